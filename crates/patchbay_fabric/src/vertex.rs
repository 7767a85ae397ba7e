//! The bare graph vertex shared by local block graphs and chains.

/// Distance of a vertex that the current search has not reached.
pub const UNREACHED: u32 = u32::MAX;

/// A graph vertex with transient search state.
///
/// `visited` and `distance` are scratch state owned by whichever search is
/// running and are reset at the start of every search. `deleted` is
/// permanent for the lifetime of the graph instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    /// The vertex label.
    pub label: String,
    /// Settled by the current search.
    pub visited: bool,
    /// Best known distance from the current search origin.
    pub distance: u32,
    /// Consumed; never considered by any later search.
    pub deleted: bool,
}

impl Vertex {
    /// Creates a live, unvisited vertex.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            visited: false,
            distance: UNREACHED,
            deleted: false,
        }
    }

    /// Clears the search scratch state.
    pub fn reset(&mut self) {
        self.visited = false;
        self.distance = UNREACHED;
    }

    /// Whether the current search assigned this vertex a distance.
    pub fn is_reached(&self) -> bool {
        self.distance != UNREACHED
    }

    /// Whether the vertex can still take part in a search.
    pub fn is_live(&self) -> bool {
        !self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_vertex_is_unreached() {
        let v = Vertex::new("n1");
        assert!(!v.visited);
        assert!(!v.is_reached());
        assert!(v.is_live());
    }

    #[test]
    fn reset_keeps_deleted() {
        let mut v = Vertex::new("n1");
        v.visited = true;
        v.distance = 3;
        v.deleted = true;
        v.reset();
        assert!(!v.visited);
        assert_eq!(v.distance, UNREACHED);
        assert!(v.deleted);
    }
}
