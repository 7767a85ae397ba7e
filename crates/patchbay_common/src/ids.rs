//! Opaque ID newtypes for router entities.
//!
//! [`ChainId`] indexes the global chain arena, [`NodeId`] and [`TerminalId`]
//! index the circuit-database collaborator. All are thin `u32` wrappers that
//! are `Copy`, `Hash`, ordered, and `Serialize`/`Deserialize`.

/// Defines an opaque `u32` index newtype with the shared helper impls.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize`, for arena access.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a chain (vertex) in the global chain graph.
    ChainId
);

define_id!(
    /// Opaque, copyable ID for a node in the circuit database.
    NodeId
);

define_id!(
    /// Opaque, copyable ID for a terminal of a circuit node.
    TerminalId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn chain_id_roundtrip() {
        let id = ChainId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn id_equality_and_order() {
        let a = NodeId::from_raw(3);
        let b = NodeId::from_raw(3);
        let c = NodeId::from_raw(4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(TerminalId::from_raw(1));
        set.insert(TerminalId::from_raw(2));
        set.insert(TerminalId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = ChainId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: ChainId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", ChainId::from_raw(7)), "7");
    }
}
