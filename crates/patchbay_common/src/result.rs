//! Common result and error types for the Patchbay router.

/// The standard result type for operations that can only fail on a bug.
///
/// `Err` indicates a broken internal invariant (a corrupted graph, a search
/// that exceeded its iteration cap), never a user input problem. Input
/// problems have their own error enums in the crates that detect them.
pub type PatchbayResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Patchbay, not a user input problem.
///
/// These errors should never occur during normal operation. If one does
/// occur, the graph state is corrupt and the current task must stop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal router error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates the error reported when a search loop exceeds its cap.
    pub fn iteration_cap(search: &str, cap: usize) -> Self {
        Self::new(format!("{search} exceeded its iteration cap of {cap}"))
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
