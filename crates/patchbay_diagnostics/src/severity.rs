//! How bad a routing diagnostic is.
//!
//! The router maps its outcomes onto three levels: a reinforcement pass is
//! a note, a failed step that will be retried is a warning, and anything
//! that ends the task is an error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity level of a diagnostic message, least severe first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Progress the user may want to see, such as chains made heavier.
    Note,
    /// A routing step failed; the attempt is retried.
    Warning,
    /// The routing task stopped.
    Error,
}

impl Severity {
    /// Every level in ascending order.
    pub const ALL: [Severity; 3] = [Severity::Note, Severity::Warning, Severity::Error];

    /// Position in [`ALL`](Self::ALL), used to index per-severity tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` if this severity is [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// SGR color code for the header of a rendered diagnostic.
    pub fn ansi_color(self) -> &'static str {
        match self {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Note => "36",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}
