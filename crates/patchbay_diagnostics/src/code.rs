//! Diagnostic codes with category prefixes for structured identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Input and functional errors, prefixed with `E`.
    Error,
    /// General warnings, prefixed with `W`.
    Warning,
    /// Routing progress and failures, prefixed with `R`.
    Route,
    /// Fabric description findings, prefixed with `F`.
    Fabric,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Route => 'R',
            Category::Fabric => 'F',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a number.
///
/// Displayed as the prefix followed by a zero-padded 3-digit number, e.g.
/// `R101` for a failed routing step.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

/// The codes the router emits.
pub mod codes {
    use super::{Category, DiagnosticCode};

    /// A functional error (bad parameter, unknown terminal, unreadable
    /// description) ended the task.
    pub const FUNCTIONAL: DiagnosticCode = DiagnosticCode::new(Category::Error, 101);
    /// A broken internal invariant ended the task.
    pub const INTERNAL: DiagnosticCode = DiagnosticCode::new(Category::Error, 102);
    /// One connection found no path; the attempt is retried.
    pub const STEP_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Route, 101);
    /// Every attempt failed.
    pub const EXHAUSTED: DiagnosticCode = DiagnosticCode::new(Category::Route, 201);
    /// Contested chains were made heavier between attempts.
    pub const REINFORCED: DiagnosticCode = DiagnosticCode::new(Category::Route, 301);
    /// A crossbar is referenced by chains but has no adjacency description.
    pub const UNDESCRIBED_CROSSBAR: DiagnosticCode = DiagnosticCode::new(Category::Fabric, 101);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
