//! The closed set of functional block kinds found on the fabric.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a functional block, resolved once from its label prefix.
///
/// Block labels look like `CAU<10` or `CB3`: an alphabetic prefix naming the
/// kind, followed by the numeric base id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// A crossbar switch matrix (`CB`).
    Crossbar,
    /// An amplifier unit (`CAU`).
    Amplifier,
    /// A resistor array with selectable taps (`RES`).
    ResistorArray,
    /// A capacitor array (`CAP`).
    CapacitorArray,
    /// An external pad (`PPC`).
    Pad,
    /// A shared reference block that may be tapped several times (`SPM`).
    SharedReference,
    /// An isolated-net lane block (`ION`).
    Ion,
    /// Any prefix not listed above.
    Other,
}

impl BlockKind {
    /// Resolves the kind from a block label's alphabetic prefix.
    pub fn from_block_label(label: &str) -> Self {
        let end = label
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(label.len());
        Self::from_prefix(&label[..end])
    }

    /// Resolves the kind from a bare prefix such as `"CB"`.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "CB" => BlockKind::Crossbar,
            "CAU" => BlockKind::Amplifier,
            "RES" => BlockKind::ResistorArray,
            "CAP" => BlockKind::CapacitorArray,
            "PPC" => BlockKind::Pad,
            "SPM" => BlockKind::SharedReference,
            "ION" => BlockKind::Ion,
            _ => BlockKind::Other,
        }
    }

    /// Returns the label prefix of this kind (empty for [`BlockKind::Other`]).
    pub fn prefix(self) -> &'static str {
        match self {
            BlockKind::Crossbar => "CB",
            BlockKind::Amplifier => "CAU",
            BlockKind::ResistorArray => "RES",
            BlockKind::CapacitorArray => "CAP",
            BlockKind::Pad => "PPC",
            BlockKind::SharedReference => "SPM",
            BlockKind::Ion => "ION",
            BlockKind::Other => "",
        }
    }

    /// Whether ports on blocks of this kind stay on a chain that is affected.
    pub fn survives_affect(self) -> bool {
        matches!(self, BlockKind::Crossbar | BlockKind::SharedReference)
    }

    /// Whether used-block registry entries for this kind are regular expressions.
    pub fn used_by_pattern(self) -> bool {
        self == BlockKind::Pad
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Crossbar => "crossbar",
            BlockKind::Amplifier => "amplifier",
            BlockKind::ResistorArray => "resistor array",
            BlockKind::CapacitorArray => "capacitor array",
            BlockKind::Pad => "pad",
            BlockKind::SharedReference => "shared reference",
            BlockKind::Ion => "ion",
            BlockKind::Other => "other",
        };
        f.write_str(name)
    }
}
