//! Registry of blocks that routed connections have already claimed.

use patchbay_fabric::BlockKind;
use regex::Regex;

#[derive(Debug, Clone)]
enum Entry {
    Literal(String),
    Pattern(Regex),
}

/// Block labels and pad patterns that unbound targets must avoid.
///
/// Pad entries are regular expressions, since a pad is claimed one pin
/// group at a time. Every other entry is a block label matched literally
/// against port labels; a literal never matches a longer block id, so
/// `CAU<1` does not cover `CAU<10.n1`.
#[derive(Debug, Clone, Default)]
pub struct UsedBlockRegistry {
    sources: Vec<String>,
    entries: Vec<Entry>,
}

impl UsedBlockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a block label or pad pattern.
    ///
    /// Returns `false` if the entry was already present.
    pub fn insert(&mut self, entry: &str) -> Result<bool, regex::Error> {
        if self.sources.iter().any(|s| s == entry) {
            return Ok(false);
        }
        let compiled = if BlockKind::from_block_label(entry).used_by_pattern() {
            Entry::Pattern(Regex::new(entry)?)
        } else {
            Entry::Literal(entry.to_string())
        };
        self.sources.push(entry.to_string());
        self.entries.push(compiled);
        Ok(true)
    }

    /// Whether any entry covers the port label.
    pub fn covers(&self, port_label: &str) -> bool {
        self.entries.iter().any(|entry| match entry {
            Entry::Pattern(re) => re.is_match(port_label),
            Entry::Literal(label) => covers_literal(label, port_label),
        })
    }

    /// The recorded entries in insertion order.
    pub fn entries(&self) -> &[String] {
        &self.sources
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn covers_literal(label: &str, port_label: &str) -> bool {
    port_label.match_indices(label).any(|(at, _)| {
        !port_label[at + label.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}
