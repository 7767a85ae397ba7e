//! Fingerprints of routing state.
//!
//! A fingerprint covers what a later search can observe: live chains with
//! their weights and affect flags, how much of each block graph is left,
//! and the used-block registry. Equal fingerprints route identically, which
//! is how snapshots and repeated tasks are compared in logs and tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// A 128-bit XXH3 digest of routing state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Digest of a raw byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_digest(xxhash_rust::xxh3::xxh3_128(data))
    }

    fn from_digest(digest: u128) -> Self {
        Self(digest.to_le_bytes())
    }

    /// The first eight hex digits, enough to tell attempts apart in a log.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}..)", self.short())
    }
}

/// Streams routing state into a [`ContentHash`].
///
/// Labels are NUL terminated, so `["CB<1.n1", "2"]` and `["CB<1.n12"]`
/// never collide.
pub struct Fingerprinter {
    state: Xxh3,
}

impl Fingerprinter {
    /// An empty fingerprint.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Adds a little-endian number.
    pub fn number(&mut self, value: u32) -> &mut Self {
        self.state.update(&value.to_le_bytes());
        self
    }

    /// Adds a flag as one byte.
    pub fn flag(&mut self, value: bool) -> &mut Self {
        self.state.update(&[u8::from(value)]);
        self
    }

    /// Adds a port, block or registry label.
    pub fn label(&mut self, label: &str) -> &mut Self {
        self.state.update(label.as_bytes());
        self.state.update(&[0]);
        self
    }

    /// The digest of everything added so far.
    pub fn finish(&self) -> ContentHash {
        ContentHash::from_digest(self.state.digest128())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(weight: u32, ports: &[&str]) -> ContentHash {
        let mut f = Fingerprinter::new();
        f.number(weight);
        for port in ports {
            f.label(port);
        }
        f.finish()
    }

    #[test]
    fn same_chain_same_fingerprint() {
        assert_eq!(
            chain(1, &["CAU<10.n1", "PPC<20.PX1"]),
            chain(1, &["CAU<10.n1", "PPC<20.PX1"])
        );
    }

    #[test]
    fn reinforced_weight_changes_fingerprint() {
        assert_ne!(chain(1, &["CB<1.n2"]), chain(5, &["CB<1.n2"]));
    }

    #[test]
    fn label_boundaries_are_kept() {
        assert_ne!(chain(1, &["CB<1.n1", "2"]), chain(1, &["CB<1.n12"]));
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut f = Fingerprinter::new();
        f.label("RES<30");
        assert_eq!(f.finish(), ContentHash::from_bytes(b"RES<30\0"));
    }

    #[test]
    fn display_and_short_forms() {
        let h = chain(1, &["PPC<20.PY1"]);
        let full = h.to_string();
        assert_eq!(full.len(), 32);
        assert!(full.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h.short(), full[..8]);
        assert_eq!(format!("{h:?}"), format!("ContentHash({}..)", &full[..8]));
    }
}
