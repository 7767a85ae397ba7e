//! Fabric port labels and the block reference extracted from them.

use crate::kind::BlockKind;

/// The block part of a port label, e.g. `CAU<10` in `CAU<10.n1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockRef {
    /// The full block label.
    pub label: String,
    /// The numeric suffix of the label; added to local keys when emitting.
    pub base_id: u32,
    /// The kind resolved from the label prefix.
    pub kind: BlockKind,
}

impl BlockRef {
    /// Parses a block label. Returns `None` unless it ends in a numeric base id.
    pub fn parse(label: &str) -> Option<Self> {
        let digits_at = label
            .rfind(|c: char| !c.is_ascii_digit())
            .map_or(0, |pos| pos + 1);
        if digits_at == label.len() {
            return None;
        }
        let base_id = label[digits_at..].parse().ok()?;
        Some(Self {
            label: label.to_string(),
            base_id,
            kind: BlockKind::from_block_label(label),
        })
    }
}

/// One port of a chain: its literal label and, when present, its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// The literal port label from the chain description.
    pub label: String,
    /// The block this port belongs to, if the label has a `<block>.` prefix.
    pub block: Option<BlockRef>,
    /// The terminal name inside the block (the whole label without a block).
    pub terminal: String,
}

impl Port {
    /// Parses a port label such as `CAU<10.n1` or `PPC<20.PX1`.
    pub fn parse(label: &str) -> Self {
        if let Some((head, tail)) = label.split_once('.') {
            if let Some(block) = BlockRef::parse(head) {
                return Self {
                    label: label.to_string(),
                    block: Some(block),
                    terminal: tail.to_string(),
                };
            }
        }
        Self {
            label: label.to_string(),
            block: None,
            terminal: label.to_string(),
        }
    }

    /// Returns the block label, if any.
    pub fn block_label(&self) -> Option<&str> {
        self.block.as_ref().map(|b| b.label.as_str())
    }

    /// Returns the block kind, or [`BlockKind::Other`] for block-less ports.
    pub fn kind(&self) -> BlockKind {
        self.block.as_ref().map_or(BlockKind::Other, |b| b.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_block_port() {
        let port = Port::parse("CAU<10.n1");
        let block = port.block.as_ref().unwrap();
        assert_eq!(block.label, "CAU<10");
        assert_eq!(block.base_id, 10);
        assert_eq!(block.kind, BlockKind::Amplifier);
        assert_eq!(port.terminal, "n1");
    }

    #[test]
    fn parse_pad_port() {
        let port = Port::parse("PPC<20.PX1");
        assert_eq!(port.block_label(), Some("PPC<20"));
        assert_eq!(port.kind(), BlockKind::Pad);
        assert_eq!(port.terminal, "PX1");
    }

    #[test]
    fn terminal_keeps_later_dots() {
        let port = Port::parse("CB3.bus.n4");
        assert_eq!(port.block_label(), Some("CB3"));
        assert_eq!(port.terminal, "bus.n4");
    }

    #[test]
    fn port_without_block() {
        let port = Port::parse("GND");
        assert!(port.block.is_none());
        assert_eq!(port.terminal, "GND");
        assert_eq!(port.kind(), BlockKind::Other);
    }

    #[test]
    fn head_without_digits_is_not_a_block() {
        let port = Port::parse("VREF.out");
        assert!(port.block.is_none());
    }

    #[test]
    fn block_ref_requires_digits() {
        assert!(BlockRef::parse("CB").is_none());
        assert_eq!(BlockRef::parse("RES<7").unwrap().base_id, 7);
    }
}
