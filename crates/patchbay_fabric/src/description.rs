//! Readers for the two fabric description formats.

use crate::chain::{Chain, MAX_CHAINS};
use crate::error::FabricError;
use std::path::Path;

/// Parses a global chain description, one chain per non-blank line.
///
/// Lines starting with `#` are comments.
pub fn parse_chain_description(text: &str) -> Result<Vec<Chain>, FabricError> {
    let mut chains = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if chains.len() == MAX_CHAINS {
            return Err(FabricError::TooManyChains { limit: MAX_CHAINS });
        }
        chains.push(Chain::parse(line, line_no + 1)?);
    }
    Ok(chains)
}

/// Reads and parses a global chain description file.
pub fn read_chain_description(path: &Path) -> Result<Vec<Chain>, FabricError> {
    let text = read_to_string(path)?;
    parse_chain_description(&text)
}

/// Reads a block adjacency description file without parsing it.
pub fn read_block_description(path: &Path) -> Result<String, FabricError> {
    read_to_string(path)
}

fn read_to_string(path: &Path) -> Result<String, FabricError> {
    std::fs::read_to_string(path).map_err(|source| FabricError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_comments_and_blanks() {
        let text = "# fabric\n\nCAU<10.n1 CB<3.n4\n  \nCAU<10.n2 PPC<20.PX1\n";
        let chains = parse_chain_description(text).unwrap();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].label(), "CAU<10.n1");
        assert_eq!(chains[1].ports().len(), 2);
    }

    #[test]
    fn rejects_oversized_description() {
        let text: String = (0..=MAX_CHAINS).map(|i| format!("CB<{i}.n1\n")).collect();
        let err = parse_chain_description(&text).unwrap_err();
        assert!(matches!(err, FabricError::TooManyChains { limit: MAX_CHAINS }));
    }

    #[test]
    fn reads_chain_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CAU<10.n1 CB<3.n4").unwrap();
        let chains = read_chain_description(file.path()).unwrap();
        assert_eq!(chains.len(), 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let err = read_block_description(&path).unwrap_err();
        match err {
            FabricError::Io { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
