//! Why a `patchbay.toml` was rejected.

use std::path::PathBuf;

/// Errors from reading or validating a router configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid TOML for a router configuration.
    #[error("malformed configuration: {0}")]
    Parse(String),

    /// A field the router cannot run without is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Two `[[fabric.blocks]]` entries share a label.
    #[error("block '{0}' is declared more than once")]
    DuplicateBlock(String),

    /// A reserved key names a block without an adjacency description.
    #[error("reserved key {key} names undeclared block '{block}'")]
    UndeclaredReservedBlock {
        /// The block label as written.
        block: String,
        /// The reserved key.
        key: u32,
    },

    /// A search setting is below its minimum.
    #[error("{field} must be at least {minimum}")]
    TooSmall {
        /// Dotted field name, e.g. `search.max_attempts`.
        field: &'static str,
        /// The smallest accepted value.
        minimum: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("bench/patchbay.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "cannot read bench/patchbay.toml: not found");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn reserved_key_message() {
        let err = ConfigError::UndeclaredReservedBlock {
            block: "CB<9".into(),
            key: 3,
        };
        assert_eq!(err.to_string(), "reserved key 3 names undeclared block 'CB<9'");
    }

    #[test]
    fn too_small_message() {
        let err = ConfigError::TooSmall {
            field: "search.reinforcement_period",
            minimum: 1,
        };
        assert_eq!(err.to_string(), "search.reinforcement_period must be at least 1");
    }
}
