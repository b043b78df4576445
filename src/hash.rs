//! Content hashing for change detection.
//!
//! Hashes are compared instead of stored dirty booleans: a boolean can wedge
//! permanently if an expected follow-up event never arrives, a hash
//! comparison cannot.

use sha2::{Digest, Sha256};

/// SHA-256 of document content, hex encoded.
///
/// Equality means byte-identical content. Used to detect no-op change
/// notifications and to derive the dirty state of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash the given content.
    pub fn of(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    /// Hex representation, for logging.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for compact log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_hashes_equal() {
        assert_eq!(ContentHash::of("hello"), ContentHash::of("hello"));
    }

    #[test]
    fn different_content_hashes_differ() {
        assert_ne!(ContentHash::of("hello"), ContentHash::of("hello!"));
        assert_ne!(ContentHash::of(""), ContentHash::of(" "));
    }

    #[test]
    fn hex_encoding_is_64_chars() {
        let hash = ContentHash::of("anything");
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash.short().len(), 8);
    }
}
