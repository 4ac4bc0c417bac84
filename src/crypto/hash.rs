//! SHA-256 hashing helpers
//!
//! Used to derive the canonical signing digest of a transaction.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Incremental SHA-256 over length-prefixed fields.
///
/// Each field is written as its big-endian `u64` length followed by the raw
/// bytes, so `("ab", "c")` and `("a", "bc")` never collide.
pub struct FieldHasher {
    inner: Sha256,
}

impl FieldHasher {
    /// Start a new digest under a domain tag
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Self {
            inner: Sha256::new(),
        };
        hasher.field(domain);
        hasher
    }

    /// Append one length-prefixed field
    pub fn field(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.update((bytes.len() as u64).to_be_bytes());
        self.inner.update(bytes);
        self
    }

    /// Finish and return the 32-byte digest
    pub fn finish(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            hex::encode(hash),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        let mut a = FieldHasher::new(b"test");
        a.field(b"ab").field(b"c");
        let mut b = FieldHasher::new(b"test");
        b.field(b"a").field(b"bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_domain_separates_digests() {
        let mut a = FieldHasher::new(b"one");
        a.field(b"x");
        let mut b = FieldHasher::new(b"two");
        b.field(b"x");
        assert_ne!(a.finish(), b.finish());
    }
}
