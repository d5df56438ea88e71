//! Content digests for integrity checks and manifest version identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Hash algorithm used for asset digests and manifest identity.
///
/// `Md5` matches what the origin's manifest generator emits. The role of the
/// digest is staleness and corruption detection against a trusted origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the hex-encoded digest.
    pub fn hex_len(self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 32,
            DigestAlgorithm::Sha256 => 64,
        }
    }

    /// Compute the lowercase hex digest of `bytes`.
    pub fn digest(self, bytes: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => hex::encode(md5::compute(bytes).0),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
        }
    }

    /// Check `bytes` against an expected hex digest (case-insensitive).
    pub fn verify(self, bytes: &[u8], expected: &str) -> bool {
        self.digest(bytes).eq_ignore_ascii_case(expected.trim())
    }

    /// Whether `candidate` looks like a digest this algorithm could produce.
    pub fn is_well_formed(self, candidate: &str) -> bool {
        candidate.len() == self.hex_len() && candidate.chars().all(|c| c.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_value() {
        assert_eq!(DigestAlgorithm::Md5.digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(DigestAlgorithm::Md5.digest(b"hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            DigestAlgorithm::Sha256.digest(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_digest_stability() {
        let a = DigestAlgorithm::Md5.digest(b"body { color: red }");
        let b = DigestAlgorithm::Md5.digest(b"body { color: red }");
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_ignores_case() {
        assert!(DigestAlgorithm::Md5.verify(b"hello", "5D41402ABC4B2A76B9719D911017C592"));
        assert!(!DigestAlgorithm::Md5.verify(b"hello!", "5d41402abc4b2a76b9719d911017c592"));
    }

    #[test]
    fn test_well_formed() {
        assert!(DigestAlgorithm::Md5.is_well_formed("5d41402abc4b2a76b9719d911017c592"));
        assert!(!DigestAlgorithm::Md5.is_well_formed("5d41402abc4b2a76"));
        assert!(!DigestAlgorithm::Md5.is_well_formed("zz41402abc4b2a76b9719d911017c592"));
        assert!(!DigestAlgorithm::Sha256.is_well_formed("5d41402abc4b2a76b9719d911017c592"));
    }
}
