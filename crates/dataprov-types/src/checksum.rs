use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Digest algorithm used to compute a [`Checksum`].
///
/// SHA-1 is the default identity algorithm: element keys and data set
/// membership are derived from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    #[default]
    Sha1,
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// All supported algorithms.
    pub const ALL: [DigestAlgorithm; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Blake3];

    /// Digest length in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }

    /// Lowercase algorithm label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(TypeError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Digest of an element's full byte content.
///
/// A checksum is a pure function of content: identical bytes always produce
/// the same checksum under the same algorithm, in any process. Checksums of
/// different algorithms never compare equal.
///
/// Serialized as `"<algorithm>:<hex>"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum {
    algorithm: DigestAlgorithm,
    digest: Vec<u8>,
}

impl Checksum {
    /// Wrap a computed digest. Fails if the length does not match the algorithm.
    pub fn new(algorithm: DigestAlgorithm, digest: Vec<u8>) -> Result<Self, TypeError> {
        if digest.len() != algorithm.digest_len() {
            return Err(TypeError::InvalidLength {
                algorithm: algorithm.to_string(),
                expected: algorithm.digest_len(),
                actual: digest.len(),
            });
        }
        Ok(Self { algorithm, digest })
    }

    /// Parse a bare hex digest for the given algorithm.
    pub fn from_hex(algorithm: DigestAlgorithm, s: &str) -> Result<Self, TypeError> {
        let digest = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::new(algorithm, digest)
    }

    /// The algorithm this digest was computed with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.digest
    }

    /// Lowercase hex digest, without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    /// First 8 hex characters.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..4])
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({}:{})", self.algorithm, self.short_hex())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl FromStr for Checksum {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex_digest) = s
            .split_once(':')
            .ok_or_else(|| TypeError::InvalidHex(format!("missing algorithm prefix in {s:?}")))?;
        Self::from_hex(algorithm.parse()?, hex_digest)
    }
}

impl TryFrom<String> for Checksum {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Checksum> for String {
    fn from(checksum: Checksum) -> Self {
        checksum.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    #[test]
    fn default_algorithm_is_sha1() {
        assert_eq!(DigestAlgorithm::default(), DigestAlgorithm::Sha1);
    }

    #[test]
    fn hex_roundtrip() {
        let c = Checksum::from_hex(DigestAlgorithm::Sha1, HELLO_SHA1).unwrap();
        assert_eq!(c.to_hex(), HELLO_SHA1);
        assert_eq!(c.as_bytes().len(), 20);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = Checksum::from_hex(DigestAlgorithm::Sha256, HELLO_SHA1).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                algorithm: "sha256".into(),
                expected: 32,
                actual: 20,
            }
        );
    }

    #[test]
    fn invalid_hex_is_rejected() {
        assert!(matches!(
            Checksum::from_hex(DigestAlgorithm::Md5, "zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn display_includes_algorithm() {
        let c = Checksum::from_hex(DigestAlgorithm::Sha1, HELLO_SHA1).unwrap();
        assert_eq!(c.to_string(), format!("sha1:{HELLO_SHA1}"));
        let parsed: Checksum = c.to_string().parse().unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn algorithms_do_not_compare_equal() {
        let a = Checksum::new(DigestAlgorithm::Sha256, vec![7; 32]).unwrap();
        let b = Checksum::new(DigestAlgorithm::Blake3, vec![7; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn serde_uses_prefixed_string() {
        let c = Checksum::from_hex(DigestAlgorithm::Sha1, HELLO_SHA1).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, format!("\"sha1:{HELLO_SHA1}\""));
        let parsed: Checksum = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn algorithm_parsing_accepts_dashed_names() {
        assert_eq!("SHA-1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("sha-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn short_hex_is_8_chars() {
        let c = Checksum::new(DigestAlgorithm::Md5, vec![0xab; 16]).unwrap();
        assert_eq!(c.short_hex(), "abababab");
    }
}
