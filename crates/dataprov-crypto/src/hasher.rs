use dataprov_types::{Checksum, DigestAlgorithm};
use sha1::Digest as _;

/// Plain content hasher for a single [`DigestAlgorithm`].
///
/// Unlike object-store hashers there is no domain separation: the digest of
/// `b"hello"` under SHA-1 is the well-known
/// `aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d`, so checksums agree with any
/// external tool and stay stable across processes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: DigestAlgorithm,
}

impl ContentHasher {
    /// Hasher for MD5 digests.
    pub const MD5: Self = Self::new(DigestAlgorithm::Md5);
    /// Hasher for SHA-1 digests (the identity algorithm).
    pub const SHA1: Self = Self::new(DigestAlgorithm::Sha1);
    /// Hasher for SHA-256 digests.
    pub const SHA256: Self = Self::new(DigestAlgorithm::Sha256);
    /// Hasher for BLAKE3 digests.
    pub const BLAKE3: Self = Self::new(DigestAlgorithm::Blake3);

    pub const fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Digest raw bytes.
    pub fn hash(&self, data: &[u8]) -> Checksum {
        let digest = Self::raw_digest(self.algorithm, data);
        Checksum::new(self.algorithm, digest)
            .unwrap_or_else(|_| unreachable!("digest length is fixed per algorithm"))
    }

    /// The algorithm used by this hasher.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    fn raw_digest(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
        match algorithm {
            DigestAlgorithm::Md5 => md5::compute(data).0.to_vec(),
            DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            DigestAlgorithm::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        }
    }
}

impl From<DigestAlgorithm> for ContentHasher {
    fn from(algorithm: DigestAlgorithm) -> Self {
        Self::new(algorithm)
    }
}
