use std::fmt;
use std::path::{Path, PathBuf};

use dataprov_plugin::{Configurable, Contract};
use dataprov_types::{Checksum, DigestAlgorithm, ElementKey};

use crate::cache::ContentCache;
use crate::error::{ElementError, ElementResult};

/// Handle to one unit of byte content, wherever it lives.
///
/// Implementations provide retrieval, the backend write, and a
/// [`ContentCache`]; identity, temp-file materialization, and cache
/// invalidation come from the provided methods and behave the same for
/// every backend.
///
/// Invariants:
/// - A checksum is a pure function of the current content.
/// - `write_temp` returns the same path for unchanged content.
/// - `set_bytes` succeeds only when [`writable`](Self::writable) and
///   invalidates every previously issued temp path and checksum.
/// - Retrieval failures are surfaced, never reported as empty content.
pub trait DataElement: Configurable + Send + Sync + fmt::Debug {
    /// MIME type reported by the backend or inferred, `None` when unknown.
    fn content_type(&self) -> Option<String>;

    /// Fetch the full content from the backend.
    fn get_bytes(&self) -> ElementResult<Vec<u8>>;

    /// Whether [`set_bytes`](Self::set_bytes) is permitted. Fixed at
    /// construction.
    fn writable(&self) -> bool;

    /// Persist content to the backend. Only called on writable elements.
    fn store_bytes(&self, data: &[u8]) -> ElementResult<()>;

    /// Human-readable locator used in error messages.
    fn locator(&self) -> String;

    /// The element's own checksum memo and temp-file cache.
    fn cache(&self) -> &ContentCache;

    /// Replace the content.
    fn set_bytes(&self, data: &[u8]) -> ElementResult<()> {
        if !self.writable() {
            return Err(ElementError::ReadOnly {
                element: self.locator(),
            });
        }
        self.store_bytes(data)?;
        self.cache().invalidate();
        Ok(())
    }

    /// Returns `true` if the content is zero bytes long.
    fn is_empty(&self) -> ElementResult<bool> {
        Ok(self.get_bytes()?.is_empty())
    }

    /// Digest of the content under `algorithm`, from a single read.
    fn checksum(&self, algorithm: DigestAlgorithm) -> ElementResult<Checksum> {
        self.cache().checksum(algorithm, || self.get_bytes())
    }

    fn sha1(&self) -> ElementResult<Checksum> {
        self.checksum(DigestAlgorithm::Sha1)
    }

    fn md5(&self) -> ElementResult<Checksum> {
        self.checksum(DigestAlgorithm::Md5)
    }

    fn sha256(&self) -> ElementResult<Checksum> {
        self.checksum(DigestAlgorithm::Sha256)
    }

    /// Key under which data sets store this element: the SHA-1 hex digest.
    fn uuid(&self) -> ElementResult<ElementKey> {
        Ok(ElementKey::from(&self.sha1()?))
    }

    /// Content-equal iff SHA-1 checksums match.
    fn content_eq(&self, other: &dyn DataElement) -> ElementResult<bool> {
        Ok(self.sha1()? == other.sha1()?)
    }

    /// Materialize the content as a local file and return its path.
    ///
    /// See [`ContentCache::write_temp`] for reuse rules.
    fn write_temp(&self, dir: Option<&Path>) -> ElementResult<PathBuf> {
        let content_type = self.content_type();
        self.cache()
            .write_temp(dir, content_type.as_deref(), || self.get_bytes())
    }

    /// Delete every temp file written for this instance. Idempotent.
    fn clean_temp(&self) {
        self.cache().invalidate();
    }
}

impl Contract for dyn DataElement {
    const NAME: &'static str = "data_element";
}
