//! Per-instance memo of checksums and temporary file materializations.
//!
//! Every [`DataElement`](crate::DataElement) owns one [`ContentCache`]. The
//! cache never holds content itself; it remembers digests and the paths of
//! files it wrote, and forgets both whenever the element's content changes.
//!
//! A generation counter guards against races between a reader and a
//! mutation: results derived from a read that began before an invalidation
//! are never memoized.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dataprov_crypto::ContentHasher;
use dataprov_types::{Checksum, DigestAlgorithm};
use tracing::{debug, warn};

use crate::error::{ElementError, ElementResult};

const TEMP_PREFIX: &str = "dprov-";

#[derive(Debug)]
struct TempFile {
    generation: u64,
    path: PathBuf,
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    checksums: HashMap<DigestAlgorithm, Checksum>,
    temp_files: Vec<TempFile>,
}

/// Checksum memo and temp-file cache owned by a single element.
///
/// Temp files are deleted on [`invalidate`](Self::invalidate) and when the
/// cache is dropped, never shared with another instance.
#[derive(Debug, Default)]
pub struct ContentCache {
    state: Mutex<CacheState>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content generation. Bumped by every invalidation.
    pub fn generation(&self) -> u64 {
        self.state.lock().expect("lock poisoned").generation
    }

    /// Digest the content returned by `read`, reusing a memo when one exists
    /// for the current generation.
    pub fn checksum<F>(&self, algorithm: DigestAlgorithm, read: F) -> ElementResult<Checksum>
    where
        F: FnOnce() -> ElementResult<Vec<u8>>,
    {
        let generation = {
            let state = self.state.lock().expect("lock poisoned");
            if let Some(checksum) = state.checksums.get(&algorithm) {
                return Ok(checksum.clone());
            }
            state.generation
        };

        let checksum = ContentHasher::new(algorithm).hash(&read()?);

        let mut state = self.state.lock().expect("lock poisoned");
        if state.generation == generation {
            state.checksums.insert(algorithm, checksum.clone());
        }
        Ok(checksum)
    }

    /// Return a file holding the current content, writing one only if no
    /// valid materialization exists.
    ///
    /// With `dir`, only a file inside that directory is reused and a new one
    /// is created there (the directory is created if missing). Without it,
    /// any current file is reused and new files go to the system temp
    /// directory. Files deleted behind the cache's back are forgotten first.
    pub fn write_temp<F>(&self, dir: Option<&Path>, content_type: Option<&str>, read: F) -> ElementResult<PathBuf>
    where
        F: FnOnce() -> ElementResult<Vec<u8>>,
    {
        let dir = match dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|source| ElementError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
                Some(std::path::absolute(dir).map_err(|source| ElementError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?)
            }
            None => None,
        };

        let generation = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.temp_files.retain(|t| t.path.exists());
            let current = state.generation;
            let cached = state
                .temp_files
                .iter()
                .rev()
                .filter(|t| t.generation == current)
                .find(|t| dir.as_deref().map_or(true, |d| t.path.parent() == Some(d)));
            if let Some(cached) = cached {
                return Ok(cached.path.clone());
            }
            current
        };

        let target_dir = dir.unwrap_or_else(std::env::temp_dir);
        let path = write_new_file(&target_dir, &extension_for(content_type), &read()?)?;
        debug!(path = %path.display(), generation, "materialized element content");

        let mut state = self.state.lock().expect("lock poisoned");
        state.temp_files.push(TempFile {
            generation,
            path: path.clone(),
        });
        Ok(path)
    }

    /// Paths of every temp file currently tracked, oldest first.
    pub fn temp_paths(&self) -> Vec<PathBuf> {
        let state = self.state.lock().expect("lock poisoned");
        state.temp_files.iter().map(|t| t.path.clone()).collect()
    }

    /// Forget all memos and delete every temp file. Idempotent.
    pub fn invalidate(&self) {
        let removed = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.generation += 1;
            state.checksums.clear();
            std::mem::take(&mut state.temp_files)
        };
        remove_files(removed);
    }
}

impl Drop for ContentCache {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        remove_files(std::mem::take(&mut state.temp_files));
    }
}

fn remove_files(files: Vec<TempFile>) {
    for file in files {
        match fs::remove_file(&file.path) {
            Ok(()) => debug!(path = %file.path.display(), "removed temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %file.path.display(), error = %e, "failed to remove temp file"),
        }
    }
}

fn write_new_file(dir: &Path, suffix: &str, data: &[u8]) -> ElementResult<PathBuf> {
    let io_err = |source| ElementError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(io_err)?;
    file.write_all(data).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    file.into_temp_path().keep().map_err(|e| io_err(e.error))
}

/// File extension (with the dot) for a content type, or empty if unknown.
///
/// JPEG content always gets `.jpg` rather than the rarer `.jpe`/`.jfif`.
pub(crate) fn extension_for(content_type: Option<&str>) -> String {
    let Some(extensions) = content_type.and_then(mime_guess::get_mime_extensions_str) else {
        return String::new();
    };
    if extensions.iter().any(|e| matches!(*e, "jpg" | "jpe" | "jfif")) {
        return ".jpg".to_string();
    }
    extensions.first().map(|e| format!(".{e}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &'static [u8]) -> impl FnOnce() -> ElementResult<Vec<u8>> {
        move || Ok(data.to_vec())
    }

    // -----------------------------------------------------------------------
    // Checksums
    // -----------------------------------------------------------------------

    #[test]
    fn checksum_is_memoized_per_generation() {
        let cache = ContentCache::new();
        let first = cache.checksum(DigestAlgorithm::Sha1, reader(b"hello")).unwrap();
        assert_eq!(first.to_hex(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");

        let memo = cache
            .checksum(DigestAlgorithm::Sha1, || panic!("memo should be used"))
            .unwrap();
        assert_eq!(memo, first);

        cache.invalidate();
        let fresh = cache.checksum(DigestAlgorithm::Sha1, reader(b"other")).unwrap();
        assert_ne!(fresh, first);
    }

    #[test]
    fn stale_checksum_is_not_memoized() {
        let cache = ContentCache::new();
        let c = cache
            .checksum(DigestAlgorithm::Sha1, || {
                // A mutation lands while the content is being read.
                cache.invalidate();
                Ok(b"old".to_vec())
            })
            .unwrap();
        assert_eq!(c, ContentHasher::SHA1.hash(b"old"));
        let next = cache.checksum(DigestAlgorithm::Sha1, reader(b"new")).unwrap();
        assert_eq!(next, ContentHasher::SHA1.hash(b"new"));
    }

    #[test]
    fn retrieval_errors_are_not_memoized() {
        let cache = ContentCache::new();
        let err = cache
            .checksum(DigestAlgorithm::Md5, || Err(ElementError::retrieval("x", "down")))
            .unwrap_err();
        assert!(matches!(err, ElementError::Retrieval { .. }));
        assert!(cache.checksum(DigestAlgorithm::Md5, reader(b"")).is_ok());
    }

    // -----------------------------------------------------------------------
    // Temp files
    // -----------------------------------------------------------------------

    #[test]
    fn write_temp_reuses_path_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new();
        let a = cache.write_temp(Some(dir.path()), None, reader(b"abc")).unwrap();
        let b = cache
            .write_temp(Some(dir.path()), None, || panic!("cached path should be reused"))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(fs::read(&a).unwrap(), b"abc");

        cache.invalidate();
        assert!(!a.exists());
        let c = cache.write_temp(Some(dir.path()), None, reader(b"xyz")).unwrap();
        assert_eq!(fs::read(&c).unwrap(), b"xyz");
    }

    #[test]
    fn write_temp_respects_requested_directory() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        let cache = ContentCache::new();
        let a = cache.write_temp(Some(one.path()), None, reader(b"data")).unwrap();
        let b = cache.write_temp(Some(two.path()), None, reader(b"data")).unwrap();
        assert_ne!(a, b);
        assert_eq!(b.parent(), Some(std::path::absolute(two.path()).unwrap().as_path()));
        // No directory requested: any current file will do.
        assert_eq!(cache.write_temp(None, None, || panic!("reuse")).unwrap(), b);
        assert_eq!(cache.temp_paths(), vec![a, b]);
    }

    #[test]
    fn write_temp_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let cache = ContentCache::new();
        let path = cache.write_temp(Some(&nested), None, reader(b"x")).unwrap();
        assert!(nested.is_dir());
        assert!(path.starts_with(std::path::absolute(&nested).unwrap()));
    }

    #[test]
    fn externally_removed_files_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new();
        let a = cache.write_temp(Some(dir.path()), None, reader(b"x")).unwrap();
        fs::remove_file(&a).unwrap();
        let b = cache.write_temp(Some(dir.path()), None, reader(b"x")).unwrap();
        assert!(b.exists());
        assert_eq!(cache.temp_paths(), vec![b]);
    }

    #[test]
    fn drop_removes_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let cache = ContentCache::new();
            cache.write_temp(Some(dir.path()), None, reader(b"x")).unwrap()
        };
        assert!(!path.exists());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let cache = ContentCache::new();
        cache.invalidate();
        cache.invalidate();
        assert_eq!(cache.generation(), 2);
        assert!(cache.temp_paths().is_empty());
    }

    #[test]
    fn temp_file_names_carry_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new();
        let path = cache
            .write_temp(Some(dir.path()), Some("image/png"), reader(b"png"))
            .unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(TEMP_PREFIX));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(extension_for(Some("image/jpeg")), ".jpg");
        assert_eq!(extension_for(Some("image/png")), ".png");
        assert_eq!(extension_for(Some("application/x-not-a-real-type")), "");
        assert_eq!(extension_for(None), "");
    }
}
