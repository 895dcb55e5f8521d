use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dataprov_element::{resolve_element, DataElement};
use dataprov_plugin::{BoxError, Configurable, Plugin, PluginDescriptor, Plugins};
use dataprov_types::{ConfigMap, ElementKey, Value};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{SetError, SetResult};
use crate::traits::DataSet;

/// Default number of segments the SHA-1 digest is split into.
pub const DEFAULT_SHA1_CHUNK: usize = 10;

const FILE_PREFIX: &str = "UUID_";
const SHA1_MARKER: &str = ".SHA1_";
const FILE_SUFFIX: &str = ".dataElement";

/// Split `s` into `segments` contiguous pieces of near-equal length.
///
/// Leading pieces take the remainder, so lengths never increase along the
/// result. Returns `None` if `segments` is zero or longer than `s`.
pub fn partition_string(s: &str, segments: usize) -> Option<Vec<&str>> {
    let bounds: Vec<usize> = s.char_indices().map(|(i, _)| i).chain([s.len()]).collect();
    let len = bounds.len() - 1;
    if segments == 0 || segments > len {
        return None;
    }
    let (base, extra) = (len / segments, len % segments);
    let mut start = 0;
    let pieces = (0..segments)
        .map(|i| {
            let end = start + base + usize::from(i < extra);
            let piece = &s[bounds[start]..bounds[end]];
            start = end;
            piece
        })
        .collect();
    Some(pieces)
}

#[derive(Debug, Clone)]
struct Entry {
    // Every descriptor file found for the key; the element is loaded from
    // the first. More than one appears when writers used different chunking.
    paths: Vec<PathBuf>,
    element: Arc<dyn DataElement>,
}

impl Entry {
    fn new(path: PathBuf, element: Arc<dyn DataElement>) -> Self {
        Self {
            paths: vec![path],
            element,
        }
    }
}

/// Data set persisted as a directory tree of element descriptors.
///
/// Each element is written to
/// `<root>/<seg>/.../UUID_<key>.SHA1_<sha1>.dataElement`, where the segment
/// directories are the SHA-1 hex digest split into `sha1_chunk` pieces with
/// the last piece dropped. Files already under the root are picked up at
/// construction. Removing an entry deletes its descriptor files (all of
/// them, if several layouts left one each) and never the element content.
pub struct FileDataSet {
    root_directory: PathBuf,
    sha1_chunk: usize,
    plugins: Plugins,
    entries: RwLock<BTreeMap<ElementKey, Entry>>,
}

impl FileDataSet {
    /// Open (creating if needed) a set rooted at `root_directory`.
    pub fn new(root_directory: impl AsRef<Path>, sha1_chunk: usize, plugins: Plugins) -> SetResult<Self> {
        if !(1..=40).contains(&sha1_chunk) {
            return Err(SetError::Store {
                set: "FileDataSet".into(),
                reason: format!("sha1_chunk must be between 1 and 40, got {sha1_chunk}"),
            });
        }
        let root = root_directory.as_ref();
        fs::create_dir_all(root).map_err(|source| SetError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let root_directory = fs::canonicalize(root).map_err(|source| SetError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let entries = scan(&root_directory, &plugins)?;
        debug!(root = %root_directory.display(), elements = entries.len(), "opened file data set");
        Ok(Self {
            root_directory,
            sha1_chunk,
            plugins,
            entries: RwLock::new(entries),
        })
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn sha1_chunk(&self) -> usize {
        self.sha1_chunk
    }

    /// Path of the descriptor file for `key`, if present.
    pub fn element_path(&self, key: &ElementKey) -> Option<PathBuf> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(key)
            .and_then(|entry| entry.paths.first().cloned())
    }

    /// Re-read the directory tree, picking up files written by others.
    pub fn refresh(&self) -> SetResult<()> {
        let entries = scan(&self.root_directory, &self.plugins)?;
        *self.entries.write().expect("lock poisoned") = entries;
        Ok(())
    }

    fn path_for(&self, key: &ElementKey, sha1: &str) -> SetResult<PathBuf> {
        let segments = partition_string(sha1, self.sha1_chunk).ok_or_else(|| SetError::Store {
            set: self.describe(),
            reason: format!("cannot split digest {sha1} into {} segments", self.sha1_chunk),
        })?;
        let mut path = self.root_directory.clone();
        path.extend(&segments[..segments.len() - 1]);
        path.push(format!("{FILE_PREFIX}{key}{SHA1_MARKER}{sha1}{FILE_SUFFIX}"));
        Ok(path)
    }

    fn describe(&self) -> String {
        format!("FileDataSet at {}", self.root_directory.display())
    }
}

impl std::fmt::Debug for FileDataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDataSet")
            .field("root_directory", &self.root_directory)
            .field("sha1_chunk", &self.sha1_chunk)
            .field("count", &self.entries.read().expect("lock poisoned").len())
            .finish()
    }
}

impl DataSet for FileDataSet {
    fn count(&self) -> SetResult<usize> {
        Ok(self.entries.read().expect("lock poisoned").len())
    }

    fn keys(&self) -> SetResult<Vec<ElementKey>> {
        Ok(self.entries.read().expect("lock poisoned").keys().cloned().collect())
    }

    fn has_key(&self, key: &ElementKey) -> SetResult<bool> {
        Ok(self.entries.read().expect("lock poisoned").contains_key(key))
    }

    fn add_many(&self, elements: Vec<Arc<dyn DataElement>>) -> SetResult<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        for element in elements {
            let key = element.uuid()?;
            let sha1 = element.sha1()?.to_hex();
            let path = self.path_for(&key, &sha1)?;
            let io_err = |source| SetError::Io {
                path: path.clone(),
                source,
            };
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(io_err)?;
            }
            let json = serde_json::to_vec_pretty(&element.to_descriptor().to_value()).map_err(|e| SetError::Store {
                set: self.describe(),
                reason: format!("cannot serialize {key}: {e}"),
            })?;
            fs::write(&path, json).map_err(io_err)?;

            if let Some(old) = entries.get(&key) {
                for stale in old.paths.iter().filter(|p| **p != path) {
                    if let Err(e) = fs::remove_file(stale) {
                        warn!(path = %stale.display(), error = %e, "failed to remove superseded descriptor");
                    }
                }
            }
            debug!(key = %key, path = %path.display(), "stored element descriptor");
            entries.insert(key, Entry::new(path, element));
        }
        Ok(())
    }

    fn get(&self, key: &ElementKey) -> SetResult<Arc<dyn DataElement>> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(|entry| entry.element.clone())
            .ok_or_else(|| SetError::KeyNotFound(key.clone()))
    }

    fn remove(&self, key: &ElementKey) -> SetResult<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        let entry = entries.get_mut(key).ok_or_else(|| SetError::KeyNotFound(key.clone()))?;
        while let Some(path) = entry.paths.pop() {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    entry.paths.push(path.clone());
                    return Err(SetError::Io { path, source });
                }
            }
        }
        entries.remove(key);
        Ok(())
    }
}

impl Configurable for FileDataSet {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn DataSet>>::NAME
    }

    fn get_config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert(
            "root_directory".into(),
            Value::String(self.root_directory.to_string_lossy().into_owned()),
        );
        config.insert("sha1_chunk".into(), Value::from(self.sha1_chunk));
        config
    }
}

impl Plugin<dyn DataSet> for FileDataSet {
    const NAME: &'static str = "FileDataSet";

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("root_directory".into(), Value::Null);
        config.insert("sha1_chunk".into(), Value::from(DEFAULT_SHA1_CHUNK));
        config
    }

    fn from_config(config: &ConfigMap, plugins: &Plugins) -> Result<Self, BoxError> {
        let root = match config.get("root_directory") {
            Some(Value::String(s)) if !s.is_empty() => PathBuf::from(s),
            _ => return Err("\"root_directory\" is required".into()),
        };
        let sha1_chunk = match config.get("sha1_chunk") {
            None | Some(Value::Null) => DEFAULT_SHA1_CHUNK,
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| format!("\"sha1_chunk\" must be a positive integer, got {v}"))?,
        };
        Ok(Self::new(root, sha1_chunk, plugins.clone())?)
    }

    fn into_contract(self) -> Box<dyn DataSet> {
        Box::new(self)
    }
}

/// Key encoded in a descriptor file name, if the name has the expected shape.
fn key_from_file_name(name: &str) -> Option<ElementKey> {
    let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    let (key, sha1) = stem.split_once(SHA1_MARKER)?;
    (!key.is_empty() && !sha1.is_empty()).then(|| ElementKey::new(key))
}

fn scan(root: &Path, plugins: &Plugins) -> SetResult<BTreeMap<ElementKey, Entry>> {
    let mut entries: BTreeMap<ElementKey, Entry> = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(key) = entry.file_name().to_str().and_then(key_from_file_name) else {
            continue;
        };
        let path = entry.into_path();
        if let Some(existing) = entries.get_mut(&key) {
            warn!(
                key = %key,
                path = %path.display(),
                kept = %existing.paths[0].display(),
                "duplicate descriptor for element"
            );
            existing.paths.push(path);
            continue;
        }
        let element = load_descriptor(&path, plugins)?;
        entries.insert(key, Entry::new(path, element));
    }
    Ok(entries)
}

fn load_descriptor(path: &Path, plugins: &Plugins) -> SetResult<Arc<dyn DataElement>> {
    let bytes = fs::read(path).map_err(|source| SetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let store_err = |reason: String| SetError::Store {
        set: format!("FileDataSet entry {}", path.display()),
        reason,
    };
    let map: ConfigMap = serde_json::from_slice(&bytes).map_err(|e| store_err(format!("not a descriptor: {e}")))?;
    let descriptor =
        PluginDescriptor::from_config_map("data_element", &map).map_err(|e| store_err(e.to_string()))?;
    Ok(resolve_element(plugins, &descriptor)?)
}
