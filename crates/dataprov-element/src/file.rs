use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use dataprov_plugin::{BoxError, Configurable, Plugin, Plugins};
use dataprov_types::{ConfigMap, Value};
use serde_json::json;
use tracing::debug;

use crate::cache::ContentCache;
use crate::error::{ElementError, ElementResult};
use crate::memory::optional_string;
use crate::traits::DataElement;

const FILE_SCHEME: &str = "file://";

/// Element backed by a file on the local filesystem.
///
/// The file itself is the materialization: [`write_temp`](DataElement::write_temp)
/// returns the file's own path unless a different directory is requested.
#[derive(Debug)]
pub struct FileElement {
    filepath: PathBuf,
    readonly: bool,
    explicit_mimetype: Option<String>,
    cache: ContentCache,
}

impl FileElement {
    /// A writable element over `filepath`. The file need not exist yet.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            readonly: false,
            explicit_mimetype: None,
            cache: ContentCache::new(),
        }
    }

    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Override the content type guessed from the file extension.
    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.explicit_mimetype = Some(mimetype.into());
        self
    }

    /// Parse `file://<absolute path>`.
    pub fn from_uri(uri: &str) -> ElementResult<Self> {
        let path = uri
            .strip_prefix(FILE_SCHEME)
            .ok_or_else(|| ElementError::invalid_uri(uri, "not a file:// URI"))?;
        let path = Path::new(path);
        if !path.is_absolute() {
            return Err(ElementError::invalid_uri(uri, "file URIs require an absolute path"));
        }
        Ok(Self::new(path))
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }
}

impl DataElement for FileElement {
    fn content_type(&self) -> Option<String> {
        self.explicit_mimetype.clone().or_else(|| {
            mime_guess::from_path(&self.filepath)
                .first_raw()
                .map(str::to_string)
        })
    }

    fn get_bytes(&self) -> ElementResult<Vec<u8>> {
        fs::read(&self.filepath).map_err(|e| ElementError::retrieval(self.locator(), e))
    }

    fn writable(&self) -> bool {
        !self.readonly
    }

    /// Write through a sibling temp file and rename it over the target, so
    /// readers never observe a partial write.
    fn store_bytes(&self, data: &[u8]) -> ElementResult<()> {
        let store_err = |e: std::io::Error| ElementError::store(self.locator(), e);
        let dir = match self.filepath.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(store_err)?;
        let mut staged = tempfile::NamedTempFile::new_in(&dir).map_err(store_err)?;
        staged.write_all(data).map_err(store_err)?;
        staged.as_file().sync_all().map_err(store_err)?;
        staged.persist(&self.filepath).map_err(|e| store_err(e.error))?;
        debug!(path = %self.filepath.display(), bytes = data.len(), "wrote file element");
        Ok(())
    }

    fn locator(&self) -> String {
        format!("file {}", self.filepath.display())
    }

    fn cache(&self) -> &ContentCache {
        &self.cache
    }

    fn write_temp(&self, dir: Option<&Path>) -> ElementResult<PathBuf> {
        if let Some(dir) = dir {
            let requested = std::path::absolute(dir).map_err(|source| ElementError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let own = std::path::absolute(&self.filepath).ok();
            if own.as_deref().and_then(Path::parent) != Some(requested.as_path()) {
                let content_type = self.content_type();
                return self
                    .cache
                    .write_temp(Some(dir), content_type.as_deref(), || self.get_bytes());
            }
        }
        if !self.filepath.is_file() {
            return Err(ElementError::retrieval(self.locator(), "file does not exist"));
        }
        Ok(self.filepath.clone())
    }
}

impl Configurable for FileElement {
    fn plugin_name(&self) -> &'static str {
        <Self as Plugin<dyn DataElement>>::NAME
    }

    fn get_config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("filepath".into(), json!(self.filepath.to_string_lossy()));
        config.insert("readonly".into(), Value::Bool(self.readonly));
        config.insert("explicit_mimetype".into(), json!(self.explicit_mimetype));
        config
    }
}

impl Plugin<dyn DataElement> for FileElement {
    const NAME: &'static str = "FileElement";

    fn default_config() -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("filepath".into(), Value::Null);
        config.insert("readonly".into(), Value::Bool(false));
        config.insert("explicit_mimetype".into(), Value::Null);
        config
    }

    fn from_config(config: &ConfigMap, _plugins: &Plugins) -> Result<Self, BoxError> {
        let filepath = optional_string(config, "filepath")?
            .filter(|p| !p.is_empty())
            .ok_or("\"filepath\" is required")?;
        let readonly = config.get("readonly").and_then(Value::as_bool).unwrap_or(false);
        let mut element = Self::new(filepath).with_readonly(readonly);
        element.explicit_mimetype = optional_string(config, "explicit_mimetype")?;
        Ok(element)
    }

    fn into_contract(self) -> Box<dyn DataElement> {
        Box::new(self)
    }
}
