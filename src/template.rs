//! On-disk template store.
//!
//! Templates are plain-text `.tmpl` files in a directory, loaded lazily and
//! cached in memory. Placeholder syntax is handled by [`crate::prompt`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ForgeError, Result};

/// File extension template files must carry.
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// A directory of named prompt templates with an in-memory load cache.
#[derive(Debug)]
pub struct TemplateStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl TemplateStore {
    /// Create a store over `dir`. The directory is not touched until a
    /// template is listed or loaded.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The directory this store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List the template names available in the directory, sorted.
    ///
    /// Names are file stems: `ner.tmpl` is listed as `ner`.
    pub fn available(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_template = path
                .extension()
                .is_some_and(|ext| ext == TEMPLATE_EXTENSION);
            if !is_template {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load a template by name, consulting the cache first.
    pub fn load(&self, name: &str) -> Result<String> {
        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(text) = cache.get(name) {
                return Ok(text.clone());
            }
        }
        let path = self.dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION));
        let text = std::fs::read_to_string(&path).map_err(|err| ForgeError::Template {
            name: name.to_string(),
            message: format!("could not read {}: {}", path.display(), err),
        })?;
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(name.to_string(), text.clone());
        Ok(text)
    }

    /// Load a template from an explicit path, bypassing the directory and
    /// the cache. The file may live anywhere and use any extension.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        std::fs::read_to_string(path).map_err(|err| ForgeError::Template {
            name: path.display().to_string(),
            message: err.to_string(),
        })
    }
}
