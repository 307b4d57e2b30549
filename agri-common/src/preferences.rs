//! Persisted user preferences
//!
//! A small key-value file owned by the process. Loaded once at startup and
//! written through on every [`PreferenceStore::set`]. The advisor engine never
//! touches it; only the language selector surface reads or writes it.

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key holding the last-selected display language
pub const SELECTED_LANGUAGE: &str = "selected_language";

/// File-backed preference store
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Load preferences from `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Parse preferences {} failed: {}", path.display(), e))
            })?
        } else {
            debug!("No preference file at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a preference and persist the whole store
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidInput("preference key must not be empty".to_string()));
        }
        self.values.insert(key.to_string(), value.into());
        self.persist()
    }

    pub fn language(&self) -> Option<&str> {
        self.get(SELECTED_LANGUAGE)
    }

    pub fn set_language(&mut self, code: &str) -> Result<()> {
        self.set(SELECTED_LANGUAGE, code)
    }

    /// Write to a sibling temp file, then rename over the target
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string(&self.values)
            .map_err(|e| Error::Internal(format!("Serialize preferences failed: {}", e)))?;
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;

        info!("Preferences saved to {}", self.path.display());
        Ok(())
    }
}
