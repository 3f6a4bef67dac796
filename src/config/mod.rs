//! Server configuration: which files to index and what to report.
//!
//! User-level config: `~/.omni/config.yaml`
//! Project-level config: `<root>/.omni/config.yaml`
//! Editor settings: LSP `initializationOptions` (same keys, JSON)
//!
//! Resolution: defaults → user → project → editor. Each layer only
//! overrides the keys it sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OmniResult;

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmniConfig {
    /// Globs, relative to the workspace root, of files to index.
    pub include: Vec<String>,
    /// Globs, relative to the workspace root, of files to leave out.
    pub exclude: Vec<String>,
    /// Files larger than this are not indexed.
    pub max_file_bytes: u64,
    /// Stop indexing after this many files.
    pub max_files: usize,
    /// Publish diagnostics for open documents.
    pub diagnostics: bool,
}

impl Default for OmniConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.omni".into()],
            exclude: vec![
                "**/.git/**".into(),
                "**/node_modules/**".into(),
                "**/target/**".into(),
            ],
            max_file_bytes: 1024 * 1024,
            max_files: 10_000,
            diagnostics: true,
        }
    }
}

/// One configuration source. Unset keys leave the lower layer alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    #[serde(alias = "maxFileBytes")]
    pub max_file_bytes: Option<u64>,
    #[serde(alias = "maxFiles")]
    pub max_files: Option<usize>,
    pub diagnostics: Option<bool>,
}

/// Path to `~/.omni/`.
fn dirs_path() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|p| PathBuf::from(p).join(".omni"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME")
            .ok()
            .map(|p| PathBuf::from(p).join(".omni"))
    }
}

impl OmniConfig {
    /// Defaults merged with the user file and, if a root is known, the
    /// project file. Missing or malformed files are skipped.
    pub fn load(root: Option<&Path>) -> Self {
        let mut config = Self::default();
        if let Some(layer) = dirs_path().and_then(|d| load_layer(&d.join("config.yaml"))) {
            config.apply(layer);
        }
        if let Some(layer) = root.and_then(|r| load_layer(&r.join(".omni").join("config.yaml"))) {
            config.apply(layer);
        }
        config
    }

    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(include) = layer.include {
            self.include = include;
        }
        if let Some(exclude) = layer.exclude {
            self.exclude = exclude;
        }
        if let Some(max) = layer.max_file_bytes {
            self.max_file_bytes = max;
        }
        if let Some(max) = layer.max_files {
            self.max_files = max;
        }
        if let Some(enabled) = layer.diagnostics {
            self.diagnostics = enabled;
        }
    }

    /// Apply LSP `initializationOptions`.
    pub fn apply_json(&mut self, options: serde_json::Value) -> OmniResult<()> {
        if options.is_null() {
            return Ok(());
        }
        let layer: ConfigLayer = serde_json::from_value(options)?;
        self.apply(layer);
        Ok(())
    }
}

/// Parse one YAML config file.
pub fn parse_layer(content: &str) -> OmniResult<ConfigLayer> {
    // An empty file is valid and sets nothing.
    if content.trim().is_empty() {
        return Ok(ConfigLayer::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

fn load_layer(path: &Path) -> Option<ConfigLayer> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse_layer(&content) {
        Ok(layer) => {
            debug!(path = %path.display(), "loaded config");
            Some(layer)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed config");
            None
        }
    }
}
