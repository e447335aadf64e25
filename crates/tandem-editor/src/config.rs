use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};

/// Presentation settings for remote collaborators' decorations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Left border width of a remote caret, in pixels.
    pub cursor_border_px: u32,
    /// Height of a remote caret relative to the line height.
    pub cursor_height_ratio: f64,
    /// Class given to remote caret markers.
    pub cursor_class: String,
    /// Prefix of the per-color selection class (`<prefix><rrggbb>`).
    pub selection_class_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            cursor_border_px: 2,
            cursor_height_ratio: 0.9,
            cursor_class: "other-client".to_string(),
            selection_class_prefix: "selection-".to_string(),
        }
    }
}

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("failed to access config file")]
    #[diagnostic(code(tandem::config::io))]
    Io(#[from] std::io::Error),
    #[error("invalid JSON config")]
    #[diagnostic(code(tandem::config::json))]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML config")]
    #[diagnostic(code(tandem::config::toml))]
    TomlDe(#[from] toml::de::Error),
    #[error("could not write TOML config")]
    #[diagnostic(code(tandem::config::toml))]
    TomlSer(#[from] toml::ser::Error),
    #[error("unsupported config format: {0:?}")]
    #[diagnostic(
        code(tandem::config::format),
        help("use a .json or .toml extension")
    )]
    UnsupportedFormat(String),
}

impl EditorConfig {
    /// Load from a `.json` or `.toml` file, picked by extension. Missing
    /// fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(path)?)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Write to a `.json` or `.toml` file, picked by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(std::fs::write(path, serde_json::to_string_pretty(self)?)?),
            Some("toml") => Ok(std::fs::write(path, toml::to_string_pretty(self)?)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}
