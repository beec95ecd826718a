use std::path::Path;

use mosaic_types::{SamTieBreak, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of `unresolved-*` diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedSeverity {
    #[default]
    Error,
    Warning,
}

impl From<UnresolvedSeverity> for Severity {
    fn from(value: UnresolvedSeverity) -> Self {
        match value {
            UnresolvedSeverity::Error => Severity::Error,
            UnresolvedSeverity::Warning => Severity::Warning,
        }
    }
}

/// Options for the semantic core, usually read from a `[typeck]`-style TOML document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeckConfig {
    /// What to do with interfaces that declare two unrelated abstract methods.
    pub sam_tie_break: SamTieBreak,
    /// Packages whose types are visible by simple name.
    pub implicit_imports: Vec<String>,
    /// Resolve `obj.name` through `getName()` / `isName()` when no field matches.
    pub getter_properties: bool,
    pub unresolved_severity: UnresolvedSeverity,
    /// Upper bound on re-inference rounds after lambda return feedback.
    pub max_inference_passes: u32,
}

impl Default for TypeckConfig {
    fn default() -> Self {
        Self {
            sam_tie_break: SamTieBreak::default(),
            implicit_imports: vec![
                "java.lang".to_string(),
                "java.util".to_string(),
                "java.util.function".to_string(),
            ],
            getter_properties: true,
            unresolved_severity: UnresolvedSeverity::default(),
            max_inference_passes: 4,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_string())
    }
}

impl TypeckConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(target: "mosaic.typeck", path = %path.display(), "loaded typeck config");
        Ok(config)
    }
}
