//! Loading tier tables from RON, TOML or JSON files.
//!
//! The format is picked from the file extension. A file may list only some
//! tiers; the rest keep their defaults.

use crate::tier::{Tier, TierTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {origin}: {detail}")]
    Parse { origin: String, detail: String },

    #[error("tier {tier:?} has zero speed")]
    ZeroSpeed { tier: Tier },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`. More than one
/// match is an error.
pub fn find_config_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, ConfigError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(ConfigError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

// ===========================================================================
// Config
// ===========================================================================

/// Top-level configuration of the transport core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticsConfig {
    pub tiers: TierTable,
}

impl LogisticsConfig {
    pub fn from_str(content: &str, format: Format) -> Result<Self, ConfigError> {
        Self::parse(content, format, "<string>")
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, format, &path.display().to_string())?;
        tracing::info!(file = %path.display(), ?format, "loaded logistics config");
        Ok(config)
    }

    fn parse(content: &str, format: Format, origin: &str) -> Result<Self, ConfigError> {
        let parsed = match format {
            Format::Ron => ron::from_str::<Self>(content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str::<Self>(content).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str::<Self>(content).map_err(|e| e.to_string()),
        };
        let config = parsed.map_err(|detail| ConfigError::Parse {
            origin: origin.to_string(),
            detail,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in [Tier::Basic, Tier::Advanced, Tier::Elite, Tier::Ultimate] {
            if self.tiers.spec(tier).speed == 0 {
                return Err(ConfigError::ZeroSpeed { tier });
            }
        }
        Ok(())
    }
}
