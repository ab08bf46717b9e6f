//! Application configuration.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    foundation::error::{TopotrackError, TopotrackResult},
    layout::format::{Format, FormatCatalog},
};

/// Top-level configuration, usually loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory exported artifacts are written into.
    pub output_dir: PathBuf,

    /// Format used when none is requested explicitly.
    pub default_format: String,

    /// Playthrough capture settings.
    pub video: VideoConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Additional formats appended to the built-in catalog.
    pub formats: Vec<Format>,
}

/// Settings for recording an animation playthrough to MP4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub fps: u32,

    /// Length of the route replay, in seconds.
    pub replay_secs: f64,

    /// Background the alpha channel is flattened over, `#rrggbb`.
    pub background: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "topotrack=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
            default_format: "Square".to_string(),
            video: VideoConfig::default(),
            logging: LoggingConfig::default(),
            formats: Vec::new(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            replay_secs: 8.0,
            background: "#000000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> TopotrackResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> TopotrackResult<()> {
        if self.video.fps == 0 {
            return Err(TopotrackError::validation("video fps must be > 0"));
        }
        if !(self.video.replay_secs.is_finite() && self.video.replay_secs > 0.0) {
            return Err(TopotrackError::validation("video replay_secs must be > 0"));
        }
        crate::foundation::core::Rgba8::parse_hex(&self.video.background)?;
        for f in &self.formats {
            f.validate()?;
        }
        Ok(())
    }

    /// Built-in formats plus the configured extras.
    pub fn catalog(&self) -> TopotrackResult<FormatCatalog> {
        let mut catalog = FormatCatalog::builtin();
        for f in &self.formats {
            catalog.insert(f.clone())?;
        }
        Ok(catalog)
    }
}
