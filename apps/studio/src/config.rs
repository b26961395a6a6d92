use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::BuilderSettings;
use crate::layout::DEFAULT_ANCHOR_PADDING;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for the file-backed template store. In-memory when unset.
    pub storage_dir: Option<PathBuf>,
    pub anchor_padding: f64,
    pub pixel_ratio: f64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            storage_dir: std::env::var("STORAGE_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            anchor_padding: parse_f64("ANCHOR_PADDING", DEFAULT_ANCHOR_PADDING)?,
            pixel_ratio: parse_f64("PIXEL_RATIO", 1.0)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn builder_settings(&self) -> BuilderSettings {
        BuilderSettings {
            pixel_ratio: self.pixel_ratio,
            anchor_padding: self.anchor_padding,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            storage_dir: None,
            anchor_padding: DEFAULT_ANCHOR_PADDING,
            pixel_ratio: 1.0,
            rust_log: "info".to_string(),
        }
    }
}

fn parse_f64(key: &str, default: f64) -> Result<f64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
