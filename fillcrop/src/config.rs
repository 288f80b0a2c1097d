use std::{fs, path::PathBuf};

use crate::image::PngCompression;

/// Default number of results the shell keeps around for repeated uploads
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    pub png_compression: PngCompression,
    // Zero turns the result cache off
    pub cache_capacity: usize,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            png_compression: PngCompression::Default,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ResizeConfig {
    pub fn load() -> Option<Self> {
        let config_path = Self::config_path()?;

        fs::read_to_string(&config_path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
    }

    pub fn save(&self) -> Option<()> {
        let config_path = Self::config_path()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).ok()?;
        }

        serde_json::to_string_pretty(self)
            .ok()
            .and_then(|json| fs::write(&config_path, json).ok())
    }

    pub fn config_path() -> Option<PathBuf> {
        let home = std::env::home_dir()?;
        Some(home.join(".config").join("fillcrop").join("config.json"))
    }
}
