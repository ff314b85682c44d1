use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "ripple.config.json";

/// Ripple configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root scope for components that have no enclosing component
    #[serde(default)]
    pub globals: Map<String, Json>,

    /// Initial data per component tag
    #[serde(default)]
    pub data: Map<String, Json>,

    /// Display frames to run after mounting
    #[serde(default = "default_frames")]
    pub frames: usize,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_frames() -> usize {
    1
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        Self::load_from(&PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            globals: Map::new(),
            data: Map::new(),
            frames: default_frames(),
            log_level: default_log_level(),
        }
    }
}
