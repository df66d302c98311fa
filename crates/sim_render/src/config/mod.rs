//! Configuration system
//!
//! Any serde type can be persisted as TOML or RON; the format is picked from
//! the file extension.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load from file if it exists, otherwise fall back to defaults
    fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name, used in log output
    pub application_name: String,
    /// Run the resource reaper every N frames (0 disables periodic reaping;
    /// shutdown always reaps)
    pub reap_interval_frames: u32,
    /// Sort draws so each program is bound once per frame
    pub group_draws_by_program: bool,
    /// Directory for file-backed shaders. `None` uses the built-in library
    pub shader_directory: Option<PathBuf>,
    /// `env_logger` filter applied by [`crate::foundation::logging::init_with_config`]
    pub log_filter: Option<String>,
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            reap_interval_frames: 60,
            group_draws_by_program: true,
            shader_directory: None,
            log_filter: None,
        }
    }

    /// Set the reaper interval in frames
    #[must_use]
    pub fn with_reap_interval(mut self, frames: u32) -> Self {
        self.reap_interval_frames = frames;
        self
    }

    /// Enable or disable grouping draws by program
    #[must_use]
    pub fn with_grouped_draws(mut self, enable: bool) -> Self {
        self.group_draws_by_program = enable;
        self
    }

    /// Load shaders from `<dir>/<name>.vert` and `<dir>/<name>.frag`
    #[must_use]
    pub fn with_shader_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_directory = Some(dir.into());
        self
    }

    /// Set the log filter
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("sim_render application")
    }
}

impl Config for RendererConfig {}
