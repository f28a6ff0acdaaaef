//! Configuration file support for maskpaint.
//!
//! Settings are stored as JSON in the platform config directory. Every field
//! falls back to its default when missing, so older files keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKEND_URL, DEFAULT_BRUSH_SIZE, MASK_INFO_DEBOUNCE_MS, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, display,
    generation,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Largest on-screen size for a freshly loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayLimits {
    pub width: f32,
    pub height: f32,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self {
            width: display::MAX_WIDTH,
            height: display::MAX_HEIGHT,
        }
    }
}

/// Parameters of one generation request.
///
/// Also used in the config file as the defaults the form starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub prompt: String,
    pub negative_prompt: String,
    pub num_images: u32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    /// Context kept around the mask when cropping; `None` sends the whole image.
    pub padding_mask_crop: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            prompt: generation::PROMPT.to_string(),
            negative_prompt: String::new(),
            num_images: generation::NUM_IMAGES,
            guidance_scale: generation::GUIDANCE_SCALE,
            num_inference_steps: generation::NUM_INFERENCE_STEPS,
            padding_mask_crop: None,
        }
    }
}

impl GenerationParams {
    /// Replace blank or out-of-range values with those from `defaults`.
    ///
    /// A padding of zero means "no padding" and becomes `None`.
    pub fn normalized(mut self, defaults: &GenerationParams) -> Self {
        if self.prompt.trim().is_empty() {
            self.prompt = defaults.prompt.clone();
        }
        if self.num_images == 0 {
            self.num_images = defaults.num_images;
        }
        if !(self.guidance_scale.is_finite() && self.guidance_scale > 0.0) {
            self.guidance_scale = defaults.guidance_scale;
        }
        if self.num_inference_steps == 0 {
            self.num_inference_steps = defaults.num_inference_steps;
        }
        self.padding_mask_crop = self.padding_mask_crop.filter(|&p| p > 0);
        self
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Base URL of the generation backend
    pub backend_url: String,

    /// Brush diameter in native pixels
    pub brush_size: u32,

    pub max_display: DisplayLimits,

    /// Delay between a rectangle commit and the automatic mask-info query
    pub mask_info_debounce_ms: u64,

    /// Defaults for the generation form
    pub generation: GenerationParams,

    /// Log verbosity level
    pub log_level: LogLevel,
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            brush_size: DEFAULT_BRUSH_SIZE,
            max_display: DisplayLimits::default(),
            mask_info_debounce_ms: MASK_INFO_DEBOUNCE_MS,
            generation: GenerationParams::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Brush size clamped to the supported range.
    pub fn brush_size(&self) -> u32 {
        self.brush_size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
    }

    pub fn mask_info_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.mask_info_debounce_ms)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.brush_size = config.brush_size();
        Ok(config)
    }

    /// Get the default config file name.
    pub fn default_filename() -> &'static str {
        "maskpaint-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("maskpaint").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("maskpaint")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from an explicit file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
