//! Configuration for the record forge pipeline.
//!
//! Covers storage paths, prompt configuration files, LLM options and
//! concurrency limits. Values come from defaults, builder methods, or
//! environment variables.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::DEFAULT_MODEL;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the forge pipeline.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    // Storage settings
    /// Directory holding one JSON file per entity table.
    pub data_dir: PathBuf,

    // Prompt configuration files
    /// Per-entity completion instructions, keyed by entity name.
    pub instructions_path: Option<PathBuf>,
    /// Per-entity context associations, keyed by entity name.
    pub associations_path: Option<PathBuf>,
    /// Per-entity generation prompt pairs, keyed by entity name.
    pub generation_prompts_path: Option<PathBuf>,

    // LLM settings
    /// Model requested for completion and generation calls.
    pub model: String,
    /// Sampling temperature for LLM calls.
    pub temperature: f64,
    /// Optional completion token cap.
    pub max_tokens: Option<u32>,

    // Concurrency settings
    /// Maximum number of records completed concurrently in a batch.
    pub max_concurrent_completions: usize,

    // Randomness settings
    /// Seed for placeholder tag sampling. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            instructions_path: None,
            associations_path: None,
            generation_prompts_path: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: None,
            max_concurrent_completions: 4,
            seed: None,
        }
    }
}

impl ForgeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BOOKFORGE_DATA_DIR`: Record table directory (default: ./data)
    /// - `BOOKFORGE_INSTRUCTIONS`: Completion instructions file
    /// - `BOOKFORGE_ASSOCIATIONS`: Context associations file
    /// - `BOOKFORGE_GENERATION_PROMPTS`: Generation prompt file
    /// - `BOOKFORGE_MODEL`: Model name (default: gpt-4o-mini)
    /// - `BOOKFORGE_TEMPERATURE`: Sampling temperature (default: 0.7)
    /// - `BOOKFORGE_MAX_TOKENS`: Completion token cap
    /// - `BOOKFORGE_MAX_CONCURRENT`: Concurrent completions (default: 4)
    /// - `BOOKFORGE_SEED`: Seed for placeholder tag sampling
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BOOKFORGE_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("BOOKFORGE_INSTRUCTIONS") {
            config.instructions_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("BOOKFORGE_ASSOCIATIONS") {
            config.associations_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("BOOKFORGE_GENERATION_PROMPTS") {
            config.generation_prompts_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("BOOKFORGE_MODEL") {
            config.model = val;
        }

        if let Ok(val) = std::env::var("BOOKFORGE_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "BOOKFORGE_TEMPERATURE")?;
        }

        if let Ok(val) = std::env::var("BOOKFORGE_MAX_TOKENS") {
            config.max_tokens = Some(parse_env_value(&val, "BOOKFORGE_MAX_TOKENS")?);
        }

        if let Ok(val) = std::env::var("BOOKFORGE_MAX_CONCURRENT") {
            config.max_concurrent_completions = parse_env_value(&val, "BOOKFORGE_MAX_CONCURRENT")?;
        }

        if let Ok(val) = std::env::var("BOOKFORGE_SEED") {
            config.seed = Some(parse_env_value(&val, "BOOKFORGE_SEED")?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "data_dir cannot be empty".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model cannot be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.max_concurrent_completions == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent_completions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the record table directory.
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Builder method to set the completion instructions file.
    pub fn with_instructions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.instructions_path = Some(path.into());
        self
    }

    /// Builder method to set the context associations file.
    pub fn with_associations_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.associations_path = Some(path.into());
        self
    }

    /// Builder method to set the generation prompt file.
    pub fn with_generation_prompts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.generation_prompts_path = Some(path.into());
        self
    }

    /// Builder method to set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder method to set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Builder method to set the completion token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Builder method to set the concurrent completion limit.
    pub fn with_max_concurrent_completions(mut self, max: usize) -> Self {
        self.max_concurrent_completions = max;
        self
    }

    /// Builder method to set the placeholder sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
