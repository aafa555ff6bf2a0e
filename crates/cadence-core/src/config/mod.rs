use anyhow::Result;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder};
use serde::Deserialize;

use crate::constants::{
    CONFIG_FILE_NAME, CONFIG_FILE_STEM, DEFAULT_LOG_LEVEL, DEFAULT_MAX_BATCH, DEFAULT_TIMEZONE,
    ENV_PREFIX,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// IANA zone used when a series is created without an explicit timezone.
    pub default_timezone: String,
    /// Maximum number of instances a single materialization call may emit.
    pub max_batch: u32,
}

impl EngineConfig {
    /// ## Summary
    /// Checks values that deserialize fine but make no sense for the engine.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidConfiguration` if `max_batch` is zero or the
    /// default timezone is blank.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_batch == 0 {
            return Err(CoreError::InvalidConfiguration(
                "engine.max_batch must be at least 1".to_string(),
            ));
        }
        if self.default_timezone.trim().is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "engine.default_timezone must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            max_batch: DEFAULT_MAX_BATCH,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("engine.default_timezone", DEFAULT_TIMEZONE)?
            .set_default("engine.max_batch", i64::from(DEFAULT_MAX_BATCH))?
            .set_default("logging.level", DEFAULT_LOG_LEVEL)?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings = builder.build()?.try_deserialize::<Settings>()?;
        settings.engine.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `cadence.toml` into a `Settings`.
    /// Values in the TOML file take precedence over environment variables.
    ///
    /// ## Errors
    /// Returns an error if building, deserializing or validating the
    /// configuration fails.
    pub fn load() -> Result<Self> {
        Self::finish(
            Self::builder()?
                .add_source(
                    config::Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("_")
                        .separator("__")
                        .ignore_empty(true)
                        .try_parsing(true),
                )
                .add_source(config::File::with_name(CONFIG_FILE_STEM).required(false)),
        )
    }

    /// ## Summary
    /// Builds `Settings` from an in-memory TOML document layered over the
    /// defaults. Used by embedders that keep configuration elsewhere.
    ///
    /// ## Errors
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::finish(
            Self::builder()?.add_source(config::File::from_str(toml, config::FileFormat::Toml)),
        )
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    tracing::debug!(
        config_file = CONFIG_FILE_NAME,
        default_timezone = %settings.engine.default_timezone,
        max_batch = settings.engine.max_batch,
        "Configuration loaded"
    );
    Ok(settings)
}
