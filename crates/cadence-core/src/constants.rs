/// Prefix for environment variables read by the configuration loader.
pub const ENV_PREFIX: &str = "CADENCE";

/// Optional configuration file, resolved relative to the working directory.
pub const CONFIG_FILE_STEM: &str = "cadence";
pub const CONFIG_FILE_NAME: &str = const_str::concat!(CONFIG_FILE_STEM, ".toml");

/// Timezone assumed for series that are created without one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Upper bound on instances emitted by one materialization call.
pub const DEFAULT_MAX_BATCH: u32 = 10_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";
