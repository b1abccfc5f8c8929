mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    AuthProvider, AuthSettings, LoggingSettings, RelaySettings, ServerSettings, Settings,
};

/// Default location of the optional configuration file (any format the
/// `config` crate understands, e.g. `config/default.toml`).
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Prefix of environment overrides, e.g. `WEBDRAW__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "WEBDRAW";

/// Loads the configuration from the default file and environment variables
/// and merges it with default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Like [`load_config`], reading the optional file at `path` (without
/// extension).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_onto(Settings::default()))
}

#[cfg(test)]
mod tests;
