/// Process configuration using figment
///
/// This is the ambient configuration of the nedsim binary (log level, where
/// similarity settings files live). The similarity settings themselves are read
/// by `crate::settings`.
///
/// Loads configuration with this precedence (highest wins):
/// 1. Defaults (hardcoded)
/// 2. TOML file: nedsim.toml (in working directory)
/// 3. Environment variables: prefixed NEDSIM_ (e.g., NEDSIM_LOG_LEVEL=debug)

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Toml, Serialized},
};
use serde::{Deserialize, Serialize};
use crate::errors::NedsimError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output: auto, pretty or json
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Directory searched for `<name>.properties` when a settings argument
    /// is not an existing path.
    #[serde(default = "default_settings_dir")]
    pub settings_dir: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "auto".to_string()
}

fn default_settings_dir() -> String {
    "settings/similarity".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_log_level(),
            log_format: default_log_format(),
            settings_dir: default_settings_dir(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, TOML file, and environment variables
    ///
    /// Environment variables override TOML file values.
    /// Example: NEDSIM_LOG_LEVEL=debug overrides log_level in nedsim.toml
    pub fn load() -> Result<Config, NedsimError> {
        Self::figment("nedsim.toml")
            .extract()
            .map_err(|e| NedsimError::Config(format!("Failed to load config: {}", e)))
    }

    fn figment(toml_path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(toml_path.as_ref()))
            .merge(Env::prefixed("NEDSIM_"))
    }

    /// Resolve a settings argument: an existing path is used as-is, anything
    /// else is treated as a name inside `settings_dir`.
    pub fn resolve_settings_path(&self, arg: &str) -> PathBuf {
        let direct = PathBuf::from(arg);
        if direct.exists() {
            return direct;
        }
        let file_name = if arg.ends_with(".properties") {
            arg.to_string()
        } else {
            format!("{}.properties", arg)
        };
        Path::new(&self.settings_dir).join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, "auto");
        assert_eq!(config.settings_dir, "settings/similarity");
    }

    #[test]
    fn test_config_toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("nedsim.toml", "log_level = \"debug\"")?;
            let config: Config = Config::figment("nedsim.toml").extract()?;
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.settings_dir, "settings/similarity");
            Ok(())
        });
    }

    #[test]
    fn test_resolve_settings_path_by_name() {
        let config = Config {
            settings_dir: "/nonexistent/dir".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_settings_path("cocktail"),
            PathBuf::from("/nonexistent/dir/cocktail.properties")
        );
        assert_eq!(
            config.resolve_settings_path("cocktail.properties"),
            PathBuf::from("/nonexistent/dir/cocktail.properties")
        );
    }
}
