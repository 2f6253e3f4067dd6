/// Structured logging setup using tracing
///
/// Writes to stderr only so stdout stays clean for the JSON the CLI prints.
/// `log_format` picks the output: `pretty` (ANSI), `json`, or `auto`, which is
/// pretty on a terminal and JSON when stderr is piped.

use std::io::IsTerminal;
use std::str::FromStr;

use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use crate::config::Config;
use crate::errors::NedsimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(LogFormat::Auto),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected auto, pretty or json)", other)),
        }
    }
}

impl LogFormat {
    /// Whether to emit JSON, given where stderr points.
    fn emits_json(self, stderr_is_terminal: bool) -> bool {
        match self {
            LogFormat::Auto => !stderr_is_terminal,
            LogFormat::Pretty => false,
            LogFormat::Json => true,
        }
    }
}

/// Install the global subscriber.
///
/// Level comes from `config.log_level`; `RUST_LOG` overrides it.
pub fn init_logging(config: &Config) -> Result<(), NedsimError> {
    let format: LogFormat = config.log_format.parse().map_err(NedsimError::Config)?;
    let json = format.emits_json(std::io::stderr().is_terminal());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let pretty_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
    });
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| NedsimError::Config(format!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("auto".parse::<LogFormat>(), Ok(LogFormat::Auto));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_auto_follows_terminal() {
        assert!(!LogFormat::Auto.emits_json(true));
        assert!(LogFormat::Auto.emits_json(false));
        assert!(LogFormat::Json.emits_json(true));
        assert!(!LogFormat::Pretty.emits_json(false));
    }

    #[test]
    fn test_invalid_format_is_a_config_error() {
        let config = Config {
            log_format: "xml".to_string(),
            ..Config::default()
        };
        assert!(matches!(init_logging(&config), Err(NedsimError::Config(_))));
    }
}
