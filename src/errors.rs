/// Domain-specific error types for nedsim
///
/// Every variant carries enough context (option name, tuple text, position)
/// to reproduce the misconfiguration from the log line alone.

#[derive(Debug, thiserror::Error)]
pub enum NedsimError {
    #[error("Settings file not found: {path}")]
    ConfigNotFound {
        path: String
    },

    #[error("Unknown {kind} '{name}' in {option} (tuple #{position})")]
    UnknownMeasure {
        kind: &'static str,
        name: String,
        option: &'static str,
        position: usize,
    },

    #[error("Unknown entities context '{name}' in mentionEntitySimilarities (tuple #{position})")]
    UnknownContext {
        name: String,
        position: usize,
    },

    #[error("Malformed tuple '{tuple}' in {option} (tuple #{position}): {reason}")]
    MalformedTuple {
        option: &'static str,
        position: usize,
        tuple: String,
        reason: String,
    },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        key: String,
        value: String
    },

    #[error("Calibration averages missing: {0}")]
    CalibrationMissing(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for NedsimError {
    fn from(e: std::io::Error) -> Self {
        NedsimError::Io(e.to_string())
    }
}

impl NedsimError {
    /// Helper to create tuple parse errors
    ///
    /// Example:
    /// ```
    /// use nedsim::errors::NedsimError;
    /// let err = NedsimError::malformed("entityEntitySimilarity", 1, "MilneWitten", "expected 2 fields");
    /// assert!(err.to_string().contains("MilneWitten"));
    /// ```
    pub fn malformed(option: &'static str, position: usize, tuple: &str, reason: &str) -> Self {
        NedsimError::MalformedTuple {
            option,
            position,
            tuple: tuple.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is one the caller may log and continue past.
    pub fn is_soft(&self) -> bool {
        matches!(self, NedsimError::CalibrationMissing(_))
    }
}
