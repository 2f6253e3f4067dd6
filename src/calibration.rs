/// Score normalization lookup.
///
/// Calibration tooling writes `averages.properties` next to the settings files,
/// one `<identifier>=<avg>:<max>` line per settings file. The normalized average
/// (avg / max) lets callers compare confidence scores produced by different
/// ensembles.

use std::path::PathBuf;

use crate::errors::NedsimError;
use crate::properties::Properties;
use crate::settings::EnsembleSettings;

pub const AVERAGES_FILE: &str = "averages.properties";

/// Returned by `normalized_average_score` when no calibration is available.
pub const CALIBRATION_MISSING: f64 = -1.0;

impl EnsembleSettings {
    /// avg / max for this settings file, or the reason it is unavailable.
    pub fn try_normalized_average_score(&self) -> Result<f64, NedsimError> {
        let identifier = self.identifier().ok_or_else(|| {
            NedsimError::CalibrationMissing("settings were not loaded from a file".to_string())
        })?;
        let averages = self.averages_path()?;
        if !averages.is_file() {
            return Err(NedsimError::CalibrationMissing(format!(
                "{} does not exist",
                averages.display()
            )));
        }

        let props = Properties::load(&averages)?;
        let entry = props.get(identifier).ok_or_else(|| {
            NedsimError::CalibrationMissing(format!(
                "no entry for '{}' in {}",
                identifier,
                averages.display()
            ))
        })?;
        parse_entry(entry).ok_or_else(|| {
            NedsimError::CalibrationMissing(format!(
                "malformed entry '{}={}' in {}",
                identifier,
                entry,
                averages.display()
            ))
        })
    }

    /// avg / max for this settings file; -1.0 (logged) when unavailable.
    pub fn normalized_average_score(&self) -> f64 {
        match self.try_normalized_average_score() {
            Ok(score) => score,
            Err(e) => {
                tracing::error!(
                    identifier = self.identifier().unwrap_or_default(),
                    error = %e,
                    "Could not read normalized average score"
                );
                CALIBRATION_MISSING
            }
        }
    }

    fn averages_path(&self) -> Result<PathBuf, NedsimError> {
        self.source_path()
            .and_then(|p| p.parent())
            .map(|dir| dir.join(AVERAGES_FILE))
            .ok_or_else(|| {
                NedsimError::CalibrationMissing("settings have no source directory".to_string())
            })
    }
}

/// `avg:max` → avg / max. None when unparseable or max is zero.
fn parse_entry(entry: &str) -> Option<f64> {
    let (avg, max) = entry.split_once(':')?;
    let avg: f64 = avg.trim().parse().ok()?;
    let max: f64 = max.trim().parse().ok()?;
    if max == 0.0 || !avg.is_finite() || !max.is_finite() {
        return None;
    }
    Some(avg / max)
}
