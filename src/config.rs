//! Engine tuning knobs.
//!
//! Every field has a sensible default, so hosts only need to pass the
//! values they want to change. Field names are camelCase to match the
//! JSON the browser side sends.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunable constants for the tag walker, the renderer and the preview manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upper bound on tag bytes held in memory while looking for cover art.
    pub max_tag_bytes: usize,
    /// Cover payloads shorter than this are treated as missing.
    pub min_image_bytes: usize,
    /// Cutoff of the high-pass stage in the synthetic effect, in Hz.
    pub highpass_cutoff_hz: f64,
    pub highpass_q: f64,
    /// Drive constant of the arctangent waveshaping curve.
    pub drive_amount: f64,
    /// Number of points in the waveshaper lookup curve.
    pub curve_resolution: usize,
    /// Extra time past the expected end before the preview watchdog fires.
    pub watchdog_margin_ms: u64,
    /// Default wall-clock cap for async offline renders.
    pub render_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_tag_bytes: 5 * 1024 * 1024,
            min_image_bytes: 16,
            highpass_cutoff_hz: 800.0,
            highpass_q: std::f64::consts::FRAC_1_SQRT_2,
            drive_amount: 50.0,
            curve_resolution: 4096,
            watchdog_margin_ms: 500,
            render_timeout_ms: 30_000,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.highpass_cutoff_hz.is_finite() && self.highpass_cutoff_hz > 0.0) {
            return Err(ConfigError::Invalid {
                field: "highpassCutoffHz",
                reason: format!("must be positive, got {}", self.highpass_cutoff_hz),
            });
        }
        if !(self.highpass_q.is_finite() && self.highpass_q > 0.0) {
            return Err(ConfigError::Invalid {
                field: "highpassQ",
                reason: format!("must be positive, got {}", self.highpass_q),
            });
        }
        if !(self.drive_amount.is_finite() && self.drive_amount > 0.0) {
            return Err(ConfigError::Invalid {
                field: "driveAmount",
                reason: format!("must be positive, got {}", self.drive_amount),
            });
        }
        if self.curve_resolution < 2 {
            return Err(ConfigError::Invalid {
                field: "curveResolution",
                reason: format!("needs at least 2 points, got {}", self.curve_resolution),
            });
        }
        Ok(())
    }

    pub fn watchdog_margin(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.watchdog_margin_ms)
    }

    pub fn render_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.render_timeout_ms)
    }
}
