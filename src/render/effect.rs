//! Effect requests shared by the offline renderer and the live preview.

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// What a render or preview should do to the source audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    /// Replay at a different speed; `parameter` is the rate multiplier.
    RateChange,
    /// Dry signal plus a high-passed, saturated copy; `parameter` is the
    /// modulation frequency in Hz used by the live preview.
    SyntheticDistortion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectSpec {
    pub kind: EffectKind,
    pub parameter: f64,
}

impl EffectSpec {
    pub fn rate(rate: f64) -> Self {
        EffectSpec {
            kind: EffectKind::RateChange,
            parameter: rate,
        }
    }

    pub fn chipmunk() -> Self {
        Self::rate(1.5)
    }

    pub fn deep() -> Self {
        Self::rate(0.75)
    }

    pub fn robot() -> Self {
        EffectSpec {
            kind: EffectKind::SyntheticDistortion,
            parameter: 50.0,
        }
    }

    /// Build a spec from a tool name, optionally overriding its parameter.
    ///
    /// `"rate"` requires a parameter; the named presets fall back to
    /// their built-in one.
    pub fn parse(name: &str, parameter: Option<f64>) -> Result<Self, RenderError> {
        let mut spec = match name.trim().to_ascii_lowercase().as_str() {
            "rate" => {
                let rate = parameter.ok_or_else(|| {
                    RenderError::InvalidParameter("rate effect needs a multiplier".to_string())
                })?;
                Self::rate(rate)
            }
            "chipmunk" => Self::chipmunk(),
            "deep" => Self::deep(),
            "robot" => Self::robot(),
            other => {
                return Err(RenderError::InvalidParameter(format!(
                    "unknown effect '{other}'"
                )));
            }
        };
        if let Some(p) = parameter {
            spec.parameter = p;
        }
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        let ok = self.parameter.is_finite() && self.parameter > 0.0;
        match self.kind {
            EffectKind::RateChange if !ok => Err(RenderError::InvalidRate(self.parameter)),
            EffectKind::SyntheticDistortion if !ok => Err(RenderError::InvalidParameter(format!(
                "modulation frequency must be positive, got {}",
                self.parameter
            ))),
            _ => Ok(()),
        }
    }

    /// How long `seconds` of source audio lasts once this effect is applied.
    pub fn output_duration(&self, seconds: f64) -> f64 {
        match self.kind {
            EffectKind::RateChange => seconds / self.parameter,
            EffectKind::SyntheticDistortion => seconds,
        }
    }
}
