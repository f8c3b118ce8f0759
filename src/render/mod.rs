//! Offline renderer — deterministic, non-realtime effect rendering.
//!
//! Every render mixes the source to mono first and returns a fresh mono
//! buffer at the source sample rate. The same input and parameters always
//! produce bit-identical output.

pub mod effect;
#[cfg(feature = "runtime")]
pub mod task;

use std::sync::Arc;

pub use effect::{EffectKind, EffectSpec};

use crate::buffer::{SampleBuffer, read_interpolated};
use crate::config::EngineConfig;
use crate::dsp::filter::HighpassFilter;
use crate::dsp::mixer::slice_and_mixdown;
use crate::dsp::shaper::{WaveShaper, arctan_curve};
use crate::error::RenderError;
use crate::wav::encode_wav;

/// Upper bound on frames a single render may produce.
pub const MAX_RENDER_FRAMES: u32 = u32::MAX;

/// Renders effects into new buffers.
#[derive(Debug, Clone)]
pub struct OfflineRenderer {
    config: EngineConfig,
    curve: Arc<[f32]>,
}

impl Default for OfflineRenderer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl OfflineRenderer {
    pub fn new(config: EngineConfig) -> Self {
        let curve = arctan_curve(config.drive_amount, config.curve_resolution);
        OfflineRenderer { config, curve }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The saturation curve used by the distortion path.
    pub fn curve(&self) -> &Arc<[f32]> {
        &self.curve
    }

    /// Render `buffer` through `spec`.
    pub fn render_effect(
        &self,
        buffer: &SampleBuffer,
        spec: &EffectSpec,
    ) -> Result<SampleBuffer, RenderError> {
        spec.validate()?;
        match spec.kind {
            EffectKind::RateChange => self.render_rate_changed(buffer, spec.parameter),
            EffectKind::SyntheticDistortion => Ok(self.render_distortion(buffer)),
        }
    }

    /// Replay `buffer` at `rate` times its speed.
    ///
    /// Output length is `ceil(frames / rate)`, so the duration scales by
    /// `1 / rate`. Reads between source frames interpolate linearly. A rate
    /// so small that the output would exceed [`MAX_RENDER_FRAMES`] is
    /// rejected before anything is allocated.
    pub fn render_rate_changed(
        &self,
        buffer: &SampleBuffer,
        rate: f64,
    ) -> Result<SampleBuffer, RenderError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(RenderError::InvalidRate(rate));
        }

        let mono = buffer.mixdown();
        let out_frames = (mono.len() as f64 / rate).ceil();
        if out_frames > MAX_RENDER_FRAMES as f64 {
            log::warn!("rate render x{rate}: {out_frames} output frames exceeds the render limit");
            return Err(RenderError::InvalidRate(rate));
        }
        let out_frames = out_frames as usize;
        let out: Vec<f32> = (0..out_frames)
            .map(|i| read_interpolated(&mono, i as f64 * rate))
            .collect();

        log::debug!(
            "rate render x{rate}: {} -> {} frames @ {}Hz",
            mono.len(),
            out.len(),
            buffer.sample_rate()
        );
        Ok(buffer.derive_mono(out))
    }

    /// Dry signal plus a high-passed, arctan-saturated copy.
    ///
    /// This approximates a "robot" timbre by ear; it is not a ring
    /// modulator or vocoder.
    fn render_distortion(&self, buffer: &SampleBuffer) -> SampleBuffer {
        let dry = buffer.mixdown();
        let mut highpass = HighpassFilter::new(
            self.config.highpass_cutoff_hz,
            self.config.highpass_q,
            buffer.sample_rate() as f64,
        );
        let shaper = WaveShaper::new(self.curve.clone());

        let out: Vec<f32> = dry
            .iter()
            .map(|&s| s + shaper.shape(highpass.process(s as f64) as f32))
            .collect();

        log::debug!(
            "distortion render: {} frames @ {}Hz, cutoff {}Hz, drive {}",
            out.len(),
            buffer.sample_rate(),
            self.config.highpass_cutoff_hz,
            self.config.drive_amount
        );
        buffer.derive_mono(out)
    }
}

/// Cut `start..end` seconds out of `buffer`, mix to mono and encode as WAV.
pub fn trim_to_wav(buffer: &SampleBuffer, start: f64, end: f64) -> Result<Vec<u8>, RenderError> {
    let (samples, sample_rate) = slice_and_mixdown(buffer, start, end);
    if samples.is_empty() {
        return Err(RenderError::EmptyRange { start, end });
    }
    Ok(encode_wav(&samples, sample_rate))
}
