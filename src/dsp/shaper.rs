//! Waveshaper — nonlinear transfer curve applied sample by sample.
//!
//! The curve is a lookup table over `[-1, 1]`, evaluated with linear
//! interpolation the same way a WebAudio WaveShaperNode reads its curve,
//! so the offline render and the live preview shape identically.

use std::f64::consts::FRAC_2_PI;
use std::sync::Arc;

/// Arctangent saturation curve: `2/π · atan(drive · x)` sampled at
/// `resolution` evenly spaced points across `[-1, 1]`.
pub fn arctan_curve(drive: f64, resolution: usize) -> Arc<[f32]> {
    let resolution = resolution.max(2);
    let last = (resolution - 1) as f64;
    (0..resolution)
        .map(|i| {
            let x = i as f64 * 2.0 / last - 1.0;
            (FRAC_2_PI * (drive * x).atan()) as f32
        })
        .collect()
}

/// Applies a lookup curve to a signal.
#[derive(Debug, Clone)]
pub struct WaveShaper {
    curve: Arc<[f32]>,
}

impl WaveShaper {
    pub fn new(curve: Arc<[f32]>) -> Self {
        WaveShaper { curve }
    }

    pub fn curve(&self) -> &Arc<[f32]> {
        &self.curve
    }

    /// Shape one sample. Inputs outside `[-1, 1]` read the curve ends; NaN is silence.
    pub fn shape(&self, input: f32) -> f32 {
        let n = self.curve.len();
        if n == 0 {
            return input;
        }
        if input.is_nan() {
            return 0.0;
        }
        if n == 1 {
            return self.curve[0];
        }
        let pos = ((input.clamp(-1.0, 1.0) as f64 + 1.0) * 0.5 * (n - 1) as f64).max(0.0);
        let idx = pos as usize;
        if idx >= n - 1 {
            return self.curve[n - 1];
        }
        let frac = (pos - idx as f64) as f32;
        self.curve[idx] * (1.0 - frac) + self.curve[idx + 1] * frac
    }

    pub fn process_block(&self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&s| self.shape(s)).collect()
    }
}
