//! High-pass biquad — matches WebAudio BiquadFilterNode coefficients.

use std::f64::consts::PI;

/// A second-order high-pass IIR filter.
///
/// Implements the standard Direct Form II Transposed structure.
/// Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct HighpassFilter {
    pub cutoff: f64,
    pub q: f64,

    // Coefficients
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    // State (Direct Form II Transposed)
    z1: f64,
    z2: f64,
}

impl HighpassFilter {
    pub fn new(cutoff: f64, q: f64, sample_rate: f64) -> Self {
        // Keep the cutoff below Nyquist so low sample rates stay stable.
        let cutoff = cutoff.min(sample_rate * 0.49);
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        HighpassFilter {
            cutoff,
            q,
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Filter a whole block, starting from the current state.
    pub fn process_block(&mut self, input: &[f32]) -> Vec<f32> {
        input
            .iter()
            .map(|&s| self.process(s as f64) as f32)
            .collect()
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_amplitude(filter: &mut HighpassFilter, freq: f64, sample_rate: f64) -> f64 {
        let mut max_out = 0.0_f64;
        for i in 0..(sample_rate as usize / 5) {
            let t = i as f64 / sample_rate;
            let out = filter.process((2.0 * PI * freq * t).sin());
            if i > 2000 {
                // skip transient
                max_out = max_out.max(out.abs());
            }
        }
        max_out
    }

    #[test]
    fn blocks_dc() {
        let mut f = HighpassFilter::new(800.0, 0.707, 44100.0);
        let mut output = 0.0;
        for _ in 0..2000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 0.001, "Highpass should block DC, got {output}");
    }

    #[test]
    fn attenuates_below_cutoff_passes_above() {
        let mut low = HighpassFilter::new(800.0, 0.707, 44100.0);
        let mut high = HighpassFilter::new(800.0, 0.707, 44100.0);
        let low_amp = steady_amplitude(&mut low, 100.0, 44100.0);
        let high_amp = steady_amplitude(&mut high, 5000.0, 44100.0);
        assert!(low_amp < 0.05, "100Hz should be attenuated, got {low_amp}");
        assert!(high_amp > 0.9, "5kHz should pass, got {high_amp}");
    }

    #[test]
    fn reset_clears_state() {
        let mut f = HighpassFilter::new(800.0, 0.707, 8000.0);
        let first = f.process_block(&[1.0, 0.0, -1.0, 0.5]);
        f.reset();
        let second = f.process_block(&[1.0, 0.0, -1.0, 0.5]);
        assert_eq!(first, second);
    }

    #[test]
    fn stable_when_cutoff_exceeds_nyquist() {
        let mut f = HighpassFilter::new(800.0, 0.707, 1000.0);
        for i in 0..10000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            assert!(f.process(input).is_finite(), "Filter output not finite at sample {i}");
        }
    }
}
