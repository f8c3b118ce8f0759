//! Mixdown — collapses a multi-channel buffer (or a time range of it) to mono.

use crate::buffer::SampleBuffer;

/// Average every channel over frames `start..end` into one mono sequence.
///
/// Bounds are clamped to the buffer; an inverted range yields nothing.
pub fn mixdown_range(buffer: &SampleBuffer, start: usize, end: usize) -> Vec<f32> {
    let end = end.min(buffer.frame_count());
    if end <= start {
        return Vec::new();
    }

    let mut out = vec![0.0f32; end - start];
    for channel in buffer.channels() {
        for (acc, &s) in out.iter_mut().zip(&channel[start..end]) {
            *acc += s;
        }
    }

    let scale = 1.0 / buffer.channel_count() as f32;
    if buffer.channel_count() > 1 {
        for s in &mut out {
            *s *= scale;
        }
    }
    out
}

/// Cut `start_seconds..end_seconds` out of `buffer` and mix it to mono.
///
/// Both bounds are clamped into `[0, duration]` (NaN counts as 0). Frame
/// bounds are `floor(seconds * sample_rate)`. When the clamped end is not
/// after the start the returned sequence is empty; callers treat that as
/// an invalid range.
pub fn slice_and_mixdown(
    buffer: &SampleBuffer,
    start_seconds: f64,
    end_seconds: f64,
) -> (Vec<f32>, u32) {
    let sample_rate = buffer.sample_rate();
    let duration = buffer.duration();
    let start = clamp_seconds(start_seconds, duration);
    let end = clamp_seconds(end_seconds, duration);
    if end <= start {
        return (Vec::new(), sample_rate);
    }

    let start_frame = (start * sample_rate as f64).floor() as usize;
    let end_frame = (end * sample_rate as f64).floor() as usize;
    (mixdown_range(buffer, start_frame, end_frame), sample_rate)
}

fn clamp_seconds(seconds: f64, duration: f64) -> f64 {
    if seconds.is_nan() {
        0.0
    } else {
        seconds.clamp(0.0, duration)
    }
}
