//! Decoded multi-channel audio.
//!
//! A `SampleBuffer` is what the platform decoder hands us. It is never
//! mutated after construction; slicing, mixdown and rendering all build
//! new buffers.

use crate::error::BufferError;

/// Planar f32 audio: one sample array per channel, all the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Build a buffer from planar channel data.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let Some(first) = channels.first() else {
            return Err(BufferError::NoChannels);
        };
        let expected = first.len();
        if let Some((channel, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(BufferError::RaggedChannels {
                channel,
                expected,
                found: ch.len(),
            });
        }
        Ok(SampleBuffer {
            sample_rate,
            channels,
        })
    }

    /// Single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, BufferError> {
        Self::new(sample_rate, vec![samples])
    }

    /// De-interleave `L R L R ...` style data into a planar buffer.
    pub fn from_interleaved(
        interleaved: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        if channel_count == 0 {
            return Err(BufferError::NoChannels);
        }
        if interleaved.len() % channel_count != 0 {
            return Err(BufferError::InterleavedLength {
                len: interleaved.len(),
                channels: channel_count,
            });
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Equal-weight average of all channels over the whole buffer.
    pub fn mixdown(&self) -> Vec<f32> {
        crate::dsp::mixer::mixdown_range(self, 0, self.frame_count())
    }

    /// Mono copy of this buffer.
    pub fn to_mono(&self) -> SampleBuffer {
        self.derive_mono(self.mixdown())
    }

    /// New mono buffer at this buffer's sample rate.
    pub(crate) fn derive_mono(&self, samples: Vec<f32>) -> SampleBuffer {
        SampleBuffer {
            sample_rate: self.sample_rate,
            channels: vec![samples],
        }
    }
}

/// Read `data` at a fractional index with linear interpolation.
///
/// Positions before the start read as silence; the last sample is held
/// for positions between it and the end, and anything past that is silence.
pub fn read_interpolated(data: &[f32], position: f64) -> f32 {
    if data.is_empty() || position < 0.0 {
        return 0.0;
    }

    let idx = position as usize;
    if idx >= data.len() - 1 {
        return if idx < data.len() { data[idx] } else { 0.0 };
    }

    let frac = (position - idx as f64) as f32;
    data[idx] * (1.0 - frac) + data[idx + 1] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_channels() {
        let err = SampleBuffer::new(44100, vec![vec![0.0; 4], vec![0.0; 3]]).unwrap_err();
        assert_eq!(
            err,
            BufferError::RaggedChannels {
                channel: 1,
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn rejects_zero_rate_and_no_channels() {
        assert_eq!(
            SampleBuffer::new(0, vec![vec![0.0]]).unwrap_err(),
            BufferError::ZeroSampleRate
        );
        assert_eq!(
            SampleBuffer::new(8000, vec![]).unwrap_err(),
            BufferError::NoChannels
        );
    }

    #[test]
    fn deinterleaves_stereo() {
        let buf = SampleBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3, -0.3], 2, 8000)
            .unwrap();
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.frame_count(), 3);
        assert_eq!(buf.channel(0).unwrap(), &[0.1, 0.2, 0.3]);
        assert_eq!(buf.channel(1).unwrap(), &[-0.1, -0.2, -0.3]);
    }

    #[test]
    fn interleaved_length_must_divide() {
        let err = SampleBuffer::from_interleaved(&[0.0; 5], 2, 8000).unwrap_err();
        assert_eq!(err, BufferError::InterleavedLength { len: 5, channels: 2 });
    }

    #[test]
    fn duration_is_frames_over_rate() {
        let buf = SampleBuffer::mono(vec![0.0; 22050], 44100).unwrap();
        assert!((buf.duration() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn interpolates_between_samples() {
        let data = [0.0, 1.0, 0.0];
        assert!((read_interpolated(&data, 0.5) - 0.5).abs() < 1e-6);
        assert!((read_interpolated(&data, 1.25) - 0.75).abs() < 1e-6);
        assert_eq!(read_interpolated(&data, 2.0), 0.0);
        assert_eq!(read_interpolated(&data, 3.5), 0.0);
        assert_eq!(read_interpolated(&data, -1.0), 0.0);
    }
}
