//! WAV encoder — serializes mono float samples to 16-bit PCM WAV bytes.

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const CHANNELS: u16 = 1;

/// Encode mono samples as a 16-bit PCM WAV file.
///
/// Samples are clamped to `[-1, 1]` and quantized with [`quantize`];
/// NaN and infinities become silence. Never fails.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate.saturating_mul(block_align as u32);
    let payload_len = samples.len().saturating_mul(block_align as usize);
    // Header sizes are u32; anything larger is written as the maximum.
    let data_size = u32::try_from(payload_len).unwrap_or(u32::MAX);
    let file_size = data_size.saturating_add(36);

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN.saturating_add(payload_len));

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&CHANNELS.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    buf
}

/// Convert one float sample to signed 16-bit.
///
/// Negative values scale by 32768 and positive ones by 32767 so both
/// full-scale ends land exactly on `i16::MIN` / `i16::MAX`. Rounding is
/// to nearest with ties away from zero, so `0.5` becomes `16384`.
pub fn quantize(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0) as f64;
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
