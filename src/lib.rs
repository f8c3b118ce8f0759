pub mod buffer;
pub mod config;
pub mod dsp;
pub mod error;
#[cfg(feature = "runtime")]
pub mod preview;
pub mod render;
pub mod tag;
pub mod wav;

pub use crate::buffer::SampleBuffer;
pub use crate::config::EngineConfig;
pub use crate::dsp::mixer::slice_and_mixdown;
pub use crate::error::SoundbenchError;
#[cfg(feature = "runtime")]
pub use crate::preview::{PreviewHandle, PreviewManager, PreviewState};
pub use crate::render::{EffectKind, EffectSpec, OfflineRenderer, trim_to_wav};
pub use crate::tag::{CoverImage, extract_cover_image, read_cover_image};
pub use crate::wav::encode_wav;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the soundbench-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed as `encode_wav`: encode mono f32 samples as a 16-bit PCM WAV file.
#[wasm_bindgen(js_name = encode_wav)]
pub fn encode_mono_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    wav::encode_wav(samples, sample_rate)
}

/// WASM-exposed: find embedded cover art.
/// Returns `{ mimeType, bytes }`, or `null` when the file has none.
#[wasm_bindgen]
pub fn extract_cover(file: &[u8]) -> Result<JsValue, JsValue> {
    match tag::extract_cover_image(file) {
        Some(cover) => {
            serde_wasm_bindgen::to_value(&cover).map_err(|e| JsValue::from_str(&format!("{e}")))
        }
        None => Ok(JsValue::NULL),
    }
}

/// WASM-exposed as `trim_to_wav`: cut `start..end` seconds from
/// interleaved audio and return it as a mono WAV. Errors on an empty selection.
#[wasm_bindgen(js_name = trim_to_wav)]
pub fn trim_selection(
    interleaved: &[f32],
    channels: u32,
    sample_rate: u32,
    start: f64,
    end: f64,
) -> Result<Vec<u8>, JsValue> {
    let buffer = SampleBuffer::from_interleaved(interleaved, channels as usize, sample_rate)
        .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    render::trim_to_wav(&buffer, start, end).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render an effect (`"rate"`, `"chipmunk"`, `"deep"`,
/// `"robot"`) over interleaved audio and return a mono WAV.
#[wasm_bindgen]
pub fn render_effect_wav(
    interleaved: &[f32],
    channels: u32,
    sample_rate: u32,
    effect: &str,
    parameter: Option<f64>,
) -> Result<Vec<u8>, JsValue> {
    let wav = render_interleaved(interleaved, channels as usize, sample_rate, effect, parameter)
        .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(wav)
}

fn render_interleaved(
    interleaved: &[f32],
    channels: usize,
    sample_rate: u32,
    effect: &str,
    parameter: Option<f64>,
) -> Result<Vec<u8>, SoundbenchError> {
    let buffer = SampleBuffer::from_interleaved(interleaved, channels, sample_rate)?;
    let spec = EffectSpec::parse(effect, parameter)?;
    let rendered = OfflineRenderer::default().render_effect(&buffer, &spec)?;
    Ok(wav::encode_wav(&rendered.mixdown(), rendered.sample_rate()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_interleaved_input_to_wav() {
        let interleaved: Vec<f32> = (0..16000).map(|i| ((i / 2) as f32 * 0.01).sin() * 0.5).collect();
        let wav = render_interleaved(&interleaved, 2, 8000, "deep", None).unwrap();

        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize;
        assert_eq!(data_size, (8000.0f64 / 0.75).ceil() as usize * 2);
        assert_eq!(&wav[0..4], b"RIFF");
    }

    #[test]
    fn bad_effect_name_is_an_error() {
        let err = render_interleaved(&[0.0; 4], 2, 8000, "flanger", None).unwrap_err();
        assert!(matches!(err, SoundbenchError::Render(_)));
    }

    #[test]
    fn ragged_interleaving_is_an_error() {
        let err = render_interleaved(&[0.0; 5], 2, 8000, "robot", None).unwrap_err();
        assert!(matches!(err, SoundbenchError::Buffer(_)));
    }

    #[test]
    fn trim_export_cuts_interleaved_selection() {
        let interleaved: Vec<f32> = (0..8000).map(|i| (i % 7) as f32 * 0.1).collect();
        let wav = trim_selection(&interleaved, 2, 4000, 0.25, 0.75).unwrap();
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 2000 * 2);
    }

    #[test]
    fn encode_export_matches_library_encoder() {
        let samples = [0.25, -0.25, 0.0];
        assert_eq!(encode_mono_wav(&samples, 16000), encode_wav(&samples, 16000));
    }
}
