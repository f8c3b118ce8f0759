use std::time::Duration;

use thiserror::Error;

/// Top-level error for every fallible operation in the crate.
#[derive(Debug, Error)]
pub enum SoundbenchError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Preview error: {0}")]
    Preview(#[from] PreviewError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// A sample buffer could not be constructed from the given data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    #[error("Sample rate must be positive")]
    ZeroSampleRate,
    #[error("Buffer needs at least one channel")]
    NoChannels,
    #[error("Channel {channel} has {found} frames, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        found: usize,
    },
    #[error("Interleaved length {len} is not a multiple of {channels} channels")]
    InterleavedLength { len: usize, channels: usize },
}

/// Failures of the offline renderer and the trim pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("Playback rate {0} cannot be rendered")]
    InvalidRate(f64),
    #[error("Invalid effect parameter: {0}")]
    InvalidParameter(String),
    #[error("Empty range: {start}s..{end}s selects no samples")]
    EmptyRange { start: f64, end: f64 },
    #[error("Render abandoned after {0:?}")]
    Timeout(Duration),
    #[error("Render task aborted: {0}")]
    Aborted(String),
}

/// Errors reported by a live audio graph backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("Failed to create {kind} node: {reason}")]
    CreateFailed { kind: &'static str, reason: String },
    #[error("Failed to connect node {from}: {reason}")]
    ConnectFailed { from: u64, reason: String },
    #[error("Failed to start node {node}: {reason}")]
    StartFailed { node: u64, reason: String },
}

/// A preview could not be auditioned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreviewError {
    #[error("Audio graph failure: {0}")]
    Graph(#[from] GraphError),
    #[error("Invalid preview parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
