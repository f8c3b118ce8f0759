//! Live audio graph abstraction.
//!
//! The host platform (a WebAudio context in the browser, a native output
//! stream elsewhere) implements [`AudioGraph`]. The preview manager only
//! creates, wires, starts and releases nodes through this trait.

use std::sync::{Arc, OnceLock};

use crate::error::GraphError;

/// Backend-assigned node handle.
pub type NodeId = u64;

/// Invoked once when a buffer source finishes playing.
pub type EndedCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Plays mono samples once at `playback_rate` times normal speed.
    BufferSource {
        samples: Arc<[f32]>,
        sample_rate: u32,
        playback_rate: f64,
    },
    /// Sine oscillator.
    Oscillator { frequency: f64 },
    /// Gain stage. Its gain can also be driven by a modulation input.
    Gain { gain: f64 },
    Highpass { cutoff: f64, q: f64 },
    WaveShaper { curve: Arc<[f32]> },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::BufferSource { .. } => "buffer-source",
            NodeKind::Oscillator { .. } => "oscillator",
            NodeKind::Gain { .. } => "gain",
            NodeKind::Highpass { .. } => "highpass",
            NodeKind::WaveShaper { .. } => "waveshaper",
        }
    }
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The device output.
    Output,
    /// Another node's audio input.
    Node(NodeId),
    /// The gain parameter of a gain node.
    GainModulation(NodeId),
}

pub trait AudioGraph: Send + Sync {
    fn create_node(&self, kind: NodeKind) -> Result<NodeId, GraphError>;

    fn connect(&self, from: NodeId, to: Destination) -> Result<(), GraphError>;

    /// Begin playback. Sources call `on_ended` when they run out.
    fn start(&self, node: NodeId, on_ended: Option<EndedCallback>) -> Result<(), GraphError>;

    /// Stop and disconnect a node. Releasing an unknown node is a no-op.
    fn release(&self, node: NodeId);
}

static DEVICE: OnceLock<Arc<dyn AudioGraph>> = OnceLock::new();

/// The process-wide output graph, created by `init` on first use.
///
/// Later calls return the same instance and ignore their `init`.
pub fn device_context<F>(init: F) -> Arc<dyn AudioGraph>
where
    F: FnOnce() -> Arc<dyn AudioGraph>,
{
    DEVICE.get_or_init(init).clone()
}
