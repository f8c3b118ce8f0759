//! Live preview lifecycle.
//!
//! At most one preview session holds live graph nodes at a time. A
//! session owns its nodes and its watchdog; dropping it releases both.
//! Every session gets a generation number, and callbacks (natural end,
//! watchdog) carry the generation they were created for, so a late
//! event from an old session can never tear down a newer one.
//!
//! ```text
//!            start_preview            source ended / stop / watchdog
//!   Idle ──► Building ──► Playing ──────────────────────────────► Idle
//!              │  ▲                     │
//!              │  └──── start_preview ──┘  (old session dropped first)
//!              └── node failure ──► Idle   (partial graph released)
//! ```

pub mod graph;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub use graph::{AudioGraph, Destination, EndedCallback, NodeId, NodeKind, device_context};

use crate::buffer::SampleBuffer;
use crate::config::EngineConfig;
use crate::dsp::shaper::arctan_curve;
use crate::error::PreviewError;
use crate::render::{EffectKind, EffectSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    Building,
    Playing,
}

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewEnd {
    Natural,
    Stopped,
    Superseded,
    Watchdog,
}

/// Identifies one started preview. Teardown invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle {
    generation: u64,
}

impl PreviewHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Live resources of one preview.
struct PreviewSession {
    generation: u64,
    graph: Arc<dyn AudioGraph>,
    // Held so the source outlives every node reading from it.
    _source: Arc<SampleBuffer>,
    nodes: Vec<NodeId>,
    watchdog: Option<JoinHandle<()>>,
}

impl PreviewSession {
    fn new(generation: u64, graph: Arc<dyn AudioGraph>, source: Arc<SampleBuffer>) -> Self {
        PreviewSession {
            generation,
            graph,
            _source: source,
            nodes: Vec::new(),
            watchdog: None,
        }
    }

    fn add(&mut self, kind: NodeKind) -> Result<NodeId, PreviewError> {
        let id = self.graph.create_node(kind)?;
        self.nodes.push(id);
        Ok(id)
    }

    fn connect(&self, from: NodeId, to: Destination) -> Result<(), PreviewError> {
        Ok(self.graph.connect(from, to)?)
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        // Release in reverse creation order: sinks after their sources.
        for node in self.nodes.drain(..).rev() {
            self.graph.release(node);
        }
        log::trace!("preview #{}: nodes released", self.generation);
    }
}

struct Slot {
    generation: u64,
    state: PreviewState,
    session: Option<PreviewSession>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// End the session for `generation`, if it is still the current one.
///
/// The session is dropped after the lock is released, so a backend that
/// reports "ended" from inside `release` cannot deadlock us.
fn finish(slot: &Weak<Mutex<Slot>>, generation: u64, reason: PreviewEnd) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    let session = {
        let mut guard = lock(&slot);
        if guard.generation != generation || guard.state == PreviewState::Idle {
            log::trace!("preview #{generation}: stale {reason:?} ignored");
            return;
        }
        guard.state = PreviewState::Idle;
        guard.generation += 1;
        guard.session.take()
    };
    match reason {
        PreviewEnd::Watchdog => {
            log::warn!("preview #{generation}: no end signal, watchdog forced teardown")
        }
        _ => log::debug!("preview #{generation}: ended ({reason:?})"),
    }
    drop(session);
}

/// Owns the single live preview.
pub struct PreviewManager {
    graph: Arc<dyn AudioGraph>,
    runtime: Handle,
    config: EngineConfig,
    curve: Arc<[f32]>,
    slot: Arc<Mutex<Slot>>,
}

impl PreviewManager {
    /// Manager on the process-wide device graph.
    ///
    /// `init` builds the graph only if no device exists yet; every manager
    /// created this way shares the same one. `runtime` drives the watchdog
    /// timers.
    pub fn with_device<F>(init: F, runtime: Handle, config: EngineConfig) -> Self
    where
        F: FnOnce() -> Arc<dyn AudioGraph>,
    {
        Self::new(device_context(init), runtime, config)
    }

    /// Manager on an explicitly supplied graph, bypassing the shared device.
    pub fn new(graph: Arc<dyn AudioGraph>, runtime: Handle, config: EngineConfig) -> Self {
        let curve = arctan_curve(config.drive_amount, config.curve_resolution);
        PreviewManager {
            graph,
            runtime,
            config,
            curve,
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                state: PreviewState::Idle,
                session: None,
            })),
        }
    }

    pub fn state(&self) -> PreviewState {
        lock(&self.slot).state
    }

    /// Whether the session behind `handle` still holds live nodes.
    pub fn is_active(&self, handle: &PreviewHandle) -> bool {
        let guard = lock(&self.slot);
        guard.generation == handle.generation && guard.session.is_some()
    }

    /// Nodes currently owned by the live session.
    pub fn live_node_count(&self) -> usize {
        lock(&self.slot)
            .session
            .as_ref()
            .map_or(0, |s| s.nodes.len())
    }

    /// Start auditioning `spec` on `buffer`, replacing any running preview.
    ///
    /// On failure every node created for this attempt has been released
    /// and the manager is back to `Idle`.
    pub fn start_preview(
        &self,
        buffer: Arc<SampleBuffer>,
        spec: EffectSpec,
    ) -> Result<PreviewHandle, PreviewError> {
        spec.validate()
            .map_err(|e| PreviewError::InvalidParameter(e.to_string()))?;

        let (generation, previous) = {
            let mut guard = lock(&self.slot);
            guard.generation += 1;
            guard.state = PreviewState::Building;
            (guard.generation, guard.session.take())
        };
        if let Some(previous) = previous {
            log::debug!("preview #{}: ended ({:?})", previous.generation, PreviewEnd::Superseded);
            drop(previous);
        }

        let mut session = PreviewSession::new(generation, self.graph.clone(), buffer.clone());
        if let Err(e) = self.build(&mut session, &buffer, &spec) {
            log::warn!("preview #{generation}: audition failed: {e}");
            drop(session);
            let mut guard = lock(&self.slot);
            if guard.generation == generation {
                guard.state = PreviewState::Idle;
            }
            return Err(e);
        }

        let expected = Duration::try_from_secs_f64(spec.output_duration(buffer.duration()))
            .unwrap_or(Duration::MAX);
        let deadline = expected.saturating_add(self.config.watchdog_margin());
        session.watchdog = Some(self.spawn_watchdog(generation, deadline));

        let stale = {
            let mut guard = lock(&self.slot);
            if guard.generation == generation && guard.state == PreviewState::Building {
                guard.state = PreviewState::Playing;
                guard.session = Some(session);
                None
            } else {
                // Ended (or was replaced) before we could install it.
                Some(session)
            }
        };
        drop(stale);

        log::debug!(
            "preview #{generation}: playing {:?} x{} for {expected:?}",
            spec.kind,
            spec.parameter
        );
        Ok(PreviewHandle { generation })
    }

    /// Tear down the live preview, if any. Safe to call at any time.
    pub fn stop_preview(&self) {
        let session = {
            let mut guard = lock(&self.slot);
            if guard.state == PreviewState::Idle {
                return;
            }
            guard.state = PreviewState::Idle;
            guard.generation += 1;
            guard.session.take()
        };
        if let Some(session) = session {
            log::debug!("preview #{}: ended ({:?})", session.generation, PreviewEnd::Stopped);
        }
    }

    /// Create, wire and start the nodes for `spec`.
    fn build(
        &self,
        session: &mut PreviewSession,
        buffer: &SampleBuffer,
        spec: &EffectSpec,
    ) -> Result<(), PreviewError> {
        let samples: Arc<[f32]> = buffer.mixdown().into();
        let playback_rate = match spec.kind {
            EffectKind::RateChange => spec.parameter,
            EffectKind::SyntheticDistortion => 1.0,
        };
        let source = session.add(NodeKind::BufferSource {
            samples,
            sample_rate: buffer.sample_rate(),
            playback_rate,
        })?;
        session.connect(source, Destination::Output)?;

        if spec.kind == EffectKind::SyntheticDistortion {
            // source -> highpass -> shaper -> ring gain -> out, with the
            // oscillator driving the ring gain.
            let highpass = session.add(NodeKind::Highpass {
                cutoff: self.config.highpass_cutoff_hz,
                q: self.config.highpass_q,
            })?;
            let shaper = session.add(NodeKind::WaveShaper {
                curve: self.curve.clone(),
            })?;
            let ring = session.add(NodeKind::Gain { gain: 0.0 })?;
            let modulator = session.add(NodeKind::Oscillator {
                frequency: spec.parameter,
            })?;

            session.connect(source, Destination::Node(highpass))?;
            session.connect(highpass, Destination::Node(shaper))?;
            session.connect(shaper, Destination::Node(ring))?;
            session.connect(modulator, Destination::GainModulation(ring))?;
            session.connect(ring, Destination::Output)?;
            self.graph.start(modulator, None)?;
        }

        let slot = Arc::downgrade(&self.slot);
        let generation = session.generation;
        self.graph.start(
            source,
            Some(Box::new(move || finish(&slot, generation, PreviewEnd::Natural))),
        )?;
        Ok(())
    }

    fn spawn_watchdog(&self, generation: u64, after: Duration) -> JoinHandle<()> {
        let slot = Arc::downgrade(&self.slot);
        self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            finish(&slot, generation, PreviewEnd::Watchdog);
        })
    }
}

impl Drop for PreviewManager {
    fn drop(&mut self) {
        self.stop_preview();
    }
}
