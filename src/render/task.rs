//! Single-shot async rendering with a wall-clock limit.
//!
//! The render itself is CPU-bound and runs on tokio's blocking pool. If
//! it does not finish within the limit the result is abandoned and the
//! caller gets [`RenderError::Timeout`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use super::{EffectSpec, OfflineRenderer};
use crate::buffer::SampleBuffer;
use crate::error::RenderError;

impl OfflineRenderer {
    /// Render on the blocking pool using the configured timeout.
    pub async fn render_async(
        &self,
        buffer: Arc<SampleBuffer>,
        spec: EffectSpec,
    ) -> Result<SampleBuffer, RenderError> {
        let limit = self.config().render_timeout();
        self.render_async_with_timeout(buffer, spec, limit).await
    }

    /// Render on the blocking pool, giving up after `limit`.
    pub async fn render_async_with_timeout(
        &self,
        buffer: Arc<SampleBuffer>,
        spec: EffectSpec,
        limit: Duration,
    ) -> Result<SampleBuffer, RenderError> {
        spec.validate()?;

        let renderer = self.clone();
        let job = tokio::task::spawn_blocking(move || renderer.render_effect(&buffer, &spec));

        match timeout(limit, job).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(RenderError::Aborted(e.to_string())),
            Err(_) => {
                log::warn!("offline render ({:?}) abandoned after {limit:?}", spec.kind);
                Err(RenderError::Timeout(limit))
            }
        }
    }
}
