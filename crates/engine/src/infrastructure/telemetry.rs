//! Default dispatch observer: one structured log event per dispatch.

use async_trait::async_trait;

use crate::infrastructure::ports::{DispatchEvent, DispatchObserver, DispatchOutcome, ObserverError};

/// Logs every dispatch through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatchObserver;

impl TracingDispatchObserver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DispatchObserver for TracingDispatchObserver {
    async fn on_dispatch(&self, event: &DispatchEvent) -> Result<(), ObserverError> {
        let request = event.request();
        match &event.outcome {
            DispatchOutcome::Delivered { title, snippets } => tracing::info!(
                target: "buttonburgh_engine::telemetry",
                player_id = %request.snapshot.player_id,
                mode = %event.mode,
                trigger = ?request.trigger_reason(),
                choices = request.snapshot.choice_log.len(),
                context_chars = event.assembly.user_context.len(),
                %title,
                snippets,
                "dispatch delivered"
            ),
            DispatchOutcome::Failed { reason } => tracing::warn!(
                target: "buttonburgh_engine::telemetry",
                player_id = %request.snapshot.player_id,
                mode = %event.mode,
                trigger = ?request.trigger_reason(),
                %reason,
                "dispatch failed"
            ),
        }
        Ok(())
    }
}
