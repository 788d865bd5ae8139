//! Chapter event dispatch - routes a request to the sandbox or live director.

use std::sync::Arc;

use buttonburgh_domain::{DispatchMode, DispatchRequest, NarrativeEventResponse};

use super::prompt::PromptAssembler;
use crate::infrastructure::ports::{
    ConfigurationError, DirectorError, DispatchEvent, DispatchObserver, DispatchOutcome,
    NarrativeDirectorPort, PromptAssembly,
};

/// Façade used by narrative pacing to request chapter events.
///
/// Holds one (rate-limited) client per mode. Stateless per call; the only
/// state shared between calls lives inside those clients.
pub struct DispatchService {
    assembler: PromptAssembler,
    sandbox: Arc<dyn NarrativeDirectorPort>,
    live: Option<Arc<dyn NarrativeDirectorPort>>,
    observer: Arc<dyn DispatchObserver>,
}

impl DispatchService {
    pub fn new(
        assembler: PromptAssembler,
        sandbox: Arc<dyn NarrativeDirectorPort>,
        live: Option<Arc<dyn NarrativeDirectorPort>>,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            assembler,
            sandbox,
            live,
            observer,
        }
    }

    /// Whether requests for `mode` can be served.
    pub fn supports(&self, mode: DispatchMode) -> bool {
        match mode {
            DispatchMode::Sandbox => true,
            DispatchMode::Live => self.live.is_some(),
        }
    }

    fn client_for(
        &self,
        mode: DispatchMode,
    ) -> Result<&Arc<dyn NarrativeDirectorPort>, ConfigurationError> {
        match mode {
            DispatchMode::Sandbox => Ok(&self.sandbox),
            DispatchMode::Live => self
                .live
                .as_ref()
                .ok_or(ConfigurationError::ModeUnavailable(mode)),
        }
    }

    /// Produce the next chapter event for a player.
    ///
    /// Client errors are returned as-is; whether to retry or fall back to
    /// sandbox mode is the caller's decision.
    pub async fn generate_chapter_event(
        &self,
        request: DispatchRequest,
        mode: DispatchMode,
    ) -> Result<NarrativeEventResponse, DirectorError> {
        let assembly = self.assembler.assemble(request);

        tracing::info!(
            player_id = %assembly.request.snapshot.player_id,
            mode = %mode,
            trigger = ?assembly.trigger_reason(),
            "Dispatching chapter event"
        );

        // Routing failures are dispatch outcomes too; observers see every call.
        let result = match self.client_for(mode) {
            Ok(client) => client.generate(&assembly).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(event) => tracing::info!(
                mode = %mode,
                title = %event.title,
                snippets = event.snippets.len(),
                "Chapter event dispatched"
            ),
            Err(e) => tracing::warn!(mode = %mode, error = %e, "Chapter event dispatch failed"),
        }

        self.notify(mode, assembly, &result);
        result
    }

    /// Hand the dispatch record to the observer without waiting on it.
    fn notify(
        &self,
        mode: DispatchMode,
        assembly: PromptAssembly,
        result: &Result<NarrativeEventResponse, DirectorError>,
    ) {
        let outcome = match result {
            Ok(event) => DispatchOutcome::Delivered {
                title: event.title.clone(),
                snippets: event.snippets.len(),
            },
            Err(e) => DispatchOutcome::Failed {
                reason: e.to_string(),
            },
        };
        let event = DispatchEvent {
            mode,
            assembly,
            outcome,
        };

        let observer = Arc::clone(&self.observer);
        tokio::spawn(async move {
            if let Err(e) = observer.on_dispatch(&event).await {
                tracing::warn!(error = %e, mode = %event.mode, "Dispatch observer failed");
            }
        });
    }
}
