//! Sandbox director client - serves narrative events from fixtures.
//!
//! Used for offline play and tests. Responses are looked up by trigger
//! reason, optionally delayed to mimic network latency, and stamped with ids
//! from the injected id source so runs are reproducible.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use buttonburgh_domain::NarrativeEventResponse;

use crate::infrastructure::fixtures::FixtureDocument;
use crate::infrastructure::ports::{
    ClockPort, ConfigurationError, DirectorError, IdPort, NarrativeDirectorPort, PromptAssembly,
};

pub struct SandboxDirectorClient {
    fixtures: Arc<FixtureDocument>,
    ids: Arc<dyn IdPort>,
    clock: Arc<dyn ClockPort>,
    latency: Option<Duration>,
}

impl SandboxDirectorClient {
    pub fn new(
        fixtures: Arc<FixtureDocument>,
        ids: Arc<dyn IdPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            fixtures,
            ids,
            clock,
            latency: None,
        }
    }

    /// Simulate a network round trip of `latency` before each response.
    pub fn with_latency(mut self, latency: Option<Duration>) -> Self {
        self.latency = latency.filter(|latency| !latency.is_zero());
        self
    }
}

#[async_trait]
impl NarrativeDirectorPort for SandboxDirectorClient {
    async fn generate(
        &self,
        assembly: &PromptAssembly,
    ) -> Result<NarrativeEventResponse, DirectorError> {
        if let Some(latency) = self.latency {
            self.clock.sleep(latency).await;
        }

        let trigger = assembly.trigger_reason();
        let matched = trigger.and_then(|reason| self.fixtures.find(reason));
        let fixture = matched
            .or_else(|| self.fixtures.default_fixture())
            .ok_or_else(|| ConfigurationError::FixtureEmpty {
                path: self.fixtures.source().to_string(),
            })?;

        tracing::debug!(
            fixture_id = %fixture.id,
            trigger = ?trigger,
            matched = matched.is_some(),
            "Serving sandbox narrative fixture"
        );

        let mut response = fixture.response.clone();
        for snippet in &mut response.snippets {
            snippet.id = format!("{}-{}", snippet.id, self.ids.next_id());
        }
        Ok(response)
    }
}
