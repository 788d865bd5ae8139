//! Application composition.

use std::sync::Arc;

use buttonburgh_domain::{
    DispatchMode, DispatchRequest, NarrativeEventResponse, PlayerNarrativeSnapshot,
};

use crate::infrastructure::{
    clock::{SystemClock, SystemIds},
    config::DirectorConfig,
    fixtures::{FixtureDocument, FixtureStore},
    gemini::GeminiDirectorClient,
    ports::{
        ClockPort, ConfigurationError, DirectorError, DispatchObserver, IdPort,
        NarrativeDirectorPort,
    },
    rate_limited::RateLimitedDirector,
    sandbox::SandboxDirectorClient,
    telemetry::TracingDispatchObserver,
};
use crate::use_cases::narrative::{DispatchService, PromptAssembler};

/// Main application state.
///
/// Built once at startup and shared (`Arc<App>`) by every caller.
pub struct App {
    pub dispatch: Arc<DispatchService>,
    pub fixtures: Arc<FixtureDocument>,
    default_mode: DispatchMode,
}

impl App {
    /// Compose the application with system clock, random ids and log telemetry.
    pub fn new(config: DirectorConfig) -> Result<Self, ConfigurationError> {
        Self::with_ports(
            config,
            Arc::new(SystemClock::new()),
            Arc::new(SystemIds::new()),
            Arc::new(TracingDispatchObserver::new()),
        )
    }

    pub fn with_ports(
        config: DirectorConfig,
        clock: Arc<dyn ClockPort>,
        ids: Arc<dyn IdPort>,
        observer: Arc<dyn DispatchObserver>,
    ) -> Result<Self, ConfigurationError> {
        let store = if config.uses_default_fixtures() {
            FixtureStore::bundled()
        } else {
            FixtureStore::new(config.fixture_path.clone())
        };
        let fixtures = Arc::new(store.load()?);
        let default_mode = config.mode.unwrap_or_else(|| fixtures.default_mode());

        let sandbox: Arc<dyn NarrativeDirectorPort> = Arc::new(
            RateLimitedDirector::new(
                Arc::new(
                    SandboxDirectorClient::new(Arc::clone(&fixtures), ids, clock.clone())
                        .with_latency(config.sandbox_latency),
                ),
                config.rate_limit,
                clock.clone(),
            )
            .with_label("sandbox"),
        );

        let live = match (&config.gemini.api_key, default_mode) {
            (Some(_), _) => {
                let client = GeminiDirectorClient::from_config(&config.gemini)?;
                tracing::info!(
                    model = %client.model(),
                    base_url = %config.gemini.base_url,
                    "Live director configured"
                );
                let live: Arc<dyn NarrativeDirectorPort> = Arc::new(
                    RateLimitedDirector::new(Arc::new(client), config.rate_limit, clock)
                        .with_label("live"),
                );
                Some(live)
            }
            (None, DispatchMode::Live) => {
                return Err(ConfigurationError::MissingSetting("GEMINI_API_KEY"));
            }
            (None, DispatchMode::Sandbox) => {
                tracing::info!("GEMINI_API_KEY not set, live dispatch disabled");
                None
            }
        };

        tracing::info!(
            default_mode = %default_mode,
            fixtures = fixtures.len(),
            max_requests = config.rate_limit.max_requests,
            interval_ms = config.rate_limit.interval.as_millis() as u64,
            "Narrative director ready"
        );

        let assembler = PromptAssembler::new().with_temperature(config.gemini.temperature);
        let dispatch = Arc::new(DispatchService::new(assembler, sandbox, live, observer));

        Ok(Self {
            dispatch,
            fixtures,
            default_mode,
        })
    }

    /// Mode used when a caller does not pick one.
    pub fn default_mode(&self) -> DispatchMode {
        self.default_mode
    }

    /// Request the next chapter event; `mode` falls back to the default mode.
    pub async fn generate_chapter_event(
        &self,
        snapshot: PlayerNarrativeSnapshot,
        trigger_reason: Option<String>,
        mode: Option<DispatchMode>,
    ) -> Result<NarrativeEventResponse, DirectorError> {
        let request = DispatchRequest::new(snapshot, trigger_reason);
        self.dispatch
            .generate_chapter_event(request, mode.unwrap_or(self.default_mode))
            .await
    }
}
