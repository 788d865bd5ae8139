//! Gemini live director client (`generateContent` REST API)

pub mod protocol;

use std::time::Duration;

use async_trait::async_trait;
use buttonburgh_domain::NarrativeEventResponse;
use reqwest::header::HeaderValue;
use reqwest::Client;

use crate::infrastructure::ports::{
    ConfigurationError, DirectorError, NarrativeDirectorPort, PromptAssembly, RemoteDispatchError,
};
use protocol::GenerateContentResponse;

/// Default Gemini base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for Gemini.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default per-call timeout.
pub const DEFAULT_GEMINI_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for the live client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            request_timeout: DEFAULT_GEMINI_TIMEOUT,
            temperature: None,
        }
    }
}

/// Client for Gemini's generateContent API
#[derive(Clone)]
pub struct GeminiDirectorClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: HeaderValue,
    timeout: Duration,
}

impl GeminiDirectorClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let mut api_key = HeaderValue::from_str(api_key)
            .map_err(|e| ConfigurationError::invalid("GEMINI_API_KEY", e))?;
        api_key.set_sensitive(true);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::invalid("http_client", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            timeout,
        })
    }

    /// Build from configuration. Live mode needs an API key.
    pub fn from_config(config: &GeminiConfig) -> Result<Self, ConfigurationError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigurationError::MissingSetting("GEMINI_API_KEY"))?;
        Self::new(
            &config.base_url,
            &config.model,
            api_key,
            config.request_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn classify(&self, error: reqwest::Error) -> RemoteDispatchError {
        if error.is_timeout() {
            RemoteDispatchError::Timeout(self.timeout)
        } else {
            RemoteDispatchError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl NarrativeDirectorPort for GeminiDirectorClient {
    async fn generate(
        &self,
        assembly: &PromptAssembly,
    ) -> Result<NarrativeEventResponse, DirectorError> {
        tracing::debug!(
            model = %self.model,
            trigger = ?assembly.trigger_reason(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.clone())
            .json(&assembly.wire_request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                model = %self.model,
                "Gemini rejected generateContent request"
            );
            return Err(RemoteDispatchError::status(status.as_u16(), error_text).into());
        }

        let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                RemoteDispatchError::Timeout(self.timeout)
            } else {
                RemoteDispatchError::malformed(format!("undecodable response body: {}", e))
            }
        })?;

        if let Some(usage) = &api_response.usage_metadata {
            tracing::debug!(
                prompt_tokens = usage.prompt_token_count,
                candidate_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "Gemini token usage"
            );
        }

        convert_response(api_response).map_err(Into::into)
    }
}

fn convert_response(
    response: GenerateContentResponse,
) -> Result<NarrativeEventResponse, RemoteDispatchError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(RemoteDispatchError::NoCandidates)?;

    let event = parse_narrative_payload(&candidate.text())?;
    tracing::info!(
        title = %event.title,
        snippets = event.snippets.len(),
        finish_reason = ?candidate.finish_reason,
        "Received live narrative event"
    );
    Ok(event)
}

/// Decode candidate text into a narrative event.
///
/// Models sometimes wrap JSON in a Markdown fence even when asked for bare
/// JSON; the fence is stripped before decoding.
pub(crate) fn parse_narrative_payload(
    text: &str,
) -> Result<NarrativeEventResponse, RemoteDispatchError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(RemoteDispatchError::malformed("candidate text is empty"));
    }

    let event: NarrativeEventResponse = serde_json::from_str(body).map_err(|e| {
        RemoteDispatchError::malformed(format!("candidate text is not a narrative event: {}", e))
    })?;
    event.validate().map_err(RemoteDispatchError::malformed)?;
    Ok(event)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use buttonburgh_domain::{DispatchRequest, NarrativeSnippet, PlayerId, PlayerNarrativeSnapshot};
    use uuid::Uuid;

    use crate::use_cases::narrative::PromptAssembler;

    /// What the fake endpoint saw for one call.
    #[derive(Debug, Clone)]
    struct SeenCall {
        call: String,
        api_key: Option<String>,
        body: serde_json::Value,
    }

    #[derive(Clone)]
    struct FakeGemini {
        status: StatusCode,
        body: String,
        delay: Duration,
        seen: Arc<Mutex<Vec<SeenCall>>>,
    }

    impl FakeGemini {
        fn new(status: StatusCode, body: impl Into<String>) -> Self {
            Self {
                status,
                body: body.into(),
                delay: Duration::ZERO,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    async fn handle(
        State(fake): State<FakeGemini>,
        Path(call): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, String) {
        fake.seen.lock().unwrap().push(SeenCall {
            call,
            api_key: headers
                .get(API_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            body,
        });
        if !fake.delay.is_zero() {
            tokio::time::sleep(fake.delay).await;
        }
        (fake.status, fake.body.clone())
    }

    async fn spawn_fake(fake: FakeGemini) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let router = Router::new()
            .route("/v1beta/models/{call}", post(handle))
            .with_state(fake);

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn client(base_url: &str, timeout: Duration) -> GeminiDirectorClient {
        GeminiDirectorClient::new(base_url, "test-model", "secret-key", timeout).unwrap()
    }

    fn assembly() -> PromptAssembly {
        let snapshot = PlayerNarrativeSnapshot::new(PlayerId::from_uuid(Uuid::nil()));
        PromptAssembler::new().assemble(DispatchRequest::new(
            snapshot,
            Some("market_day".to_string()),
        ))
    }

    fn sample_event() -> NarrativeEventResponse {
        NarrativeEventResponse {
            title: "The Loose Button".to_string(),
            summary: "A brass button rolls to your feet.".to_string(),
            snippets: vec![NarrativeSnippet {
                id: "loose_button".to_string(),
                text: "It hums faintly.".to_string(),
                choice_options: vec![
                    "Pocket it".to_string(),
                    "Return it".to_string(),
                    "Follow the hum".to_string(),
                ],
                consequences: BTreeMap::from([(
                    "Pocket it".to_string(),
                    serde_json::json!({ "reputation": -1, "item": "brass_button" }),
                )]),
                conditions: BTreeMap::from([(
                    "questStage".to_string(),
                    serde_json::json!("lost_thimble@searching"),
                )]),
            }],
        }
    }

    fn candidate_body(text: &str) -> String {
        serde_json::to_string(&GenerateContentResponse::from_text(text)).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_status_is_a_remote_error() {
        let fake = FakeGemini::new(StatusCode::UNAUTHORIZED, r#"{"error":"API key not valid"}"#);
        let base_url = spawn_fake(fake).await;

        let err = client(&base_url, Duration::from_secs(5))
            .generate(&assembly())
            .await
            .unwrap_err();

        match err {
            DirectorError::Remote(remote) => assert_eq!(remote.status_code(), Some(401)),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_is_a_remote_error() {
        let base_url = spawn_fake(FakeGemini::new(StatusCode::OK, r#"{"candidates":[]}"#)).await;

        let err = client(&base_url, Duration::from_secs(5))
            .generate(&assembly())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DirectorError::Remote(RemoteDispatchError::NoCandidates)
        ));
    }

    #[tokio::test]
    async fn non_json_candidate_is_malformed_payload() {
        let body = candidate_body("Once upon a time, in Buttonburgh...");
        let base_url = spawn_fake(FakeGemini::new(StatusCode::OK, body)).await;

        let err = client(&base_url, Duration::from_secs(5))
            .generate(&assembly())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DirectorError::Remote(RemoteDispatchError::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed_payload() {
        let base_url = spawn_fake(FakeGemini::new(StatusCode::OK, "<html>gateway</html>")).await;

        let err = client(&base_url, Duration::from_secs(5))
            .generate(&assembly())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DirectorError::Remote(RemoteDispatchError::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn valid_candidate_yields_exact_event() {
        let expected = sample_event();
        let body = candidate_body(&serde_json::to_string(&expected).unwrap());
        let fake = FakeGemini::new(StatusCode::OK, body);
        let seen = Arc::clone(&fake.seen);
        let base_url = spawn_fake(fake).await;

        let assembly = assembly();
        let event = client(&base_url, Duration::from_secs(5))
            .generate(&assembly)
            .await
            .unwrap();

        assert_eq!(event, expected);

        let calls = seen.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call, "test-model:generateContent");
        assert_eq!(calls[0].api_key.as_deref(), Some("secret-key"));
        assert_eq!(
            calls[0].body,
            serde_json::to_value(&assembly.wire_request).unwrap()
        );
    }

    #[tokio::test]
    async fn slow_endpoint_times_out_as_remote_error() {
        let mut fake = FakeGemini::new(StatusCode::OK, candidate_body("{}"));
        fake.delay = Duration::from_secs(2);
        let base_url = spawn_fake(fake).await;

        let err = client(&base_url, Duration::from_millis(100))
            .generate(&assembly())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DirectorError::Remote(RemoteDispatchError::Timeout(_))
        ));
    }

    #[test]
    fn narrative_event_round_trips_through_wire_format() {
        let expected = sample_event();
        let wire = candidate_body(&serde_json::to_string(&expected).unwrap());

        let decoded: GenerateContentResponse = serde_json::from_str(&wire).unwrap();
        let event = convert_response(decoded).unwrap();

        assert_eq!(event, expected);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        let fenced = format!("```json\n{}\n```", json);
        assert_eq!(parse_narrative_payload(&fenced).unwrap(), sample_event());
    }

    #[test]
    fn event_with_empty_title_is_malformed() {
        let mut event = sample_event();
        event.title = String::new();
        let err = parse_narrative_payload(&serde_json::to_string(&event).unwrap()).unwrap_err();
        assert!(matches!(err, RemoteDispatchError::MalformedPayload(_)));
    }

    #[test]
    fn from_config_requires_api_key() {
        let err = GeminiDirectorClient::from_config(&GeminiConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConfigurationError::MissingSetting("GEMINI_API_KEY")
        ));
    }

    #[test]
    fn api_key_that_cannot_be_a_header_is_rejected_up_front() {
        let err = GeminiDirectorClient::new(
            "http://localhost:9000",
            "test-model",
            "secret\nkey",
            Duration::from_secs(5),
        )
        .err()
        .unwrap();

        assert!(matches!(
            err,
            ConfigurationError::InvalidSetting {
                name: "GEMINI_API_KEY",
                ..
            }
        ));
    }
}
