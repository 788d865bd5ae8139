//! External service port traits (narrative dispatch, dispatch telemetry).

use async_trait::async_trait;
use buttonburgh_domain::{DispatchMode, DispatchRequest, NarrativeEventResponse};

use super::error::{DirectorError, ObserverError};
use crate::infrastructure::gemini::protocol::GenerateContentRequest;

// =============================================================================
// Dispatch Types
// =============================================================================

/// Everything needed to dispatch one request, rendered once up front.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptAssembly {
    /// The request the prompt was built from
    pub request: DispatchRequest,
    /// House rules and response contract
    pub system_instruction: String,
    /// Serialized player state and trigger
    pub user_context: String,
    /// Ready-to-send generateContent body
    pub wire_request: GenerateContentRequest,
}

impl PromptAssembly {
    pub fn trigger_reason(&self) -> Option<&str> {
        self.request.trigger_reason()
    }
}

/// How a dispatch ended, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { title: String, snippets: usize },
    Failed { reason: String },
}

/// Telemetry record handed to observers after each dispatch.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    pub mode: DispatchMode,
    pub assembly: PromptAssembly,
    pub outcome: DispatchOutcome,
}

impl DispatchEvent {
    pub fn request(&self) -> &DispatchRequest {
        &self.assembly.request
    }
}

// =============================================================================
// Ports
// =============================================================================

/// Turns an assembled prompt into a narrative event.
///
/// Implemented by the sandbox (fixture) client, the live Gemini client, and
/// decorators such as the rate limiter. Callers cannot tell them apart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NarrativeDirectorPort: Send + Sync {
    async fn generate(
        &self,
        assembly: &PromptAssembly,
    ) -> Result<NarrativeEventResponse, DirectorError>;
}

/// Receives a record of every dispatch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DispatchObserver: Send + Sync {
    async fn on_dispatch(&self, event: &DispatchEvent) -> Result<(), ObserverError>;
}
