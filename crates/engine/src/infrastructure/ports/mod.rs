//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Narrative dispatch (sandbox fixtures vs. the live Gemini API)
//! - Dispatch telemetry (observers)
//! - Clock/Ids (for testing)

mod error;
mod external;
mod testing;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    DispatchEvent, DispatchObserver, DispatchOutcome, NarrativeDirectorPort, PromptAssembly,
};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::{MockDispatchObserver, MockNarrativeDirectorPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, IdPort};

// =============================================================================
// Error Types
// =============================================================================
pub use error::{ConfigurationError, DirectorError, ObserverError, RemoteDispatchError};
