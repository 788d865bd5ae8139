//! Use cases - User story orchestration.

pub mod narrative;

pub use narrative::{DispatchService, PromptAssembler};
