//! Narrative dispatch use cases.

pub mod dispatch;
pub mod prompt;

pub use dispatch::DispatchService;
pub use prompt::PromptAssembler;
