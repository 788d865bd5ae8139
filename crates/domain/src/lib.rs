//! Buttonburgh director domain.
//!
//! Plain value types shared by the director engine and its callers:
//! player snapshots, dispatch requests, narrative events and dispatch modes.
//! No I/O lives here.

pub mod dispatch_mode;
pub mod error;
pub mod ids;
pub mod narrative_event;
pub mod snapshot;

pub use dispatch_mode::DispatchMode;
pub use error::DomainError;
pub use ids::PlayerId;
pub use narrative_event::{NarrativeEventResponse, NarrativeSnippet};
pub use snapshot::{ChoiceTag, DispatchRequest, PlayerNarrativeSnapshot, QuestProgress};
