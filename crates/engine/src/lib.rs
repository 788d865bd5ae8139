//! Buttonburgh narrative director.
//!
//! Turns a player's narrative snapshot into the next chapter event, served
//! either from local fixtures (sandbox) or from the Gemini API (live).
//!
//! ## Structure
//!
//! - `use_cases/` - Prompt assembly and dispatch
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
