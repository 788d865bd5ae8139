//! Infrastructure layer - adapters behind the engine's ports.
//!
//! - `fixtures`/`sandbox`: offline dispatch from a fixture document
//! - `gemini`: live dispatch over the generateContent REST API
//! - `rate_limited`: admission control around either client

pub mod clock;
pub mod config;
pub mod fixtures;
pub mod gemini;
pub mod ports;
pub mod rate_limited;
pub mod sandbox;
pub mod telemetry;
