//! Financial Query Orchestrator
//!
//! Answers free-text financial questions by:
//! - Classifying the query into an intent (quote, history, news, analysis, explain)
//! - Routing it to the matching data collaborator under a timeout
//! - Gating semantic retrieval on a confidence threshold before grounding generation
//! - Composing the final text, with fixed fallbacks when data is missing
//!
//! A scheduled market brief summarizes index quotes and market headlines.
//!
//! FLOW:
//! QUERY → CLASSIFY → DISPATCH → (COLLABORATORS | RETRIEVE → GATE → GENERATE) → COMPOSE

pub mod agent;
pub mod api;
pub mod brief;
pub mod classifier;
pub mod composer;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod retrieval;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::{BriefOutcome, Orchestrator};
pub use classifier::IntentClassifier;
pub use config::Settings;
pub use models::*;
