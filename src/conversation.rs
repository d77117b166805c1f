//! Per-persona conversation buffers and the turn-taking engine.

mod engine;
mod personas;
mod state;

pub use engine::{ChatReply, ConversationEngine};
pub use personas::Personas;
pub use state::ConversationState;
