//! Common types used throughout the relaygpt bot.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Role of a turn in the conversation.
///
/// Maps to completion API message roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Persona instructions, always the first turn
    System,
    /// Message from the human user
    User,
    /// Message from the AI assistant
    Assistant,
}

/// One role-tagged message unit in a conversation.
///
/// Serializes to the `{role, content}` shape the completion API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Which configured system role a conversation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, poise::ChoiceParameter)]
#[strum(serialize_all = "lowercase")]
pub enum Persona {
    #[name = "default"]
    Default,
    #[name = "alternate"]
    Alternate,
}

/// Timing and token usage of the most recent completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnMetrics {
    pub latency: Duration,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TurnMetrics {
    #[must_use]
    pub fn latency_secs(&self) -> f64 {
        self.latency.as_secs_f64()
    }
}
