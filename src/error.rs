use reqwest::StatusCode;
use thiserror::Error;

use crate::types::Persona;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Serenity error: {0}")]
    Serenity(Box<poise::serenity_prelude::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Completion API error ({status}): {message}")]
    CompletionApi {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Completion response error: {0}")]
    CompletionResponse(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Persona '{0}' is not configured")]
    PersonaNotConfigured(Persona),
}

impl From<poise::serenity_prelude::Error> for BotError {
    fn from(err: poise::serenity_prelude::Error) -> Self {
        BotError::Serenity(Box::new(err))
    }
}

impl BotError {
    /// Whether the error came from the remote completion round-trip.
    #[must_use]
    pub fn is_completion_failure(&self) -> bool {
        matches!(
            self,
            BotError::CompletionApi { .. } | BotError::CompletionResponse(_) | BotError::Reqwest(_)
        )
    }

    /// Returns a user-friendly error message suitable for displaying in Discord
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            BotError::Serenity(_) => {
                "⚠️ Sorry, I'm having trouble communicating with Discord right now. Please try again later.".to_string()
            }
            BotError::Config(_) => {
                "⚠️ Sorry, there's a configuration issue on my end. Please contact the bot administrator.".to_string()
            }
            BotError::CompletionApi { status, .. } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    "⚠️ Sorry, I'm having authentication issues with my AI service. Please contact the bot administrator.".to_string()
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    "⚠️ Sorry, I've hit my rate limit. Please try again in a few moments.".to_string()
                }
                status if status.is_server_error() => {
                    "⚠️ Sorry, the AI service is experiencing issues right now. Please try again later.".to_string()
                }
                status if status.is_client_error() => {
                    "⚠️ Sorry, there was an issue with my request to the AI service. Please try again or contact the bot administrator.".to_string()
                }
                _ => {
                    "⚠️ Sorry, I'm having trouble connecting to my AI service. Please try again later.".to_string()
                }
            },
            BotError::CompletionResponse(_) => {
                "⚠️ Sorry, I received an unexpected response from my AI service. Please try again.".to_string()
            }
            BotError::Reqwest(_) => {
                "⚠️ Sorry, I'm having network issues. Please try again in a moment.".to_string()
            }
            BotError::PersonaNotConfigured(persona) => {
                format!("⚠️ The {persona} persona is not configured on this bot.")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
