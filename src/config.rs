use std::{env, time::Duration};

use log::{debug, error, info};

use crate::completion::{DEFAULT_COMPLETION_API_URL, DEFAULT_COMPLETION_MODEL};
use crate::error::{BotError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub completion_api_key: String,
    pub completion_api_url: String,
    pub completion_model: String,
    pub system_role: String,
    pub system_role_alt: Option<String>,
    pub reset_after_idle: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                error!("Failed to load {key} from environment");
                BotError::Config(format!("{key} is not set"))
            })
        };

        let discord_token = required("CHAT_PLATFORM_TOKEN")?;
        let completion_api_key = required("COMPLETION_API_KEY")?;
        let system_role = required("SYSTEM_ROLE")?;
        let reset_after_idle = parse_idle_seconds(&required("RESET_AFTER_IDLE")?)?;

        let system_role_alt = lookup("SYSTEM_ROLE_ALT").filter(|role| !role.trim().is_empty());
        let completion_model =
            lookup("COMPLETION_MODEL").unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string());
        let completion_api_url =
            lookup("COMPLETION_API_URL").unwrap_or_else(|| DEFAULT_COMPLETION_API_URL.to_string());

        info!("Configuration loaded successfully");
        debug!("Discord token length: {} characters", discord_token.len());
        debug!(
            "Completion API key length: {} characters",
            completion_api_key.len()
        );
        debug!("Completion endpoint: {completion_api_url}");
        debug!("Completion model: {completion_model}");
        debug!("System role length: {} characters", system_role.len());
        debug!(
            "Alternate persona: {}",
            if system_role_alt.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
        debug!("Reset after idle: {}s", reset_after_idle.as_secs());

        Ok(Self {
            discord_token,
            completion_api_key,
            completion_api_url,
            completion_model,
            system_role,
            system_role_alt,
            reset_after_idle,
        })
    }
}

fn parse_idle_seconds(raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            error!("Invalid RESET_AFTER_IDLE value '{raw}': {e}");
            BotError::Config(format!(
                "RESET_AFTER_IDLE must be a whole number of seconds, got '{raw}'"
            ))
        })
}
