//! Discord bot wiring: configuration, personas, reaper and event handling.

use std::sync::Arc;

use log::{debug, error, info, warn};
use poise::{
    Framework, FrameworkError, FrameworkOptions, builtins,
    serenity_prelude::{ClientBuilder, Context, FullEvent, GatewayIntents},
};

use crate::commands::relay_commands;
use crate::completion::{CompletionClient, OpenAiClient};
use crate::config::Config;
use crate::conversation::Personas;
use crate::error::{BotError, Result};
use crate::reaper::IdleReaper;
use crate::relay::handle_message;

/// Shared state handed to every event and command.
pub struct Data {
    personas: Personas,
}

impl Data {
    #[must_use]
    pub fn personas(&self) -> &Personas {
        &self.personas
    }
}

/// Run the Discord bot.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    debug!("Initializing completion client");
    let completion_client: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(
        config.completion_api_key.clone(),
        config.completion_api_url.clone(),
        config.completion_model.clone(),
    ));

    let personas = Personas::new(
        &completion_client,
        &config.system_role,
        config.system_role_alt.as_deref(),
    );
    info!(
        "Personas ready (alternate {})",
        if personas.has_alternate() {
            "enabled"
        } else {
            "disabled"
        }
    );

    IdleReaper::new(personas.clone(), config.reset_after_idle).spawn();

    debug!("Setting up gateway intents");
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    debug!("Building framework");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: relay_commands(),
            event_handler: |ctx, event, _framework, data| Box::pin(event_handler(ctx, event, data)),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("{} has connected to Discord!", ready.user.name);
                debug!("Registering commands globally");
                builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully");
                Ok(Data { personas })
            })
        })
        .build();

    debug!("Creating Discord client");
    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    Ok(())
}

async fn event_handler(ctx: &Context, event: &FullEvent, data: &Data) -> Result<()> {
    if let FullEvent::Message { new_message } = event {
        handle_message(ctx, new_message, data).await?;
    }
    Ok(())
}

async fn on_error(error: FrameworkError<'_, Data, BotError>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!("Command '{}' failed: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(error.user_message()).await {
                warn!("Failed to report command error: {e}");
            }
        }
        other => {
            if let Err(e) = builtins::on_error(other).await {
                error!("Error while handling framework error: {e}");
            }
        }
    }
}
