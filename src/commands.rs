//! Poise slash commands for inspecting and clearing conversation context.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::bot::Data;
use crate::conversation::ConversationEngine;
use crate::error::{BotError, Result};
use crate::relay::status_line;
use crate::types::{Persona, TurnMetrics};

/// Context type for relay commands.
type Context<'a> = poise::Context<'a, Data, BotError>;

fn get_engine(ctx: Context<'_>, persona: Option<Persona>) -> Result<Arc<ConversationEngine>> {
    let persona = persona.unwrap_or(Persona::Default);
    ctx.data()
        .personas()
        .get(persona)
        .cloned()
        .ok_or(BotError::PersonaNotConfigured(persona))
}

/// Clear a persona's conversation context.
#[poise::command(slash_command)]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "Persona to clear (default if omitted)"] persona: Option<Persona>,
) -> Result<()> {
    let engine = get_engine(ctx, persona)?;
    let dropped = engine.reset().await;

    ctx.say(format!(
        "✅ Removed {dropped} turns from the **{}** persona's context!",
        engine.persona()
    ))
    .await?;
    Ok(())
}

fn stats_message(
    persona: Persona,
    system_role: &str,
    history_len: usize,
    last_activity: DateTime<Utc>,
    metrics: Option<&TurnMetrics>,
) -> String {
    let summary = match metrics {
        Some(metrics) => status_line(metrics, history_len),
        None => format!("> No completed turns yet // 🔮 {history_len} contexts"),
    };
    format!(
        "**{persona}** persona, last active {}\nSystem role: {} characters\n{summary}",
        last_activity.format("%Y-%m-%d %H:%M:%S UTC"),
        system_role.chars().count()
    )
}

/// Show context size and the last turn's usage for a persona.
#[poise::command(slash_command)]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "Persona to inspect (default if omitted)"] persona: Option<Persona>,
) -> Result<()> {
    let engine = get_engine(ctx, persona)?;
    let system_role = engine.context().await;
    let history_len = engine.history_len().await;
    let last_activity = engine.last_activity().await;
    let metrics = engine.last_metrics().await;

    ctx.say(stats_message(
        engine.persona(),
        &system_role,
        history_len,
        last_activity,
        metrics.as_ref(),
    ))
    .await?;
    Ok(())
}

/// Get available relay commands.
#[must_use]
pub fn relay_commands() -> Vec<poise::Command<Data, BotError>> {
    vec![clear(), stats()]
}
