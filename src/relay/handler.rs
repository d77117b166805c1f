//! Main handler for inbound channel messages.

use log::{debug, error, info};
use poise::serenity_prelude::{Context, Message as SerenityMessage};

use crate::bot::Data;
use crate::chunker::{DISCORD_MESSAGE_LIMIT, split_for_delivery};
use crate::conversation::ChatReply;
use crate::error::Result;
use crate::types::TurnMetrics;

use super::delivery::{send_notice, send_segments};
use super::route::{InboundMessage, Route, route};

const TOO_SHORT_NOTICE: &str = "> ⚠️  Message too short!";
const RESET_NOTICE: &str = "> ✅  Chat history cleared!";

/// One-line summary of a turn's latency, token usage and context size.
#[must_use]
pub fn status_line(metrics: &TurnMetrics, history_len: usize) -> String {
    format!(
        "> `🕒 {:.2}s // 💸 {}/{}/{} (p/c/U) // 🔮 {history_len} contexts`",
        metrics.latency_secs(),
        metrics.prompt_tokens,
        metrics.completion_tokens,
        metrics.total_tokens,
    )
}

fn with_status_footer(reply: &ChatReply) -> String {
    format!(
        "{}\n\n{}",
        reply.text,
        status_line(&reply.metrics, reply.history_len)
    )
}

/// Filter an inbound message and, when it is meant for the bot, relay it.
pub async fn handle_message(
    ctx: &Context,
    new_message: &SerenityMessage,
    data: &Data,
) -> Result<()> {
    let bot_user_id = ctx.cache.current_user().id;
    let inbound = InboundMessage {
        author_is_self: new_message.author.id == bot_user_id,
        author_is_bot: new_message.author.bot,
        is_reply_to_other: new_message
            .referenced_message
            .as_ref()
            .is_some_and(|parent| parent.author.id != bot_user_id),
        text: new_message.content.clone(),
        clean_text: new_message.content_safe(&ctx.cache),
    };

    let personas = data.personas();
    let (persona, text, reset_first) = match route(&inbound, personas.has_alternate()) {
        Route::Ignore => return Ok(()),
        Route::TooShort => {
            debug!("Message from {} too short", new_message.author.tag());
            return send_notice(ctx, new_message, TOO_SHORT_NOTICE).await;
        }
        Route::Reset => {
            personas.default_engine().reset().await;
            return send_notice(ctx, new_message, RESET_NOTICE).await;
        }
        Route::Chat {
            persona,
            text,
            reset_first,
        } => (persona, text, reset_first),
    };

    info!(
        "Received message from {} in channel {} for {persona} persona",
        new_message.author.tag(),
        new_message.channel_id,
    );

    let engine = personas
        .get(persona)
        .unwrap_or_else(|| personas.default_engine());

    let typing = new_message.channel_id.start_typing(&ctx.http);
    let result = if reset_first {
        engine.chat_fresh(&text).await
    } else {
        engine.chat(&text).await
    };
    drop(typing);

    match result {
        Ok(reply) => {
            let body = with_status_footer(&reply);
            let segments = split_for_delivery(&body, DISCORD_MESSAGE_LIMIT);
            send_segments(ctx, new_message, segments).await
        }
        Err(e) => {
            error!(
                "Error processing message from {}: {}",
                new_message.author.tag(),
                e
            );
            send_notice(ctx, new_message, e.user_message()).await
        }
    }
}
