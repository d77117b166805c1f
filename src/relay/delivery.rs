//! Ordered delivery of reply segments to Discord.

use std::time::Duration;

use log::{debug, info};
use poise::serenity_prelude::{
    Context, CreateAllowedMentions, CreateMessage, Message as SerenityMessage,
};

use crate::error::Result;

/// Pause between consecutive segments of one reply.
const SEGMENT_DELAY: Duration = Duration::from_secs(1);

/// Reply to `reply_to` with `content`, without pinging its author.
pub async fn send_notice(
    ctx: &Context,
    reply_to: &SerenityMessage,
    content: impl Into<String>,
) -> Result<()> {
    let message = CreateMessage::new()
        .content(content)
        .reference_message(reply_to)
        .allowed_mentions(CreateAllowedMentions::new().replied_user(false));

    reply_to
        .channel_id
        .send_message(&ctx.http, message)
        .await?;
    Ok(())
}

/// Send every segment in order as a reply to `reply_to`.
pub async fn send_segments(
    ctx: &Context,
    reply_to: &SerenityMessage,
    segments: Vec<String>,
) -> Result<()> {
    let total = segments.len();
    for (idx, segment) in segments.into_iter().enumerate() {
        if idx > 0 {
            tokio::time::sleep(SEGMENT_DELAY).await;
        }
        debug!("Sending segment {}/{total}", idx + 1);
        send_notice(ctx, reply_to, segment).await?;
    }

    info!(
        "Replied to {} in channel {} ({total} segment(s))",
        reply_to.author.tag(),
        reply_to.channel_id
    );
    Ok(())
}
