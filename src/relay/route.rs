//! Deciding what to do with an inbound chat message.

use crate::types::Persona;

/// Messages starting with this are not meant for the bot.
pub const IGNORE_MARKER: char = '-';

/// Prefix that routes a message to the alternate persona.
pub const ALTERNATE_MARKER: char = '^';

/// Prefixes that clear the default persona's context.
pub const RESET_COMMANDS: [&str; 2] = ["*clear context", "*clear history"];

/// Shortest message that is forwarded, in characters.
pub const MIN_MESSAGE_CHARS: usize = 2;

/// Messages with fewer space-separated tokens start a fresh conversation.
pub const SHORT_MESSAGE_TOKENS: usize = 3;

/// Characters trimmed from both ends before a message becomes a user turn.
const TRIM_CHARS: [char; 7] = ['\r', '\n', ' ', '>', '*', '-', '^'];

/// Platform-neutral view of an inbound message.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub author_is_self: bool,
    pub author_is_bot: bool,
    /// Replies to a message the bot did not write.
    pub is_reply_to_other: bool,
    /// Content as sent, mentions in their `<@id>` form. All routing checks
    /// look at this.
    pub text: String,
    /// Content with mentions rendered as names; becomes the user turn.
    pub clean_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Drop silently.
    Ignore,
    /// Answer with a warning and stop.
    TooShort,
    /// Clear the default persona and confirm.
    Reset,
    /// Forward `text` to `persona`, resetting it first when `reset_first`.
    Chat {
        persona: Persona,
        text: String,
        reset_first: bool,
    },
}

#[must_use]
pub fn route(message: &InboundMessage, alternate_enabled: bool) -> Route {
    if message.author_is_self || message.author_is_bot || message.is_reply_to_other {
        return Route::Ignore;
    }

    let raw = message.text.as_str();
    if raw.starts_with(IGNORE_MARKER) {
        return Route::Ignore;
    }
    if raw.chars().count() < MIN_MESSAGE_CHARS {
        return Route::TooShort;
    }
    if RESET_COMMANDS.iter().any(|command| raw.starts_with(command)) {
        return Route::Reset;
    }

    let persona = if alternate_enabled && raw.starts_with(ALTERNATE_MARKER) {
        Persona::Alternate
    } else {
        Persona::Default
    };

    let text = message.clean_text.trim_matches(TRIM_CHARS.as_slice());
    if text.is_empty() {
        return Route::TooShort;
    }

    Route::Chat {
        persona,
        text: text.to_string(),
        reset_first: raw.split(' ').count() < SHORT_MESSAGE_TOKENS,
    }
}
