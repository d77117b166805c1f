//! Relaying Discord messages to the conversation engines and back.

mod delivery;
mod handler;
mod route;

pub use delivery::{send_notice, send_segments};
pub use handler::{handle_message, status_line};
pub use route::{InboundMessage, Route, route};
