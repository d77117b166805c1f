pub mod bot;
pub mod chunker;
pub mod commands;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod reaper;
pub mod relay;
pub mod types;

pub use bot::run;
