/// `!`-prefixed chat command parsing
pub mod commands;
/// Message handlers mapping commands onto the search controller
pub mod handlers;
/// Delivery sink posting image links to a chat
pub mod sink;
/// View layer (user-facing texts)
pub mod views;

pub use commands::ChatCommand;
pub use sink::TelegramSink;
