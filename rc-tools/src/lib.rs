//! Rocket.Chat tools exposed to MCP clients.
//!
//! Each tool is a typed operation over the session client; `RocketChatTools::invoke`
//! is the string-returning edge the transport calls.

mod dispatch;
mod error;
pub mod render;

pub use dispatch::{
    CreatedChannel, DEFAULT_MESSAGE_COUNT, MAX_MESSAGE_COUNT, NOT_INITIALIZED, RocketChatTools,
    RoomListing, SentMessage, ToolCall, effective_message_count,
};
pub use error::{Result, ToolError};
