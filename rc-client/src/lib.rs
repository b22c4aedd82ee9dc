//! Rocket.Chat REST session client.
//!
//! Holds the server identity and credentials, logs in, and performs
//! authenticated `/api/v1` calls.

mod client;
mod error;
pub mod types;

pub use client::{ApiRequest, ClientConfig, Credentials, RocketChatClient, Session};
pub use error::{Cause, ClientError, Result};
