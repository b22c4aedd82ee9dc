//! Response records for the Rocket.Chat REST endpoints this crate calls.
//!
//! Every field the server may omit is an `Option`; placeholder text for missing
//! values belongs to whoever renders these records.

use chrono::DateTime;
use serde::Deserialize;

/// Common `{ "success": bool, "error": "..." }` envelope around an endpoint payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<LoginData>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(rename = "authToken")]
    pub auth_token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersPayload {
    #[serde(default)]
    pub users: Option<Vec<User>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfoPayload {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsPayload {
    #[serde(default)]
    pub channels: Option<Vec<Room>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupsPayload {
    #[serde(default)]
    pub groups: Option<Vec<Room>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesPayload {
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChannelPayload {
    #[serde(default)]
    pub channel: Option<Room>,
}

/// Only the envelope matters for a post; the echoed message is not decoded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMessagePayload {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub emails: Option<Vec<Email>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl User {
    /// Address of the first registered email, if any.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .as_deref()
            .and_then(|emails| emails.first())
            .and_then(|email| email.address.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Email {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
}

/// A channel or a private group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Room {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ts: Option<MessageTimestamp>,
    #[serde(rename = "u", default)]
    pub author: Option<MessageAuthor>,
    #[serde(rename = "msg", default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageAuthor {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// REST responses carry ISO strings; realtime-style payloads wrap the value in `$date`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageTimestamp {
    Iso(String),
    Extended {
        #[serde(rename = "$date")]
        date: serde_json::Value,
    },
}

impl MessageTimestamp {
    /// Display form: ISO strings pass through, epoch milliseconds become RFC 3339.
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Iso(value) => Some(value.clone()),
            Self::Extended { date } => match date {
                serde_json::Value::String(value) => Some(value.clone()),
                serde_json::Value::Number(millis) => millis
                    .as_i64()
                    .and_then(DateTime::from_timestamp_millis)
                    .map(|ts| ts.to_rfc3339()),
                _ => None,
            },
        }
    }
}
