use crate::error::{Result, ToolError};
use crate::render;
use rc_client::RocketChatClient;
use rc_client::types::{ApiResponse, Message, Room, User};
use std::sync::Arc;

pub const NOT_INITIALIZED: &str = "RocketChat client not initialized";
pub const DEFAULT_MESSAGE_COUNT: u32 = 20;
pub const MAX_MESSAGE_COUNT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedChannel {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomListing {
    pub channels: Vec<Room>,
    pub groups: Vec<Room>,
}

/// One incoming tool invocation with its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ListUsers,
    SendMessageInChannel { channel: String, text: String },
    ListChannels,
    ListAllRooms,
    GetUserInfo { username: String },
    CreateChannel { name: String },
    GetChannelMessages { room_id: String, count: Option<u32> },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListUsers => "list_users",
            Self::SendMessageInChannel { .. } => "send_message_in_channel",
            Self::ListChannels => "list_channels",
            Self::ListAllRooms => "list_all_rooms",
            Self::GetUserInfo { .. } => "get_user_info",
            Self::CreateChannel { .. } => "create_channel",
            Self::GetChannelMessages { .. } => "get_channel_messages",
        }
    }

    /// Completes "Failed to ..." when the server reports `success: false`.
    fn failed_to(&self) -> &'static str {
        match self {
            Self::ListUsers => "list users",
            Self::SendMessageInChannel { .. } => "send message",
            Self::ListChannels => "list channels",
            Self::ListAllRooms => "list rooms",
            Self::GetUserInfo { .. } => "get user info",
            Self::CreateChannel { .. } => "create channel",
            Self::GetChannelMessages { .. } => "get messages",
        }
    }

    /// Completes "Error ..." when the call itself failed.
    fn error_while(&self) -> &'static str {
        match self {
            Self::ListUsers => "listing users",
            Self::SendMessageInChannel { .. } => "sending message",
            Self::ListChannels => "listing channels",
            Self::ListAllRooms => "listing rooms",
            Self::GetUserInfo { .. } => "getting user info",
            Self::CreateChannel { .. } => "creating channel",
            Self::GetChannelMessages { .. } => "getting messages",
        }
    }

    fn default_api_error(&self) -> &'static str {
        match self {
            Self::GetUserInfo { .. } => "User not found",
            _ => "Unknown error",
        }
    }
}

/// Tool dispatch facade over an optional session handle.
#[derive(Debug, Clone, Default)]
pub struct RocketChatTools {
    client: Option<Arc<RocketChatClient>>,
}

impl RocketChatTools {
    pub fn new(client: Arc<RocketChatClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn uninitialized() -> Self {
        Self { client: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    /// Runs a tool and renders its outcome. Never fails: every error becomes text.
    #[tracing::instrument(level = "info", skip_all, fields(tool = call.name()))]
    pub async fn invoke(&self, call: ToolCall) -> String {
        let outcome = match &call {
            ToolCall::ListUsers => self.list_users().await.map(|users| render::users(&users)),
            ToolCall::SendMessageInChannel { channel, text } => self
                .send_message_in_channel(channel, text)
                .await
                .map(|sent| render::sent_message(&sent)),
            ToolCall::ListChannels => self
                .list_channels()
                .await
                .map(|channels| render::channels(&channels)),
            ToolCall::ListAllRooms => self
                .list_all_rooms()
                .await
                .map(|listing| render::rooms(&listing)),
            ToolCall::GetUserInfo { username } => self
                .get_user_info(username)
                .await
                .map(|user| render::user_info(&user)),
            ToolCall::CreateChannel { name } => self
                .create_channel(name)
                .await
                .map(|created| render::created_channel(&created)),
            ToolCall::GetChannelMessages { room_id, count } => self
                .get_channel_messages(room_id, *count)
                .await
                .map(|messages| render::messages(&messages)),
        };
        finish(&call, outcome)
    }

    #[tracing::instrument(level = "info", skip_all)]
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let response = self.client()?.users_list().await?;
        let users = payload_of(response, |payload| payload.users)?;
        tracing::info!(count = users.len(), "retrieved users");
        Ok(users)
    }

    #[tracing::instrument(level = "info", skip(self, text), fields(text_len = text.len()))]
    pub async fn send_message_in_channel(&self, channel: &str, text: &str) -> Result<SentMessage> {
        let response = self.client()?.chat_post_message(channel, text).await?;
        ensure_success(&response)?;
        tracing::info!("message sent");
        Ok(SentMessage {
            channel: channel.to_string(),
        })
    }

    #[tracing::instrument(level = "info", skip_all)]
    pub async fn list_channels(&self) -> Result<Vec<Room>> {
        let response = self.client()?.channels_list().await?;
        let channels = payload_of(response, |payload| payload.channels)?;
        tracing::info!(count = channels.len(), "retrieved channels");
        Ok(channels)
    }

    /// Channels and private groups together. Fails as a whole if either half fails.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn list_all_rooms(&self) -> Result<RoomListing> {
        let client = self.client()?;
        let (channels, groups) = tokio::try_join!(client.channels_list(), client.groups_list())?;
        let channels = payload_of(channels, |payload| payload.channels).inspect_err(|error| {
            tracing::warn!(%error, "channels.list half of room listing failed");
        })?;
        let groups = payload_of(groups, |payload| payload.groups).inspect_err(|error| {
            tracing::warn!(%error, "groups.list half of room listing failed");
        })?;
        tracing::info!(
            channels = channels.len(),
            groups = groups.len(),
            "retrieved rooms"
        );
        Ok(RoomListing { channels, groups })
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn get_user_info(&self, username: &str) -> Result<User> {
        let response = self.client()?.users_info(username).await?;
        payload_of(response, |payload| payload.user)
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn create_channel(&self, name: &str) -> Result<CreatedChannel> {
        let response = self.client()?.channels_create(name).await?;
        ensure_success(&response)?;
        let id = response.payload.channel.and_then(|channel| channel.id);
        tracing::info!(channel_id = ?id, "channel created");
        Ok(CreatedChannel {
            name: name.to_string(),
            id,
        })
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn get_channel_messages(
        &self,
        room_id: &str,
        count: Option<u32>,
    ) -> Result<Vec<Message>> {
        let client = self.client()?;
        let count = effective_message_count(count);
        let response = client.channels_messages(room_id, count).await?;
        let messages = payload_of(response, |payload| payload.messages)?;
        tracing::info!(count = messages.len(), "retrieved messages");
        Ok(messages)
    }

    fn client(&self) -> Result<&RocketChatClient> {
        self.client.as_deref().ok_or(ToolError::NotInitialized)
    }
}

/// Requested history size, defaulted and capped. Other values pass through as given.
pub fn effective_message_count(count: Option<u32>) -> u32 {
    count.unwrap_or(DEFAULT_MESSAGE_COUNT).min(MAX_MESSAGE_COUNT)
}

fn ensure_success<T>(response: &ApiResponse<T>) -> Result<()> {
    if response.success {
        return Ok(());
    }
    Err(ToolError::Api {
        error: response.error.clone(),
    })
}

fn payload_of<T, U>(response: ApiResponse<T>, pick: impl FnOnce(T) -> Option<U>) -> Result<U> {
    ensure_success(&response)?;
    let ApiResponse { error, payload, .. } = response;
    pick(payload).ok_or(ToolError::Api { error })
}

fn finish(call: &ToolCall, outcome: Result<String>) -> String {
    match outcome {
        Ok(text) => text,
        Err(ToolError::NotInitialized) => {
            tracing::error!(tool = call.name(), "{NOT_INITIALIZED}");
            NOT_INITIALIZED.to_string()
        }
        Err(ToolError::Api { error }) => {
            let error = error.unwrap_or_else(|| call.default_api_error().to_string());
            tracing::warn!(tool = call.name(), %error, "tool call rejected by server");
            format!("Failed to {}: {error}", call.failed_to())
        }
        Err(ToolError::Client(error)) => {
            tracing::error!(tool = call.name(), %error, "tool call failed");
            format!("Error {}: {error}", call.error_while())
        }
    }
}
