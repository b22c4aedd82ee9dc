//! MCP stdio server exposing the Rocket.Chat tools.

use crate::config::AppConfig;
use anyhow::Context;
use rc_client::RocketChatClient;
use rc_tools::{RocketChatTools, ToolCall};
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ErrorData, Implementation, ServerCapabilities, ServerInfo},
    schemars::JsonSchema,
    tool, tool_handler, tool_router,
    transport::stdio,
};
// The JsonSchema derive resolves `schemars::` paths through this import.
use rmcp::schemars;
use serde::Deserialize;
use std::sync::Arc;

const INSTRUCTIONS: &str = "Rocket.Chat tools: list users, channels and rooms, look up a user, \
create a channel, read channel history and post messages. Every tool returns plain text.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendMessageParams {
    /// Channel name (e.g. 'general') or channel ID
    pub channel: String,
    /// Message text to send
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetUserInfoParams {
    /// Username to get information about
    pub username: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateChannelParams {
    /// Name of the channel to create
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetChannelMessagesParams {
    /// ID of the room/channel
    pub room_id: String,
    /// Number of messages to retrieve (default: 20, max: 100)
    #[serde(default)]
    pub count: Option<u32>,
}

/// Logs in, then serves tools on stdin/stdout until the client disconnects.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let mut client = RocketChatClient::new(config.client_config())
        .context("invalid rocket.chat connection settings")?;
    client
        .authenticate()
        .await
        .context("failed to initialize rocket.chat client")?;
    tracing::info!(server_url = %client.server_url(), "rocket.chat client ready");

    let server = RocketChatServer::new(RocketChatTools::new(Arc::new(client)));
    tracing::info!("starting mcp server on stdio");
    let service = server
        .serve(stdio())
        .await
        .context("start mcp stdio transport")?;
    let reason = service.waiting().await?;
    tracing::info!(?reason, "mcp server stopped");
    Ok(())
}

#[derive(Clone)]
pub struct RocketChatServer {
    tools: RocketChatTools,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl RocketChatServer {
    pub fn new(tools: RocketChatTools) -> Self {
        Self {
            tools,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List all users available to the user.")]
    async fn list_users(&self) -> Result<CallToolResult, ErrorData> {
        self.respond(ToolCall::ListUsers).await
    }

    #[tool(description = "Send a message to a RocketChat channel.")]
    async fn send_message_in_channel(
        &self,
        Parameters(params): Parameters<SendMessageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.respond(ToolCall::SendMessageInChannel {
            channel: params.channel,
            text: params.text,
        })
        .await
    }

    #[tool(description = "List all channels available to the user.")]
    async fn list_channels(&self) -> Result<CallToolResult, ErrorData> {
        self.respond(ToolCall::ListChannels).await
    }

    #[tool(description = "List all rooms (channels and groups) available to the user.")]
    async fn list_all_rooms(&self) -> Result<CallToolResult, ErrorData> {
        self.respond(ToolCall::ListAllRooms).await
    }

    #[tool(description = "Get information about a specific user.")]
    async fn get_user_info(
        &self,
        Parameters(params): Parameters<GetUserInfoParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.respond(ToolCall::GetUserInfo {
            username: params.username,
        })
        .await
    }

    #[tool(description = "Create a new channel.")]
    async fn create_channel(
        &self,
        Parameters(params): Parameters<CreateChannelParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.respond(ToolCall::CreateChannel { name: params.name })
            .await
    }

    #[tool(description = "Get messages from a specific channel.")]
    async fn get_channel_messages(
        &self,
        Parameters(params): Parameters<GetChannelMessagesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.respond(ToolCall::GetChannelMessages {
            room_id: params.room_id,
            count: params.count,
        })
        .await
    }
}

impl RocketChatServer {
    /// Tool failures are reported as text, never as protocol errors.
    async fn respond(&self, call: ToolCall) -> Result<CallToolResult, ErrorData> {
        let text = self.tools.invoke(call).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for RocketChatServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "rocketchat".to_string(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}
