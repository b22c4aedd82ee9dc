use rc_client::ClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("RocketChat client not initialized")]
    NotInitialized,

    /// The server answered but reported `success: false` or left out the payload.
    #[error("{}", .error.as_deref().unwrap_or("Unknown error"))]
    Api { error: Option<String> },

    #[error(transparent)]
    Client(#[from] ClientError),
}
