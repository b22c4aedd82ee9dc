use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        cause: Option<Cause>,
    },

    #[error("{method} {endpoint} failed: {message}")]
    Request {
        method: String,
        endpoint: String,
        message: String,
        cause: Option<Cause>,
    },
}

/// Underlying failure. Its text is already part of the owning error's message,
/// so it is kept as a plain field rather than exposed as `source()`.
#[derive(Debug, Error)]
pub enum Cause {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl ClientError {
    pub(crate) fn authentication(cause: impl Into<Cause>) -> Self {
        let cause = cause.into();
        Self::Authentication {
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    pub(crate) fn request(method: &str, endpoint: &str, cause: impl Into<Cause>) -> Self {
        let cause = cause.into();
        Self::Request {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            message: cause.to_string(),
            cause: Some(cause),
        }
    }
}
