use thiserror::Error;

/// Failure taxonomy shared by the gateway, the upload coordinator and the
/// workflow controller. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("could not reach server: {0}")]
    Transport(String),
    #[error("server returned {status} - {}", .message.as_deref().unwrap_or("no message from server"))]
    Server { status: u16, message: Option<String> },
    #[error("unexpected response from server: {0}")]
    Parse(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Parse(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}
