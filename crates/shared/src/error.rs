use serde::{Deserialize, Serialize};

/// Error body the backend may attach to a non-2xx response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Extracts the server message from a raw error body. Malformed bodies and
    /// blank messages yield `None`.
    pub fn message_from_body(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ApiError>(body)
            .ok()
            .and_then(|error| error.message)
            .filter(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_body_ignores_malformed_bodies() {
        assert_eq!(
            ApiError::message_from_body(br#"{"message":"disk full"}"#).as_deref(),
            Some("disk full")
        );
        assert_eq!(ApiError::message_from_body(b"<html>502</html>"), None);
        assert_eq!(ApiError::message_from_body(br#"{"detail":"x"}"#), None);
        assert_eq!(ApiError::message_from_body(br#"{"message":"  "}"#), None);
    }
}
