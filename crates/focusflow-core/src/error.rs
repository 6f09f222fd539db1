use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not logged in")]
    Unauthenticated,

    #[error("request rejected by server (status {status})")]
    Unauthorized { status: u16 },

    #[error("server returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("session store error: {0}")]
    Session(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Auth failures (missing token or rejected token).
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Unauthorized { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_classification() {
        assert!(ClientError::Unauthenticated.is_auth());
        assert!(ClientError::Unauthorized { status: 401 }.is_auth());
        assert!(!ClientError::Transport("refused".into()).is_auth());
        assert!(ClientError::validation("empty").is_validation());
    }

    #[test]
    fn http_error_message_carries_status_and_body() {
        let err = ClientError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "server returned status 500: boom");
    }
}
