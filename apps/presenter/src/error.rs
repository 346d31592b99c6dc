use thiserror::Error;

use crate::stream::{ConnectionEvent, ConnectionState};

pub type Result<T> = std::result::Result<T, PresenterError>;

#[derive(Debug, Error)]
pub enum PresenterError {
    #[error("invalid coordinates for {record}: {reason}")]
    InvalidCoordinates { record: String, reason: String },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("element #{0} not found")]
    MissingElement(String),

    #[error("unknown stream channel {0}")]
    UnknownChannel(String),

    #[error("invalid stream transition from {from} with event {event}")]
    InvalidTransition {
        from: ConnectionState,
        event: ConnectionEvent,
    },
}

impl PresenterError {
    pub fn parse(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            what: what.into(),
            source,
        }
    }

    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}
