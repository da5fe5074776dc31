//! Error types shared by the session controller and its collaborators.

use thiserror::Error;

/// Failure reported by a signal driver backend.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("signal device unavailable: {0}")]
    Unavailable(String),

    #[error("signal device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recorder cannot type character {0:?}")]
    UnsupportedCharacter(char),
}

/// Failure reported by a playlist source provider.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{provider} is not reachable at {endpoint}: {source}")]
    Unreachable {
        provider: &'static str,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {provider}: {message}")]
    Payload {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} has no active track")]
    NothingPlaying { provider: &'static str },

    #[error("{0}")]
    Config(String),
}

/// Why a recording session stopped before completing.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session cancelled")]
    Cancelled,

    #[error("the playlist contains no tracks")]
    EmptyTrackList,

    #[error("playlist source error: {0}")]
    Source(#[from] SourceError),

    #[error("signal driver error: {0}")]
    Driver(#[from] DriverError),
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
