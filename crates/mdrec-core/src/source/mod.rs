//! Playlist sources.
//!
//! A playlist source supplies the ordered track labels for a session and
//! reports live playback timing while recording. Two providers exist:
//!
//! ```text
//! PlaylistSource trait
//!   ├── BeefwebSource  - foobar2000 with the beefweb HTTP plugin
//!   └── SpotifySource  - Spotify Web API (playlist URI + active device)
//! ```
//!
//! The provider is picked once from configuration via [`PlaylistProvider`].

mod beefweb;
mod spotify;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SourceError;

pub use beefweb::{BeefwebSource, DEFAULT_BEEFWEB_URL};
pub use spotify::{SpotifySource, parse_playlist_id};

/// Upper bound for the connectivity probe
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound for regular requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A resolved display string for one track
pub type TrackLabel = String;

/// Parameters for fetching the track list
#[derive(Debug, Clone, Default)]
pub struct TrackListRequest {
    /// Label template, e.g. `%artist% - %title%`
    pub template: String,
    /// Language preference for localized metadata (e.g. `ja`)
    pub language_hint: Option<String>,
}

/// Playback commands sent to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Switch to sequential playback and start from the first playlist item
    StartFromFirst,
    Play,
    Pause,
    Stop,
}

/// Ordered track metadata and live playback timing.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Provider identifier for logging
    fn name(&self) -> &'static str;

    /// Fail fast (within [`CONNECTIVITY_TIMEOUT`]) if the player is unreachable
    async fn check_connectivity(&self) -> Result<(), SourceError>;

    async fn fetch_track_list(
        &self,
        request: &TrackListRequest,
    ) -> Result<Vec<TrackLabel>, SourceError>;

    /// Seconds left in the track that is currently playing
    async fn current_track_remaining_secs(&self) -> Result<f64, SourceError>;

    async fn set_playback_state(&self, state: PlaybackState) -> Result<(), SourceError>;
}

/// Which playlist provider a session uses
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistProvider {
    Beefweb { base_url: String },
    Spotify { playlist_uri: String, token: String },
}

impl PlaylistProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaylistProvider::Beefweb { .. } => "foobar2000 (beefweb)",
            PlaylistProvider::Spotify { .. } => "Spotify",
        }
    }

    /// Construct the provider implementation
    pub fn build(&self) -> Result<Box<dyn PlaylistSource>, SourceError> {
        match self {
            PlaylistProvider::Beefweb { base_url } => Ok(Box::new(BeefwebSource::new(base_url)?)),
            PlaylistProvider::Spotify {
                playlist_uri,
                token,
            } => Ok(Box::new(SpotifySource::new(playlist_uri, token)?)),
        }
    }
}

/// Shared HTTP client with the request timeout applied
pub(crate) fn http_client() -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SourceError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Validate and normalize an `http(s)://host[:port]` base URL
pub(crate) fn normalize_base_url(raw: &str, what: &str) -> Result<String, SourceError> {
    let trimmed = raw.trim();
    let after_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| {
            SourceError::Config(format!(
                "Invalid {what} URL: must start with http:// or https://\nGot: {trimmed}"
            ))
        })?;
    if after_scheme.is_empty() || after_scheme.starts_with('/') {
        return Err(SourceError::Config(format!(
            "Invalid {what} URL: missing host\nGot: {trimmed}"
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url(" http://localhost:8880/ ", "beefweb").unwrap(),
            "http://localhost:8880"
        );
        assert!(normalize_base_url("localhost:8880", "beefweb").is_err());
        assert!(normalize_base_url("https:///api", "beefweb").is_err());
    }

    #[test]
    fn test_provider_build_rejects_bad_config() {
        let provider = PlaylistProvider::Beefweb {
            base_url: "ftp://nas".into(),
        };
        assert!(provider.build().is_err());

        let provider = PlaylistProvider::Spotify {
            playlist_uri: "spotify:album:123".into(),
            token: "t".into(),
        };
        assert!(matches!(provider.build(), Err(SourceError::Config(_))));
    }
}
