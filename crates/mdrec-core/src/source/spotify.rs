//! Spotify Web API playlist source.
//!
//! Plays a playlist on the user's active Spotify Connect device. Requires an
//! OAuth access token with the `playlist-read-private`,
//! `user-read-playback-state` and `user-modify-playback-state` scopes.

use async_trait::async_trait;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{
    CONNECTIVITY_TIMEOUT, PlaybackState, PlaylistSource, TrackLabel, TrackListRequest,
    http_client,
};
use crate::error::SourceError;
use crate::label::{self, TrackFields};

const API_BASE: &str = "https://api.spotify.com/v1";
const PROVIDER: &str = "spotify";
const PAGE_LIMIT: u32 = 100;

#[derive(Deserialize, Debug)]
struct TracksPage {
    items: Vec<PlaylistTrack>,
    next: Option<String>,
}

#[derive(Deserialize, Debug)]
struct PlaylistTrack {
    track: Option<Track>,
}

#[derive(Deserialize, Debug)]
struct Track {
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    album: Option<Album>,
    #[serde(default)]
    track_number: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct Artist {
    name: String,
}

#[derive(Deserialize, Debug)]
struct Album {
    name: String,
}

#[derive(Deserialize, Debug)]
struct PlayerResponse {
    progress_ms: Option<u64>,
    item: Option<PlayingItem>,
}

#[derive(Deserialize, Debug)]
struct PlayingItem {
    duration_ms: u64,
}

/// Extract the playlist id from a `spotify:playlist:<id>` URI or an
/// `https://open.spotify.com/playlist/<id>` link.
pub fn parse_playlist_id(uri: &str) -> Result<String, SourceError> {
    let trimmed = uri.trim();
    let id = if let Some(id) = trimmed.strip_prefix("spotify:playlist:") {
        id
    } else if let Some(rest) = trimmed
        .strip_prefix("https://open.spotify.com/")
        .or_else(|| trimmed.strip_prefix("http://open.spotify.com/"))
    {
        let path = rest.split(['?', '#']).next().unwrap_or("");
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        // Localized links carry a prefix such as `intl-de/`
        let mut kind = segments.next();
        if kind.is_some_and(|k| k.starts_with("intl-")) {
            kind = segments.next();
        }
        match (kind, segments.next()) {
            (Some("playlist"), Some(id)) => id,
            _ => "",
        }
    } else {
        ""
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SourceError::Config(format!(
            "Not a Spotify playlist URI: {trimmed}\n\
             Expected spotify:playlist:<id> or https://open.spotify.com/playlist/<id>"
        )));
    }
    Ok(id.to_string())
}

/// Playlist source backed by the Spotify Web API
#[derive(Debug, Clone)]
pub struct SpotifySource {
    playlist_id: String,
    token: String,
    client: reqwest::Client,
}

impl SpotifySource {
    pub fn new(playlist_uri: &str, token: &str) -> Result<Self, SourceError> {
        if token.trim().is_empty() {
            return Err(SourceError::Config(format!(
                "No Spotify access token configured.\nSet the {} environment variable.",
                crate::settings::SPOTIFY_TOKEN_ENV_VAR
            )));
        }
        Ok(Self {
            playlist_id: parse_playlist_id(playlist_uri)?,
            token: token.trim().to_string(),
            client: http_client()?,
        })
    }

    fn context_uri(&self) -> String {
        format!("spotify:playlist:{}", self.playlist_id)
    }

    fn request(&self, method: Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.token)
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, SourceError> {
        reqwest::Url::parse(&format!("{API_BASE}{path}"))
            .map_err(|e| SourceError::Config(format!("Invalid Spotify URL: {e}")))
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, SourceError> {
        builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| SourceError::Http {
                provider: PROVIDER,
                source,
            })
    }

    async fn player_command(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<(), SourceError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        let mut builder = self.request(method, url);
        builder = match body {
            Some(body) => builder.json(&body),
            // Spotify rejects body-less PUTs without a length header
            None => builder.header(reqwest::header::CONTENT_LENGTH, 0),
        };
        self.send(builder).await?;
        Ok(())
    }
}

fn payload_error(e: reqwest::Error) -> SourceError {
    SourceError::Payload {
        provider: PROVIDER,
        message: e.to_string(),
    }
}

fn fields_from_track(track: Track, list_index: usize) -> TrackFields {
    TrackFields {
        artist: track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        title: track.name,
        album: track.album.map(|a| a.name).unwrap_or_default(),
        track_number: track.track_number,
        list_index,
    }
}

fn remaining_secs(player: &PlayerResponse) -> Result<f64, SourceError> {
    match (&player.item, player.progress_ms) {
        (Some(item), Some(progress)) => {
            Ok((item.duration_ms as f64 - progress as f64) / 1000.0)
        }
        _ => Err(SourceError::NothingPlaying { provider: PROVIDER }),
    }
}

#[async_trait]
impl PlaylistSource for SpotifySource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn check_connectivity(&self) -> Result<(), SourceError> {
        let url = self.endpoint("/me")?;
        let endpoint = url.to_string();
        self.request(Method::GET, url)
            .timeout(CONNECTIVITY_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| SourceError::Unreachable {
                provider: PROVIDER,
                endpoint,
                source,
            })?;
        Ok(())
    }

    async fn fetch_track_list(
        &self,
        request: &TrackListRequest,
    ) -> Result<Vec<TrackLabel>, SourceError> {
        let mut url = self.endpoint(&format!("/playlists/{}/tracks", self.playlist_id))?;
        url.query_pairs_mut()
            .append_pair(
                "fields",
                "items(track(name,artists(name),album(name),track_number)),next",
            )
            .append_pair("limit", &PAGE_LIMIT.to_string());

        let mut labels = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let mut builder = self.request(Method::GET, url);
            if let Some(lang) = &request.language_hint {
                builder = builder.header(ACCEPT_LANGUAGE, lang.as_str());
            }
            let page: TracksPage = self.send(builder).await?.json().await.map_err(payload_error)?;

            for entry in page.items {
                let Some(track) = entry.track else {
                    tracing::warn!("Skipping unavailable playlist entry");
                    continue;
                };
                let fields = fields_from_track(track, labels.len() + 1);
                labels.push(label::render(&request.template, &fields));
            }

            next = match page.next {
                Some(link) => Some(reqwest::Url::parse(&link).map_err(|e| SourceError::Payload {
                    provider: PROVIDER,
                    message: format!("bad paging link {link}: {e}"),
                })?),
                None => None,
            };
        }
        Ok(labels)
    }

    async fn current_track_remaining_secs(&self) -> Result<f64, SourceError> {
        let url = self.endpoint("/me/player")?;
        let response = self.send(self.request(Method::GET, url)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(SourceError::NothingPlaying { provider: PROVIDER });
        }
        let player: PlayerResponse = response.json().await.map_err(payload_error)?;
        remaining_secs(&player)
    }

    async fn set_playback_state(&self, state: PlaybackState) -> Result<(), SourceError> {
        match state {
            PlaybackState::StartFromFirst => {
                self.player_command(Method::PUT, "/me/player/shuffle", &[("state", "false")], None)
                    .await?;
                self.player_command(Method::PUT, "/me/player/repeat", &[("state", "off")], None)
                    .await?;
                let body = json!({
                    "context_uri": self.context_uri(),
                    "offset": { "position": 0 },
                    "position_ms": 0,
                });
                self.player_command(Method::PUT, "/me/player/play", &[], Some(body))
                    .await
            }
            PlaybackState::Play => {
                self.player_command(Method::PUT, "/me/player/play", &[], None)
                    .await
            }
            // The Web API has no stop; pausing leaves the device silent
            PlaybackState::Pause | PlaybackState::Stop => {
                self.player_command(Method::PUT, "/me/player/pause", &[], None)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playlist_uri() {
        assert_eq!(
            parse_playlist_id("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
    }

    #[test]
    fn test_parse_playlist_link() {
        assert_eq!(
            parse_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc")
                .unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(
            parse_playlist_id("https://open.spotify.com/intl-ja/playlist/5zT2?si=x").unwrap(),
            "5zT2"
        );
    }

    #[test]
    fn test_parse_rejects_other_uris() {
        assert!(parse_playlist_id("spotify:album:4aawyAB9vmqN3uQ7FjRGTy").is_err());
        assert!(parse_playlist_id("https://open.spotify.com/album/4aaw").is_err());
        assert!(parse_playlist_id("").is_err());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        assert!(matches!(
            SpotifySource::new("spotify:playlist:abc", "  "),
            Err(SourceError::Config(_))
        ));
    }

    #[test]
    fn test_tracks_page_renders_labels() {
        let body = r#"{
            "items": [
                {"track": {"name": "Tomorrow Never Knows", "track_number": 14,
                           "artists": [{"name": "The Beatles"}], "album": {"name": "Revolver"}}},
                {"track": null},
                {"track": {"name": "Windowlicker", "track_number": 1,
                           "artists": [{"name": "Aphex Twin"}, {"name": "AFX"}], "album": null}}
            ],
            "next": null
        }"#;
        let page: TracksPage = serde_json::from_str(body).unwrap();
        let labels: Vec<String> = page
            .items
            .into_iter()
            .filter_map(|e| e.track)
            .enumerate()
            .map(|(i, t)| label::render("%track number% %artist% - %title%", &fields_from_track(t, i + 1)))
            .collect();
        assert_eq!(
            labels,
            vec![
                "14 The Beatles - Tomorrow Never Knows",
                "01 Aphex Twin, AFX - Windowlicker"
            ]
        );
    }

    #[test]
    fn test_remaining_from_player() {
        let player: PlayerResponse = serde_json::from_str(
            r#"{"progress_ms": 30500, "is_playing": true, "item": {"duration_ms": 200000}}"#,
        )
        .unwrap();
        assert_eq!(remaining_secs(&player).unwrap(), 169.5);

        let idle: PlayerResponse =
            serde_json::from_str(r#"{"progress_ms": null, "item": null}"#).unwrap();
        assert!(matches!(
            remaining_secs(&idle),
            Err(SourceError::NothingPlaying { .. })
        ));
    }
}
