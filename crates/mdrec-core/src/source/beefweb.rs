//! foobar2000 playlist source via the beefweb HTTP plugin.
//!
//! Labels are evaluated by foobar2000 itself: the label template is sent as a
//! title formatting column, so every field foobar2000 knows is available.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    CONNECTIVITY_TIMEOUT, PlaybackState, PlaylistSource, TrackLabel, TrackListRequest,
    http_client, normalize_base_url,
};
use crate::error::SourceError;

/// Default beefweb listen address
pub const DEFAULT_BEEFWEB_URL: &str = "http://localhost:8880";

const PROVIDER: &str = "beefweb";
/// foobar2000 "Default" playback order
const PLAYBACK_MODE_DEFAULT: u32 = 0;

#[derive(Deserialize, Debug)]
struct PlayerResponse {
    player: PlayerState,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PlayerState {
    active_item: ActiveItem,
    #[serde(default)]
    playback_state: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ActiveItem {
    index: i64,
    position: f64,
    duration: f64,
}

#[derive(Deserialize, Debug)]
struct PlaylistsResponse {
    playlists: Vec<PlaylistInfo>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PlaylistInfo {
    id: String,
    title: String,
    is_current: bool,
    item_count: usize,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ItemsResponse {
    playlist_items: PlaylistItems,
}

#[derive(Deserialize, Debug)]
struct PlaylistItems {
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize, Debug)]
struct PlaylistItem {
    columns: Vec<String>,
}

/// Playlist source backed by a running foobar2000 instance
#[derive(Debug, Clone)]
pub struct BeefwebSource {
    base_url: String,
    client: reqwest::Client,
}

impl BeefwebSource {
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            base_url: normalize_base_url(base_url, "beefweb")?,
            client: http_client()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: impl reqwest::IntoUrl,
    ) -> Result<T, SourceError> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?
            .json::<T>()
            .await
            .map_err(|e| SourceError::Payload {
                provider: PROVIDER,
                message: e.to_string(),
            })
    }

    async fn post(&self, path: &str, body: Option<serde_json::Value>) -> Result<(), SourceError> {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;
        Ok(())
    }

    async fn player(&self) -> Result<PlayerState, SourceError> {
        let response: PlayerResponse = self.get_json(self.url("/player")).await?;
        Ok(response.player)
    }

    async fn current_playlist(&self) -> Result<PlaylistInfo, SourceError> {
        let response: PlaylistsResponse = self.get_json(self.url("/playlists")).await?;
        select_current_playlist(response.playlists)
    }
}

fn http_error(source: reqwest::Error) -> SourceError {
    SourceError::Http {
        provider: PROVIDER,
        source,
    }
}

fn select_current_playlist(playlists: Vec<PlaylistInfo>) -> Result<PlaylistInfo, SourceError> {
    playlists
        .into_iter()
        .find(|p| p.is_current)
        .ok_or_else(|| SourceError::Payload {
            provider: PROVIDER,
            message: "foobar2000 reports no current playlist".into(),
        })
}

fn remaining_secs(item: &ActiveItem) -> Result<f64, SourceError> {
    if item.index < 0 {
        return Err(SourceError::NothingPlaying { provider: PROVIDER });
    }
    Ok(item.duration - item.position)
}

#[async_trait]
impl PlaylistSource for BeefwebSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn check_connectivity(&self) -> Result<(), SourceError> {
        let endpoint = self.url("/player");
        self.client
            .get(&endpoint)
            .timeout(CONNECTIVITY_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| SourceError::Unreachable {
                provider: PROVIDER,
                endpoint: endpoint.clone(),
                source,
            })?;
        tracing::debug!(%endpoint, "beefweb reachable");
        Ok(())
    }

    async fn fetch_track_list(
        &self,
        request: &TrackListRequest,
    ) -> Result<Vec<TrackLabel>, SourceError> {
        if request.language_hint.is_some() {
            tracing::debug!("beefweb ignores the language hint; foobar2000 tags are used as-is");
        }

        let playlist = self.current_playlist().await?;
        tracing::info!(
            playlist = %playlist.title,
            items = playlist.item_count,
            "Reading current foobar2000 playlist"
        );
        if playlist.item_count == 0 {
            return Ok(Vec::new());
        }

        let mut url = reqwest::Url::parse(&self.url(&format!(
            "/playlists/{}/items/0:{}",
            playlist.id, playlist.item_count
        )))
        .map_err(|e| SourceError::Config(format!("Invalid beefweb URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("columns", &request.template);

        let response: ItemsResponse = self.get_json(url).await?;
        labels_from_items(response.playlist_items)
    }

    async fn current_track_remaining_secs(&self) -> Result<f64, SourceError> {
        let player = self.player().await?;
        tracing::debug!(state = %player.playback_state, "beefweb player state");
        remaining_secs(&player.active_item)
    }

    async fn set_playback_state(&self, state: PlaybackState) -> Result<(), SourceError> {
        match state {
            PlaybackState::StartFromFirst => {
                let playlist = self.current_playlist().await?;
                self.post(
                    "/player",
                    Some(json!({ "playbackMode": PLAYBACK_MODE_DEFAULT })),
                )
                .await?;
                self.post(&format!("/player/play/{}/0", playlist.id), None)
                    .await
            }
            PlaybackState::Play => self.post("/player/play", None).await,
            PlaybackState::Pause => self.post("/player/pause", None).await,
            PlaybackState::Stop => self.post("/player/stop", None).await,
        }
    }
}

/// beefweb splits `columns` on commas, so a template containing a comma
/// comes back as several columns that are joined again here.
fn labels_from_items(items: PlaylistItems) -> Result<Vec<TrackLabel>, SourceError> {
    items
        .items
        .into_iter()
        .map(|item| {
            if item.columns.is_empty() {
                return Err(SourceError::Payload {
                    provider: PROVIDER,
                    message: "playlist item without a label column".into(),
                });
            }
            Ok(item.columns.join(","))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_from_player_response() {
        let body = r#"{
            "player": {
                "activeItem": {
                    "playlistId": "p1", "playlistIndex": 0, "index": 2,
                    "position": 61.5, "duration": 200.0, "columns": []
                },
                "playbackState": "playing",
                "playbackMode": 0
            }
        }"#;
        let response: PlayerResponse = serde_json::from_str(body).unwrap();
        assert_eq!(remaining_secs(&response.player.active_item).unwrap(), 138.5);
    }

    #[test]
    fn test_remaining_when_stopped() {
        let body = r#"{
            "player": {
                "activeItem": {
                    "playlistId": "", "playlistIndex": -1, "index": -1,
                    "position": 0.0, "duration": 0.0, "columns": []
                },
                "playbackState": "stopped"
            }
        }"#;
        let response: PlayerResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            remaining_secs(&response.player.active_item),
            Err(SourceError::NothingPlaying { .. })
        ));
    }

    #[test]
    fn test_select_current_playlist() {
        let body = r#"{"playlists": [
            {"id": "p1", "index": 0, "title": "Default", "isCurrent": false, "itemCount": 3, "totalTime": 0},
            {"id": "p2", "index": 1, "title": "MD 74", "isCurrent": true, "itemCount": 12, "totalTime": 0}
        ]}"#;
        let response: PlaylistsResponse = serde_json::from_str(body).unwrap();
        let current = select_current_playlist(response.playlists).unwrap();
        assert_eq!(current.id, "p2");
        assert_eq!(current.item_count, 12);
    }

    #[test]
    fn test_labels_from_items() {
        let body = r#"{"playlistItems": {"offset": 0, "totalCount": 2, "items": [
            {"columns": ["Stereolab - French Disko"]},
            {"columns": ["Broadcast - Echo's Answer"]}
        ]}}"#;
        let response: ItemsResponse = serde_json::from_str(body).unwrap();
        let labels = labels_from_items(response.playlist_items).unwrap();
        assert_eq!(
            labels,
            vec!["Stereolab - French Disko", "Broadcast - Echo's Answer"]
        );
    }

    #[test]
    fn test_labels_rejoin_comma_split_columns() {
        // Template "%artist%, %title%"
        let body = r#"{"playlistItems": {"offset": 0, "totalCount": 2, "items": [
            {"columns": ["Stereolab", " French Disko"]},
            {"columns": ["Can", " Vitamin C", " Ege Bamyasi"]}
        ]}}"#;
        let response: ItemsResponse = serde_json::from_str(body).unwrap();
        let labels = labels_from_items(response.playlist_items).unwrap();
        assert_eq!(
            labels,
            vec!["Stereolab, French Disko", "Can, Vitamin C, Ege Bamyasi"]
        );
    }

    #[test]
    fn test_item_without_columns_is_payload_error() {
        let items: PlaylistItems =
            serde_json::from_str(r#"{"items": [{"columns": []}]}"#).unwrap();
        assert!(matches!(
            labels_from_items(items),
            Err(SourceError::Payload { .. })
        ));
    }
}
