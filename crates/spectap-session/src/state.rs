//! Point-in-time session snapshots.

use crate::{PlaybackError, PlaybackStatus};
use serde::Serialize;

/// What `getState` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Player id.
    pub id: String,
    /// Current status.
    pub status: PlaybackStatus,
    /// Whether a source has finished loading.
    pub loaded: bool,
    /// Playback position in milliseconds.
    pub position_ms: u64,
    /// Source duration in milliseconds.
    pub duration_ms: u64,
    /// Last load or engine error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PlaybackError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_like_the_bridge_expects() {
        let state = PlayerState {
            id: "p1".into(),
            status: PlaybackStatus::Playing,
            loaded: true,
            position_ms: 1200,
            duration_ms: 3000,
            error: None,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "p1",
                "status": "playing",
                "loaded": true,
                "positionMs": 1200,
                "durationMs": 3000,
            })
        );
    }

    #[test]
    fn error_is_included_when_present() {
        let state = PlayerState {
            id: "p1".into(),
            status: PlaybackStatus::Error,
            loaded: false,
            position_ms: 0,
            duration_ms: 0,
            error: Some(PlaybackError::source_load(
                "ASSET_NOT_FOUND",
                "missing",
                None,
            )),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["kind"], "source_load");
        assert_eq!(json["error"]["code"], "ASSET_NOT_FOUND");
        assert!(json["error"].get("detail").is_none());
    }
}
