//! Playback telemetry payloads posted back to the upstream catalog, per
//! §4.5's "Telemetry payloads" table.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum PlayMethod {
    DirectPlay,
    Transcode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStartPayload {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub session_id: String,
    pub media_source_id: Uuid,
    pub can_seek: bool,
    pub play_method: PlayMethod,
    pub play_session_id: String,
    pub start_time_ticks: i64,
    pub position_ticks: i64,
    pub event_name: &'static str,
}

impl PlaybackStartPayload {
    pub fn new(
        user_id: Uuid,
        item_id: Uuid,
        session_id: &str,
        play_method: PlayMethod,
        position_ticks: i64,
    ) -> Self {
        Self {
            user_id,
            item_id,
            session_id: session_id.to_string(),
            media_source_id: item_id,
            can_seek: true,
            play_method,
            play_session_id: session_id.to_string(),
            start_time_ticks: position_ticks,
            position_ticks,
            event_name: "playbackstart",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackProgressPayload {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub session_id: String,
    pub media_source_id: Uuid,
    pub play_method: PlayMethod,
    pub play_session_id: String,
    pub position_ticks: i64,
    pub is_paused: bool,
    pub event_name: &'static str,
}

impl PlaybackProgressPayload {
    pub fn new(
        user_id: Uuid,
        item_id: Uuid,
        session_id: &str,
        play_method: PlayMethod,
        position_ticks: i64,
        is_paused: bool,
    ) -> Self {
        Self {
            user_id,
            item_id,
            session_id: session_id.to_string(),
            media_source_id: item_id,
            play_method,
            play_session_id: session_id.to_string(),
            position_ticks,
            is_paused,
            event_name: if is_paused { "pause" } else { "timeupdate" },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStoppedPayload {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub session_id: String,
    pub media_source_id: Uuid,
    pub play_method: PlayMethod,
    pub play_session_id: String,
    pub position_ticks: i64,
    pub failed: bool,
}

impl PlaybackStoppedPayload {
    pub fn new(
        user_id: Uuid,
        item_id: Uuid,
        session_id: &str,
        play_method: PlayMethod,
        position_ticks: i64,
    ) -> Self {
        Self {
            user_id,
            item_id,
            session_id: session_id.to_string(),
            media_source_id: item_id,
            play_method,
            play_session_id: session_id.to_string(),
            position_ticks,
            failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_name_follows_pause_state() {
        let playing = PlaybackProgressPayload::new(
            Uuid::nil(),
            Uuid::nil(),
            "s1",
            PlayMethod::DirectPlay,
            0,
            false,
        );
        assert_eq!(playing.event_name, "timeupdate");

        let paused = PlaybackProgressPayload::new(
            Uuid::nil(),
            Uuid::nil(),
            "s1",
            PlayMethod::DirectPlay,
            0,
            true,
        );
        assert_eq!(paused.event_name, "pause");
    }

    #[test]
    fn start_payload_uses_position_as_start_time() {
        let start = PlaybackStartPayload::new(Uuid::nil(), Uuid::nil(), "s1", PlayMethod::Transcode, 5_000);
        assert_eq!(start.start_time_ticks, 5_000);
        assert_eq!(start.event_name, "playbackstart");
    }

    #[test]
    fn serializes_with_pascal_case_field_names() {
        let start = PlaybackStartPayload::new(Uuid::nil(), Uuid::nil(), "s1", PlayMethod::DirectPlay, 0);
        let json = serde_json::to_string(&start).unwrap();
        assert!(json.contains("\"PlaySessionId\""));
        assert!(json.contains("\"PlayMethod\":\"DirectPlay\""));
    }
}
