//! `DeviceProfile` and its direct-play/transcoding rule sub-records, per §3.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectPlayRule {
    pub media_type: String,
    /// Empty string means "any container".
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub video_codec: Option<String>,
    #[serde(default)]
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodingRule {
    pub media_type: String,
    pub container: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub id: String,
    pub name: String,
    /// Substring match against the renderer's `USER-AGENT`; `"*"` marks the
    /// catch-all default profile.
    pub user_agent_match: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    pub max_streaming_bitrate: i64,
    #[serde(default)]
    pub direct_play: Vec<DirectPlayRule>,
    #[serde(default)]
    pub transcoding: Vec<TranscodingRule>,
}

impl DeviceProfile {
    pub fn is_wildcard(&self) -> bool {
        self.user_agent_match == "*"
    }

    /// Whether this profile should be considered for a request carrying
    /// `user_agent`/`manufacturer`/`model_name`, per §4.4.
    pub fn matches_request(
        &self,
        user_agent: &str,
        manufacturer: Option<&str>,
        model_name: Option<&str>,
    ) -> bool {
        if self.is_wildcard() {
            return true;
        }
        if !self.user_agent_match.is_empty()
            && user_agent
                .to_ascii_lowercase()
                .contains(&self.user_agent_match.to_ascii_lowercase())
        {
            return true;
        }
        if let (Some(ua_mfr), Some(profile_mfr)) = (manufacturer, self.manufacturer.as_deref()) {
            if ua_mfr.eq_ignore_ascii_case(profile_mfr) {
                return true;
            }
        }
        if let (Some(ua_model), Some(profile_model)) = (model_name, self.model_name.as_deref()) {
            if ua_model.eq_ignore_ascii_case(profile_model) {
                return true;
            }
        }
        false
    }

    /// Whether some `direct_play` entry matches `(media_type, container,
    /// video_codec, audio_codec)`. A rule field of `None`/`""` means "any".
    pub fn direct_play_matches(
        &self,
        media_type: &str,
        container: &str,
        video_codec: Option<&str>,
        audio_codec: Option<&str>,
    ) -> bool {
        self.direct_play.iter().any(|rule| {
            rule.media_type.eq_ignore_ascii_case(media_type)
                && field_matches(&rule.container, Some(container))
                && option_field_matches(rule.video_codec.as_deref(), video_codec)
                && option_field_matches(rule.audio_codec.as_deref(), audio_codec)
        })
    }

    /// A built-in mp4/h264/aac direct-play profile used when no configured
    /// profile (including no wildcard) exists, per §4.4's final fallback.
    pub fn fallback() -> Self {
        Self {
            id: "fallback".to_string(),
            name: "Generic DLNA".to_string(),
            user_agent_match: "*".to_string(),
            manufacturer: None,
            model_name: None,
            max_streaming_bitrate: 20_000_000,
            direct_play: vec![DirectPlayRule {
                media_type: "Video".to_string(),
                container: "mp4".to_string(),
                video_codec: Some("h264".to_string()),
                audio_codec: Some("aac".to_string()),
            }],
            transcoding: vec![],
        }
    }
}

fn field_matches(rule_value: &str, actual: Option<&str>) -> bool {
    if rule_value.is_empty() {
        return true;
    }
    actual.is_some_and(|a| a.eq_ignore_ascii_case(rule_value))
}

fn option_field_matches(rule_value: Option<&str>, actual: Option<&str>) -> bool {
    match rule_value {
        None => true,
        Some(s) if s.is_empty() => true,
        Some(s) => actual.is_some_and(|a| a.eq_ignore_ascii_case(s)),
    }
}
