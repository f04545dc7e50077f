//! `ProfileStore`: where [`DeviceProfile`]s come from. Persistence to a
//! relational store (§6) is out of scope; an in-memory store seeded from
//! YAML is the whole of it here.

use crate::error::{ProfileError, Result};
use crate::models::{DeviceProfile, DirectPlayRule};
use std::sync::RwLock;
use tracing::warn;

/// Read-only view over the configured device profiles, in admin-defined
/// order.
pub trait ProfileStore: Send + Sync {
    fn list(&self) -> Vec<DeviceProfile>;
}

/// Simple keyed record store held entirely in memory, populated once at
/// startup from the embedded defaults or a YAML file.
pub struct InMemoryProfileStore {
    profiles: RwLock<Vec<DeviceProfile>>,
}

impl InMemoryProfileStore {
    pub fn new(profiles: Vec<DeviceProfile>) -> Self {
        if !profiles.iter().any(DeviceProfile::is_wildcard) {
            warn!("no wildcard DeviceProfile configured; falling back to the built-in default at match time");
        }
        Self {
            profiles: RwLock::new(profiles),
        }
    }

    /// Parses `yaml` into a profile list and builds a store from it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let profiles: Vec<DeviceProfile> = serde_yaml::from_str(yaml)?;
        Ok(Self::new(profiles))
    }

    /// Reads and parses a profile file from disk.
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// The built-in profile set: a handful of well-known renderers plus a
    /// wildcard default, mirroring the vendor buckets SSDP/DIDL already
    /// distinguish.
    pub fn with_defaults() -> Self {
        Self::new(default_profiles())
    }

    pub fn replace(&self, profiles: Vec<DeviceProfile>) {
        *self.profiles.write().expect("profile store lock poisoned") = profiles;
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn list(&self) -> Vec<DeviceProfile> {
        self.profiles
            .read()
            .expect("profile store lock poisoned")
            .clone()
    }
}

fn default_profiles() -> Vec<DeviceProfile> {
    vec![
        DeviceProfile {
            id: "samsung".to_string(),
            name: "Samsung Smart TV".to_string(),
            user_agent_match: "samsung".to_string(),
            manufacturer: Some("Samsung".to_string()),
            model_name: None,
            max_streaming_bitrate: 20_000_000,
            direct_play: vec![DirectPlayRule {
                media_type: "Video".to_string(),
                container: "mp4".to_string(),
                video_codec: Some("h264".to_string()),
                audio_codec: Some("aac".to_string()),
            }],
            transcoding: vec![],
        },
        DeviceProfile {
            id: "lg".to_string(),
            name: "LG webOS TV".to_string(),
            user_agent_match: "lg".to_string(),
            manufacturer: Some("LG".to_string()),
            model_name: None,
            max_streaming_bitrate: 20_000_000,
            direct_play: vec![DirectPlayRule {
                media_type: "Video".to_string(),
                container: "mp4".to_string(),
                video_codec: Some("h264".to_string()),
                audio_codec: Some("aac".to_string()),
            }],
            transcoding: vec![],
        },
        DeviceProfile {
            id: "xbox".to_string(),
            name: "Xbox".to_string(),
            user_agent_match: "xbox".to_string(),
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
        },
        DeviceProfile {
            id: "vlc".to_string(),
            name: "VLC".to_string(),
            user_agent_match: "vlc".to_string(),
            manufacturer: None,
            model_name: None,
            max_streaming_bitrate: 40_000_000,
            direct_play: vec![
                DirectPlayRule {
                    media_type: "Video".to_string(),
                    container: "mp4".to_string(),
                    video_codec: None,
                    audio_codec: None,
                },
                DirectPlayRule {
                    media_type: "Video".to_string(),
                    container: "mkv".to_string(),
                    video_codec: None,
                    audio_codec: None,
                },
            ],
            transcoding: vec![],
        },
        DeviceProfile::fallback(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_includes_a_wildcard() {
        let store = InMemoryProfileStore::with_defaults();
        assert!(store.list().iter().any(DeviceProfile::is_wildcard));
    }

    #[test]
    fn from_yaml_round_trips_a_single_profile() {
        let yaml = r#"
- id: custom
  name: Custom Renderer
  user_agent_match: custom-agent
  max_streaming_bitrate: 8000000
  direct_play: []
  transcoding: []
"#;
        let store = InMemoryProfileStore::from_yaml(yaml).unwrap();
        let profiles = store.list();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, "custom");
    }
}
