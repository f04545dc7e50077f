//! DIDL-Lite container/item/resource types and their `quick-xml` serde
//! (de)serialization, per UPnP `urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/`.
//!
//! This crate only models the subset of DIDL-Lite the content directory
//! engine needs to emit: containers, items, a single `<res>` per item, and
//! the handful of `dc:`/`upnp:`/`sec:` properties §4.3 of the media-server
//! specification names. It does not attempt to be a general DIDL-Lite
//! parser for arbitrary renderer metadata.

use serde::{Deserialize, Serialize};

const DIDL_XMLNS: &str = "urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/";
const DIDL_XMLNS_DC: &str = "http://purl.org/dc/elements/1.1/";
const DIDL_XMLNS_UPNP: &str = "urn:schemas-upnp-org:metadata-1-0/upnp/";
const DIDL_XMLNS_SEC: &str = "http://www.sec.co.kr/";

/// The root DIDL-Lite document returned in a Browse `<Result>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename = "DIDL-Lite")]
pub struct DidlLite {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,

    #[serde(rename = "@xmlns:dc")]
    pub xmlns_dc: String,

    #[serde(rename = "@xmlns:upnp")]
    pub xmlns_upnp: String,

    #[serde(rename = "@xmlns:sec")]
    pub xmlns_sec: String,

    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

impl DidlLite {
    pub fn new() -> Self {
        Self {
            xmlns: DIDL_XMLNS.to_string(),
            xmlns_dc: DIDL_XMLNS_DC.to_string(),
            xmlns_upnp: DIDL_XMLNS_UPNP.to_string(),
            xmlns_sec: DIDL_XMLNS_SEC.to_string(),
            containers: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_containers(containers: Vec<Container>) -> Self {
        Self {
            containers,
            ..Self::new()
        }
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::new()
        }
    }

    /// Serializes to the XML that goes inside a Browse `<Result>` element.
    pub fn render(&self) -> Result<String, quick_xml::SeError> {
        quick_xml::se::to_string(self)
    }

    /// Parses a previously rendered document back into structured form.
    /// Used by the container-XML stability test in §8 of the specification.
    pub fn parse(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }
}

/// A DIDL-Lite `<container>` — a browsable node (library, series, season,
/// album, artist, folder…).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted")]
    pub restricted: String,

    #[serde(rename = "@childCount")]
    pub child_count: u32,

    #[serde(rename = "dc:title")]
    pub title: String,

    #[serde(rename = "upnp:class")]
    pub class: String,

    #[serde(rename = "upnp:albumArtURI", skip_serializing_if = "Option::is_none")]
    pub album_art_uri: Option<String>,

    #[serde(rename = "upnp:icon", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(rename = "sec:dcmInfo", skip_serializing_if = "Option::is_none")]
    pub dcm_info: Option<String>,
}

impl Container {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>, title: impl Into<String>, class: impl Into<String>, child_count: u32) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            restricted: "1".to_string(),
            child_count,
            title: title.into(),
            class: class.into(),
            album_art_uri: None,
            icon: None,
            dcm_info: None,
        }
    }
}

/// A DIDL-Lite `<item>` — a leaf playable object (movie, episode, track,
/// photo…).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted")]
    pub restricted: String,

    #[serde(rename = "dc:title")]
    pub title: String,

    #[serde(rename = "upnp:class")]
    pub class: String,

    #[serde(rename = "upnp:albumArtURI", skip_serializing_if = "Option::is_none")]
    pub album_art_uri: Option<String>,

    #[serde(rename = "dc:description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "dc:date", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(rename = "upnp:episodeNumber", skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<i32>,

    #[serde(rename = "upnp:episodeSeason", skip_serializing_if = "Option::is_none")]
    pub episode_season: Option<i32>,

    #[serde(rename = "upnp:seriesTitle", skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,

    #[serde(rename = "upnp:album", skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    #[serde(rename = "upnp:artist", default, skip_serializing_if = "Vec::is_empty")]
    pub artists: Vec<String>,

    #[serde(rename = "upnp:genre", default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,

    #[serde(rename = "upnp:icon", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(rename = "sec:dcmInfo", skip_serializing_if = "Option::is_none")]
    pub dcm_info: Option<String>,

    #[serde(rename = "res", skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}

impl Item {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>, title: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            restricted: "1".to_string(),
            title: title.into(),
            class: class.into(),
            album_art_uri: None,
            description: None,
            date: None,
            episode_number: None,
            episode_season: None,
            series_title: None,
            album: None,
            artists: Vec::new(),
            genres: Vec::new(),
            icon: None,
            dcm_info: None,
            resource: None,
        }
    }
}

/// A single `<res>` element describing this item's streamable resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    #[serde(rename = "@protocolInfo")]
    pub protocol_info: String,

    #[serde(rename = "@size", skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,

    #[serde(rename = "@duration", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(rename = "@resolution", skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(rename = "@bitrate", skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<i64>,

    #[serde(rename = "@sampleFrequency", skip_serializing_if = "Option::is_none")]
    pub sample_frequency: Option<i32>,

    #[serde(rename = "@nrAudioChannels", skip_serializing_if = "Option::is_none")]
    pub nr_audio_channels: Option<i32>,

    #[serde(rename = "$text")]
    pub url: String,
}

impl Resource {
    pub fn new(protocol_info: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            protocol_info: protocol_info.into(),
            size: None,
            duration: None,
            resolution: None,
            bitrate: None,
            sample_frequency: None,
            nr_audio_channels: None,
            url: url.into(),
        }
    }
}

/// Truncates `s` to `max_chars` characters, appending an ellipsis when it
/// had to cut. Used for `dc:description` per §4.3 ("truncated at 200 chars
/// with ellipsis").
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('\u{2026}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_root_namespaces() {
        let didl = DidlLite::new();
        let xml = didl.render().unwrap();
        assert!(xml.contains(DIDL_XMLNS));
        assert!(xml.contains(DIDL_XMLNS_DC));
        assert!(xml.contains(DIDL_XMLNS_UPNP));
        assert!(xml.contains(DIDL_XMLNS_SEC));
    }

    #[test]
    fn container_round_trips() {
        let mut container = Container::new("library:aaa", "0", "Movies", "object.container.genre.movieGenre", 12);
        container.album_art_uri = Some("http://host/art.jpg".to_string());
        let didl = DidlLite::with_containers(vec![container.clone()]);

        let xml = didl.render().unwrap();
        let parsed = DidlLite::parse(&xml).unwrap();

        assert_eq!(parsed.containers.len(), 1);
        assert_eq!(parsed.containers[0], container);
    }

    #[test]
    fn item_with_resource_round_trips() {
        let mut item = Item::new("item-1", "library:aaa", "1. Pilot", "object.item.videoItem");
        item.episode_number = Some(1);
        item.episode_season = Some(1);
        item.series_title = Some("Example Series".to_string());
        item.genres = vec!["Drama".to_string(), "Mystery".to_string()];
        let mut res = Resource::new("http-get:*:video/mp4:*", "http://host/stream/item-1");
        res.duration = Some("0:42:10.000".to_string());
        res.resolution = Some("1920x1080".to_string());
        item.resource = Some(res);

        let didl = DidlLite::with_items(vec![item.clone()]);
        let xml = didl.render().unwrap();
        let parsed = DidlLite::parse(&xml).unwrap();

        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0], item);
    }

    #[test]
    fn multiple_artists_serialize_as_repeated_elements() {
        let mut item = Item::new("track-1", "0", "Song", "object.item.audioItem.musicTrack");
        item.artists = vec!["Artist A".to_string(), "Artist B".to_string()];
        let didl = DidlLite::with_items(vec![item]);
        let xml = didl.render().unwrap();
        assert_eq!(xml.matches("upnp:artist").count(), 4); // 2 opening + 2 closing tags
    }

    #[test]
    fn description_truncates_at_200_chars() {
        let long = "x".repeat(250);
        let truncated = truncate_with_ellipsis(&long, 200);
        assert_eq!(truncated.chars().count(), 201); // 200 + ellipsis
        assert!(truncated.ends_with('\u{2026}'));
    }

    #[test]
    fn description_under_limit_is_untouched() {
        assert_eq!(truncate_with_ellipsis("short", 200), "short");
    }
}
