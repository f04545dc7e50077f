//! Wire types for the upstream catalog's `Items` family of endpoints.
//!
//! Field names follow the catalog's own PascalCase JSON so deserialization
//! needs no per-field renaming beyond the enum tags.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag of a [`CatalogItem`]. Content-directory mapping (UPnP class, sort
/// key, inclusion) dispatches over this, never over subclassing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Movie,
    Episode,
    Season,
    Series,
    Audio,
    MusicAlbum,
    MusicArtist,
    MusicVideo,
    Photo,
    Video,
    AudioBook,
    Folder,
    CollectionFolder,
    BoxSet,
    Playlist,
    UserView,
    AggregateFolder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub collection_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub child_count: Option<i32>,
    #[serde(default)]
    pub run_time_ticks: Option<i64>,
    #[serde(default)]
    pub index_number: Option<i32>,
    #[serde(default)]
    pub parent_index_number: Option<i32>,
    #[serde(default)]
    pub production_year: Option<i32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub media_sources: Vec<MediaSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub bitrate: Option<i32>,
    #[serde(default)]
    pub run_time_ticks: Option<i64>,
    #[serde(default)]
    pub media_streams: Vec<MediaStream>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaStream {
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub channels: Option<i32>,
    #[serde(default)]
    pub sample_rate: Option<i32>,
    #[serde(default)]
    pub index: Option<i32>,
    #[serde(default)]
    pub is_external: bool,
}

/// Per-user playback state for a single item (`GET
/// /Users/{uid}/Items/{id}/UserData`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub playback_position_ticks: i64,
    #[serde(default)]
    pub played: bool,
}

/// Envelope of `GET /Items`.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub total_record_count: i64,
}

impl CatalogItem {
    /// The catalog's own class of containers that hold direct children —
    /// folders, collections, and the grouping types (Series/Season/Album/…).
    pub fn is_container(&self) -> bool {
        matches!(
            self.item_type,
            ItemType::AggregateFolder
                | ItemType::CollectionFolder
                | ItemType::BoxSet
                | ItemType::Folder
                | ItemType::UserView
                | ItemType::Series
                | ItemType::Season
                | ItemType::MusicAlbum
                | ItemType::MusicArtist
                | ItemType::Playlist
        )
    }

    /// The catalog's own class of leaf/media items.
    pub fn is_media_item(&self) -> bool {
        matches!(
            self.item_type,
            ItemType::Movie
                | ItemType::Episode
                | ItemType::Audio
                | ItemType::Photo
                | ItemType::Video
                | ItemType::MusicVideo
                | ItemType::AudioBook
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_and_media_items_partition_the_tag_set() {
        let all = [
            ItemType::Movie,
            ItemType::Episode,
            ItemType::Season,
            ItemType::Series,
            ItemType::Audio,
            ItemType::MusicAlbum,
            ItemType::MusicArtist,
            ItemType::MusicVideo,
            ItemType::Photo,
            ItemType::Video,
            ItemType::AudioBook,
            ItemType::Folder,
            ItemType::CollectionFolder,
            ItemType::BoxSet,
            ItemType::Playlist,
            ItemType::UserView,
            ItemType::AggregateFolder,
        ];
        for item_type in all {
            let item = CatalogItem {
                id: Uuid::nil(),
                name: "x".into(),
                item_type,
                collection_type: None,
                parent_id: None,
                child_count: None,
                run_time_ticks: None,
                index_number: None,
                parent_index_number: None,
                production_year: None,
                overview: None,
                genres: vec![],
                series_name: None,
                album: None,
                artists: vec![],
                media_sources: vec![],
            };
            assert!(
                item.is_container() || item.is_media_item(),
                "{item_type:?} is neither container nor media item"
            );
        }
    }

    #[test]
    fn musicvideo_is_a_media_item_not_a_container() {
        let item = CatalogItem {
            id: Uuid::nil(),
            name: "x".into(),
            item_type: ItemType::MusicVideo,
            collection_type: None,
            parent_id: None,
            child_count: None,
            run_time_ticks: None,
            index_number: None,
            parent_index_number: None,
            production_year: None,
            overview: None,
            genres: vec![],
            series_name: None,
            album: None,
            artists: vec![],
            media_sources: vec![],
        };
        assert!(item.is_media_item());
        assert!(!item.is_container());
    }
}
