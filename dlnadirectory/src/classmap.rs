//! Inclusion rules, `upnp:class` mapping, and resource `protocolInfo`
//! construction, per §4.3.

use dlnacatalog::{CatalogItem, ItemType, MediaSource, MediaStream, StreamType};
use dlnautil::Vendor;

/// Folder names excluded from Browse results regardless of type, matched
/// case-insensitively.
const EXCLUDED_FOLDERS: &[&str] = &[
    "Behind The Scenes",
    "Deleted Scenes",
    "Interviews",
    "Scenes",
    "Samples",
    "Shorts",
    "Featurettes",
    "Extras",
    "Trailers",
    "Theme Videos",
    "Theme Songs",
    "Specials",
];

/// Whether `item` should appear as a child in a Browse result.
pub fn is_included(item: &CatalogItem) -> bool {
    let excluded_by_name = EXCLUDED_FOLDERS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(&item.name));
    !excluded_by_name && (item.is_container() || item.is_media_item())
}

/// `upnp:class` for a non-root-library child, per the mapping table.
pub fn upnp_class(item: &CatalogItem) -> &'static str {
    match item.item_type {
        ItemType::Movie => "object.item.videoItem.movie",
        ItemType::Episode | ItemType::Video => "object.item.videoItem",
        ItemType::MusicVideo => "object.item.videoItem.musicVideoClip",
        ItemType::Audio | ItemType::AudioBook => "object.item.audioItem.musicTrack",
        ItemType::Photo => "object.item.imageItem.photo",
        ItemType::Series | ItemType::Season => "object.container.album.videoAlbum",
        ItemType::MusicAlbum => "object.container.album.musicAlbum",
        ItemType::MusicArtist => "object.container.person.musicArtist",
        ItemType::CollectionFolder
        | ItemType::Folder
        | ItemType::BoxSet
        | ItemType::Playlist
        | ItemType::UserView
        | ItemType::AggregateFolder => "object.container.storageFolder",
    }
}

/// `upnp:class` override for a top-level library container, keyed by its
/// `collection_type`.
pub fn library_root_class(collection_type: Option<&str>) -> &'static str {
    match collection_type {
        Some(t) if t.eq_ignore_ascii_case("movies") || t.eq_ignore_ascii_case("tvshows") => {
            "object.container.genre.movieGenre"
        }
        Some(t) if t.eq_ignore_ascii_case("photos") => "object.container.album.photoAlbum",
        _ => "object.container.storageFolder",
    }
}

/// MIME type for a media source's container, falling back to something
/// reasonable for the item's own type when the container is unknown.
pub fn mime_type(item: &CatalogItem, media_source: Option<&MediaSource>) -> &'static str {
    if let Some(container) = media_source.and_then(|m| m.container.as_deref()) {
        match container.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" | "mov" => return "video/mp4",
            "mkv" => return "video/x-matroska",
            "avi" => return "video/avi",
            "mp3" => return "audio/mpeg",
            "m4a" | "aac" => return "audio/mp4",
            "flac" => return "audio/flac",
            "jpg" | "jpeg" => return "image/jpeg",
            _ => {}
        }
    }
    match item.item_type {
        ItemType::Photo => "image/jpeg",
        ItemType::Audio | ItemType::AudioBook => "audio/mpeg",
        _ => "video/mp4",
    }
}

/// DLNA flags for a resource's `protocolInfo`, per §4.3's Samsung-specific
/// values and the catch-all `*` the generic protocol-info table uses
/// elsewhere.
pub fn dlna_flags(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::Samsung => {
            "DLNA.ORG_PN=AVC_MP4_MP_HD_1080i_AAC;DLNA.ORG_OP=01;DLNA.ORG_FLAGS=01700000000000000000000000000000"
        }
        _ => "*",
    }
}

pub fn find_stream(media_source: Option<&MediaSource>, stream_type: StreamType) -> Option<&MediaStream> {
    media_source?.media_streams.iter().find(|s| s.stream_type == stream_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(item_type: ItemType, name: &str) -> CatalogItem {
        CatalogItem {
            id: Uuid::nil(),
            name: name.to_string(),
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
        }
    }

    #[test]
    fn excluded_folder_names_are_rejected_case_insensitively() {
        assert!(!is_included(&item(ItemType::Folder, "behind the SCENES")));
    }

    #[test]
    fn ordinary_movie_is_included() {
        assert!(is_included(&item(ItemType::Movie, "Arrival")));
    }

    #[test]
    fn movie_maps_to_the_movie_class() {
        assert_eq!(upnp_class(&item(ItemType::Movie, "x")), "object.item.videoItem.movie");
    }

    #[test]
    fn season_maps_to_video_album() {
        assert_eq!(upnp_class(&item(ItemType::Season, "x")), "object.container.album.videoAlbum");
    }

    #[test]
    fn library_root_movies_maps_to_movie_genre() {
        assert_eq!(library_root_class(Some("Movies")), "object.container.genre.movieGenre");
    }

    #[test]
    fn library_root_unknown_collection_type_is_storage_folder() {
        assert_eq!(library_root_class(None), "object.container.storageFolder");
    }

    #[test]
    fn mime_type_falls_back_to_item_type_when_container_is_missing() {
        assert_eq!(mime_type(&item(ItemType::Photo, "x"), None), "image/jpeg");
    }

    #[test]
    fn mime_type_from_container_wins_over_item_type() {
        let mut source = MediaSource {
            container: Some("mkv".to_string()),
            size: None,
            bitrate: None,
            run_time_ticks: None,
            media_streams: vec![],
        };
        assert_eq!(mime_type(&item(ItemType::Movie, "x"), Some(&source)), "video/x-matroska");
        source.container = Some("FLAC".to_string());
        assert_eq!(mime_type(&item(ItemType::Audio, "x"), Some(&source)), "audio/flac");
    }

    #[test]
    fn samsung_gets_the_literal_spec_dlna_flags() {
        assert!(dlna_flags(Vendor::Samsung).starts_with("DLNA.ORG_PN=AVC_MP4_MP_HD_1080i_AAC"));
        assert_eq!(dlna_flags(Vendor::Other), "*");
    }
}
