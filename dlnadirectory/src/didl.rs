//! Assembly of DIDL-Lite `<container>`/`<item>` records from catalog items,
//! per §4.3's "Container XML"/"Item XML" sections.

use crate::classmap::{self, find_stream};
use dlnacatalog::{CatalogClient, CatalogItem, ItemType, StreamType};
use dlnadidl::{Container, Item, Resource, truncate_with_ellipsis};
use dlnautil::Vendor;

const DESCRIPTION_MAX_CHARS: usize = 200;
const MAX_ARTISTS: usize = 3;
const MAX_GENRES: usize = 2;

/// Builds the `<container>` for a top-level library or a nested container
/// item (Series, Season, MusicAlbum, a plain Folder…).
pub fn build_container(
    item: &CatalogItem,
    object_id: &str,
    parent_object_id: &str,
    child_count: u32,
    catalog: &dyn CatalogClient,
    vendor: Vendor,
    is_library_root: bool,
) -> Container {
    let class = if is_library_root {
        classmap::library_root_class(item.collection_type.as_deref())
    } else {
        classmap::upnp_class(item)
    };

    let mut container = Container::new(object_id, parent_object_id, item.name.clone(), class, child_count);
    container.album_art_uri = Some(catalog.image_url(&item.id.to_string(), "Primary"));

    if vendor == Vendor::Samsung {
        container.icon = container.album_art_uri.clone();
        container.dcm_info = Some("CREATIONDATE=0,FOLDER=1".to_string());
    }

    container
}

/// Builds the `<item>` (with its single `<res>`) for a leaf media item.
pub fn build_item(
    item: &CatalogItem,
    object_id: &str,
    parent_object_id: &str,
    catalog: &dyn CatalogClient,
    vendor: Vendor,
    stream_base_url: &str,
) -> Item {
    let class = classmap::upnp_class(item);
    let title = match item.item_type {
        ItemType::Episode => format!("{}. {}", item.index_number.unwrap_or(0), item.name),
        _ => item.name.clone(),
    };

    let mut didl_item = Item::new(object_id, parent_object_id, title, class);
    didl_item.album_art_uri = Some(catalog.image_url(&item.id.to_string(), "Primary"));
    didl_item.description = item
        .overview
        .as_deref()
        .map(|overview| truncate_with_ellipsis(overview, DESCRIPTION_MAX_CHARS));
    didl_item.date = item.production_year.map(|year| year.to_string());

    if item.item_type == ItemType::Episode {
        didl_item.episode_number = item.index_number;
        didl_item.episode_season = item.parent_index_number;
        didl_item.series_title = item.series_name.clone();
    }

    if matches!(item.item_type, ItemType::Audio | ItemType::AudioBook) {
        didl_item.album = item.album.clone();
        didl_item.artists = item.artists.iter().take(MAX_ARTISTS).cloned().collect();
    }
    didl_item.genres = item.genres.iter().take(MAX_GENRES).cloned().collect();

    didl_item.resource = Some(build_resource(item, catalog, vendor, stream_base_url));

    if vendor == Vendor::Samsung {
        didl_item.icon = didl_item.album_art_uri.clone();
        didl_item.dcm_info = Some("CREATIONDATE=0,FOLDER=0,BM=0".to_string());
    }

    didl_item
}

fn build_resource(item: &CatalogItem, catalog: &dyn CatalogClient, vendor: Vendor, stream_base_url: &str) -> Resource {
    let media_source = item.media_sources.first();
    let mime = classmap::mime_type(item, media_source);
    let protocol_info = format!("http-get:*:{mime}:{}", classmap::dlna_flags(vendor));
    let url = format!("{}/stream/{}", stream_base_url.trim_end_matches('/'), item.id);
    let _ = catalog; // resource URLs always point back at this server, never the upstream, per §4.3.

    let mut resource = Resource::new(protocol_info, url);
    resource.size = media_source.and_then(|m| m.size);

    let ticks = item.run_time_ticks.or(media_source.and_then(|m| m.run_time_ticks)).unwrap_or(0);
    resource.duration = (ticks > 0).then(|| dlnautil::format_duration(ticks));

    if let Some(video) = find_stream(media_source, StreamType::Video) {
        if let (Some(w), Some(h)) = (video.width, video.height) {
            resource.resolution = Some(format!("{w}x{h}"));
        }
    }
    resource.bitrate = media_source.and_then(|m| m.bitrate).map(i64::from);
    if let Some(audio) = find_stream(media_source, StreamType::Audio) {
        resource.sample_frequency = audio.sample_rate;
        resource.nr_audio_channels = audio.channels;
    }

    resource
}
