//! The direct-play-vs-transcode decision and upstream URL construction, per
//! §4.5's "Direct-play decision" and "Upstream URL construction".

use dlnacatalog::{CatalogClient, ItemType, PlayMethod};
use dlnautil::Vendor;

const VLC_CONTAINERS: &[&str] = &["mp4", "mkv", "avi", "mov"];
const VLC_VIDEO_CODECS: &[&str] = &["h264", "hevc", "mpeg4", "mpeg2video", "vp9"];
const VLC_AUDIO_CODECS: &[&str] = &["aac", "mp3", "ac3", "eac3", "dts"];

/// The catalog's generic `media_type` string a `DeviceProfile.direct_play`
/// rule keys on; distinct from the more granular [`ItemType`] tag.
pub fn media_type(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Audio | ItemType::AudioBook => "Audio",
        ItemType::Photo => "Photo",
        _ => "Video",
    }
}

/// The direct-play/transcode decision tree of §4.5.
pub fn decide(
    profile: Option<&dlnaprofiles::DeviceProfile>,
    user_agent: &str,
    media_type: &str,
    container: Option<&str>,
    video_codec: Option<&str>,
    audio_codec: Option<&str>,
) -> PlayMethod {
    let (Some(profile), Some(container)) = (profile, container) else {
        return PlayMethod::Transcode;
    };

    if is_vlc_compatible(user_agent, container, video_codec, audio_codec) {
        return PlayMethod::DirectPlay;
    }

    if profile.direct_play_matches(media_type, container, video_codec, audio_codec) {
        PlayMethod::DirectPlay
    } else {
        PlayMethod::Transcode
    }
}

fn is_vlc_compatible(
    user_agent: &str,
    container: &str,
    video_codec: Option<&str>,
    audio_codec: Option<&str>,
) -> bool {
    if !user_agent.to_ascii_lowercase().contains("vlc") {
        return false;
    }
    let container_ok = VLC_CONTAINERS.contains(&container.to_ascii_lowercase().as_str());
    let video_ok = video_codec
        .map(|c| VLC_VIDEO_CODECS.contains(&c.to_ascii_lowercase().as_str()))
        .unwrap_or(true);
    let audio_ok = audio_codec
        .map(|c| VLC_AUDIO_CODECS.contains(&c.to_ascii_lowercase().as_str()))
        .unwrap_or(true);
    container_ok && video_ok && audio_ok
}

/// Builds the upstream media URL for `item_id`, per §4.5's "Upstream URL
/// construction": a direct-play URL carrying `Static=true` plus
/// vendor-specific stream-copy hints, or a transcode URL with the codec
/// and bitrate parameters the upstream transcoder expects.
pub fn upstream_url(
    catalog: &dyn CatalogClient,
    vendor: Vendor,
    item_id: &str,
    play_method: PlayMethod,
    max_streaming_bitrate: i64,
    start_position_ticks: i64,
) -> String {
    match play_method {
        PlayMethod::DirectPlay => {
            let mut params = vec![
                ("Static".to_string(), "true".to_string()),
                ("MaxStreamingBitrate".to_string(), max_streaming_bitrate.to_string()),
            ];
            params.extend(vendor_hints(vendor));
            let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            catalog.stream_url(item_id, &params)
        }
        PlayMethod::Transcode => {
            let mut params = vec![
                ("Container".to_string(), "mp4".to_string()),
                ("VideoCodec".to_string(), "h264".to_string()),
                ("AudioCodec".to_string(), "aac".to_string()),
                ("TranscodingMaxAudioChannels".to_string(), "2".to_string()),
                ("VideoBitRate".to_string(), max_streaming_bitrate.to_string()),
                ("AudioBitRate".to_string(), "128000".to_string()),
            ];
            if start_position_ticks > 0 {
                params.push(("StartTimeTicks".to_string(), start_position_ticks.to_string()));
            }
            let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            catalog.stream_url(item_id, &params)
        }
    }
}

fn vendor_hints(vendor: Vendor) -> Vec<(String, String)> {
    match vendor {
        Vendor::Samsung => vec![
            ("EnableAutoStreamCopy".to_string(), "true".to_string()),
            ("AllowVideoStreamCopy".to_string(), "true".to_string()),
            ("AllowAudioStreamCopy".to_string(), "true".to_string()),
        ],
        Vendor::Xbox => vec![
            ("VideoCodec".to_string(), "h264".to_string()),
            ("AudioCodec".to_string(), "aac".to_string()),
            ("EnableAutoStreamCopy".to_string(), "false".to_string()),
        ],
        Vendor::Lg => vec![("EnableAutoStreamCopy".to_string(), "true".to_string())],
        Vendor::Vlc | Vendor::Other => vec![],
    }
}
