//! HTTP `/stream/{id}` handling: resolves the item and device profile,
//! makes the direct-play decision, opens the upstream GET, and pumps bytes
//! to the renderer while driving the [`PlaybackTracker`], per §4.5.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use dlnacatalog::{CatalogClient, MediaSource, StreamType};
use dlnaprofiles::{InMemoryProfileStore, ProfileMatcher, ProfileStore};
use futures::TryStreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::warn;
use uuid::Uuid;

use crate::direct_play;
use crate::error::StreamError;
use crate::seek::compute_start_position;
use crate::session::PlaybackTracker;

const COPY_BUFFER_BYTES: usize = 64 * 1024;
const PROGRESS_INTERVAL: Duration = Duration::from_secs(15);
const DIRECT_PLAY_CONTENT_FEATURES: &str = "DLNA.ORG_OP=01;DLNA.ORG_FLAGS=01700000000000000000000000000000";

/// What a caller of [`StreamProxy::stream`] knows about the inbound HTTP
/// request; everything else (item metadata, user data, device profile) is
/// resolved from the catalog and profile store.
pub struct StreamRequest {
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub user_agent: String,
    pub client_addr: SocketAddr,
    pub range: Option<String>,
}

pub struct StreamProxy<S: ProfileStore = InMemoryProfileStore> {
    catalog: Arc<dyn CatalogClient>,
    profiles: ProfileMatcher<S>,
    tracker: Arc<PlaybackTracker>,
    http: reqwest::Client,
}

impl<S: ProfileStore> StreamProxy<S> {
    pub fn new(catalog: Arc<dyn CatalogClient>, profiles: ProfileMatcher<S>, tracker: Arc<PlaybackTracker>) -> Self {
        Self {
            catalog,
            profiles,
            tracker,
            http: reqwest::Client::new(),
        }
    }

    pub async fn stream(&self, req: StreamRequest) -> Response {
        match self.try_stream(req).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "stream request failed before a session was established");
                error_response(err.as_http_status())
            }
        }
    }

    async fn try_stream(&self, req: StreamRequest) -> Result<Response, StreamError> {
        let item = self.catalog.get_item(&req.item_id.to_string()).await?;
        let user_data = self
            .catalog
            .get_user_data(&req.item_id.to_string())
            .await
            .unwrap_or_default();

        let media_source = item
            .media_sources
            .first()
            .ok_or_else(|| StreamError::NoMediaSource(req.item_id.to_string()))?;

        let profile = self.profiles.resolve(&req.user_agent, None, None);
        let vendor = dlnautil::vendor::classify(&req.user_agent);
        let media_type = direct_play::media_type(item.item_type);
        let container = media_source.container.as_deref();
        let video_codec = first_codec(media_source, StreamType::Video);
        let audio_codec = first_codec(media_source, StreamType::Audio);

        let play_method = direct_play::decide(
            Some(&profile),
            &req.user_agent,
            media_type,
            container,
            video_codec.as_deref(),
            audio_codec.as_deref(),
        );

        let total_ticks = item.run_time_ticks.unwrap_or(0);
        let start_position_ticks = compute_start_position(
            req.range.as_deref(),
            total_ticks,
            user_data.playback_position_ticks,
            user_data.played,
        );

        let upstream_url = direct_play::upstream_url(
            self.catalog.as_ref(),
            vendor,
            &req.item_id.to_string(),
            play_method,
            profile.max_streaming_bitrate,
            start_position_ticks,
        );

        let mut upstream_request = self.http.get(&upstream_url);
        if let Some(range) = &req.range {
            upstream_request = upstream_request.header("Range", range.clone());
        }
        let upstream_response = upstream_request.send().await?;

        let session_id = self
            .tracker
            .begin_session(
                req.item_id,
                req.user_id,
                &req.user_agent,
                req.client_addr,
                start_position_ticks,
                play_method,
            )
            .await;

        Ok(self.pump(upstream_response, session_id, total_ticks, play_method))
    }

    fn pump(
        &self,
        upstream_response: reqwest::Response,
        session_id: Uuid,
        total_ticks: i64,
        play_method: dlnacatalog::PlayMethod,
    ) -> Response {
        let status = if upstream_response.status() == reqwest::StatusCode::PARTIAL_CONTENT {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };

        let mut builder = Response::builder().status(status);
        for name in ["content-length", "content-range", "cache-control", "last-modified", "etag"] {
            if let Some(value) = upstream_response.headers().get(name) {
                builder = builder.header(name, value.clone());
            }
        }
        builder = builder
            .header("Accept-Ranges", HeaderValue::from_static("bytes"))
            .header("transferMode.dlna.org", HeaderValue::from_static("Streaming"));
        if matches!(play_method, dlnacatalog::PlayMethod::DirectPlay) {
            builder = builder.header("contentFeatures.dlna.org", HeaderValue::from_static(DIRECT_PLAY_CONTENT_FEATURES));
        }

        let (writer, reader) = tokio::io::duplex(COPY_BUFFER_BYTES);
        self.spawn_copy_loop(upstream_response, writer, session_id, total_ticks);

        let body = Body::from_stream(ReaderStream::new(reader));
        builder.body(body).unwrap_or_else(|_| error_response(502))
    }

    fn spawn_copy_loop(
        &self,
        upstream_response: reqwest::Response,
        mut writer: tokio::io::DuplexStream,
        session_id: Uuid,
        total_ticks: i64,
    ) {
        let tracker = self.tracker.clone();
        tokio::spawn(async move {
            let byte_stream = upstream_response
                .bytes_stream()
                .map_err(|err| std::io::Error::other(err));
            let mut upstream = StreamReader::new(byte_stream);
            let mut buf = vec![0u8; COPY_BUFFER_BYTES];
            let mut last_progress = Instant::now();

            loop {
                let read = upstream.read(&mut buf).await;
                let n = match read {
                    Ok(0) => {
                        tracker.handle_stream_end(session_id, total_ticks).await;
                        return;
                    }
                    Ok(n) => n,
                    Err(err) => {
                        warn!(%err, %session_id, "upstream read failed");
                        tracker.handle_disconnect(session_id, total_ticks).await;
                        return;
                    }
                };

                if writer.write_all(&buf[..n]).await.is_err() || writer.flush().await.is_err() {
                    tracker.handle_disconnect(session_id, total_ticks).await;
                    return;
                }

                tracker.record_activity(session_id, n as u64).await;

                if last_progress.elapsed() >= PROGRESS_INTERVAL {
                    tracker.report_progress(session_id).await;
                    last_progress = Instant::now();
                }
            }
        });
    }
}

fn first_codec(media_source: &MediaSource, stream_type: StreamType) -> Option<String> {
    media_source
        .media_streams
        .iter()
        .find(|s| s.stream_type == stream_type)
        .and_then(|s| s.codec.clone())
}

fn error_response(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    Response::builder()
        .status(status)
        .body(Body::from(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Body::from(Bytes::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlnacatalog::MediaStream;

    fn stream(stream_type: StreamType, codec: &str) -> MediaStream {
        MediaStream {
            stream_type,
            codec: Some(codec.to_string()),
            width: None,
            height: None,
            language: None,
            channels: None,
            sample_rate: None,
            index: None,
            is_external: false,
        }
    }

    #[test]
    fn first_codec_picks_the_matching_stream_type() {
        let source = MediaSource {
            container: Some("mp4".to_string()),
            size: None,
            bitrate: None,
            run_time_ticks: None,
            media_streams: vec![stream(StreamType::Video, "h264"), stream(StreamType::Audio, "aac")],
        };
        assert_eq!(first_codec(&source, StreamType::Video).as_deref(), Some("h264"));
        assert_eq!(first_codec(&source, StreamType::Audio).as_deref(), Some("aac"));
    }

    #[test]
    fn first_codec_is_none_when_no_stream_of_that_type_exists() {
        let source = MediaSource {
            container: Some("mp4".to_string()),
            size: None,
            bitrate: None,
            run_time_ticks: None,
            media_streams: vec![stream(StreamType::Audio, "aac")],
        };
        assert_eq!(first_codec(&source, StreamType::Video), None);
    }

    #[test]
    fn error_response_maps_unrecognized_status_to_bad_gateway() {
        let response = error_response(502);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
