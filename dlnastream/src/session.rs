//! `PlaybackSession`/`StreamProgress` state and the `PlaybackTracker` that
//! reports their lifecycle to the upstream catalog, per §4.5. The
//! `item_id -> session_id` dedup index lives here too: §9 has sessions
//! owned by the tracker and indexes hold only opaque ids, never the record.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dlnacatalog::{
    CatalogClient, PlayMethod, PlaybackProgressPayload, PlaybackStartPayload, PlaybackStoppedPayload,
};
use dlnautil::ONE_SECOND_TICKS;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

const DEDUP_WINDOW: Duration = Duration::from_secs(30);
const SEEK_THRESHOLD_TICKS: i64 = 10 * ONE_SECOND_TICKS;
const ACTIVE_STALENESS: Duration = Duration::from_secs(15 * 60);
const PAUSED_STALENESS: Duration = Duration::from_secs(2 * 60 * 60);
const PAUSE_MIN_BYTES: u64 = 5 * 1024 * 1024;
const PAUSE_MIN_SECS: u64 = 30;
const PAUSE_MAX_WATCHED_RATIO: f64 = 0.95;
const WATCHED_RATIO: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub session_id: Uuid,
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub start_time: Instant,
    pub last_progress_update: Instant,
    pub last_position_ticks: i64,
    pub is_paused: bool,
    pub user_agent: String,
    pub client_endpoint: SocketAddr,
    pub total_bytes_streamed: u64,
    pub initial_position_ticks: i64,
    pub play_method: PlayMethod,
}

#[derive(Debug, Clone)]
pub struct StreamProgress {
    pub current_ticks: i64,
    pub last_reported_position: i64,
    pub last_reported_time: Instant,
    pub last_update_time: Instant,
    pub total_bytes_streamed: u64,
    pub has_been_seeked: bool,
    pub last_seek_time: Option<Instant>,
    pub report_count: u32,
}

/// Owns every active [`PlaybackSession`], reports Start/Progress/Stop to
/// the upstream catalog, and runs the periodic staleness sweep of §4.5.
pub struct PlaybackTracker {
    catalog: Arc<dyn CatalogClient>,
    sessions: Mutex<HashMap<Uuid, PlaybackSession>>,
    progress: Mutex<HashMap<Uuid, StreamProgress>>,
    item_index: Mutex<HashMap<Uuid, Uuid>>,
    stopped: Mutex<HashSet<Uuid>>,
}

impl PlaybackTracker {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            catalog,
            sessions: Mutex::new(HashMap::new()),
            progress: Mutex::new(HashMap::new()),
            item_index: Mutex::new(HashMap::new()),
            stopped: Mutex::new(HashSet::new()),
        }
    }

    /// Starts (or, within the dedup window, reuses) a session for
    /// `item_id`, reporting `playbackstart` (or a seek-progress) upstream.
    pub async fn begin_session(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        user_agent: &str,
        client_endpoint: SocketAddr,
        start_position_ticks: i64,
        play_method: PlayMethod,
    ) -> Uuid {
        if let Some(session_id) = self.reusable_session(item_id).await {
            if self.seek_differs(session_id, start_position_ticks).await {
                self.apply_seek(session_id, start_position_ticks, play_method).await;
            }
            return session_id;
        }

        self.evict_stale_index_entry(item_id).await;

        let now = Instant::now();
        let session_id = Uuid::new_v4();
        let session = PlaybackSession {
            session_id,
            item_id,
            user_id,
            start_time: now,
            last_progress_update: now,
            last_position_ticks: start_position_ticks,
            is_paused: false,
            user_agent: user_agent.to_string(),
            client_endpoint,
            total_bytes_streamed: 0,
            initial_position_ticks: start_position_ticks,
            play_method,
        };
        let progress = StreamProgress {
            current_ticks: start_position_ticks,
            last_reported_position: start_position_ticks,
            last_reported_time: now,
            last_update_time: now,
            total_bytes_streamed: 0,
            has_been_seeked: false,
            last_seek_time: None,
            report_count: 0,
        };

        self.sessions.lock().await.insert(session_id, session);
        self.progress.lock().await.insert(session_id, progress);
        self.item_index.lock().await.insert(item_id, session_id);

        let payload = PlaybackStartPayload::new(
            user_id,
            item_id,
            &session_id.to_string(),
            play_method,
            start_position_ticks,
        );
        if let Err(err) = self.catalog.report_playback_start(&payload).await {
            warn!(%err, %session_id, "failed to report playback start");
        }

        session_id
    }

    async fn reusable_session(&self, item_id: Uuid) -> Option<Uuid> {
        let session_id = *self.item_index.lock().await.get(&item_id)?;
        let fresh = self
            .progress
            .lock()
            .await
            .get(&session_id)
            .map(|p| p.last_update_time.elapsed() <= DEDUP_WINDOW)
            .unwrap_or(false);
        fresh.then_some(session_id)
    }

    async fn seek_differs(&self, session_id: Uuid, new_position_ticks: i64) -> bool {
        self.progress
            .lock()
            .await
            .get(&session_id)
            .map(|p| (new_position_ticks - p.current_ticks).abs() > SEEK_THRESHOLD_TICKS)
            .unwrap_or(false)
    }

    async fn apply_seek(&self, session_id: Uuid, new_position_ticks: i64, play_method: PlayMethod) {
        let now = Instant::now();
        let target = {
            let mut sessions = self.sessions.lock().await;
            let Some(session) = sessions.get_mut(&session_id) else {
                return;
            };
            session.last_position_ticks = new_position_ticks;
            session.last_progress_update = now;
            (session.user_id, session.item_id)
        };
        {
            let mut progress = self.progress.lock().await;
            if let Some(p) = progress.get_mut(&session_id) {
                p.current_ticks = new_position_ticks;
                p.has_been_seeked = true;
                p.last_seek_time = Some(now);
                p.last_update_time = now;
            }
        }
        let (user_id, item_id) = target;
        self.send_progress(session_id, user_id, item_id, new_position_ticks, false, play_method)
            .await;
    }

    /// A dedup-index entry pointing at a session that fell out of the
    /// window is replaced, but the session it pointed at still gets a
    /// proper (non-watched) Stop instead of silently vanishing.
    async fn evict_stale_index_entry(&self, item_id: Uuid) {
        let stale_session = self.item_index.lock().await.get(&item_id).copied();
        if let Some(session_id) = stale_session {
            self.stop(session_id, false).await;
        }
    }

    /// Records byte/clock activity without sending telemetry; called every
    /// iteration of the stream proxy's copy loop.
    pub async fn record_activity(&self, session_id: Uuid, bytes_delta: u64) {
        let now = Instant::now();
        if let Some(p) = self.progress.lock().await.get_mut(&session_id) {
            p.total_bytes_streamed += bytes_delta;
            p.last_update_time = now;
        }
        if let Some(s) = self.sessions.lock().await.get_mut(&session_id) {
            s.total_bytes_streamed += bytes_delta;
        }
    }

    /// The 15 s-cadence progress report; position is whatever the session
    /// currently holds, advanced only by [`Self::apply_seek`].
    pub async fn report_progress(&self, session_id: Uuid) {
        let snapshot = {
            let sessions = self.sessions.lock().await;
            let progress = self.progress.lock().await;
            let session = sessions.get(&session_id);
            let prog = progress.get(&session_id);
            match (session, prog) {
                (Some(s), Some(p)) => Some((s.user_id, s.item_id, p.current_ticks, s.is_paused, s.play_method)),
                _ => None,
            }
        };
        let Some((user_id, item_id, current_ticks, is_paused, play_method)) = snapshot else {
            return;
        };
        self.send_progress(session_id, user_id, item_id, current_ticks, is_paused, play_method)
            .await;
    }

    async fn send_progress(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        item_id: Uuid,
        current_ticks: i64,
        is_paused: bool,
        play_method: PlayMethod,
    ) {
        let now = Instant::now();
        if let Some(p) = self.progress.lock().await.get_mut(&session_id) {
            p.last_reported_position = current_ticks;
            p.last_reported_time = now;
            p.report_count += 1;
        }
        let payload = PlaybackProgressPayload::new(
            user_id,
            item_id,
            &session_id.to_string(),
            play_method,
            current_ticks,
            is_paused,
        );
        if let Err(err) = self.catalog.report_playback_progress(&payload).await {
            warn!(%err, %session_id, "failed to report playback progress");
        }
    }

    /// Destroys `session_id`, reporting Stop exactly once. A session
    /// already stopped (duplicate pause+disconnect, a repeat sweep pass)
    /// is silently a no-op, per §7's `SessionError`.
    pub async fn stop(&self, session_id: Uuid, watched: bool) {
        if !self.stopped.lock().await.insert(session_id) {
            return;
        }

        let session = self.sessions.lock().await.remove(&session_id);
        let progress = self.progress.lock().await.remove(&session_id);
        let Some(session) = session else {
            return;
        };

        {
            let mut index = self.item_index.lock().await;
            if index.get(&session.item_id) == Some(&session_id) {
                index.remove(&session.item_id);
            }
        }

        let position = progress.map(|p| p.current_ticks).unwrap_or(session.last_position_ticks);
        let payload = PlaybackStoppedPayload::new(
            session.user_id,
            session.item_id,
            &session_id.to_string(),
            session.play_method,
            position,
        );
        if let Err(err) = self.catalog.report_playback_stopped(&payload).await {
            warn!(%err, %session_id, "failed to report playback stopped");
        }

        if watched {
            if let Err(err) = self.catalog.mark_played(session.user_id, session.item_id).await {
                warn!(%err, %session_id, "failed to mark item played");
            }
        }
    }

    /// Clean end-of-stream: computes "watched" from `total_ticks` (when
    /// known, i.e. non-zero) and issues Stop.
    pub async fn handle_stream_end(&self, session_id: Uuid, total_ticks: i64) {
        let current_ticks = self
            .progress
            .lock()
            .await
            .get(&session_id)
            .map(|p| p.current_ticks)
            .unwrap_or(0);
        let watched = total_ticks > 0 && (current_ticks as f64) >= WATCHED_RATIO * total_ticks as f64;
        self.stop(session_id, watched).await;
    }

    /// The disconnect/I-O-error heuristic of §4.5: a long-enough,
    /// mostly-unwatched stream is treated as a pause and kept alive;
    /// everything else is a Stop.
    pub async fn handle_disconnect(&self, session_id: Uuid, total_ticks: i64) {
        let snapshot = {
            let sessions = self.sessions.lock().await;
            let progress = self.progress.lock().await;
            match (sessions.get(&session_id), progress.get(&session_id)) {
                (Some(s), Some(p)) => Some((s.start_time.elapsed(), p.total_bytes_streamed, p.current_ticks)),
                _ => None,
            }
        };
        let Some((elapsed, bytes_streamed, current_ticks)) = snapshot else {
            return;
        };

        let watched_ratio = if total_ticks > 0 {
            current_ticks as f64 / total_ticks as f64
        } else {
            0.0
        };
        let looks_like_pause = bytes_streamed >= PAUSE_MIN_BYTES
            && elapsed >= Duration::from_secs(PAUSE_MIN_SECS)
            && watched_ratio < PAUSE_MAX_WATCHED_RATIO;

        if looks_like_pause {
            if let Some(s) = self.sessions.lock().await.get_mut(&session_id) {
                s.is_paused = true;
            }
            self.report_progress(session_id).await;
        } else {
            self.stop(session_id, false).await;
        }
    }

    /// Destroys sessions idle past their staleness window (§4.5; the
    /// server lifecycle runs this every 5 min).
    pub async fn sweep_stale(&self) {
        let now = Instant::now();
        let stale: Vec<Uuid> = {
            let sessions = self.sessions.lock().await;
            let progress = self.progress.lock().await;
            sessions
                .iter()
                .filter_map(|(id, session)| {
                    let age = now.duration_since(progress.get(id)?.last_update_time);
                    let limit = if session.is_paused { PAUSED_STALENESS } else { ACTIVE_STALENESS };
                    (age > limit).then_some(*id)
                })
                .collect()
        };
        for session_id in stale {
            self.stop(session_id, false).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dlnacatalog::{CatalogItem, ItemsResponse, UserData};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct FakeCatalog {
        starts: AtomicUsize,
        progresses: AtomicUsize,
        stops: AtomicUsize,
        marked_played: AsyncMutex<Vec<(Uuid, Uuid)>>,
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn list_libraries(&self) -> dlnacatalog::Result<Vec<CatalogItem>> {
            unimplemented!()
        }
        async fn list_children(&self, _parent_id: &str) -> dlnacatalog::Result<Vec<CatalogItem>> {
            unimplemented!()
        }
        async fn get_item(&self, _item_id: &str) -> dlnacatalog::Result<CatalogItem> {
            unimplemented!()
        }
        async fn get_user_data(&self, _item_id: &str) -> dlnacatalog::Result<UserData> {
            unimplemented!()
        }
        fn stream_url(&self, _item_id: &str, _extra_params: &[(&str, &str)]) -> String {
            unimplemented!()
        }
        fn image_url(&self, _item_id: &str, _image_type: &str) -> String {
            unimplemented!()
        }
        fn subtitle_urls(&self, _item_id: &str, _stream_index: u32) -> Vec<String> {
            unimplemented!()
        }
        async fn report_playback_start(&self, _payload: &PlaybackStartPayload) -> dlnacatalog::Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn report_playback_progress(&self, _payload: &PlaybackProgressPayload) -> dlnacatalog::Result<()> {
            self.progresses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn report_playback_stopped(&self, _payload: &PlaybackStoppedPayload) -> dlnacatalog::Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn mark_played(&self, user_id: Uuid, item_id: Uuid) -> dlnacatalog::Result<()> {
            self.marked_played.lock().await.push((user_id, item_id));
            Ok(())
        }
    }

    fn endpoint() -> SocketAddr {
        "127.0.0.1:12345".parse().unwrap()
    }

    #[tokio::test]
    async fn starting_a_session_reports_exactly_one_start() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;

        assert_eq!(catalog.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn begin_session_within_dedup_window_reuses_the_same_session() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let first = tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;
        let second = tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;

        assert_eq!(first, second);
        assert_eq!(catalog.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reused_session_with_far_seek_reports_a_seek_progress() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;
        tracker
            .begin_session(
                item_id,
                user_id,
                "VLC/3.0",
                endpoint(),
                60 * ONE_SECOND_TICKS,
                PlayMethod::DirectPlay,
            )
            .await;

        assert_eq!(catalog.progresses.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn double_stop_reports_exactly_one_stop() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let session_id = tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;

        tracker.stop(session_id, false).await;
        tracker.stop(session_id, false).await;

        assert_eq!(catalog.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn watched_completion_marks_the_item_played() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let total_ticks = 60 * 60 * ONE_SECOND_TICKS;

        let session_id = tracker
            .begin_session(
                item_id,
                user_id,
                "VLC/3.0",
                endpoint(),
                (0.9 * total_ticks as f64) as i64,
                PlayMethod::DirectPlay,
            )
            .await;
        tracker.handle_stream_end(session_id, total_ticks).await;

        assert_eq!(catalog.marked_played.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn unwatched_disconnect_does_not_mark_played() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let total_ticks = 60 * 60 * ONE_SECOND_TICKS;

        let session_id = tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;
        tracker.handle_stream_end(session_id, total_ticks).await;

        assert!(catalog.marked_played.lock().await.is_empty());
    }

    #[tokio::test]
    async fn short_disconnect_stops_rather_than_pauses() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let session_id = tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;
        tracker.record_activity(session_id, 1024).await;
        tracker.handle_disconnect(session_id, 60 * 60 * ONE_SECOND_TICKS).await;

        assert_eq!(catalog.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn long_mostly_unwatched_disconnect_pauses_instead_of_stopping() {
        let catalog = Arc::new(FakeCatalog::default());
        let tracker = PlaybackTracker::new(catalog.clone());
        let item_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let session_id = tracker
            .begin_session(item_id, user_id, "VLC/3.0", endpoint(), 0, PlayMethod::DirectPlay)
            .await;
        tracker.record_activity(session_id, 10 * 1024 * 1024).await;
        {
            let mut sessions = tracker.sessions.lock().await;
            let session = sessions.get_mut(&session_id).unwrap();
            session.start_time = Instant::now() - Duration::from_secs(60);
        }

        tracker.handle_disconnect(session_id, 60 * 60 * ONE_SECOND_TICKS).await;

        assert_eq!(catalog.stops.load(Ordering::SeqCst), 0);
        assert_eq!(catalog.progresses.load(Ordering::SeqCst), 1);
    }
}
