//! `DlnaServer`: builds the Axum [`Router`] wiring every endpoint of §4.2
//! and owns the running SSDP engine, the playback tracker's staleness
//! sweep, and the SSE log tap.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Router, body::Bytes};
use dlnacatalog::{CatalogClient, HttpCatalogClient};
use dlnaconfig::Config;
use dlnadirectory::{ConnectionManager, ContentDirectory};
use dlnaprofiles::{InMemoryProfileStore, ProfileMatcher};
use dlnastream::{PlaybackTracker, StreamProxy, StreamRequest};
use dlnautil::vendor;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::logs::LogState;
use crate::subscriptions::SubscriptionRegistry;
use crate::subtitle::fetch_subtitle;

const SWEEP_INTERVAL_SECS: u64 = 60;

struct ServerState {
    content_directory: ContentDirectory,
    connection_manager: ConnectionManager,
    stream_proxy: StreamProxy<InMemoryProfileStore>,
    catalog: Arc<dyn CatalogClient>,
    tracker: Arc<PlaybackTracker>,
    subscriptions: SubscriptionRegistry,
    http: reqwest::Client,
    descriptor: dlnaconfig::DeviceDescriptor,
    local_ip: String,
    base_url: String,
    catalog_user_id: Uuid,
    server_header: String,
}

/// Builds a [`DlnaServer`] from the process configuration.
pub struct DlnaServerBuilder {
    config: Arc<Config>,
    log_state: Option<LogState>,
}

impl DlnaServerBuilder {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            log_state: None,
        }
    }

    /// Supplies the [`LogState`] the SSE log tap already writes into, so the
    /// subscriber can be initialized before the server is built. Falls back
    /// to a fresh [`LogState`] if never called.
    pub fn with_log_state(mut self, log_state: LogState) -> Self {
        self.log_state = Some(log_state);
        self
    }

    /// Resolves the local IP, constructs the device descriptor, the
    /// catalog client, profile matcher, playback tracker, and stream
    /// proxy, and binds the SSDP socket. Does not start any background
    /// task — call [`DlnaServer::start`] for that.
    pub async fn build(self) -> anyhow::Result<DlnaServer> {
        let config = self.config;
        let log_state = self.log_state.unwrap_or_default();
        config.validate()?;

        let local_ip = dlnautil::guess_local_ip();
        let http_port = config.get_dlna_port()?;
        let descriptor = config.build_device_descriptor(&local_ip)?;
        let base_url = format!("http://{local_ip}:{http_port}");

        let catalog_url = config.get_catalog_server_url()?;
        let access_token = config.get_catalog_access_token()?;
        let user_id = config.get_catalog_user_id()?;
        let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(
            catalog_url.as_str(),
            &access_token,
            user_id,
        )?);

        let profiles = ProfileMatcher::new(InMemoryProfileStore::with_defaults());
        let tracker = Arc::new(PlaybackTracker::new(catalog.clone()));
        let stream_proxy = StreamProxy::new(catalog.clone(), profiles, tracker.clone());

        let server_header = format!(
            "{}/1.0 UPnP/1.0 {}/{}",
            std::env::consts::OS,
            config.get_app_name(),
            config.get_app_version()
        );
        let ssdp = dlnaupnp::ssdp::SsdpEngine::bind(descriptor.uuid, http_port, &local_ip, server_header.clone())
            .await;

        let state = Arc::new(ServerState {
            content_directory: ContentDirectory::new(catalog.clone()),
            connection_manager: ConnectionManager::new(),
            stream_proxy,
            catalog,
            tracker,
            subscriptions: SubscriptionRegistry::new(),
            http: reqwest::Client::new(),
            descriptor,
            local_ip,
            base_url,
            catalog_user_id: user_id,
            server_header,
        });

        Ok(DlnaServer {
            state,
            ssdp: Arc::new(ssdp),
            http_port,
            log_state,
        })
    }
}

/// The built server: an Axum router plus the pieces that need an explicit
/// lifecycle (SSDP advertisement, the staleness sweep).
pub struct DlnaServer {
    state: Arc<ServerState>,
    ssdp: Arc<dlnaupnp::ssdp::SsdpEngine>,
    http_port: u16,
    log_state: LogState,
}

/// A running [`DlnaServer`]; call [`wait`](DlnaServerHandle::wait) to block
/// until Ctrl+C and shut everything down in order (HTTP listener, SSDP
/// byebye, staleness sweep).
pub struct DlnaServerHandle {
    ssdp: dlnaupnp::ssdp::SsdpHandle,
    http_task: JoinHandle<()>,
    sweep_task: JoinHandle<()>,
}

impl DlnaServer {
    pub fn log_state(&self) -> LogState {
        self.log_state.clone()
    }

    /// Binds the TCP listener, spawns the Axum server and the staleness
    /// sweep, and starts SSDP advertising. Returns a handle to wait on.
    pub async fn start(self) -> anyhow::Result<DlnaServerHandle> {
        let router = build_router(self.state.clone(), self.log_state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "DLNA HTTP control endpoint listening");

        let http_task = tokio::spawn(async move {
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(err) = axum::serve(listener, service).await {
                warn!(%err, "HTTP server exited with an error");
            }
        });

        let tracker = self.state.tracker.clone();
        let sweep_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                tracker.sweep_stale().await;
            }
        });

        let ssdp = self.ssdp.start();

        info!(uuid = %self.state.descriptor.uuid, base_url = %self.state.base_url, "SSDP advertising started");

        Ok(DlnaServerHandle {
            ssdp,
            http_task,
            sweep_task,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.state.catalog_user_id
    }
}

impl DlnaServerHandle {
    /// Waits for Ctrl+C, then shuts down in order: stop accepting new
    /// work, send `ssdp:byebye`, and stop the staleness sweep.
    pub async fn wait(self) {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");

        self.sweep_task.abort();
        self.ssdp.shutdown().await;
        self.http_task.abort();
    }
}

fn build_router(state: Arc<ServerState>, log_state: LogState) -> Router {
    Router::new()
        .route("/device.xml", get(device_xml))
        .route("/ContentDirectory/scpd.xml", get(content_directory_scpd))
        .route("/ConnectionManager/scpd.xml", get(connection_manager_scpd))
        .route("/ContentDirectory/control", post(content_directory_control))
        .route("/ConnectionManager/control", post(connection_manager_control))
        .route("/ContentDirectory/event", any(content_directory_event))
        .route("/ConnectionManager/event", any(connection_manager_event))
        .route("/stream/{id}", get(stream_item))
        .route("/subtitle/{id}/{index}", get(subtitle_item))
        .route("/logs/stream", get(crate::logs::log_stream))
        .route("/logs/dump", get(crate::logs::log_dump))
        .fallback(not_found)
        .with_state((state, log_state))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn device_xml(State((state, _)): State<(Arc<ServerState>, LogState)>) -> Response {
    let xml = dlnaupnp::description::render_device_xml(&state.descriptor, &state.local_ip);
    xml_response(xml, &state.server_header, Some("max-age=1800"), false)
}

async fn content_directory_scpd(State((state, _)): State<(Arc<ServerState>, LogState)>) -> Response {
    xml_response(dlnaupnp::description::content_directory_scpd().to_string(), &state.server_header, None, false)
}

async fn connection_manager_scpd(State((state, _)): State<(Arc<ServerState>, LogState)>) -> Response {
    xml_response(dlnaupnp::description::connection_manager_scpd().to_string(), &state.server_header, None, false)
}

/// Every XML response carries `Server`, per §4.2; SOAP control responses
/// additionally carry an empty `EXT:` header.
fn xml_response(body: String, server_header: &str, cache_control: Option<&str>, soap: bool) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", HeaderValue::from_static("text/xml; charset=utf-8"))
        .header("server", HeaderValue::from_str(server_header).unwrap_or_else(|_| HeaderValue::from_static("")));
    if let Some(cache_control) = cache_control {
        builder = builder.header("cache-control", HeaderValue::from_str(cache_control).unwrap());
    }
    if soap {
        builder = builder.header("ext", HeaderValue::from_static(""));
    }
    builder
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn request_vendor(headers: &HeaderMap) -> dlnautil::Vendor {
    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok()).unwrap_or("");
    vendor::classify(user_agent)
}

async fn content_directory_control(
    State((state, _)): State<(Arc<ServerState>, LogState)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let vendor = request_vendor(&headers);
    let xml = state
        .content_directory
        .handle_control(&body, vendor, &state.base_url)
        .await;
    xml_response(xml, &state.server_header, None, true)
}

async fn connection_manager_control(
    State((state, _)): State<(Arc<ServerState>, LogState)>,
    body: Bytes,
) -> Response {
    let xml = state.connection_manager.handle_control(&body);
    xml_response(xml, &state.server_header, None, true)
}

async fn content_directory_event(
    State((state, _)): State<(Arc<ServerState>, LogState)>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    handle_event(&state.subscriptions, method, headers).await
}

async fn connection_manager_event(
    State((state, _)): State<(Arc<ServerState>, LogState)>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    handle_event(&state.subscriptions, method, headers).await
}

/// Shared SUBSCRIBE/UNSUBSCRIBE handling for both event sub-URLs, per §4.2.
async fn handle_event(subscriptions: &SubscriptionRegistry, method: Method, headers: HeaderMap) -> Response {
    match method.as_str() {
        "SUBSCRIBE" => {
            let existing_sid = headers
                .get("sid")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim_start_matches("uuid:").parse::<Uuid>().ok());
            let has_callback = headers.contains_key("callback");

            let (sid, timeout) = if let Some(sid) = existing_sid {
                (sid, subscriptions.renew(sid).await)
            } else if has_callback {
                subscriptions.subscribe().await
            } else {
                return StatusCode::PRECONDITION_FAILED.into_response();
            };

            Response::builder()
                .status(StatusCode::OK)
                .header("sid", HeaderValue::from_str(&format!("uuid:{sid}")).unwrap())
                .header("timeout", HeaderValue::from_str(&format!("Second-{timeout}")).unwrap())
                .body(axum::body::Body::empty())
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        "UNSUBSCRIBE" => {
            if let Some(sid) = headers
                .get("sid")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim_start_matches("uuid:").parse::<Uuid>().ok())
            {
                subscriptions.unsubscribe(sid).await;
            }
            StatusCode::OK.into_response()
        }
        _ => Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("allow", HeaderValue::from_static("SUBSCRIBE, UNSUBSCRIBE"))
            .body(axum::body::Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
    }
}

async fn stream_item(
    State((state, _)): State<(Arc<ServerState>, LogState)>,
    Path(item_id): Path<Uuid>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
    let range = headers.get("range").and_then(|v| v.to_str().ok()).map(str::to_string);

    let request = StreamRequest {
        item_id,
        user_id: state.tracker_user_id(),
        user_agent,
        client_addr,
        range,
    };
    state.stream_proxy.stream(request).await
}

impl ServerState {
    fn tracker_user_id(&self) -> Uuid {
        // The server always streams/browses as the single catalog user
        // configured in `Catalog.UserId`; there is no per-request identity.
        self.catalog_user_id
    }
}

async fn subtitle_item(
    State((state, _)): State<(Arc<ServerState>, LogState)>,
    Path((item_id, stream_index)): Path<(Uuid, u32)>,
) -> Response {
    let candidates = state.catalog.subtitle_urls(&item_id.to_string(), stream_index);
    fetch_subtitle(&state.http, &candidates).await
}
