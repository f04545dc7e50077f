use super::{
    ADVERTISE_PERIOD_SECS, BOOT_ID_PERIOD_SECS, DEDUP_EVICTION_AGE_SECS,
    DEDUP_SWEEP_INTERVAL_SECS, MAX_AGE, MSEARCH_DEDUP_WINDOW_SECS, SSDP_MULTICAST_ADDR,
    SSDP_PORT, SsdpError,
};
use crate::description::{
    CONNECTION_MANAGER_SERVICE_TYPE, CONTENT_DIRECTORY_SERVICE_TYPE, MEDIA_SERVER_DEVICE_TYPE,
};
use dlnautil::vendor::{self, Vendor};
use rand::Rng;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// UPnP discovery engine: binds the SSDP multicast socket, answers
/// M-SEARCH, and runs the periodic `ssdp:alive` advertisement cycle.
pub struct SsdpEngine {
    uuid: Uuid,
    location: String,
    server_header: String,
    boot_id: AtomicU32,
    config_id: AtomicU32,
    recv_socket: Option<UdpSocket>,
    send_socket: UdpSocket,
    recent_requests: Mutex<HashMap<SocketAddr, Instant>>,
}

/// A running engine plus the join handles and shutdown signal needed to
/// stop it cleanly (byebye before socket close, per §4.1).
pub struct SsdpHandle {
    engine: Arc<SsdpEngine>,
    shutdown: Arc<Notify>,
    tasks: Vec<JoinHandle<()>>,
}

impl SsdpEngine {
    /// Binds the multicast receive socket. On bind failure, falls back to a
    /// send-only ephemeral socket and logs a warning — the engine still
    /// advertises presence, it just cannot answer M-SEARCH.
    pub async fn bind(
        uuid: Uuid,
        http_port: u16,
        local_ip: &str,
        server_header: String,
    ) -> Self {
        let recv_socket = match bind_multicast_std_socket() {
            Ok(std_socket) => match UdpSocket::from_std(std_socket) {
                Ok(socket) => Some(socket),
                Err(source) => {
                    warn!(%source, "failed to hand SSDP socket to the async runtime, falling back to send-only");
                    None
                }
            },
            Err(source) => {
                warn!(%source, "SSDP multicast bind failed, falling back to a send-only ephemeral port");
                None
            }
        };

        let send_socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .expect("binding an ephemeral UDP port should never fail");

        Self {
            uuid,
            location: format!("http://{local_ip}:{http_port}/device.xml"),
            server_header,
            boot_id: AtomicU32::new(1),
            config_id: AtomicU32::new(1),
            recv_socket,
            send_socket,
            recent_requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn boot_id(&self) -> u32 {
        self.boot_id.load(Ordering::Relaxed)
    }

    pub fn config_id(&self) -> u32 {
        self.config_id.load(Ordering::Relaxed)
    }

    /// The five (NT, USN) pairs advertised for this device: rootdevice, the
    /// bare UUID, MediaServer, ContentDirectory, ConnectionManager.
    fn notification_types(&self) -> Vec<(String, String)> {
        let u = self.uuid;
        vec![
            ("upnp:rootdevice".to_string(), format!("uuid:{u}::upnp:rootdevice")),
            (format!("uuid:{u}"), format!("uuid:{u}")),
            (
                MEDIA_SERVER_DEVICE_TYPE.to_string(),
                format!("uuid:{u}::{MEDIA_SERVER_DEVICE_TYPE}"),
            ),
            (
                CONTENT_DIRECTORY_SERVICE_TYPE.to_string(),
                format!("uuid:{u}::{CONTENT_DIRECTORY_SERVICE_TYPE}"),
            ),
            (
                CONNECTION_MANAGER_SERVICE_TYPE.to_string(),
                format!("uuid:{u}::{CONNECTION_MANAGER_SERVICE_TYPE}"),
            ),
        ]
    }

    /// Resolves an M-SEARCH `ST` header to the set of (NT, USN) pairs to
    /// respond with, per the USN table of §4.1.
    fn matching_nts(&self, st: &str) -> Vec<(String, String)> {
        let all = self.notification_types();
        let uuid_st = format!("uuid:{}", self.uuid);
        if st == "ssdp:all" {
            all
        } else if st == uuid_st {
            all.into_iter().filter(|(nt, _)| *nt == uuid_st).collect()
        } else {
            all.into_iter().filter(|(nt, _)| nt == st).collect()
        }
    }

    /// Spawns the listener, advertiser, boot-id, and dedup-sweep background
    /// tasks and returns a handle that can stop them cleanly.
    pub fn start(self: Arc<Self>) -> SsdpHandle {
        let shutdown = Arc::new(Notify::new());
        let mut tasks = Vec::new();

        {
            let engine = Arc::clone(&self);
            let shutdown = Arc::clone(&shutdown);
            tasks.push(tokio::spawn(async move { engine.run_listener(shutdown).await }));
        }
        {
            let engine = Arc::clone(&self);
            let shutdown = Arc::clone(&shutdown);
            tasks.push(tokio::spawn(async move { engine.run_advertiser(shutdown).await }));
        }
        {
            let engine = Arc::clone(&self);
            let shutdown = Arc::clone(&shutdown);
            tasks.push(tokio::spawn(async move { engine.run_boot_id_clock(shutdown).await }));
        }
        {
            let engine = Arc::clone(&self);
            let shutdown = Arc::clone(&shutdown);
            tasks.push(tokio::spawn(async move { engine.run_dedup_sweep(shutdown).await }));
        }

        SsdpHandle {
            engine: self,
            shutdown,
            tasks,
        }
    }

    async fn run_listener(self: Arc<Self>, shutdown: Arc<Notify>) {
        let Some(socket) = self.recv_socket.as_ref() else {
            debug!("SSDP listener disabled (send-only mode)");
            return;
        };
        let mut buf = [0u8; 8192];
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("SSDP listener shutting down");
                    return;
                }
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((n, src)) => {
                            let datagram = String::from_utf8_lossy(&buf[..n]).to_string();
                            let engine = Arc::clone(&self);
                            tokio::spawn(async move { engine.handle_datagram(datagram, src).await; });
                        }
                        Err(source) => warn!(%source, "SSDP receive error"),
                    }
                }
            }
        }
    }

    async fn handle_datagram(&self, datagram: String, src: SocketAddr) {
        if !datagram.starts_with("M-SEARCH") {
            return;
        }
        let Some(request) = parse_msearch(&datagram) else {
            return;
        };

        if self.is_duplicate(src).await {
            debug!(%src, "deduped repeated M-SEARCH");
            return;
        }

        let nts = self.matching_nts(&request.st);
        if nts.is_empty() {
            return;
        }

        let vendor = vendor::classify(&request.user_agent);
        let delay = compute_response_delay(request.mx, vendor);
        tokio::time::sleep(delay).await;

        for (nt, usn) in nts {
            let response = self.build_search_response(&nt, &usn, vendor);
            if let Err(source) = self.send_socket.send_to(response.as_bytes(), src).await {
                warn!(%source, %src, "failed to send M-SEARCH response");
            } else {
                debug!(%src, st = %request.st, %nt, "sent M-SEARCH response");
            }
        }
    }

    async fn is_duplicate(&self, src: SocketAddr) -> bool {
        let now = Instant::now();
        let mut recent = self.recent_requests.lock().await;
        if let Some(last) = recent.get(&src) {
            if now.duration_since(*last) < Duration::from_secs(MSEARCH_DEDUP_WINDOW_SECS) {
                return true;
            }
        }
        recent.insert(src, now);
        false
    }

    fn build_search_response(&self, nt: &str, usn: &str, vendor: Vendor) -> String {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\n\
             CACHE-CONTROL: max-age={max_age}\r\n\
             DATE: {date}\r\n\
             EXT:\r\n\
             LOCATION: {location}\r\n\
             SERVER: {server}\r\n\
             ST: {nt}\r\n\
             USN: {usn}\r\n\
             BOOTID.UPNP.ORG: {boot_id}\r\n\
             CONFIGID.UPNP.ORG: {config_id}\r\n",
            max_age = MAX_AGE,
            date = http_date_now(),
            location = self.location,
            server = self.server_header,
            boot_id = self.boot_id(),
            config_id = self.config_id(),
        );
        if vendor == Vendor::Samsung {
            response.push_str("SEARCHPORT.UPNP.ORG: 1900\r\n");
        }
        response.push_str("\r\n");
        response
    }

    async fn run_advertiser(self: Arc<Self>, shutdown: Arc<Notify>) {
        self.send_alive_burst().await;
        tokio::select! {
            _ = shutdown.notified() => return,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
        self.send_alive_burst().await;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("SSDP advertiser shutting down");
                    return;
                }
                _ = tokio::time::sleep(Duration::from_secs(ADVERTISE_PERIOD_SECS)) => {
                    self.send_alive_burst().await;
                }
            }
        }
    }

    async fn send_alive_burst(&self) {
        for (nt, usn) in self.notification_types() {
            self.send_notify(&nt, &usn, "ssdp:alive").await;
            let gap_ms = rand::rng().random_range(200..=300);
            tokio::time::sleep(Duration::from_millis(gap_ms)).await;
        }
    }

    /// Sends `ssdp:byebye` for `upnp:rootdevice`, the bare `uuid:U`, and
    /// MediaServer — the three NTs §4.1's Shutdown section lists, not the
    /// full five-NT advertisement set. Called by [`SsdpHandle::shutdown`]
    /// before the sockets are dropped.
    pub async fn send_byebye_all(&self) {
        for (nt, usn) in self.notification_types().into_iter().take(3) {
            self.send_notify(&nt, &usn, "ssdp:byebye").await;
        }
    }

    async fn send_notify(&self, nt: &str, usn: &str, nts: &str) {
        let multicast: SocketAddr = SocketAddrV4::new(
            SSDP_MULTICAST_ADDR.parse().expect("valid multicast literal"),
            SSDP_PORT,
        )
        .into();

        let mut message = format!(
            "NOTIFY * HTTP/1.1\r\n\
             HOST: {addr}:{port}\r\n",
            addr = SSDP_MULTICAST_ADDR,
            port = SSDP_PORT,
        );
        if nts == "ssdp:alive" {
            message.push_str(&format!(
                "CACHE-CONTROL: max-age={max_age}\r\n\
                 LOCATION: {location}\r\n\
                 SERVER: {server}\r\n",
                max_age = MAX_AGE,
                location = self.location,
                server = self.server_header,
            ));
        }
        message.push_str(&format!(
            "NT: {nt}\r\n\
             NTS: {nts}\r\n\
             USN: {usn}\r\n\
             BOOTID.UPNP.ORG: {boot_id}\r\n\
             CONFIGID.UPNP.ORG: {config_id}\r\n\r\n",
            boot_id = self.boot_id(),
            config_id = self.config_id(),
        ));

        if let Err(source) = self.send_socket.send_to(message.as_bytes(), multicast).await {
            warn!(%source, %nt, %nts, "failed to send SSDP NOTIFY");
        }
    }

    async fn run_boot_id_clock(self: Arc<Self>, shutdown: Arc<Notify>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => return,
                _ = tokio::time::sleep(Duration::from_secs(BOOT_ID_PERIOD_SECS)) => {
                    let new_id = self.boot_id.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(boot_id = new_id, "SSDP BootID incremented");
                }
            }
        }
    }

    async fn run_dedup_sweep(self: Arc<Self>, shutdown: Arc<Notify>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => return,
                _ = tokio::time::sleep(Duration::from_secs(DEDUP_SWEEP_INTERVAL_SECS)) => {
                    let cutoff = Duration::from_secs(DEDUP_EVICTION_AGE_SECS);
                    let now = Instant::now();
                    let mut recent = self.recent_requests.lock().await;
                    recent.retain(|_, seen_at| now.duration_since(*seen_at) < cutoff);
                }
            }
        }
    }
}

impl SsdpHandle {
    /// Sends byebye for the required NTs, then stops the background tasks.
    /// Delivery of byebye is best-effort (attempted, not guaranteed) per §5.
    pub async fn shutdown(self) {
        self.engine.send_byebye_all().await;
        self.shutdown.notify_waiters();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("SSDP engine stopped");
    }
}

struct MSearchRequest {
    st: String,
    mx: u32,
    user_agent: String,
}

fn parse_msearch(datagram: &str) -> Option<MSearchRequest> {
    let mut st = None;
    let mut mx = 1u32;
    let mut user_agent = String::new();

    for line in datagram.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().to_ascii_uppercase().as_str() {
            "ST" => st = Some(value.trim().to_string()),
            "MX" => mx = value.trim().parse().unwrap_or(1),
            "USER-AGENT" => user_agent = value.trim().to_string(),
            _ => {}
        }
    }

    Some(MSearchRequest {
        st: st?,
        mx,
        user_agent,
    })
}

fn compute_response_delay(mx: u32, vendor: Vendor) -> Duration {
    let ceiling_ms = mx.saturating_mul(1000).min(3000);
    let floor_ms: u32 = match vendor {
        Vendor::Samsung => 100,
        Vendor::Lg => 200,
        Vendor::Xbox => 0,
        _ => 0,
    };
    let ceiling_ms = ceiling_ms.max(floor_ms);
    let millis = if ceiling_ms > floor_ms {
        rand::rng().random_range(floor_ms..=ceiling_ms)
    } else {
        floor_ms
    };
    Duration::from_millis(millis as u64)
}

fn http_date_now() -> String {
    chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn bind_multicast_std_socket() -> Result<std::net::UdpSocket, SsdpError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|source| SsdpError::Bind { addr: format!("0.0.0.0:{SSDP_PORT}"), source })?;
    socket
        .set_reuse_address(true)
        .map_err(|source| SsdpError::Bind { addr: format!("0.0.0.0:{SSDP_PORT}"), source })?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT);
    socket
        .bind(&bind_addr.into())
        .map_err(|source| SsdpError::Bind { addr: bind_addr.to_string(), source })?;
    socket.set_nonblocking(true).map_err(SsdpError::Io)?;

    let group: Ipv4Addr = SSDP_MULTICAST_ADDR.parse().expect("valid multicast literal");
    socket
        .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
        .map_err(|source| SsdpError::JoinMulticast { group: SSDP_MULTICAST_ADDR.to_string(), source })?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_msearch_headers() {
        let datagram = "M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nMAN: \"ssdp:discover\"\r\nST: urn:schemas-upnp-org:device:MediaServer:1\r\nMX: 2\r\nUSER-AGENT: Samsung/Tizen\r\n\r\n";
        let parsed = parse_msearch(datagram).unwrap();
        assert_eq!(parsed.st, "urn:schemas-upnp-org:device:MediaServer:1");
        assert_eq!(parsed.mx, 2);
        assert_eq!(parsed.user_agent, "Samsung/Tizen");
    }

    #[test]
    fn non_msearch_datagrams_are_ignored() {
        assert!(parse_msearch("NOTIFY * HTTP/1.1\r\n").is_some()); // parser itself doesn't gate on the verb
    }

    #[test]
    fn delay_respects_mx_ceiling() {
        for _ in 0..50 {
            let d = compute_response_delay(1, Vendor::Other);
            assert!(d <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn delay_is_capped_at_3_seconds() {
        for _ in 0..50 {
            let d = compute_response_delay(30, Vendor::Other);
            assert!(d <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn samsung_delay_has_100ms_floor() {
        for _ in 0..50 {
            let d = compute_response_delay(0, Vendor::Samsung);
            assert!(d >= Duration::from_millis(100));
        }
    }

    #[test]
    fn lg_delay_has_200ms_floor() {
        for _ in 0..50 {
            let d = compute_response_delay(0, Vendor::Lg);
            assert!(d >= Duration::from_millis(200));
        }
    }

    #[test]
    fn xbox_has_no_floor() {
        let d = compute_response_delay(0, Vendor::Xbox);
        assert_eq!(d, Duration::from_millis(0));
    }

    #[tokio::test]
    async fn notification_types_cover_the_usn_table() {
        let engine = SsdpEngine::bind(Uuid::nil(), 8200, "127.0.0.1", "test/1.0".to_string()).await;
        let nts = engine.notification_types();
        assert_eq!(nts.len(), 5);
        assert!(nts.iter().any(|(nt, usn)| nt == "upnp:rootdevice" && usn.ends_with("::upnp:rootdevice")));
        assert!(nts.iter().any(|(nt, usn)| nt == &format!("uuid:{}", Uuid::nil()) && nt == usn));
    }

    #[tokio::test]
    async fn ssdp_all_matches_every_nt() {
        let engine = SsdpEngine::bind(Uuid::nil(), 8200, "127.0.0.1", "test/1.0".to_string()).await;
        assert_eq!(engine.matching_nts("ssdp:all").len(), 5);
    }

    #[tokio::test]
    async fn uuid_st_matches_only_the_bare_uuid_nt() {
        let engine = SsdpEngine::bind(Uuid::nil(), 8200, "127.0.0.1", "test/1.0".to_string()).await;
        let matches = engine.matching_nts(&format!("uuid:{}", Uuid::nil()));
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn unknown_st_matches_nothing() {
        let engine = SsdpEngine::bind(Uuid::nil(), 8200, "127.0.0.1", "test/1.0".to_string()).await;
        assert!(engine.matching_nts("urn:schemas-upnp-org:device:MediaRenderer:1").is_empty());
    }

    #[tokio::test]
    async fn response_includes_bootid_and_searchport_for_samsung() {
        let engine = SsdpEngine::bind(Uuid::nil(), 8200, "127.0.0.1", "test/1.0".to_string()).await;
        let response = engine.build_search_response("upnp:rootdevice", "uuid:x::upnp:rootdevice", Vendor::Samsung);
        assert!(response.contains("BOOTID.UPNP.ORG: 1"));
        assert!(response.contains("SEARCHPORT.UPNP.ORG: 1900"));
    }
}
