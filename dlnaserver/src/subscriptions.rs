//! GENA event subscription bookkeeping for `/ContentDirectory/event` and
//! `/ConnectionManager/event`, per §4.2: we never actually publish events
//! (no state-change notifications are implemented), we just keep a
//! SUBSCRIBE/UNSUBSCRIBE handshake that satisfies renderers that insist on
//! one before they'll browse.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// A single subscriber's SID and when its lease expires.
struct Subscription {
    expires_at: Instant,
}

pub struct SubscriptionRegistry {
    subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// A fresh `SUBSCRIBE` with a `CALLBACK` header: mint a new SID.
    pub async fn subscribe(&self) -> (Uuid, u64) {
        let sid = Uuid::new_v4();
        let mut subs = self.subscriptions.lock().await;
        subs.insert(
            sid,
            Subscription {
                expires_at: Instant::now() + Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
        );
        (sid, DEFAULT_TIMEOUT_SECS)
    }

    /// A renewal `SUBSCRIBE` carrying an existing `SID` instead of a
    /// `CALLBACK`. Renews if known, otherwise behaves like a fresh
    /// subscription so a renderer that lost its lease can recover.
    pub async fn renew(&self, sid: Uuid) -> u64 {
        let mut subs = self.subscriptions.lock().await;
        subs.entry(sid).or_insert_with(|| Subscription {
            expires_at: Instant::now(),
        });
        if let Some(sub) = subs.get_mut(&sid) {
            sub.expires_at = Instant::now() + Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        }
        DEFAULT_TIMEOUT_SECS
    }

    pub async fn unsubscribe(&self, sid: Uuid) {
        self.subscriptions.lock().await.remove(&sid);
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
