use crate::domain::connectivity::{ConnectivityEvent, ConnectivityState};
use crate::shared::config::NetworkConfig;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 32;

struct MonitorInner {
    state: ConnectivityState,
    /// When the current failure streak began; cleared on success.
    degraded_since: Option<Instant>,
}

/// Tracks online/offline state from heartbeat outcomes plus the low-level
/// network signal. The OS signal is a hint only; heartbeat success/failure is
/// authoritative. Observers get a broadcast receiver; dropping it
/// unsubscribes. Events fire on actual transitions only.
pub struct ConnectivityMonitor {
    inner: RwLock<MonitorInner>,
    events: broadcast::Sender<ConnectivityEvent>,
    offline_threshold: Duration,
}

impl ConnectivityMonitor {
    pub fn new(config: &NetworkConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(MonitorInner {
                state: ConnectivityState::Connecting,
                degraded_since: None,
            }),
            events,
            offline_threshold: Duration::from_secs(config.offline_threshold_secs),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    pub async fn current(&self) -> ConnectivityState {
        self.inner.read().await.state
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;
        inner.degraded_since = None;
        self.transition(&mut inner, ConnectivityState::Connected);
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.write().await;
        let since = *inner.degraded_since.get_or_insert_with(Instant::now);

        match inner.state {
            ConnectivityState::Connected => {
                self.transition(&mut inner, ConnectivityState::Reconnecting);
            }
            ConnectivityState::Reconnecting | ConnectivityState::Connecting => {
                if since.elapsed() >= self.offline_threshold {
                    self.transition(&mut inner, ConnectivityState::Offline);
                }
            }
            ConnectivityState::Offline => {}
        }
    }

    /// Low-level "network unreachable" signal: drop straight to offline
    /// without waiting out the failure threshold.
    pub async fn network_unreachable(&self) {
        let mut inner = self.inner.write().await;
        inner.degraded_since.get_or_insert_with(Instant::now);
        self.transition(&mut inner, ConnectivityState::Offline);
    }

    /// Best-effort "network available" hint. Does not transition by itself;
    /// the next heartbeat confirms.
    pub fn network_hint_online(&self) {
        debug!("network hint: online; awaiting heartbeat confirmation");
    }

    fn transition(&self, inner: &mut MonitorInner, to: ConnectivityState) {
        if inner.state == to {
            return;
        }
        let event = ConnectivityEvent {
            from: inner.state,
            to,
            at: Utc::now(),
        };
        inner.state = to;
        info!(from = %event.from, to = %event.to, "connectivity changed");
        // No receivers is fine; observers come and go.
        let _ = self.events.send(event);
    }
}
