use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transient connectivity state, derived from heartbeat outcomes. Never
/// persisted; a restarted player begins in `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Connecting,
    Connected,
    Reconnecting,
    Offline,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectivityState::Connecting => "connecting",
            ConnectivityState::Connected => "connected",
            ConnectivityState::Reconnecting => "reconnecting",
            ConnectivityState::Offline => "offline",
        };
        write!(f, "{label}")
    }
}

/// Emitted on actual transitions only; repeated identical states are absorbed
/// by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityEvent {
    pub from: ConnectivityState,
    pub to: ConnectivityState,
    pub at: DateTime<Utc>,
}

impl ConnectivityEvent {
    pub fn is_back_online(&self) -> bool {
        self.from == ConnectivityState::Offline && self.to == ConnectivityState::Connected
    }
}
