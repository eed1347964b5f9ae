use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEventType {
    Heartbeat,
    Screenshot,
    Playback,
    Error,
}

impl QueueEventType {
    /// Types delivered through the queue, in drain order. Heartbeats are
    /// excluded: a queued heartbeat is superseded by the next live one.
    pub const DELIVERED: [QueueEventType; 3] = [
        QueueEventType::Screenshot,
        QueueEventType::Playback,
        QueueEventType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueEventType::Heartbeat => "heartbeat",
            QueueEventType::Screenshot => "screenshot",
            QueueEventType::Playback => "playback",
            QueueEventType::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "heartbeat" => Ok(QueueEventType::Heartbeat),
            "screenshot" => Ok(QueueEventType::Screenshot),
            "playback" => Ok(QueueEventType::Playback),
            "error" => Ok(QueueEventType::Error),
            other => Err(format!("Unknown queue event type: {other}")),
        }
    }
}

impl fmt::Display for QueueEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_variant() {
        for ty in [
            QueueEventType::Heartbeat,
            QueueEventType::Screenshot,
            QueueEventType::Playback,
            QueueEventType::Error,
        ] {
            assert_eq!(QueueEventType::parse(ty.as_str()).unwrap(), ty);
        }
        assert!(QueueEventType::parse("telemetry").is_err());
    }
}
