//! Event channel protocol: frame envelope, event names and typed alert events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::models::{Alert, AlertId, AlertPatch};

pub const EVENT_ALERT_NEW: &str = "alert:new";
pub const EVENT_ALERT_UPDATED: &str = "alert:updated";
pub const EVENT_ALERT_STATUS_UPDATED: &str = "alert:status_updated";
pub const EVENT_ALERT_ASSIGNED: &str = "alert:assigned";
pub const EVENT_ALERT_DELETED: &str = "alert:deleted";

/// Every alert event the server pushes.
pub const ALERT_EVENTS: [&str; 5] = [
    EVENT_ALERT_NEW,
    EVENT_ALERT_UPDATED,
    EVENT_ALERT_STATUS_UPDATED,
    EVENT_ALERT_ASSIGNED,
    EVENT_ALERT_DELETED,
];

/// Local lifecycle events raised by the connection itself, never sent by the server.
pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_DISCONNECT: &str = "disconnect";

/// A single text frame on the event channel.
///
/// ```json
/// { "event": "alert:deleted", "data": { "id": "42" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(text).map_err(DecodeError::Frame)
    }

    pub fn to_text(&self) -> Result<String, DecodeError> {
        serde_json::to_string(self).map_err(DecodeError::Frame)
    }
}

/// Payload of the local `connect` event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectInfo {
    /// Reconnect attempts it took to get here; 0 on a first try.
    pub attempt: u32,
    /// True when this connection was established before, whether it was lost
    /// or closed by the client.
    pub reconnect: bool,
}

/// Payload of the local `disconnect` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisconnectInfo {
    pub reason: String,
}

/// A decoded alert push event.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    New(Alert),
    Updated(Alert),
    StatusUpdated { id: AlertId, patch: AlertPatch },
    Assigned(Alert),
    Deleted(AlertId),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeletedPayload {
    Object { id: AlertId },
    Bare(AlertId),
}

#[derive(Deserialize)]
struct IdOnly {
    id: AlertId,
}

impl AlertEvent {
    /// Decode the payload of a named event.
    pub fn decode(event: &str, data: &Value) -> Result<Self, DecodeError> {
        let payload_err = |source| DecodeError::Payload {
            event: event.to_string(),
            source,
        };

        match event {
            EVENT_ALERT_NEW => Alert::deserialize(data).map(Self::New).map_err(payload_err),
            EVENT_ALERT_UPDATED => Alert::deserialize(data)
                .map(Self::Updated)
                .map_err(payload_err),
            EVENT_ALERT_ASSIGNED => Alert::deserialize(data)
                .map(Self::Assigned)
                .map_err(payload_err),
            EVENT_ALERT_STATUS_UPDATED => {
                let IdOnly { id } = IdOnly::deserialize(data).map_err(payload_err)?;
                let patch = AlertPatch::deserialize(data).map_err(payload_err)?;
                Ok(Self::StatusUpdated { id, patch })
            }
            EVENT_ALERT_DELETED => {
                let id = match DeletedPayload::deserialize(data).map_err(payload_err)? {
                    DeletedPayload::Object { id } | DeletedPayload::Bare(id) => id,
                };
                Ok(Self::Deleted(id))
            }
            other => Err(DecodeError::UnknownEvent(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::New(_) => EVENT_ALERT_NEW,
            Self::Updated(_) => EVENT_ALERT_UPDATED,
            Self::StatusUpdated { .. } => EVENT_ALERT_STATUS_UPDATED,
            Self::Assigned(_) => EVENT_ALERT_ASSIGNED,
            Self::Deleted(_) => EVENT_ALERT_DELETED,
        }
    }

    pub fn id(&self) -> AlertId {
        match self {
            Self::New(alert) | Self::Updated(alert) | Self::Assigned(alert) => alert.id,
            Self::StatusUpdated { id, .. } | Self::Deleted(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertStatus;
    use serde_json::json;

    fn full_alert(id: Value) -> Value {
        json!({
            "id": id,
            "title": "House fire",
            "location": "Brgy. San Roque",
            "alert_type": "fire",
            "severity": "critical",
            "status": "pending",
            "reported_at": "2024-01-14T14:24:08Z"
        })
    }

    #[test]
    fn test_frame_parse() {
        let frame = EventFrame::parse(r#"{"event":"alert:deleted","data":{"id":"42"}}"#).unwrap();
        assert_eq!(frame.event, EVENT_ALERT_DELETED);
        assert!(EventFrame::parse("not json").is_err());
    }

    #[test]
    fn test_decode_deleted_string_id() {
        let event = AlertEvent::decode(EVENT_ALERT_DELETED, &json!({ "id": "42" })).unwrap();
        assert_eq!(event, AlertEvent::Deleted(AlertId(42)));

        let bare = AlertEvent::decode(EVENT_ALERT_DELETED, &json!(42)).unwrap();
        assert_eq!(bare, AlertEvent::Deleted(AlertId(42)));
    }

    #[test]
    fn test_decode_full_record_events() {
        let new = AlertEvent::decode(EVENT_ALERT_NEW, &full_alert(json!(5))).unwrap();
        assert_eq!(new.name(), EVENT_ALERT_NEW);
        assert_eq!(new.id(), AlertId(5));

        let assigned = AlertEvent::decode(EVENT_ALERT_ASSIGNED, &full_alert(json!("5"))).unwrap();
        assert!(matches!(assigned, AlertEvent::Assigned(ref a) if a.id == AlertId(5)));
    }

    #[test]
    fn test_decode_status_updated() {
        let event =
            AlertEvent::decode(EVENT_ALERT_STATUS_UPDATED, &json!({ "id": 9, "status": "responding" }))
                .unwrap();
        match event {
            AlertEvent::StatusUpdated { id, patch } => {
                assert_eq!(id, AlertId(9));
                assert_eq!(patch.status, Some(AlertStatus::Responding));
                assert!(patch.assigned_vehicle.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let missing_id = json!({ "status": "responding" });
        assert!(matches!(
            AlertEvent::decode(EVENT_ALERT_STATUS_UPDATED, &missing_id),
            Err(DecodeError::Payload { .. })
        ));

        let bad_status = json!({ "id": 1, "status": "verified" });
        assert!(AlertEvent::decode(EVENT_ALERT_STATUS_UPDATED, &bad_status).is_err());

        assert!(matches!(
            AlertEvent::decode("alert:exploded", &json!({})),
            Err(DecodeError::UnknownEvent(_))
        ));
    }
}
