//! Shared data models for the dispatch console.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::rust::double_option;

// --- Identity ---

/// Server-assigned alert identity. Never reused.
///
/// Upstream payloads are inconsistent about the encoding: `alert:deleted`
/// carries the id as a string while every other event carries a number.
/// Both forms deserialize to the same value, so comparisons never depend on
/// which event kind delivered the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AlertId(pub u64);

impl AlertId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for AlertId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlertId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl<'de> Deserialize<'de> for AlertId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor).map(Self)
    }
}

/// Accepts an id encoded as a non-negative integer or a numeric string.
struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer id or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.trim()
            .parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

/// `deserialize_with` helper for foreign ids that share the alert id encoding quirk.
pub fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(IdVisitor)
}

// --- Enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Medical,
    Fire,
    Accident,
    Crime,
    NaturalDisaster,
    #[default]
    Other,
}

/// Incident severity, ordered from `Low` to `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert lifecycle status.
///
/// ```text
/// pending ──► responding ──► resolved
///    │            │
///    └────────────┴────────► cancelled
/// ```
///
/// `Resolved` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Responding,
    Resolved,
    Cancelled,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 4] = [
        AlertStatus::Pending,
        AlertStatus::Responding,
        AlertStatus::Resolved,
        AlertStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Responding => "responding",
            Self::Resolved => "resolved",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }

    /// Whether the status graph allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Responding)
                | (Self::Pending, Self::Cancelled)
                | (Self::Responding, Self::Resolved)
                | (Self::Responding, Self::Cancelled)
        )
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Assignment references ---

/// Weak reference to a vehicle owned by the fleet service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleRef {
    #[serde(deserialize_with = "flexible_id")]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
}

/// Weak reference to a responder owned by the user service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponderRef {
    #[serde(deserialize_with = "flexible_id")]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// --- Alerts ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: AlertId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub reported_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_vehicle: Option<VehicleRef>,
    #[serde(default)]
    pub assigned_responder: Option<ResponderRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Alert {
    /// Still pending or being responded to.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_vehicle.is_some() || self.assigned_responder.is_some()
    }
}

/// The changed fields carried by `alert:status_updated`, also used as the
/// body of `PUT /alerts/{id}`.
///
/// An absent field leaves the stored value alone. For nullable fields an
/// explicit `null` clears the stored value, which is why those are
/// `Option<Option<_>>`. `reported_at` is immutable and has no patch field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<AlertType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub assigned_vehicle: Option<Option<VehicleRef>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub assigned_responder: Option<Option<ResponderRef>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
}

impl AlertPatch {
    pub fn status(status: AlertStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Shallow merge of the present fields into `alert`.
    pub fn apply_to(&self, alert: &mut Alert) {
        if let Some(title) = &self.title {
            alert.title = title.clone();
        }
        if let Some(description) = &self.description {
            alert.description = description.clone();
        }
        if let Some(location) = &self.location {
            alert.location = location.clone();
        }
        if let Some(latitude) = self.latitude {
            alert.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            alert.longitude = longitude;
        }
        if let Some(alert_type) = self.alert_type {
            alert.alert_type = alert_type;
        }
        if let Some(severity) = self.severity {
            alert.severity = severity;
        }
        if let Some(status) = self.status {
            alert.status = status;
        }
        if let Some(vehicle) = &self.assigned_vehicle {
            alert.assigned_vehicle = vehicle.clone();
        }
        if let Some(responder) = &self.assigned_responder {
            alert.assigned_responder = responder.clone();
        }
        if let Some(image_url) = &self.image_url {
            alert.image_url = image_url.clone();
        }
    }
}

// --- Request bodies ---

/// Body of `POST /alerts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAlert {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub alert_type: AlertType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body of `PATCH /alerts/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdateRequest {
    pub status: AlertStatus,
}

/// Body of `PATCH /alerts/{id}/assign`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignRequest {
    pub vehicle_id: Option<u64>,
    pub responder_id: Option<u64>,
}
