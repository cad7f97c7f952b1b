use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a history record. Opaque to the client; the
/// backend may use integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryId {
    Number(i64),
    Text(String),
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Confidence attached to a recognized action. Backends send either a number or
/// a preformatted string, and both are kept as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Score(f64),
    Text(String),
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(score) => write!(f, "{score}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One recognized activity.
///
/// On the wire an action is either a bare label (`"walking"`) or an object
/// (`{"label": "running", "confidence": 0.92}`). Both deserialize into this
/// shape, so nothing past the protocol boundary sees the union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireAction")]
pub struct Action {
    pub label: String,
    pub confidence: Option<Confidence>,
}

impl Action {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(label: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            label: label.into(),
            confidence: Some(confidence),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireAction {
    Label(String),
    Detailed {
        label: String,
        #[serde(default)]
        confidence: Option<Confidence>,
    },
}

impl From<WireAction> for Action {
    fn from(value: WireAction) -> Self {
        match value {
            WireAction::Label(label) => Self {
                label,
                confidence: None,
            },
            WireAction::Detailed { label, confidence } => Self { label, confidence },
        }
    }
}

/// A past upload and its prediction, as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub video_url: String,
    #[serde(default)]
    pub predicted_actions: Vec<Action>,
    pub created_at: String,
}

impl HistoryEntry {
    /// Parses `created_at` as RFC 3339, falling back to a zone-less ISO-8601
    /// timestamp interpreted as UTC.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}
