use serde::{Deserialize, Serialize};
use serde_json::Value;

mod validation;
pub mod source;
pub mod store;
pub mod view;
#[cfg(test)]
mod tests;

pub use source::{ActivityLogSource, ActivityPage};
pub use store::SqliteActivityLog;
pub use validation::{validate_and_prepare, ValidationError};
pub use view::{ActivityFilters, ActivityLogView, ActivityState};

/// An immutable entry in a campaign's activity log.
///
/// Events have a fixed envelope with a domain-opaque details payload and
/// are time-ordered via UUIDv7 identifiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// UUIDv7 identifier (time-ordered, globally unique)
    /// Auto-generated if not provided
    #[serde(rename = "eventId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// Campaign this event belongs to
    pub campaign: String,

    /// Event category (e.g. "purchase", "combat", "npc-interaction")
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// Kind of actor that produced the event (e.g. "player", "npc", "gm")
    #[serde(rename = "actorType")]
    pub actor_type: String,

    /// Display name of the actor
    #[serde(rename = "actorName")]
    pub actor_name: String,

    /// Unix epoch milliseconds (session time)
    /// Must be positive
    pub timestamp: i64,

    /// Human-readable one-line summary
    pub summary: String,

    /// Domain-specific event data (opaque to the log)
    /// Must be a valid JSON object
    pub details: Value,
}

impl ActivityEvent {
    /// Validates and prepares an event for appending to the log.
    ///
    /// Checks required fields, positive timestamp, and that details is a
    /// JSON object; generates a UUIDv7 event id if missing.
    pub fn validate_and_prepare(&mut self) -> Result<(), ValidationError> {
        validation::validate_and_prepare(self)
    }
}

/// Sort direction for activity log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query parameters for activity log reads.
///
/// Optional fields are skipped (no filtering on that dimension); set
/// fields are AND-composed by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityQuery {
    /// Campaign scope
    pub campaign: String,
    /// Sort by timestamp
    pub sort: SortOrder,
    /// Page size
    pub limit: usize,
    /// Rows to skip
    pub offset: usize,
    /// Inclusive lower timestamp bound (epoch ms)
    pub start: Option<i64>,
    /// Inclusive upper timestamp bound (epoch ms)
    pub end: Option<i64>,
    /// Restrict to these event types
    pub event_types: Option<Vec<String>>,
    /// Restrict to these actor types
    pub actor_types: Option<Vec<String>>,
    /// Restrict to these actor names
    pub actor_names: Option<Vec<String>>,
    /// Free-text search over summaries and actor names
    pub search: Option<String>,
}

impl ActivityQuery {
    /// Default query for a campaign: newest first, page size 50, offset 0.
    pub fn for_campaign(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            sort: SortOrder::Desc,
            limit: 50,
            offset: 0,
            start: None,
            end: None,
            event_types: None,
            actor_types: None,
            actor_names: None,
            search: None,
        }
    }
}
