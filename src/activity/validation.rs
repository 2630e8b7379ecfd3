use super::ActivityEvent;
use std::fmt;
use uuid::Uuid;

/// Validation errors for ActivityEvent
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingCampaign,
    MissingEventType,
    MissingActorType,
    MissingActorName,
    InvalidTimestamp(i64),
    DetailsNotObject,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingCampaign => write!(f, "campaign is required"),
            ValidationError::MissingEventType => write!(f, "eventType is required"),
            ValidationError::MissingActorType => write!(f, "actorType is required"),
            ValidationError::MissingActorName => write!(f, "actorName is required"),
            ValidationError::InvalidTimestamp(ts) => {
                write!(f, "timestamp must be positive, got {}", ts)
            }
            ValidationError::DetailsNotObject => {
                write!(f, "details must be a JSON object")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates and prepares an ActivityEvent for appending.
///
/// Validation rules:
/// - Required fields: campaign, eventType, actorType, actorName
/// - Timestamp: must be positive (Unix epoch milliseconds)
/// - Details: must be a JSON object (not array, string, etc.)
/// - EventId: auto-generated UUIDv7 if missing or empty
pub fn validate_and_prepare(event: &mut ActivityEvent) -> Result<(), ValidationError> {
    if event.campaign.is_empty() {
        return Err(ValidationError::MissingCampaign);
    }
    if event.event_type.is_empty() {
        return Err(ValidationError::MissingEventType);
    }
    if event.actor_type.is_empty() {
        return Err(ValidationError::MissingActorType);
    }
    if event.actor_name.is_empty() {
        return Err(ValidationError::MissingActorName);
    }

    if event.timestamp <= 0 {
        return Err(ValidationError::InvalidTimestamp(event.timestamp));
    }

    if !event.details.is_object() {
        return Err(ValidationError::DetailsNotObject);
    }

    // Generate UUIDv7 if missing or empty
    if event.event_id.as_deref().map_or(true, |id| id.is_empty()) {
        event.event_id = Some(Uuid::now_v7().to_string());
    }

    Ok(())
}
