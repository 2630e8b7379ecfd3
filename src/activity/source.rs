use super::{ActivityEvent, ActivityQuery};
use anyhow::Result;
use async_trait::async_trait;

/// One page of activity log results.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPage {
    /// Events in the requested sort order
    pub events: Vec<ActivityEvent>,
    /// Whether more events exist past this page
    pub has_more: bool,
}

/// Data source the activity log view model reads from.
///
/// Implementations own durable storage; the view model only coordinates
/// presentation state on top of them.
#[async_trait]
pub trait ActivityLogSource: Send + Sync {
    /// Fetch a page of events matching the query's filter fields.
    /// The query's `search` field is ignored here.
    async fn get_activity_log(&self, query: &ActivityQuery) -> Result<ActivityPage>;

    /// Fetch a page of events matching the query's filter fields plus
    /// its free-text `search`.
    async fn search_activity_log(&self, query: &ActivityQuery) -> Result<ActivityPage>;

    /// Number of stored entries that could not be decoded.
    async fn corrupted_entry_count(&self) -> usize;
}
