use super::source::ActivityLogSource;
use super::{ActivityEvent, ActivityQuery, SortOrder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::warn;

/// Filter criteria currently applied to the activity log view.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFilters {
    pub sort: SortOrder,
    /// Page size
    pub limit: usize,
    pub offset: usize,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub event_types: Option<Vec<String>>,
    pub actor_types: Option<Vec<String>>,
    pub actor_names: Option<Vec<String>>,
}

impl Default for ActivityFilters {
    fn default() -> Self {
        Self {
            sort: SortOrder::Desc,
            limit: 50,
            offset: 0,
            start: None,
            end: None,
            event_types: None,
            actor_types: None,
            actor_names: None,
        }
    }
}

/// Complete snapshot of UI-relevant activity log state.
///
/// Replaced wholesale on every update; events keep append order and are
/// never deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityState {
    pub events: Vec<ActivityEvent>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: ActivityFilters,
    pub search_query: String,
    pub has_more: bool,
    pub corrupted_count: usize,
}

impl Default for ActivityState {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            loading: false,
            error: None,
            filters: ActivityFilters::default(),
            search_query: String::new(),
            has_more: false,
            corrupted_count: 0,
        }
    }
}

/// Paginated, filterable, searchable presentation state over an activity
/// log data source.
///
/// Every mutator ends by replacing the state snapshot and broadcasting it
/// to subscribers. A dropped or lagging subscriber never affects the
/// others (broadcast send errors are ignored).
///
/// Overlapping loads are fenced: each in-flight query carries a monotonic
/// generation number and a completion that is no longer the newest is
/// discarded, so a slow first reload can't overwrite a fast second one.
pub struct ActivityLogView {
    campaign: String,
    source: Arc<dyn ActivityLogSource>,
    state: Mutex<ActivityState>,
    state_tx: broadcast::Sender<ActivityState>,
    /// Filter record restored verbatim by `reset_filters`.
    default_filters: ActivityFilters,
    /// Generation of the newest load; stale completions bail out.
    load_generation: AtomicU64,
}

impl ActivityLogView {
    pub fn new(campaign: impl Into<String>, source: Arc<dyn ActivityLogSource>) -> Self {
        let (state_tx, _) = broadcast::channel(64);
        Self {
            campaign: campaign.into(),
            source,
            state: Mutex::new(ActivityState::default()),
            state_tx,
            default_filters: ActivityFilters::default(),
            load_generation: AtomicU64::new(0),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> ActivityState {
        self.state.lock().unwrap().clone()
    }

    /// Subscribe to state replacements.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityState> {
        self.state_tx.subscribe()
    }

    /// Query the data source and replace (reset) or extend the event
    /// sequence. On failure the error message is recorded and existing
    /// events are left untouched.
    pub async fn load_events(&self, reset: bool) {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (query, snapshot) = {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
            if reset {
                state.filters.offset = 0;
            }

            let mut query = self.build_query(&state.filters);
            if !state.search_query.is_empty() {
                query.search = Some(state.search_query.clone());
            }
            (query, state.clone())
        };
        self.publish(snapshot);

        let result = if query.search.is_some() {
            self.source.search_activity_log(&query).await
        } else {
            self.source.get_activity_log(&query).await
        };

        // A newer load started while this one was in flight; its state
        // wins and this completion is dropped.
        if self.load_generation.load(Ordering::SeqCst) != generation {
            return;
        }

        match result {
            Ok(page) => {
                let corrupted = self.source.corrupted_entry_count().await;
                if self.load_generation.load(Ordering::SeqCst) != generation {
                    return;
                }

                let snapshot = {
                    let mut state = self.state.lock().unwrap();
                    if reset {
                        state.events = page.events;
                    } else {
                        state.events.extend(page.events);
                    }
                    state.has_more = page.has_more;
                    state.corrupted_count = corrupted;
                    state.loading = false;
                    state.clone()
                };
                self.publish(snapshot);
            }
            Err(e) => {
                warn!(campaign = %self.campaign, error = %e, "Activity log query failed");
                let snapshot = {
                    let mut state = self.state.lock().unwrap();
                    state.loading = false;
                    state.error = Some(e.to_string());
                    state.clone()
                };
                self.publish(snapshot);
            }
        }
    }

    /// Merge changes into the current filters, rewind to the first page,
    /// and reload.
    pub async fn update_filters<F>(&self, apply: F)
    where
        F: FnOnce(&mut ActivityFilters),
    {
        {
            let mut state = self.state.lock().unwrap();
            apply(&mut state.filters);
            state.filters.offset = 0;
        }
        self.load_events(true).await;
    }

    /// Replace the search text, rewind, and reload.
    pub async fn update_search(&self, text: impl Into<String>) {
        {
            let mut state = self.state.lock().unwrap();
            state.search_query = text.into();
            state.filters.offset = 0;
        }
        self.load_events(true).await;
    }

    /// Fetch and append the next page. No-op while a load is in flight
    /// or when the source reported no further events.
    pub async fn load_more(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.loading || !state.has_more {
                return;
            }
            state.filters.offset += state.filters.limit;
        }
        self.load_events(false).await;
    }

    pub async fn filter_by_date_range(&self, start: Option<i64>, end: Option<i64>) {
        self.update_filters(|f| {
            f.start = start;
            f.end = end;
        })
        .await;
    }

    pub async fn filter_by_event_types(&self, event_types: Option<Vec<String>>) {
        self.update_filters(|f| f.event_types = event_types).await;
    }

    pub async fn filter_by_actor(
        &self,
        actor_types: Option<Vec<String>>,
        actor_names: Option<Vec<String>>,
    ) {
        self.update_filters(|f| {
            f.actor_types = actor_types;
            f.actor_names = actor_names;
        })
        .await;
    }

    pub async fn set_sort_order(&self, sort: SortOrder) {
        self.update_filters(|f| f.sort = sort).await;
    }

    pub async fn set_page_size(&self, limit: usize) {
        self.update_filters(|f| f.limit = limit).await;
    }

    /// Restore the construction-time default filter record verbatim,
    /// clear the search text, and reload.
    pub async fn reset_filters(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.filters = self.default_filters.clone();
            state.search_query.clear();
        }
        self.load_events(true).await;
    }

    fn build_query(&self, filters: &ActivityFilters) -> ActivityQuery {
        ActivityQuery {
            campaign: self.campaign.clone(),
            sort: filters.sort,
            limit: filters.limit,
            offset: filters.offset,
            start: filters.start,
            end: filters.end,
            event_types: filters.event_types.clone(),
            actor_types: filters.actor_types.clone(),
            actor_names: filters.actor_names.clone(),
            search: None,
        }
    }

    fn publish(&self, snapshot: ActivityState) {
        // No subscribers is fine; lagging subscribers miss snapshots
        // without affecting anyone else.
        let _ = self.state_tx.send(snapshot);
    }
}
