use super::source::{ActivityLogSource, ActivityPage};
use super::view::{ActivityFilters, ActivityLogView};
use super::{ActivityEvent, ActivityQuery, SortOrder, SqliteActivityLog};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn event(id: &str, ts: i64) -> ActivityEvent {
    ActivityEvent {
        event_id: Some(id.to_string()),
        campaign: "curse-of-strahd".to_string(),
        event_type: "combat".to_string(),
        actor_type: "player".to_string(),
        actor_name: "Ez".to_string(),
        timestamp: ts,
        summary: format!("event {}", id),
        details: json!({}),
    }
}

fn page(ids: &[&str], has_more: bool) -> ActivityPage {
    ActivityPage {
        events: ids.iter().enumerate().map(|(i, id)| event(id, (i as i64 + 1) * 1_000)).collect(),
        has_more,
    }
}

/// Scripted data source: each query pops the next response (and optional
/// delay), recording the queries it saw.
struct MockSource {
    responses: Mutex<VecDeque<(Duration, Result<ActivityPage>)>>,
    queries: Mutex<Vec<ActivityQuery>>,
    search_calls: AtomicUsize,
    corrupted: usize,
}

impl MockSource {
    fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            search_calls: AtomicUsize::new(0),
            corrupted: 0,
        }
    }

    fn push(&self, response: Result<ActivityPage>) {
        self.push_delayed(Duration::ZERO, response);
    }

    fn push_delayed(&self, delay: Duration, response: Result<ActivityPage>) {
        self.responses.lock().unwrap().push_back((delay, response));
    }

    fn seen_queries(&self) -> Vec<ActivityQuery> {
        self.queries.lock().unwrap().clone()
    }

    async fn respond(&self, query: &ActivityQuery) -> Result<ActivityPage> {
        self.queries.lock().unwrap().push(query.clone());
        let (delay, response) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::ZERO, Ok(page(&[], false))));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

#[async_trait]
impl ActivityLogSource for MockSource {
    async fn get_activity_log(&self, query: &ActivityQuery) -> Result<ActivityPage> {
        self.respond(query).await
    }

    async fn search_activity_log(&self, query: &ActivityQuery) -> Result<ActivityPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(query).await
    }

    async fn corrupted_entry_count(&self) -> usize {
        self.corrupted
    }
}

fn view_over(source: Arc<MockSource>) -> ActivityLogView {
    ActivityLogView::new("curse-of-strahd", source)
}

#[test]
fn test_default_state() {
    let view = view_over(Arc::new(MockSource::new()));
    let state = view.state();

    assert!(state.events.is_empty());
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.filters.sort, SortOrder::Desc);
    assert_eq!(state.filters.limit, 50);
    assert_eq!(state.filters.offset, 0);
    assert_eq!(state.search_query, "");
    assert!(!state.has_more);
    assert_eq!(state.corrupted_count, 0);
}

#[tokio::test]
async fn test_load_events_reset_replaces() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a", "b"], true)));
    let view = view_over(source.clone());

    view.load_events(true).await;

    let state = view.state();
    assert_eq!(state.events.len(), 2);
    assert!(state.has_more);
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_load_failure_keeps_events() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a"], false)));
    source.push(Err(anyhow!("vault unavailable")));
    let view = view_over(source.clone());

    view.load_events(true).await;
    view.load_events(true).await;

    let state = view.state();
    // Prior events survive the failed reload.
    assert_eq!(state.events.len(), 1);
    assert_eq!(state.error.as_deref(), Some("vault unavailable"));
    assert!(!state.loading);
}

#[tokio::test]
async fn test_load_more_appends_and_advances_offset() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a", "b"], true)));
    source.push(Ok(page(&["c"], false)));
    let view = view_over(source.clone());

    view.set_page_size(2).await;
    view.load_more().await;

    let state = view.state();
    assert_eq!(state.events.len(), 3);
    assert!(!state.has_more);

    let queries = source.seen_queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].offset, 0);
    assert_eq!(queries[1].offset, 2);
}

#[tokio::test]
async fn test_load_more_noop_when_no_more() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a"], false)));
    let view = view_over(source.clone());

    view.load_events(true).await;
    view.load_more().await;

    assert_eq!(source.seen_queries().len(), 1);
    assert_eq!(view.state().filters.offset, 0);
}

#[tokio::test]
async fn test_load_more_noop_while_loading() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a"], true)));
    source.push_delayed(Duration::from_millis(100), Ok(page(&["b"], true)));
    let view = Arc::new(view_over(source.clone()));

    view.load_events(true).await;

    let slow = {
        let view = view.clone();
        tokio::spawn(async move { view.load_events(true).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The reload is still in flight: loading is set, so this must not
    // issue a query or touch the offset.
    view.load_more().await;

    slow.await.unwrap();
    assert_eq!(source.seen_queries().len(), 2);
    assert_eq!(view.state().filters.offset, 0);
}

#[tokio::test]
async fn test_stale_load_discarded() {
    let source = Arc::new(MockSource::new());
    // First load answers slowly with "a"; second answers fast with "b".
    source.push_delayed(Duration::from_millis(100), Ok(page(&["a"], true)));
    source.push(Ok(page(&["b"], false)));
    let view = Arc::new(view_over(source.clone()));

    let slow = {
        let view = view.clone();
        tokio::spawn(async move { view.load_events(true).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.load_events(true).await;
    slow.await.unwrap();

    // The older completion lost the fence; "b" is the final word.
    let state = view.state();
    let ids: Vec<&str> = state
        .events
        .iter()
        .map(|e| e.event_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, vec!["b"]);
    assert!(!state.has_more);
}

#[tokio::test]
async fn test_update_search_routes_to_search_query() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a"], false)));
    source.push(Ok(page(&["a"], false)));
    let view = view_over(source.clone());

    view.update_search("sunsword").await;
    assert_eq!(source.search_calls.load(Ordering::SeqCst), 1);
    let queries = source.seen_queries();
    assert_eq!(queries[0].search.as_deref(), Some("sunsword"));

    // Clearing the search goes back to the plain read.
    view.update_search("").await;
    assert_eq!(source.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_update_filters_resets_offset() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a", "b"], true)));
    source.push(Ok(page(&["c"], true)));
    source.push(Ok(page(&["d"], true)));
    let view = view_over(source.clone());

    view.set_page_size(2).await;
    view.load_more().await;
    assert_eq!(view.state().filters.offset, 2);

    view.filter_by_event_types(Some(vec!["combat".to_string()])).await;

    let state = view.state();
    assert_eq!(state.filters.offset, 0);
    assert_eq!(state.filters.event_types.as_deref(), Some(&["combat".to_string()][..]));
    // Filter reload replaced, not appended.
    assert_eq!(state.events.len(), 1);
}

#[tokio::test]
async fn test_convenience_wrappers_set_fields() {
    let source = Arc::new(MockSource::new());
    for _ in 0..4 {
        source.push(Ok(page(&[], false)));
    }
    let view = view_over(source.clone());

    view.filter_by_date_range(Some(1_000), Some(9_000)).await;
    view.filter_by_actor(Some(vec!["npc".to_string()]), Some(vec!["Strahd".to_string()])).await;
    view.set_sort_order(SortOrder::Asc).await;

    let filters = view.state().filters;
    assert_eq!(filters.start, Some(1_000));
    assert_eq!(filters.end, Some(9_000));
    assert_eq!(filters.actor_types.as_deref(), Some(&["npc".to_string()][..]));
    assert_eq!(filters.actor_names.as_deref(), Some(&["Strahd".to_string()][..]));
    assert_eq!(filters.sort, SortOrder::Asc);
}

#[tokio::test]
async fn test_reset_filters_restores_defaults() {
    let source = Arc::new(MockSource::new());
    for _ in 0..5 {
        source.push(Ok(page(&[], false)));
    }
    let view = view_over(source.clone());

    view.set_sort_order(SortOrder::Asc).await;
    view.set_page_size(10).await;
    view.filter_by_date_range(Some(1), Some(2)).await;
    view.update_search("strahd").await;

    view.reset_filters().await;

    let state = view.state();
    assert_eq!(state.filters, ActivityFilters::default());
    assert_eq!(state.filters.sort, SortOrder::Desc);
    assert_eq!(state.filters.limit, 50);
    assert_eq!(state.filters.offset, 0);
    assert_eq!(state.search_query, "");
}

#[tokio::test]
async fn test_subscribers_notified_on_load() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a"], false)));
    let view = view_over(source.clone());
    let mut rx = view.subscribe();

    view.load_events(true).await;

    // First snapshot: loading started.
    let loading = rx.try_recv().unwrap();
    assert!(loading.loading);
    // Second snapshot: results applied.
    let done = rx.try_recv().unwrap();
    assert!(!done.loading);
    assert_eq!(done.events.len(), 1);
}

#[tokio::test]
async fn test_dropped_subscriber_does_not_block_others() {
    let source = Arc::new(MockSource::new());
    source.push(Ok(page(&["a"], false)));
    source.push(Ok(page(&["b"], false)));
    let view = view_over(source.clone());

    let dropped = view.subscribe();
    drop(dropped);
    let mut live = view.subscribe();

    view.load_events(true).await;
    assert!(live.try_recv().is_ok());
}

#[tokio::test]
async fn test_corrupted_count_refreshed() {
    let mut source = MockSource::new();
    source.corrupted = 3;
    source.push(Ok(page(&["a"], false)));
    let view = view_over(Arc::new(source));

    view.load_events(true).await;
    assert_eq!(view.state().corrupted_count, 3);
}

#[tokio::test]
async fn test_view_over_sqlite_source() {
    let log = Arc::new(SqliteActivityLog::in_memory().unwrap());
    for ts in 1..=3 {
        let mut e = ActivityEvent {
            event_id: None,
            campaign: "curse-of-strahd".to_string(),
            event_type: "purchase".to_string(),
            actor_type: "player".to_string(),
            actor_name: "Ez".to_string(),
            timestamp: ts * 1_000,
            summary: format!("purchase {}", ts),
            details: json!({}),
        };
        log.append(&mut e).unwrap();
    }

    let view = ActivityLogView::new("curse-of-strahd", log.clone());
    view.set_page_size(2).await;

    let state = view.state();
    assert_eq!(state.events.len(), 2);
    assert!(state.has_more);
    // Newest first by default.
    assert_eq!(state.events[0].timestamp, 3_000);

    view.load_more().await;
    let state = view.state();
    assert_eq!(state.events.len(), 3);
    assert!(!state.has_more);
}
