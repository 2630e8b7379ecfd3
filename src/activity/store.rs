//! Activity log persistence using SQLite.
//!
//! Events are stored one row per entry with the details payload as JSON
//! text. Rows whose details no longer parse are skipped by queries and
//! surfaced through the corrupted-entry counter instead of failing the
//! whole read.

use super::source::{ActivityLogSource, ActivityPage};
use super::{ActivityEvent, ActivityQuery, SortOrder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::warn;

/// Persists campaign activity events in SQLite.
pub struct SqliteActivityLog {
    conn: Mutex<Connection>,
}

impl SqliteActivityLog {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open activity log DB at {}", db_path))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    /// In-memory database, used by tests and throwaway sessions.
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS activity_log (
                event_id   TEXT PRIMARY KEY,
                campaign   TEXT NOT NULL,
                event_type TEXT NOT NULL,
                actor_type TEXT NOT NULL,
                actor_name TEXT NOT NULL,
                timestamp  INTEGER NOT NULL,
                summary    TEXT NOT NULL,
                details    TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_activity_campaign_ts
                ON activity_log (campaign, timestamp);",
        )
        .context("Failed to create activity_log table")?;
        Ok(())
    }

    /// Validates the event, fills in a missing event id, and inserts it.
    pub fn append(&self, event: &mut ActivityEvent) -> Result<()> {
        event
            .validate_and_prepare()
            .context("Invalid activity event")?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO activity_log
                (event_id, campaign, event_type, actor_type, actor_name, timestamp, summary, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.event_id.as_ref().expect("set by validate_and_prepare"),
                event.campaign,
                event.event_type,
                event.actor_type,
                event.actor_name,
                event.timestamp,
                event.summary,
                event.details.to_string(),
            ],
        )
        .context("Failed to insert activity event")?;
        Ok(())
    }

    /// Total stored rows, decodable or not.
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))
            .context("Failed to count activity events")?;
        Ok(count as usize)
    }

    fn query_page(&self, query: &ActivityQuery, with_search: bool) -> Result<ActivityPage> {
        let mut sql = String::from(
            "SELECT event_id, campaign, event_type, actor_type, actor_name, timestamp, summary, details
             FROM activity_log WHERE campaign = ?",
        );
        let mut bind: Vec<Box<dyn ToSql>> = vec![Box::new(query.campaign.clone())];

        if let Some(start) = query.start {
            sql.push_str(" AND timestamp >= ?");
            bind.push(Box::new(start));
        }
        if let Some(end) = query.end {
            sql.push_str(" AND timestamp <= ?");
            bind.push(Box::new(end));
        }
        push_in_clause(&mut sql, &mut bind, "event_type", query.event_types.as_deref());
        push_in_clause(&mut sql, &mut bind, "actor_type", query.actor_types.as_deref());
        push_in_clause(&mut sql, &mut bind, "actor_name", query.actor_names.as_deref());

        if with_search {
            if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
                sql.push_str(" AND (LOWER(summary) LIKE ? OR LOWER(actor_name) LIKE ?)");
                let needle = format!("%{}%", search.to_lowercase());
                bind.push(Box::new(needle.clone()));
                bind.push(Box::new(needle));
            }
        }

        // event_id is a UUIDv7, so it tiebreaks equal timestamps in
        // insertion order.
        match query.sort {
            SortOrder::Asc => sql.push_str(" ORDER BY timestamp ASC, event_id ASC"),
            SortOrder::Desc => sql.push_str(" ORDER BY timestamp DESC, event_id DESC"),
        }

        // Fetch one extra row to learn whether another page exists.
        sql.push_str(" LIMIT ? OFFSET ?");
        bind.push(Box::new((query.limit + 1) as i64));
        bind.push(Box::new(query.offset as i64));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&sql)
            .context("Failed to prepare activity log query")?;

        let bind_refs: Vec<&dyn ToSql> = bind.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(&bind_refs[..], |row| {
                let details_raw: String = row.get(7)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                    details_raw,
                ))
            })
            .context("Failed to query activity log")?;

        let mut fetched = 0usize;
        let mut events = Vec::new();
        for row in rows {
            let (event_id, campaign, event_type, actor_type, actor_name, timestamp, summary, details_raw) =
                row.context("Failed to read activity log row")?;
            fetched += 1;

            let details = match serde_json::from_str(&details_raw) {
                Ok(v) => v,
                Err(e) => {
                    warn!(event_id = %event_id, error = %e, "Skipping corrupted activity entry");
                    continue;
                }
            };
            events.push(ActivityEvent {
                event_id: Some(event_id),
                campaign,
                event_type,
                actor_type,
                actor_name,
                timestamp,
                summary,
                details,
            });
        }

        let has_more = fetched > query.limit;
        events.truncate(query.limit);
        Ok(ActivityPage { events, has_more })
    }

    fn count_corrupted(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare("SELECT details FROM activity_log") {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to prepare corrupted-entry scan");
                return 0;
            }
        };
        let rows = match stmt.query_map([], |row| row.get::<_, String>(0)) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Failed to scan for corrupted entries");
                return 0;
            }
        };

        rows.filter(|row| match row {
            Ok(raw) => serde_json::from_str::<serde_json::Value>(raw).is_err(),
            Err(_) => true,
        })
        .count()
    }
}

/// Appends `AND column IN (?, ?, …)` for a non-empty value set.
fn push_in_clause(
    sql: &mut String,
    bind: &mut Vec<Box<dyn ToSql>>,
    column: &str,
    values: Option<&[String]>,
) {
    let Some(values) = values.filter(|v| !v.is_empty()) else {
        return;
    };
    let placeholders = vec!["?"; values.len()].join(", ");
    sql.push_str(&format!(" AND {} IN ({})", column, placeholders));
    for value in values {
        bind.push(Box::new(value.clone()));
    }
}

#[async_trait]
impl ActivityLogSource for SqliteActivityLog {
    async fn get_activity_log(&self, query: &ActivityQuery) -> Result<ActivityPage> {
        self.query_page(query, false)
    }

    async fn search_activity_log(&self, query: &ActivityQuery) -> Result<ActivityPage> {
        self.query_page(query, true)
    }

    async fn corrupted_entry_count(&self) -> usize {
        self.count_corrupted()
    }
}
