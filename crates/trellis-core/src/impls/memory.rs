//! InMemoryGateway - プロセス内の authoritative store
//!
//! # 実装詳細
//! - コレクションごとに `Vec<Row>` を新しい順で保持
//! - id は `IdGenerator`（ULID）、`created_at` は `Clock` から採番
//! - 成功した書き込みはすべて broadcast で購読者に push する
//! - `inject` で「別クライアントによる変更」を再現できる
//!
//! テストと CLI の `--memory` モードで使います。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::broadcast;

use super::absorb;
use crate::domain::{BackendSettings, Collection, Row, RowChange, id_text};
use crate::ports::{
    BackendGateway, ChangeFeed, Clock, DEFAULT_BACKEND_HOST_SUFFIX, GatewayError, IdGenerator,
    SystemClock, UlidGenerator, endpoint_matches,
};

const FEED_CAPACITY: usize = 256;
const TARGET: &str = "memory";

#[derive(Default)]
struct State {
    initialized: bool,
    rows: HashMap<Collection, Vec<Row>>,
    failing: HashSet<Collection>,
}

pub struct InMemoryGateway {
    state: Mutex<State>,
    feed: broadcast::Sender<RowChange>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    host_suffix: String,
}

impl InMemoryGateway {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            feed,
            clock,
            ids,
            host_suffix: DEFAULT_BACKEND_HOST_SUFFIX.to_string(),
        }
    }

    /// Already-initialized store on the system clock.
    pub fn connected() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let gateway = Self::new(clock, ids);
        gateway.lock().initialized = true;
        gateway
    }

    pub fn with_host_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.host_suffix = suffix.into();
        self
    }

    /// Make every write to `collection` fail (or succeed again).
    pub fn fail_writes(&self, collection: Collection, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failing.insert(collection);
        } else {
            state.failing.remove(&collection);
        }
    }

    /// Put rows in place without notifying subscribers.
    pub fn seed(&self, collection: Collection, rows: impl IntoIterator<Item = Row>) {
        let mut state = self.lock();
        let stored = state.rows.entry(collection).or_default();
        stored.extend(rows);
        sort_newest_first(stored);
    }

    /// Snapshot of a collection, newest first.
    pub fn rows(&self, collection: Collection) -> Vec<Row> {
        self.lock().rows.get(&collection).cloned().unwrap_or_default()
    }

    /// Apply a change made by some other client and push it to subscribers.
    pub fn inject(&self, change: RowChange) {
        {
            let mut state = self.lock();
            let stored = state.rows.entry(change.collection).or_default();
            let id = change.row_id();
            match (&change.new, id) {
                (Some(row), Some(id)) => {
                    match stored.iter_mut().find(|r| row_id(r).as_deref() == Some(id.as_str())) {
                        Some(existing) => *existing = row.clone(),
                        None => stored.insert(0, row.clone()),
                    }
                }
                (None, Some(id)) => stored.retain(|r| row_id(r).as_deref() != Some(id.as_str())),
                (_, None) => {}
            }
        }
        self.publish(change);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, change: RowChange) {
        // 購読者ゼロのときの SendError は無視してよい
        let _ = self.feed.send(change);
    }

    fn writable(state: &State, collection: Collection) -> Result<(), GatewayError> {
        if !state.initialized {
            return Err(GatewayError::NotInitialized);
        }
        if state.failing.contains(&collection) {
            return Err(GatewayError::Rejected(format!("writes to {collection} are failing")));
        }
        Ok(())
    }

    fn try_create(&self, collection: Collection, mut fields: Row) -> Result<Row, GatewayError> {
        let row = {
            let mut state = self.lock();
            Self::writable(&state, collection)?;
            if !fields.contains_key("id") {
                fields.insert("id".into(), self.ids.generate().to_string().into());
            }
            if !fields.contains_key("created_at") {
                let now = self.clock.now().to_rfc3339_opts(SecondsFormat::Micros, true);
                fields.insert("created_at".into(), now.into());
            }
            state.rows.entry(collection).or_default().insert(0, fields.clone());
            fields
        };
        self.publish(RowChange::insert(collection, row.clone()));
        Ok(row)
    }

    fn try_update(&self, collection: Collection, id: &str, fields: Row) -> Result<Row, GatewayError> {
        let row = {
            let mut state = self.lock();
            Self::writable(&state, collection)?;
            let existing = state
                .rows
                .entry(collection)
                .or_default()
                .iter_mut()
                .find(|r| row_id(r).as_deref() == Some(id))
                .ok_or_else(|| GatewayError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
            for (key, value) in fields {
                if key != "id" {
                    existing.insert(key, value);
                }
            }
            existing.clone()
        };
        self.publish(RowChange::update(collection, row.clone()));
        Ok(row)
    }

    fn try_delete(&self, collection: Collection, id: &str) -> Result<(), GatewayError> {
        let old = {
            let mut state = self.lock();
            Self::writable(&state, collection)?;
            let stored = state.rows.entry(collection).or_default();
            let at = stored
                .iter()
                .position(|r| row_id(r).as_deref() == Some(id))
                .ok_or_else(|| GatewayError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
            stored.remove(at)
        };
        self.publish(RowChange::delete(collection, old));
        Ok(())
    }
}

#[async_trait]
impl BackendGateway for InMemoryGateway {
    fn initialize(&self, credentials: &BackendSettings) {
        self.lock().initialized = true;
        tracing::info!(url = %credentials.url, "in-memory backend initialized");
    }

    fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    async fn test_connection(&self, credentials: &BackendSettings) -> bool {
        endpoint_matches(credentials, &self.host_suffix)
    }

    async fn list(&self, collection: Collection, limit: Option<usize>) -> Vec<Row> {
        let state = self.lock();
        if !state.initialized {
            return Vec::new();
        }
        let rows = state.rows.get(&collection).map(Vec::as_slice).unwrap_or_default();
        rows.iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    async fn create(&self, collection: Collection, fields: Row) -> Option<Row> {
        absorb(TARGET, collection, "create", self.try_create(collection, fields))
    }

    async fn update(&self, collection: Collection, id: &str, fields: Row) -> Option<Row> {
        absorb(TARGET, collection, "update", self.try_update(collection, id, fields))
    }

    async fn delete(&self, collection: Collection, id: &str) -> bool {
        absorb(TARGET, collection, "delete", self.try_delete(collection, id)).is_some()
    }

    fn changes(&self) -> Option<ChangeFeed> {
        self.is_initialized().then(|| self.feed.subscribe())
    }
}

fn row_id(row: &Row) -> Option<String> {
    row.get("id").and_then(id_text)
}

fn created_at(row: &Row) -> Option<DateTime<Utc>> {
    let text = row.get("created_at")?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

fn sort_newest_first(rows: &mut [Row]) {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn gateway() -> (InMemoryGateway, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap(),
        ));
        let ids = Arc::new(UlidGenerator::new(clock.clone()));
        (InMemoryGateway::new(clock.clone(), ids), clock)
    }

    #[tokio::test]
    async fn uninitialized_store_lists_nothing_and_rejects_writes() {
        let (store, _) = gateway();
        assert!(store.list(Collection::Tasks, None).await.is_empty());
        assert!(store.create(Collection::Tasks, row(json!({"title": "x"}))).await.is_none());
        assert!(!store.delete(Collection::Tasks, "nope").await);
        assert!(store.changes().is_none());
    }

    #[tokio::test]
    async fn create_stamps_id_and_created_at_newest_first() {
        let (store, clock) = gateway();
        store.initialize(&BackendSettings::new("https://x.supabase.co", "k"));

        let first = store.create(Collection::Notes, row(json!({"title": "a"}))).await.unwrap();
        clock.advance(Duration::seconds(1));
        let second = store.create(Collection::Notes, row(json!({"title": "b"}))).await.unwrap();

        assert!(first.contains_key("id"));
        assert_eq!(first["created_at"], "2025-02-01T09:00:00.000000Z");
        let listed = store.list(Collection::Notes, None).await;
        assert_eq!(listed, vec![second, first]);
        assert_eq!(store.list(Collection::Notes, Some(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn deleting_unknown_id_fails_without_a_push() {
        let store = InMemoryGateway::connected();
        let mut feed = store.changes().unwrap();

        assert!(!store.delete(Collection::Tasks, "ghost").await);
        assert!(matches!(
            feed.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn writes_are_pushed_to_subscribers() {
        let store = InMemoryGateway::connected();
        let mut feed = store.changes().unwrap();

        let created = store.create(Collection::Tasks, row(json!({"title": "a"}))).await.unwrap();
        let id = id_text(&created["id"]).unwrap();
        store.update(Collection::Tasks, &id, row(json!({"title": "b"}))).await.unwrap();
        assert!(store.delete(Collection::Tasks, &id).await);

        let kinds: Vec<_> = [
            feed.recv().await.unwrap(),
            feed.recv().await.unwrap(),
            feed.recv().await.unwrap(),
        ]
        .into_iter()
        .map(|c| (c.kind, c.row_id()))
        .collect();
        use crate::domain::ChangeKind::*;
        assert_eq!(
            kinds,
            vec![(Insert, Some(id.clone())), (Update, Some(id.clone())), (Delete, Some(id))]
        );
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() {
        let store = InMemoryGateway::connected();
        let created = store
            .create(Collection::Tasks, row(json!({"title": "a", "status": "active"})))
            .await
            .unwrap();
        let id = id_text(&created["id"]).unwrap();

        let updated = store
            .update(Collection::Tasks, &id, row(json!({"id": "other", "status": "completed"})))
            .await
            .unwrap();
        assert_eq!(updated["title"], "a");
        assert_eq!(updated["status"], "completed");
        assert_eq!(id_text(&updated["id"]), Some(id));
    }

    #[tokio::test]
    async fn failing_collection_rejects_writes() {
        let store = InMemoryGateway::connected();
        store.fail_writes(Collection::Tasks, true);
        assert!(store.create(Collection::Tasks, row(json!({"title": "a"}))).await.is_none());
        assert!(store.rows(Collection::Tasks).is_empty());

        store.fail_writes(Collection::Tasks, false);
        assert!(store.create(Collection::Tasks, row(json!({"title": "a"}))).await.is_some());
    }

    #[tokio::test]
    async fn seeded_rows_are_sorted_by_created_at() {
        let store = InMemoryGateway::connected();
        store.seed(
            Collection::Delays,
            [
                row(json!({"id": "old", "created_at": "2025-01-01T00:00:00Z"})),
                row(json!({"id": "new", "created_at": "2025-03-01T00:00:00Z"})),
            ],
        );
        let ids: Vec<_> = store
            .list(Collection::Delays, None)
            .await
            .iter()
            .filter_map(row_id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn injected_changes_update_rows_and_reach_subscribers() {
        let store = InMemoryGateway::connected();
        let mut feed = store.changes().unwrap();
        store.inject(RowChange::insert(Collection::Notes, row(json!({"id": 7, "title": "x"}))));
        store.inject(RowChange::update(Collection::Notes, row(json!({"id": 7, "title": "y"}))));

        assert_eq!(store.rows(Collection::Notes)[0]["title"], "y");
        assert_eq!(feed.recv().await.unwrap().row_id().as_deref(), Some("7"));

        store.inject(RowChange::delete(Collection::Notes, row(json!({"id": 7}))));
        assert!(store.rows(Collection::Notes).is_empty());
    }

    #[tokio::test]
    async fn connectivity_check_uses_configured_suffix() {
        let (store, _) = gateway();
        let store = store.with_host_suffix("internal.test");
        assert!(store.test_connection(&BackendSettings::new("http://db.internal.test", "k")).await);
        assert!(!store.test_connection(&BackendSettings::new("https://x.supabase.co", "k")).await);
    }
}
