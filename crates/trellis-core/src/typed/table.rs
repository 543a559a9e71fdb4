//! Table - 1 コレクション分の型付きファサード
//!
//! `BackendGateway` は JSON 行を運ぶだけなので、エンコード・デコードの失敗は
//! ここで吸収してログに残します。呼び出し側から見た契約は port と同じ
//! （失敗は `None` / `false` / 空）。

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use super::codec::RowCodec;
use super::record::{Change, Record};
use super::subscription::Subscription;
use crate::domain::{Id, Row};
use crate::ports::BackendGateway;

pub struct Table<R: Record> {
    gateway: Arc<dyn BackendGateway>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Table<R> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Table<R> {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            gateway,
            _record: PhantomData,
        }
    }

    /// Records newest first. Rows that fail to decode are skipped.
    pub async fn list(&self, limit: Option<usize>) -> Vec<R> {
        self.gateway
            .list(R::COLLECTION, limit)
            .await
            .into_iter()
            .filter_map(|row| self.decode(row))
            .collect()
    }

    pub async fn create<D: Serialize + Sync>(&self, draft: &D) -> Option<R> {
        let fields = self.encode(draft)?;
        let row = self.gateway.create(R::COLLECTION, fields).await?;
        self.decode(row)
    }

    pub async fn update<P: Serialize + Sync>(&self, id: &Id<R::Marker>, patch: &P) -> Option<R> {
        let fields = self.encode(patch)?;
        let row = self
            .gateway
            .update(R::COLLECTION, id.as_str(), fields)
            .await?;
        self.decode(row)
    }

    pub async fn delete(&self, id: &Id<R::Marker>) -> bool {
        self.gateway.delete(R::COLLECTION, id.as_str()).await
    }

    /// Push notifications for this collection; `None` while the gateway is uninitialized.
    pub fn subscribe<F>(&self, on_change: F) -> Option<Subscription>
    where
        F: Fn(Change<R>) + Send + Sync + 'static,
    {
        let Some(feed) = self.gateway.changes() else {
            tracing::debug!(collection = %R::COLLECTION, "subscribe skipped; backend not initialized");
            return None;
        };
        Some(Subscription::spawn::<R, F>(feed, on_change))
    }

    fn encode<T: Serialize>(&self, value: &T) -> Option<Row> {
        RowCodec::encode(value)
            .inspect_err(|e| tracing::warn!(collection = %R::COLLECTION, error = %e, "encode failed"))
            .ok()
    }

    fn decode(&self, row: Row) -> Option<R> {
        RowCodec::decode(row)
            .inspect_err(|e| tracing::warn!(collection = %R::COLLECTION, error = %e, "decode failed"))
            .ok()
    }
}
