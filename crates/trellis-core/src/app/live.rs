//! LiveList - コレクション 1 つ分のインメモリのスナップショット
//!
//! `tokio::sync::watch` で公開し、変更は同期クロージャの中で
//! スナップショットごと差し替えます（await をまたいで要素を触らない）。

use std::sync::Arc;

use tokio::sync::watch;

use super::reconcile::apply_change;
use crate::typed::{Change, Record};

pub struct LiveList<R: Record> {
    tx: Arc<watch::Sender<Vec<R>>>,
    cap: Option<usize>,
}

impl<R: Record> Clone for LiveList<R> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
            cap: self.cap,
        }
    }
}

impl<R: Record> Default for LiveList<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> LiveList<R> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            tx: Arc::new(tx),
            cap: None,
        }
    }

    /// List that keeps at most `cap` entries.
    pub fn capped(cap: usize) -> Self {
        Self {
            cap: Some(cap),
            ..Self::new()
        }
    }

    pub fn snapshot(&self) -> Vec<R> {
        self.tx.borrow().clone()
    }

    /// Receiver that sees every published snapshot.
    pub fn watch(&self) -> watch::Receiver<Vec<R>> {
        self.tx.subscribe()
    }

    pub fn find(&self, mut matches: impl FnMut(&R) -> bool) -> Option<R> {
        self.tx.borrow().iter().find(|r| matches(r)).cloned()
    }

    pub fn replace(&self, mut records: Vec<R>) {
        if let Some(cap) = self.cap {
            records.truncate(cap);
        }
        self.tx.send_replace(records);
    }

    pub fn apply(&self, change: Change<R>) -> bool {
        let cap = self.cap;
        self.tx
            .send_if_modified(|list| apply_change(list, change, cap))
    }
}
