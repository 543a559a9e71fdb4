//! Subscription - push 購読のハンドル
//!
//! 購読ごとに 1 つのバックグラウンドタスクを spawn し、
//! `ChangeFeed` から自分のコレクションの通知だけを取り出して callback に渡します。
//!
//! # 不変条件
//! - `unsubscribe()` が戻った後、callback は一度も呼ばれない
//!   （callback は gate のロックを保持したまま実行される）
//! - `unsubscribe()` は何度呼んでもよい。Drop 時にも呼ばれる

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::record::{Change, Record};
use crate::domain::Collection;
use crate::ports::ChangeFeed;

#[derive(Debug)]
pub struct Subscription {
    collection: Collection,
    gate: Arc<Mutex<bool>>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Spawn the delivery task. Must be called from inside a tokio runtime.
    ///
    /// `on_change` must not call [`Subscription::unsubscribe`] on its own handle.
    pub(crate) fn spawn<R, F>(mut feed: ChangeFeed, on_change: F) -> Self
    where
        R: Record,
        F: Fn(Change<R>) + Send + Sync + 'static,
    {
        let gate = Arc::new(Mutex::new(true));
        let cancel = CancellationToken::new();

        let task_gate = Arc::clone(&gate);
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    received = feed.recv() => received,
                };
                let change = match received {
                    Ok(change) if change.collection == R::COLLECTION => change,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            collection = %R::COLLECTION,
                            skipped,
                            "push subscriber lagged; notifications dropped"
                        );
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let change = match Change::<R>::decode(change) {
                    Ok(change) => change,
                    Err(e) => {
                        tracing::warn!(collection = %R::COLLECTION, error = %e, "undecodable push notification");
                        continue;
                    }
                };

                let delivered = {
                    let open = task_gate.lock().unwrap_or_else(|e| e.into_inner());
                    if *open {
                        on_change(change);
                    }
                    *open
                };
                if !delivered {
                    break;
                }
            }
            tracing::debug!(collection = %R::COLLECTION, "push subscription task finished");
        });

        tracing::debug!(collection = %R::COLLECTION, "push subscription opened");
        Self {
            collection: R::COLLECTION,
            gate,
            cancel,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn is_active(&self) -> bool {
        *self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Close the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        let mut open = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if *open {
            *open = false;
            self.cancel.cancel();
            tracing::debug!(collection = %self.collection, "push subscription closed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Close `handle` if there is one; `None` is a no-op.
pub fn unsubscribe(handle: Option<&Subscription>) {
    if let Some(handle) = handle {
        handle.unsubscribe();
    }
}
