//! BackendGateway port - authoritative store（正本）へのアクセス
//!
//! 4 つのコレクション（tasks / notes / activity / delays）に対する
//! CRUD と push 購読を提供します。
//!
//! # 設計原則
//! - 失敗は呼び出し元に伝播しない：実装は境界で error をログに残し、
//!   `None` / `false` / 空の Vec に変換する
//! - 未初期化のクライアントはエラーではない（list は空、書き込みは `None`）
//! - 行は JSON object のまま運ぶ。型付けは `typed::Table` が担当

use async_trait::async_trait;
use reqwest::Url;
use tokio::sync::broadcast;

use crate::domain::{BackendSettings, Collection, Row, RowChange};

/// Host suffix accepted by the backend connectivity check unless configured otherwise.
pub const DEFAULT_BACKEND_HOST_SUFFIX: &str = "supabase.co";

/// Stream of push notifications for every collection.
///
/// Subscribers filter by [`RowChange::collection`].
pub type ChangeFeed = broadcast::Receiver<RowChange>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("backend client is not initialized")]
    NotInitialized,

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no {collection} row with id={id}")]
    NotFound { collection: Collection, id: String },

    #[error("backend returned no row")]
    EmptyResponse,

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Point the client at an endpoint. Later calls replace the connection.
    fn initialize(&self, credentials: &BackendSettings);

    fn is_initialized(&self) -> bool;

    /// Lightweight shape check used to decide whether `initialize` is called at all.
    async fn test_connection(&self, credentials: &BackendSettings) -> bool;

    /// Rows ordered by descending `created_at`, at most `limit` when given.
    async fn list(&self, collection: Collection, limit: Option<usize>) -> Vec<Row>;

    async fn create(&self, collection: Collection, fields: Row) -> Option<Row>;

    async fn update(&self, collection: Collection, id: &str, fields: Row) -> Option<Row>;

    async fn delete(&self, collection: Collection, id: &str) -> bool;

    /// Push notifications; `None` while uninitialized.
    fn changes(&self) -> Option<ChangeFeed>;
}

/// Connectivity check shared by the gateway implementations.
///
/// True iff url and key are non-empty and the url host is `host_suffix` or one of its
/// subdomains. No network traffic.
pub fn endpoint_matches(credentials: &BackendSettings, host_suffix: &str) -> bool {
    if !credentials.is_present() {
        return false;
    }
    let Ok(url) = Url::parse(credentials.url.trim()) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return false;
    };
    let suffix = host_suffix.trim_start_matches('.').to_ascii_lowercase();
    host == suffix || host.ends_with(&format!(".{suffix}"))
}
