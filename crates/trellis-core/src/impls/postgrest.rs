//! PostgrestGateway - Supabase の REST（PostgREST）方言で authoritative store に話す
//!
//! - `GET/POST/PATCH/DELETE {url}/rest/v1/<table>`
//! - `apikey` ヘッダ + `Authorization: Bearer <key>`
//! - 書き込みは `Prefer: return=representation` で結果の行を受け取る
//!
//! push は websocket を持たないため、このクライアント自身の書き込みを
//! 購読者へエコーするだけです。

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::broadcast;

use super::absorb;
use crate::domain::{BackendSettings, Collection, Row, RowChange};
use crate::ports::{
    BackendGateway, ChangeFeed, DEFAULT_BACKEND_HOST_SUFFIX, GatewayError, endpoint_matches,
};

const FEED_CAPACITY: usize = 256;
const TARGET: &str = "postgrest";

#[derive(Debug, Clone)]
struct Connection {
    base: Url,
    key: String,
}

impl Connection {
    fn open(credentials: &BackendSettings) -> Result<Self, GatewayError> {
        let base = Url::parse(credentials.url.trim())
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {e}", credentials.url)))?;
        Ok(Self {
            base,
            key: credentials.key.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        let apikey = HeaderValue::from_str(&self.key)
            .map_err(|e| GatewayError::Rejected(format!("invalid api key header: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.key))
            .map_err(|e| GatewayError::Rejected(format!("invalid auth header: {e}")))?;
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

/// `<base>/rest/v1/<table>`
pub fn table_url(base: &Url, collection: Collection) -> Result<Url, GatewayError> {
    let root = base.as_str().trim_end_matches('/');
    Url::parse(&format!("{root}/rest/v1/{}", collection.table()))
        .map_err(|e| GatewayError::InvalidUrl(e.to_string()))
}

pub struct PostgrestGateway {
    http: reqwest::Client,
    host_suffix: String,
    conn: RwLock<Option<Arc<Connection>>>,
    feed: broadcast::Sender<RowChange>,
}

impl PostgrestGateway {
    pub fn new(http: reqwest::Client) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            http,
            host_suffix: DEFAULT_BACKEND_HOST_SUFFIX.to_string(),
            conn: RwLock::new(None),
            feed,
        }
    }

    pub fn with_host_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.host_suffix = suffix.into();
        self
    }

    fn connection(&self) -> Result<Arc<Connection>, GatewayError> {
        self.conn
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(GatewayError::NotInitialized)
    }

    fn publish(&self, change: RowChange) {
        let _ = self.feed.send(change);
    }

    async fn rows(response: reqwest::Response) -> Result<Vec<Row>, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn try_list(&self, collection: Collection, limit: Option<usize>) -> Result<Vec<Row>, GatewayError> {
        let conn = self.connection()?;
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let response = self
            .http
            .get(table_url(&conn.base, collection)?)
            .headers(conn.headers()?)
            .query(&query)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn try_create(&self, collection: Collection, fields: Row) -> Result<Row, GatewayError> {
        let conn = self.connection()?;
        let response = self
            .http
            .post(table_url(&conn.base, collection)?)
            .headers(conn.headers()?)
            .header("Prefer", "return=representation")
            .json(&[fields])
            .send()
            .await?;
        let row = Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(GatewayError::EmptyResponse)?;
        self.publish(RowChange::insert(collection, row.clone()));
        Ok(row)
    }

    async fn try_update(&self, collection: Collection, id: &str, fields: Row) -> Result<Row, GatewayError> {
        let conn = self.connection()?;
        let response = self
            .http
            .patch(table_url(&conn.base, collection)?)
            .headers(conn.headers()?)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
            .json(&fields)
            .send()
            .await?;
        let row = Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        self.publish(RowChange::update(collection, row.clone()));
        Ok(row)
    }

    async fn try_delete(&self, collection: Collection, id: &str) -> Result<(), GatewayError> {
        let conn = self.connection()?;
        let response = self
            .http
            .delete(table_url(&conn.base, collection)?)
            .headers(conn.headers()?)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        let old = deleted_row(collection, id, Self::rows(response).await?)?;
        self.publish(RowChange::delete(collection, old));
        Ok(())
    }
}

/// The row a `return=representation` delete echoed back; none means nothing matched.
fn deleted_row(collection: Collection, id: &str, rows: Vec<Row>) -> Result<Row, GatewayError> {
    rows.into_iter().next().ok_or_else(|| GatewayError::NotFound {
        collection,
        id: id.to_string(),
    })
}

#[async_trait]
impl BackendGateway for PostgrestGateway {
    fn initialize(&self, credentials: &BackendSettings) {
        match Connection::open(credentials) {
            Ok(conn) => {
                tracing::info!(url = %conn.base, "backend initialized");
                *self.conn.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(conn));
            }
            Err(e) => tracing::warn!(error = %e, "backend initialize failed"),
        }
    }

    fn is_initialized(&self) -> bool {
        self.conn.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    async fn test_connection(&self, credentials: &BackendSettings) -> bool {
        endpoint_matches(credentials, &self.host_suffix)
    }

    async fn list(&self, collection: Collection, limit: Option<usize>) -> Vec<Row> {
        if !self.is_initialized() {
            return Vec::new();
        }
        absorb(TARGET, collection, "list", self.try_list(collection, limit).await).unwrap_or_default()
    }

    async fn create(&self, collection: Collection, fields: Row) -> Option<Row> {
        absorb(TARGET, collection, "create", self.try_create(collection, fields).await)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Row) -> Option<Row> {
        absorb(TARGET, collection, "update", self.try_update(collection, id, fields).await)
    }

    async fn delete(&self, collection: Collection, id: &str) -> bool {
        absorb(TARGET, collection, "delete", self.try_delete(collection, id).await).is_some()
    }

    fn changes(&self) -> Option<ChangeFeed> {
        self.is_initialized().then(|| self.feed.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://abcd.supabase.co", "https://abcd.supabase.co/rest/v1/tasks")]
    #[case("https://abcd.supabase.co/", "https://abcd.supabase.co/rest/v1/tasks")]
    #[case("http://localhost:54321", "http://localhost:54321/rest/v1/tasks")]
    fn table_urls_hang_off_rest_v1(#[case] base: &str, #[case] expected: &str) {
        let base = Url::parse(base).unwrap();
        assert_eq!(table_url(&base, Collection::Tasks).unwrap().as_str(), expected);
    }

    #[test]
    fn headers_carry_key_twice() {
        let conn = Connection::open(&BackendSettings::new("https://a.supabase.co", "anon")).unwrap();
        let headers = conn.headers().unwrap();
        assert_eq!(headers["apikey"], "anon");
        assert_eq!(headers[AUTHORIZATION], "Bearer anon");
    }

    #[tokio::test]
    async fn uninitialized_client_is_quiet() {
        let gateway = PostgrestGateway::new(reqwest::Client::new());
        assert!(!gateway.is_initialized());
        assert!(gateway.list(Collection::Notes, None).await.is_empty());
        assert!(gateway.create(Collection::Notes, Row::new()).await.is_none());
        assert!(!gateway.delete(Collection::Notes, "1").await);
        assert!(gateway.changes().is_none());
    }

    #[test]
    fn delete_matching_nothing_is_not_found() {
        let err = deleted_row(Collection::Tasks, "ghost", Vec::new()).unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { ref id, .. } if id == "ghost"));

        let mut echoed = Row::new();
        echoed.insert("id".into(), "t1".into());
        let old = deleted_row(Collection::Tasks, "t1", vec![echoed.clone()]).unwrap();
        assert_eq!(old, echoed);
    }

    #[tokio::test]
    async fn malformed_url_leaves_client_uninitialized() {
        let gateway = PostgrestGateway::new(reqwest::Client::new());
        gateway.initialize(&BackendSettings::new("not a url", "k"));
        assert!(!gateway.is_initialized());

        gateway.initialize(&BackendSettings::new("https://a.supabase.co", "k"));
        assert!(gateway.is_initialized());
        assert!(gateway.changes().is_some());
    }
}
