//! WrikeClient - Wrike API v4 の方言で TrackerMirror を実装
//!
//! 書き込みはすべて form-encoded。レスポンスは `{"data": [...]}` で、
//! 先頭要素を結果として扱います。

use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::TrackerSettings;
use crate::ports::{
    TrackerComment, TrackerContact, TrackerMirror, TrackerTask, TrackerTaskDraft,
    TrackerTaskPatch,
};

pub const DEFAULT_TRACKER_API_BASE: &str = "https://www.wrike.com/api/v4";

/// Extra fields requested when listing folder tasks.
const TASK_LIST_FIELDS: &str = r#"["responsibleIds","description"]"#;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker client is not initialized")]
    NotInitialized,

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("tracker returned an empty data array")]
    EmptyData,

    #[error("tracker json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

type Form = Vec<(&'static str, String)>;

fn dates_field(due: chrono::NaiveDate) -> String {
    serde_json::json!({ "due": due.format("%Y-%m-%d").to_string() }).to_string()
}

/// Form body for `POST /folders/{folder}/tasks`.
pub fn create_form(draft: &TrackerTaskDraft) -> Result<Form, TrackerError> {
    let mut form: Form = vec![("title", draft.title.clone())];
    if let Some(description) = draft.description.as_ref().filter(|d| !d.is_empty()) {
        form.push(("description", description.clone()));
    }
    if !draft.responsibles.is_empty() {
        form.push(("responsibles", serde_json::to_string(&draft.responsibles)?));
    }
    if let Some(due) = draft.due {
        form.push(("dates", dates_field(due)));
    }
    Ok(form)
}

/// Form body for `PUT /tasks/{id}`. Blank strings are left out.
pub fn update_form(patch: &TrackerTaskPatch) -> Form {
    let mut form = Form::new();
    if let Some(title) = patch.title.as_ref().filter(|t| !t.is_empty()) {
        form.push(("title", title.clone()));
    }
    if let Some(description) = patch.description.as_ref().filter(|d| !d.is_empty()) {
        form.push(("description", description.clone()));
    }
    if let Some(status) = patch.status {
        form.push(("status", status.as_str().to_string()));
    }
    if let Some(due) = patch.due {
        form.push(("dates", dates_field(due)));
    }
    form
}

pub struct WrikeClient {
    http: reqwest::Client,
    api_base: String,
    settings: RwLock<Option<TrackerSettings>>,
}

impl WrikeClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_api_base(http, DEFAULT_TRACKER_API_BASE)
    }

    pub fn with_api_base(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            settings: RwLock::new(None),
        }
    }

    fn settings(&self) -> Result<TrackerSettings, TrackerError> {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|s| !s.token.is_empty())
            .ok_or(TrackerError::NotInitialized)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn data<T: DeserializeOwned>(response: reqwest::Response) -> Result<Vec<T>, TrackerError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Envelope<T>>().await?.data)
    }

    async fn first<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TrackerError> {
        Self::data(response)
            .await?
            .into_iter()
            .next()
            .ok_or(TrackerError::EmptyData)
    }

    async fn try_create_task(&self, draft: &TrackerTaskDraft) -> Result<TrackerTask, TrackerError> {
        let settings = self.settings()?;
        if settings.folder_id.is_empty() {
            return Err(TrackerError::NotInitialized);
        }
        let response = self
            .http
            .post(self.url(&format!("/folders/{}/tasks", settings.folder_id)))
            .bearer_auth(&settings.token)
            .form(&create_form(draft)?)
            .send()
            .await?;
        Self::first(response).await
    }

    async fn try_update_task(&self, tracker_id: &str, patch: &TrackerTaskPatch) -> Result<TrackerTask, TrackerError> {
        let settings = self.settings()?;
        let response = self
            .http
            .put(self.url(&format!("/tasks/{tracker_id}")))
            .bearer_auth(&settings.token)
            .form(&update_form(patch))
            .send()
            .await?;
        Self::first(response).await
    }

    async fn try_add_comment(&self, tracker_id: &str, text: &str) -> Result<TrackerComment, TrackerError> {
        let settings = self.settings()?;
        let response = self
            .http
            .post(self.url(&format!("/tasks/{tracker_id}/comments")))
            .bearer_auth(&settings.token)
            .form(&[("text", text)])
            .send()
            .await?;
        Self::first(response).await
    }

    async fn try_list_tasks(&self) -> Result<Vec<TrackerTask>, TrackerError> {
        let settings = self.settings()?;
        if settings.folder_id.is_empty() {
            return Err(TrackerError::NotInitialized);
        }
        let response = self
            .http
            .get(self.url(&format!("/folders/{}/tasks", settings.folder_id)))
            .bearer_auth(&settings.token)
            .query(&[("fields", TASK_LIST_FIELDS)])
            .send()
            .await?;
        Self::data(response).await
    }

    async fn try_list_contacts(&self) -> Result<Vec<TrackerContact>, TrackerError> {
        let settings = self.settings()?;
        let response = self
            .http
            .get(self.url("/contacts"))
            .bearer_auth(&settings.token)
            .send()
            .await?;
        Self::data(response).await
    }
}

fn settle<T>(op: &'static str, result: Result<T, TrackerError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(TrackerError::NotInitialized) => {
            tracing::debug!(op, "tracker call skipped; not initialized");
            None
        }
        Err(e) => {
            tracing::warn!(op, error = %e, "tracker call failed");
            None
        }
    }
}

#[async_trait]
impl TrackerMirror for WrikeClient {
    fn initialize(&self, settings: &TrackerSettings) {
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
        tracing::info!(folder_id = %settings.folder_id, "tracker initialized");
    }

    async fn test_connection(&self, token: &str) -> bool {
        let result = self
            .http
            .get(self.url("/contacts"))
            .bearer_auth(token)
            .query(&[("me", "true")])
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "tracker connection test failed");
                false
            }
        }
    }

    async fn create_task(&self, draft: &TrackerTaskDraft) -> Option<TrackerTask> {
        settle("create_task", self.try_create_task(draft).await)
    }

    async fn update_task(&self, tracker_id: &str, patch: &TrackerTaskPatch) -> Option<TrackerTask> {
        settle("update_task", self.try_update_task(tracker_id, patch).await)
    }

    async fn add_comment(&self, tracker_id: &str, text: &str) -> Option<TrackerComment> {
        settle("add_comment", self.try_add_comment(tracker_id, text).await)
    }

    async fn list_tasks(&self) -> Vec<TrackerTask> {
        settle("list_tasks", self.try_list_tasks().await).unwrap_or_default()
    }

    async fn list_contacts(&self) -> Vec<TrackerContact> {
        settle("list_contacts", self.try_list_contacts().await).unwrap_or_default()
    }
}
