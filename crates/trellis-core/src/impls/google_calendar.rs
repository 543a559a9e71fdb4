//! GoogleCalendarClient - Google Calendar v3 の primary カレンダーへのミラー
//!
//! アクセストークンは `authorize()`（`ConsentFlow` 経由）で取得し、
//! プロセス内にだけ保持します。トークンが無い間はすべて no-op。

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::{CalendarSettings, DueDate};
use crate::ports::{
    AuthorizeError, CALENDAR_SCOPES, CalendarEvent, CalendarMirror, Clock, ConsentFlow,
    ConsentPrompt, ConsentRequest, EventDraft, EventPatch, EventTime, EventWindow,
};

pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_CALENDAR_TIME_ZONE: &str = "Australia/Adelaide";

const LIST_MAX_RESULTS: &str = "50";
const LIST_WINDOW_DAYS: i64 = 30;
const EMAIL_REMINDER_MINUTES: u32 = 24 * 60;
const POPUP_REMINDER_MINUTES: u32 = 30;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar has no access token")]
    Unauthorized,

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Start/end of an event in `time_zone`.
///
/// Day-only due dates start at local midnight.
pub fn event_time(due: &DueDate, time_zone: &str) -> EventTime {
    let date_time = match due {
        DueDate::Day(day) => day.and_time(NaiveTime::MIN).format(LOCAL_FORMAT).to_string(),
        DueDate::At(at) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    EventTime {
        date_time: Some(date_time),
        date: None,
        time_zone: Some(time_zone.to_string()),
    }
}

/// Explicit end, or one hour after `start`.
fn end_time(start: &DueDate, end: Option<&DueDate>, time_zone: &str) -> EventTime {
    match (start, end) {
        (_, Some(end)) => event_time(end, time_zone),
        (DueDate::At(at), None) => event_time(&DueDate::At(*at + Duration::hours(1)), time_zone),
        (DueDate::Day(day), None) => {
            let at = day.and_time(NaiveTime::MIN) + Duration::hours(1);
            EventTime {
                date_time: Some(at.format(LOCAL_FORMAT).to_string()),
                date: None,
                time_zone: Some(time_zone.to_string()),
            }
        }
    }
}

fn reminders() -> Value {
    json!({
        "useDefault": false,
        "overrides": [
            { "method": "email", "minutes": EMAIL_REMINDER_MINUTES },
            { "method": "popup", "minutes": POPUP_REMINDER_MINUTES }
        ]
    })
}

/// JSON body for `POST /calendars/primary/events`.
pub fn event_body(draft: &EventDraft, time_zone: &str) -> Value {
    let attendees: Vec<Value> = draft
        .attendees
        .iter()
        .map(|email| json!({ "email": email }))
        .collect();
    json!({
        "summary": draft.summary,
        "description": draft.description.clone().unwrap_or_default(),
        "start": event_time(&draft.start, time_zone),
        "end": end_time(&draft.start, draft.end.as_ref(), time_zone),
        "attendees": attendees,
        "reminders": reminders(),
    })
}

/// JSON body for `PATCH /calendars/primary/events/{id}`. Moving the start moves the end too.
pub fn patch_body(patch: &EventPatch, time_zone: &str) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(summary) = &patch.summary {
        body.insert("summary".into(), summary.clone().into());
    }
    if let Some(description) = &patch.description {
        body.insert("description".into(), description.clone().into());
    }
    if let Some(start) = &patch.start {
        body.insert("start".into(), json!(event_time(start, time_zone)));
        body.insert("end".into(), json!(end_time(start, None, time_zone)));
    }
    Value::Object(body)
}

/// `timeMin`/`timeMax` for a listing window, defaulting to the next 30 days.
pub fn window_bounds(window: EventWindow, now: DateTime<Utc>) -> (String, String) {
    let min = window.time_min.unwrap_or(now);
    let max = window
        .time_max
        .unwrap_or_else(|| now + Duration::days(LIST_WINDOW_DAYS));
    (
        min.to_rfc3339_opts(SecondsFormat::Millis, true),
        max.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

#[derive(Default)]
struct Grant {
    client_id: Option<String>,
    access_token: Option<String>,
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    api_base: String,
    time_zone: String,
    consent: Arc<dyn ConsentFlow>,
    clock: Arc<dyn Clock>,
    grant: RwLock<Grant>,
}

impl GoogleCalendarClient {
    pub fn new(http: reqwest::Client, consent: Arc<dyn ConsentFlow>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            api_base: DEFAULT_CALENDAR_API_BASE.to_string(),
            time_zone: DEFAULT_CALENDAR_TIME_ZONE.to_string(),
            consent,
            clock,
            grant: RwLock::new(Grant::default()),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    fn token(&self) -> Result<String, CalendarError> {
        self.grant
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .access_token
            .clone()
            .ok_or(CalendarError::Unauthorized)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CalendarError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn try_create_event(&self, draft: &EventDraft) -> Result<CalendarEvent, CalendarError> {
        let token = self.token()?;
        let response = self
            .http
            .post(self.url("/calendars/primary/events"))
            .bearer_auth(token)
            .query(&[("sendUpdates", "all")])
            .json(&event_body(draft, &self.time_zone))
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn try_update_event(&self, event_id: &str, patch: &EventPatch) -> Result<CalendarEvent, CalendarError> {
        let token = self.token()?;
        let response = self
            .http
            .patch(self.url(&format!("/calendars/primary/events/{event_id}")))
            .bearer_auth(token)
            .query(&[("sendUpdates", "all")])
            .json(&patch_body(patch, &self.time_zone))
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn try_list_events(&self, window: EventWindow) -> Result<Vec<CalendarEvent>, CalendarError> {
        let token = self.token()?;
        let (time_min, time_max) = window_bounds(window, self.clock.now());
        let response = self
            .http
            .get(self.url("/calendars/primary/events"))
            .bearer_auth(token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", LIST_MAX_RESULTS),
            ])
            .send()
            .await?;
        Ok(Self::checked(response).await?.json::<EventList>().await?.items)
    }
}

fn settle<T>(op: &'static str, result: Result<T, CalendarError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(CalendarError::Unauthorized) => {
            tracing::debug!(op, "calendar call skipped; not authorized");
            None
        }
        Err(e) => {
            tracing::warn!(op, error = %e, "calendar call failed");
            None
        }
    }
}

#[async_trait]
impl CalendarMirror for GoogleCalendarClient {
    fn initialize(&self, settings: &CalendarSettings) {
        let mut grant = self.grant.write().unwrap_or_else(|e| e.into_inner());
        if grant.client_id.as_deref() != Some(settings.client_id.as_str()) {
            grant.access_token = None;
        }
        grant.client_id = Some(settings.client_id.clone()).filter(|id| !id.is_empty());
        tracing::info!("calendar initialized");
    }

    async fn authorize(&self) -> Result<(), AuthorizeError> {
        let request = {
            let grant = self.grant.read().unwrap_or_else(|e| e.into_inner());
            let client_id = grant.client_id.clone().ok_or(AuthorizeError::NotInitialized)?;
            ConsentRequest {
                client_id,
                scopes: CALENDAR_SCOPES.iter().map(|s| s.to_string()).collect(),
                prompt: if grant.access_token.is_some() {
                    ConsentPrompt::Silent
                } else {
                    ConsentPrompt::Consent
                },
            }
        };
        let token = self.consent.request_token(&request).await?;
        self.grant.write().unwrap_or_else(|e| e.into_inner()).access_token = Some(token);
        tracing::info!("calendar authorized");
        Ok(())
    }

    async fn test_connection(&self) -> bool {
        let Ok(token) = self.token() else {
            return false;
        };
        match self
            .http
            .get(self.url("/calendars/primary"))
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "calendar connection test failed");
                false
            }
        }
    }

    async fn create_event(&self, draft: &EventDraft) -> Option<CalendarEvent> {
        settle("create_event", self.try_create_event(draft).await)
    }

    async fn update_event(&self, event_id: &str, patch: &EventPatch) -> Option<CalendarEvent> {
        settle("update_event", self.try_update_event(event_id, patch).await)
    }

    async fn list_events(&self, window: EventWindow) -> Vec<CalendarEvent> {
        settle("list_events", self.try_list_events(window).await).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::consent::StaticTokenConsent;
    use crate::ports::SystemClock;
    use chrono::TimeZone;

    const TZ: &str = DEFAULT_CALENDAR_TIME_ZONE;

    fn draft(start: &str) -> EventDraft {
        EventDraft {
            summary: "Payroll cutover".into(),
            description: None,
            start: start.parse().unwrap(),
            end: None,
            attendees: vec!["sam@example.com".into()],
        }
    }

    #[test]
    fn event_body_defaults_end_to_one_hour_later() {
        let body = event_body(&draft("2025-06-30T09:00:00+09:30"), TZ);
        assert_eq!(body["start"]["dateTime"], "2025-06-30T09:00:00+09:30");
        assert_eq!(body["end"]["dateTime"], "2025-06-30T10:00:00+09:30");
        assert_eq!(body["end"]["timeZone"], TZ);
        assert_eq!(body["attendees"][0]["email"], "sam@example.com");
        assert_eq!(body["reminders"]["overrides"][0]["minutes"], 1440);
        assert_eq!(body["reminders"]["overrides"][1]["method"], "popup");
    }

    #[test]
    fn day_only_due_dates_start_at_local_midnight() {
        let body = event_body(&draft("2025-06-30"), TZ);
        assert_eq!(body["start"]["dateTime"], "2025-06-30T00:00:00");
        assert_eq!(body["end"]["dateTime"], "2025-06-30T01:00:00");
    }

    #[test]
    fn patch_body_only_carries_changed_fields() {
        let patch = EventPatch {
            summary: Some("Renamed".into()),
            ..EventPatch::default()
        };
        assert_eq!(patch_body(&patch, TZ), json!({ "summary": "Renamed" }));

        let patch = EventPatch {
            start: Some("2025-07-01".parse().unwrap()),
            ..EventPatch::default()
        };
        let body = patch_body(&patch, TZ);
        assert_eq!(body["end"]["dateTime"], "2025-07-01T01:00:00");
    }

    #[test]
    fn listing_window_defaults_to_thirty_days() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let (min, max) = window_bounds(EventWindow::default(), now);
        assert_eq!(min, "2025-01-01T00:00:00.000Z");
        assert_eq!(max, "2025-01-31T00:00:00.000Z");
    }

    #[tokio::test]
    async fn authorize_needs_client_id_then_stores_token() {
        let client = GoogleCalendarClient::new(
            reqwest::Client::new(),
            Arc::new(StaticTokenConsent::new("ya29.token")),
            Arc::new(SystemClock),
        );
        assert!(matches!(client.authorize().await, Err(AuthorizeError::NotInitialized)));
        assert!(client.create_event(&draft("2025-06-30")).await.is_none());

        client.initialize(&CalendarSettings {
            client_id: "abc.apps.googleusercontent.com".into(),
        });
        client.authorize().await.unwrap();
        assert_eq!(client.token().unwrap(), "ya29.token");
    }
}
