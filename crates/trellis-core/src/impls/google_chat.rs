//! GoogleChatClient - Google Chat の incoming webhook へ投稿
//!
//! カード付きのメッセージは `cardsV2` 形式（ヘッダー + テキスト 1 段落）で送ります。

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Value, json};

use crate::domain::ChatSettings;
use crate::ports::{ChatMessage, ChatNotifier, Clock};

pub const CHAT_WEBHOOK_HOST: &str = "chat.googleapis.com";
pub const DEFAULT_CARD_IMAGE_URL: &str =
    "https://www.gstatic.com/images/icons/material/system/2x/description_grey600_48dp.png";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat webhook is not configured")]
    NotInitialized,

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Whether `webhook_url` points at the chat webhook host.
pub fn is_webhook_url(webhook_url: &str) -> bool {
    Url::parse(webhook_url.trim())
        .ok()
        .and_then(|url| url.host_str().map(|h| h.eq_ignore_ascii_case(CHAT_WEBHOOK_HOST)))
        .unwrap_or(false)
}

/// Webhook body: plain `{"text"}` or a single `cardsV2` card.
pub fn payload(message: &ChatMessage, card_id: i64) -> Value {
    let Some(header) = &message.card else {
        return json!({ "text": message.text });
    };
    json!({
        "cardsV2": [{
            "cardId": format!("card-{card_id}"),
            "card": {
                "header": {
                    "title": header.title,
                    "subtitle": header.subtitle,
                    "imageUrl": DEFAULT_CARD_IMAGE_URL,
                    "imageType": "CIRCLE"
                },
                "sections": [{
                    "widgets": [{ "textParagraph": { "text": message.text } }]
                }]
            }
        }]
    })
}

pub struct GoogleChatClient {
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    webhook_url: RwLock<Option<String>>,
}

impl GoogleChatClient {
    pub fn new(http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            clock,
            webhook_url: RwLock::new(None),
        }
    }

    async fn try_send(&self, message: &ChatMessage) -> Result<Value, ChatError> {
        let url = self
            .webhook_url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(ChatError::NotInitialized)?;
        let body = payload(message, self.clock.now().timestamp_millis());
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatNotifier for GoogleChatClient {
    fn initialize(&self, settings: &ChatSettings) {
        let url = Some(settings.webhook_url.clone()).filter(|u| !u.is_empty());
        *self.webhook_url.write().unwrap_or_else(|e| e.into_inner()) = url;
        tracing::info!("chat webhook initialized");
    }

    async fn test_connection(&self, webhook_url: &str) -> bool {
        is_webhook_url(webhook_url)
    }

    async fn send(&self, message: &ChatMessage) -> Option<Value> {
        match self.try_send(message).await {
            Ok(value) => Some(value),
            Err(ChatError::NotInitialized) => {
                tracing::debug!("chat message dropped; webhook not configured");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat message failed");
                None
            }
        }
    }
}
