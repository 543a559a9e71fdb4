//! ConsentFlow の実装
//!
//! - **StaticTokenConsent**: 事前に取得済みのトークンをそのまま返す
//! - `consent_url`: implicit grant の同意画面 URL（CLI が表示する）

use async_trait::async_trait;
use reqwest::Url;

use crate::ports::{AuthorizeError, ConsentFlow, ConsentPrompt, ConsentRequest};

pub const CONSENT_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const CONSENT_REDIRECT_URI: &str = "http://localhost";

/// Browser URL that starts the implicit grant for `request`.
pub fn consent_url(request: &ConsentRequest) -> Result<Url, AuthorizeError> {
    let mut url =
        Url::parse(CONSENT_ENDPOINT).map_err(|e| AuthorizeError::Flow(e.to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &request.client_id)
            .append_pair("redirect_uri", CONSENT_REDIRECT_URI)
            .append_pair("response_type", "token")
            .append_pair("scope", &request.scopes.join(" "));
        if request.prompt == ConsentPrompt::Consent {
            query.append_pair("prompt", "consent");
        }
    }
    Ok(url)
}

/// Hands out a token obtained out of band.
#[derive(Debug, Clone)]
pub struct StaticTokenConsent {
    token: String,
}

impl StaticTokenConsent {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl ConsentFlow for StaticTokenConsent {
    async fn request_token(&self, _request: &ConsentRequest) -> Result<String, AuthorizeError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(AuthorizeError::Denied("no access token supplied".into()));
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CALENDAR_SCOPES;

    fn request(prompt: ConsentPrompt) -> ConsentRequest {
        ConsentRequest {
            client_id: "abc.apps.googleusercontent.com".into(),
            scopes: CALENDAR_SCOPES.iter().map(|s| s.to_string()).collect(),
            prompt,
        }
    }

    #[test]
    fn consent_url_requests_token_grant() {
        let url = consent_url(&request(ConsentPrompt::Consent)).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("response_type".into(), "token".into())));
        assert!(pairs.contains(&("prompt".into(), "consent".into())));
        assert!(pairs.contains(&(
            "scope".into(),
            CALENDAR_SCOPES.join(" ")
        )));

        let silent = consent_url(&request(ConsentPrompt::Silent)).unwrap();
        assert!(!silent.query_pairs().any(|(k, _)| k == "prompt"));
    }

    #[tokio::test]
    async fn blank_static_token_is_denied() {
        let flow = StaticTokenConsent::new("  ");
        assert!(matches!(
            flow.request_token(&request(ConsentPrompt::Consent)).await,
            Err(AuthorizeError::Denied(_))
        ));
    }
}
