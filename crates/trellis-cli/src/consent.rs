//! 端末での calendar 同意フロー
//!
//! `TRELLIS_CALENDAR_TOKEN` があればそれを使う。無ければ同意画面の URL を表示し、
//! リダイレクト先 URL の `access_token` を標準入力から貼り付けてもらいます。

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use trellis_core::impls::{StaticTokenConsent, consent_url};
use trellis_core::ports::{AuthorizeError, ConsentFlow, ConsentRequest};

pub const TOKEN_ENV: &str = "TRELLIS_CALENDAR_TOKEN";

pub struct TerminalConsent;

#[async_trait]
impl ConsentFlow for TerminalConsent {
    async fn request_token(&self, request: &ConsentRequest) -> Result<String, AuthorizeError> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            return StaticTokenConsent::new(token).request_token(request).await;
        }

        let url = consent_url(request)?;
        eprintln!("Open this URL, approve access, then paste the access_token here:");
        eprintln!("{url}");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AuthorizeError::Flow(e.to_string()))?;
        StaticTokenConsent::new(extract_token(&line))
            .request_token(request)
            .await
    }
}

/// Accepts a bare token or the whole redirect url (`...#access_token=...&...`).
fn extract_token(pasted: &str) -> String {
    let pasted = pasted.trim();
    let Some((_, fragment)) = pasted.split_once('#') else {
        return pasted.to_string();
    };
    fragment
        .split('&')
        .find_map(|pair| pair.strip_prefix("access_token="))
        .unwrap_or_default()
        .to_string()
}
