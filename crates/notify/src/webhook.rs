//! Tweet relay notifier.
//!
//! Posting to a social network is delegated to a relay service reachable
//! over HTTP. Each notification becomes a JSON `POST` of
//! `{"handle": ..., "text": ...}`, authenticated with an optional bearer token.

use serde::Serialize;

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct RelayPayload<'a> {
    handle: &'a str,
    text: &'a str,
}

/// Delivers notifications as tweets through an HTTP relay.
#[derive(Debug)]
pub struct TweetRelayNotifier {
    url: String,
    token: Option<String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl TweetRelayNotifier {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self, NotifyError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotifyError::Config(format!(
                "tweet relay url must be http(s): {url}"
            )));
        }
        Ok(Self {
            url,
            token,
            client: reqwest::Client::new(),
        })
    }

    fn payload<'a>(notification: &'a Notification) -> Result<RelayPayload<'a>, NotifyError> {
        let handle = notification.recipient.trim_start_matches('@');
        if handle.is_empty() {
            return Err(NotifyError::InvalidRecipient(
                "empty twitter handle".to_string(),
            ));
        }
        Ok(RelayPayload {
            handle,
            text: &notification.body,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for TweetRelayNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = Self::payload(notification)?;

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body,
                "tweet relay returned non-2xx status"
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(channel = "tweet", handle = payload.handle, "Tweet posted");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "tweet"
    }
}
