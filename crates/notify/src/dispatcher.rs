//! Routes notifications to configured channels.
//!
//! Channels are registered under their name ("email", "tweet"). A dispatch
//! names the channel it wants; when that channel is not configured the
//! dispatcher falls back to its default channel, if any. Failures are
//! reported in the [`DispatchResult`] and never retried.

use std::collections::HashMap;

use crate::traits::{DispatchResult, Notification, Notifier};

pub struct Dispatcher {
    /// Channel name → notifier.
    channels: HashMap<String, Box<dyn Notifier>>,
    /// Channel used when the requested one is missing.
    fallback: Option<String>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self {
            channels: HashMap::new(),
            fallback: None,
        }
    }

    /// Register a channel under its own `channel_name()`.
    pub fn with_channel(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.channels
            .insert(notifier.channel_name().to_string(), notifier);
        self
    }

    /// Set the channel used when a requested channel is not configured.
    pub fn with_fallback(mut self, channel: impl Into<String>) -> Self {
        self.fallback = Some(channel.into());
        self
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Names of all registered channels, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// The channel a dispatch for `channel` would actually use.
    pub fn resolve(&self, channel: &str) -> Option<&str> {
        if let Some((name, _)) = self.channels.get_key_value(channel) {
            return Some(name.as_str());
        }
        self.fallback
            .as_deref()
            .filter(|fallback| self.channels.contains_key(*fallback))
    }

    /// Deliver `notification` through `channel` (or the fallback).
    ///
    /// Returns `None` when neither the channel nor a fallback is configured.
    pub async fn dispatch(
        &self,
        channel: &str,
        notification: &Notification,
    ) -> Option<DispatchResult> {
        let Some(name) = self.resolve(channel) else {
            tracing::warn!(channel, "No notification channel configured");
            return None;
        };
        let notifier = self.channels.get(name)?;

        let start = std::time::Instant::now();
        let result = notifier.send(notification).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, error) = match result {
            Ok(()) => {
                tracing::info!(channel = name, duration_ms, "Notification delivered");
                (true, None)
            }
            Err(e) => {
                tracing::warn!(
                    channel = name,
                    error = %e,
                    duration_ms,
                    "Notification delivery failed"
                );
                (false, Some(e.to_string()))
            }
        };

        Some(DispatchResult {
            channel: name.to_string(),
            recipient: notification.recipient.clone(),
            success,
            error,
            duration_ms,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NotifyError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Smtp("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn mock(name: &str, should_fail: bool) -> (Box<dyn Notifier>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (
            Box::new(MockNotifier {
                name: name.to_string(),
                send_count: count.clone(),
                should_fail,
            }),
            count,
        )
    }

    fn notification() -> Notification {
        Notification::new("jon@example.com", "Goal update", "body")
    }

    #[tokio::test]
    async fn dispatch_to_named_channel() {
        let (email, email_count) = mock("email", false);
        let (tweet, tweet_count) = mock("tweet", false);
        let dispatcher = Dispatcher::empty().with_channel(email).with_channel(tweet);

        let result = dispatcher.dispatch("tweet", &notification()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.channel, "tweet");
        assert_eq!(tweet_count.load(Ordering::SeqCst), 1);
        assert_eq!(email_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_channel_falls_back() {
        let (email, email_count) = mock("email", false);
        let dispatcher = Dispatcher::empty().with_channel(email).with_fallback("email");

        let result = dispatcher.dispatch("tweet", &notification()).await.unwrap();
        assert_eq!(result.channel, "email");
        assert_eq!(result.recipient, "jon@example.com");
        assert_eq!(email_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_reported_not_raised() {
        let (email, count) = mock("email", true);
        let dispatcher = Dispatcher::empty().with_channel(email);

        let result = dispatcher.dispatch("email", &notification()).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("mock failure"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nothing_configured_returns_none() {
        let dispatcher = Dispatcher::empty().with_fallback("email");
        assert!(dispatcher.dispatch("tweet", &notification()).await.is_none());
        assert_eq!(dispatcher.resolve("email"), None);
    }

    #[test]
    fn channel_names_sorted() {
        let (tweet, _) = mock("tweet", false);
        let (email, _) = mock("email", false);
        let dispatcher = Dispatcher::empty().with_channel(tweet).with_channel(email);
        assert_eq!(dispatcher.channel_names(), vec!["email", "tweet"]);
        assert!(dispatcher.has_channel("tweet"));
    }
}
