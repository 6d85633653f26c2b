//! Punishment delivery for missed goals.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - SMTP email and tweet relay notifier implementations
//! - Dispatcher that routes notifications to configured channels

pub mod dispatcher;
pub mod email;
pub mod traits;
pub mod webhook;

pub use dispatcher::Dispatcher;
pub use email::{EmailNotifier, SmtpSettings};
pub use traits::{DispatchResult, Notification, Notifier, NotifyError};
pub use webhook::TweetRelayNotifier;
