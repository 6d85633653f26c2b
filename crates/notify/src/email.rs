//! SMTP email notifier via `lettre` with TLS support.
//!
//! Sends each notification to the address in its `recipient` field.
//! Supports STARTTLS, implicit TLS on port 465, and plaintext relays.

use crate::traits::{Notification, Notifier, NotifyError};
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    /// Defaults to 587.
    pub port: Option<u16>,
    pub tls: bool,
    /// Sender, e.g. `"team@example.com"` or `"Do Or Don't <team@example.com>"`.
    pub from: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Sends notifications as emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox.
    from: Mailbox,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP settings.
    ///
    /// Credentials are attached only when both username and password are set;
    /// otherwise the connection is unauthenticated.
    pub fn from_config(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let port = settings.port.unwrap_or(587);

        // Port 465 uses implicit TLS; everything else uses STARTTLS when TLS is enabled.
        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if settings.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host).port(port)
        };

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let to: Mailbox = notification.recipient.parse().map_err(
            |e: lettre::address::AddressError| {
                NotifyError::InvalidRecipient(format!("{}: {e}", notification.recipient))
            },
        )?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&notification.subject)
            .body(notification.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = self.build_message(notification)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            subject = %notification.subject,
            code = %response.code(),
            "Email sent"
        );

        Ok(())
    }

    /// Returns `"email"`.
    fn channel_name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: Some(587),
            tls: true,
            from: "doordont.team@example.com".to_string(),
            username: None,
            password: None,
        }
    }

    #[test]
    fn parse_email_with_display_name() {
        let mailbox: Mailbox = "Do Or Don't <team@example.com>".parse().unwrap();
        assert_eq!(mailbox.email.to_string(), "team@example.com");
    }

    #[test]
    fn from_config_valid() {
        assert!(EmailNotifier::from_config(&settings()).is_ok());
    }

    #[test]
    fn from_config_with_credentials() {
        let mut s = settings();
        s.username = Some("team".to_string());
        s.password = Some("app-password".to_string());
        assert!(EmailNotifier::from_config(&s).is_ok());
    }

    #[test]
    fn from_config_invalid_from_address() {
        let mut s = settings();
        s.from = "bad-address".to_string();
        let err = EmailNotifier::from_config(&s).unwrap_err().to_string();
        assert!(err.contains("Configuration error"), "got: {err}");
    }

    #[test]
    fn from_config_implicit_tls_port() {
        let mut s = settings();
        s.port = Some(465);
        assert!(EmailNotifier::from_config(&s).is_ok());
    }

    #[test]
    fn from_config_no_tls() {
        let mut s = settings();
        s.port = Some(25);
        s.tls = false;
        assert!(EmailNotifier::from_config(&s).is_ok());
    }

    #[test]
    fn message_goes_to_notification_recipient() {
        let notifier = EmailNotifier::from_config(&settings()).unwrap();
        let notification = Notification::new("jon@example.com", "Goal update", "body");
        let message = notifier.build_message(&notification).unwrap();
        let to: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(to, vec!["jon@example.com".to_string()]);
    }

    #[test]
    fn invalid_recipient_is_rejected_before_sending() {
        let notifier = EmailNotifier::from_config(&settings()).unwrap();
        let notification = Notification::new("not-an-email", "Goal update", "body");
        let err = notifier.build_message(&notification).unwrap_err();
        assert!(matches!(err, NotifyError::InvalidRecipient(_)));
    }

    #[test]
    fn channel_name_is_email() {
        let notifier = EmailNotifier::from_config(&settings()).unwrap();
        assert_eq!(notifier.channel_name(), "email");
    }
}
