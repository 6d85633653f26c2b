use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub smtp: SmtpConfig,
    pub tweet: TweetRelayConfig,
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOORDONT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DOORDONT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            smtp: SmtpConfig::from_env_profiled(p),
            tweet: TweetRelayConfig::from_env_profiled(p),
            evaluation: EvaluationConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  postgres:    host={}, db={}, configured={}", self.postgres.host, self.postgres.database, self.postgres.is_configured());
        tracing::info!("  smtp:        host={}, from={}", self.smtp.host.as_deref().unwrap_or("(none)"), self.smtp.from);
        tracing::info!("  tweet relay: configured={}", self.tweet.is_configured());
        tracing::info!(
            "  evaluation:  mode={}, cron={}, reset_after_evaluation={}",
            self.evaluation.mode,
            self.evaluation.cron_expression(),
            self.evaluation.reset_after_evaluation
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "configured": self.postgres.is_configured(),
            },
            "smtp": {
                "host": self.smtp.host,
                "port": self.smtp.port,
                "from": self.smtp.from,
                "configured": self.smtp.is_configured(),
            },
            "tweet": { "configured": self.tweet.is_configured() },
            "evaluation": {
                "mode": self.evaluation.mode,
                "cron": self.evaluation.cron_expression(),
                "reset_after_evaluation": self.evaluation.reset_after_evaluation,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "PG_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "doordont"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    /// `PG_URL` when set, otherwise the URL assembled from the individual fields.
    pub fn database_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| self.connection_string())
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}

// ── SMTP (email punishments) ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: bool,
    /// Sender address, e.g. `"Do Or Don't <team@example.com>"`.
    pub from: String,
    #[serde(skip_serializing)]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl SmtpConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_opt(p, "SMTP_HOST"),
            port: profiled_env_opt(p, "SMTP_PORT").and_then(|v| v.parse().ok()),
            tls: profiled_env_bool(p, "SMTP_TLS", true),
            from: profiled_env_or(p, "SMTP_FROM", "doordont.team@gmail.com"),
            username: profiled_env_opt(p, "SMTP_USERNAME"),
            // EMAIL_PASS is the name the mail credential historically used.
            password: profiled_env_opt(p, "SMTP_PASSWORD")
                .or_else(|| profiled_env_opt(p, "EMAIL_PASS")),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.host.is_some()
    }
}

// ── Tweet relay (tweet punishments) ───────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetRelayConfig {
    pub webhook_url: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl TweetRelayConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "TWEET_WEBHOOK_URL"),
            token: profiled_env_opt(p, "TWEET_WEBHOOK_TOKEN"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

// ── Evaluation schedule ───────────────────────────────────────

/// Production: Sundays at 18:00 local time.
pub const PRODUCTION_CRON: &str = "0 0 18 * * Sun";
/// Testing: every minute, every day of the week.
pub const TESTING_CRON: &str = "0 * * * * *";

/// Which evaluation cadence the scheduler runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    Production,
    Testing,
}

impl OperatingMode {
    /// `"production"` (case-insensitive) selects production; everything else is testing.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Testing
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Testing => f.write_str("testing"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub mode: OperatingMode,
    /// Explicit cron expression overriding the mode's default cadence.
    pub cron_override: Option<String>,
    /// Reset the counter in the same step that reads it for evaluation.
    pub reset_after_evaluation: bool,
}

impl EvaluationConfig {
    fn from_env_profiled(p: &str) -> Self {
        let mode = profiled_env_opt(p, "APP_ENV")
            .or_else(|| env_opt("NODE_ENV"))
            .map(|v| OperatingMode::from_env_value(&v))
            .unwrap_or(OperatingMode::Testing);
        Self {
            mode,
            cron_override: profiled_env_opt(p, "EVALUATION_CRON"),
            reset_after_evaluation: profiled_env_bool(p, "RESET_AFTER_EVALUATION", false),
        }
    }

    /// The cron expression the scheduler should use.
    pub fn cron_expression(&self) -> &str {
        if let Some(expr) = self.cron_override.as_deref() {
            return expr;
        }
        match self.mode {
            OperatingMode::Production => PRODUCTION_CRON,
            OperatingMode::Testing => TESTING_CRON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operating_mode_only_production_is_production() {
        assert_eq!(OperatingMode::from_env_value("production"), OperatingMode::Production);
        assert_eq!(OperatingMode::from_env_value(" PRODUCTION "), OperatingMode::Production);
        assert_eq!(OperatingMode::from_env_value("development"), OperatingMode::Testing);
        assert_eq!(OperatingMode::from_env_value(""), OperatingMode::Testing);
    }

    #[test]
    fn cron_expression_follows_mode() {
        let mut eval = EvaluationConfig {
            mode: OperatingMode::Production,
            cron_override: None,
            reset_after_evaluation: false,
        };
        assert_eq!(eval.cron_expression(), PRODUCTION_CRON);

        eval.mode = OperatingMode::Testing;
        assert_eq!(eval.cron_expression(), TESTING_CRON);
    }

    #[test]
    fn cron_override_wins() {
        let eval = EvaluationConfig {
            mode: OperatingMode::Production,
            cron_override: Some("0 9 * * 1".to_string()),
            reset_after_evaluation: false,
        };
        assert_eq!(eval.cron_expression(), "0 9 * * 1");
    }

    #[test]
    fn database_url_prefers_explicit_url() {
        let mut pg = PostgresConfig {
            url: None,
            host: "db".to_string(),
            port: 5433,
            database: "goals".to_string(),
            username: Some("app".to_string()),
            password: Some("secret".to_string()),
            ssl_mode: "disable".to_string(),
            max_connections: 5,
        };
        assert_eq!(
            pg.database_url(),
            "postgres://app:secret@db:5433/goals?sslmode=disable"
        );

        pg.url = Some("postgres://other/db".to_string());
        assert_eq!(pg.database_url(), "postgres://other/db");
        assert!(pg.is_configured());
    }

    #[test]
    fn redacted_summary_hides_secrets() {
        let config = Config {
            profile: String::new(),
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                cors_origin: "*".to_string(),
            },
            postgres: PostgresConfig {
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                database: "doordont".to_string(),
                username: None,
                password: Some("pg-secret".to_string()),
                ssl_mode: "prefer".to_string(),
                max_connections: 10,
            },
            smtp: SmtpConfig {
                host: Some("smtp.example.com".to_string()),
                port: Some(587),
                tls: true,
                from: "team@example.com".to_string(),
                username: Some("team".to_string()),
                password: Some("smtp-secret".to_string()),
            },
            tweet: TweetRelayConfig {
                webhook_url: None,
                token: Some("tweet-secret".to_string()),
            },
            evaluation: EvaluationConfig {
                mode: OperatingMode::Testing,
                cron_override: None,
                reset_after_evaluation: false,
            },
        };

        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("secret"), "got: {summary}");
        assert!(summary.contains("smtp.example.com"));
        assert_eq!(config.profile_label(), "default");
    }
}
