//! Wiring from configuration to running components.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use doordont_core::Config;
use doordont_notify::{Dispatcher, EmailNotifier, SmtpSettings, TweetRelayNotifier};
use doordont_scheduler::{Cadence, EvaluationJob, GoalScheduler};

use crate::state::AppState;

/// Load `.env` and build config for `profile` (or the environment's profile).
pub fn load_config(profile: Option<&str>) -> Config {
    doordont_core::config::load_dotenv();
    match profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    }
}

/// Register every configured channel. Email is the fallback channel.
pub fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let mut dispatcher = Dispatcher::empty().with_fallback("email");

    match &config.smtp.host {
        Some(host) => {
            let settings = SmtpSettings {
                host: host.clone(),
                port: config.smtp.port,
                tls: config.smtp.tls,
                from: config.smtp.from.clone(),
                username: config.smtp.username.clone(),
                password: config.smtp.password.clone(),
            };
            let email = EmailNotifier::from_config(&settings).context("invalid SMTP configuration")?;
            dispatcher = dispatcher.with_channel(Box::new(email));
        }
        None => warn!("SMTP not configured, failure emails will not be sent"),
    }

    if let Some(url) = &config.tweet.webhook_url {
        let relay = TweetRelayNotifier::new(url.clone(), config.tweet.token.clone())
            .context("invalid tweet relay configuration")?;
        dispatcher = dispatcher.with_channel(Box::new(relay));
    }

    info!(channels = ?dispatcher.channel_names(), "Notification channels ready");
    Ok(dispatcher)
}

/// Open the store and build the scheduler. Goals are not scheduled yet.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = doordont_storage::open_store(&config.postgres)
        .await
        .context("failed to open store")?;

    let dispatcher = build_dispatcher(config)?;
    let cadence = Cadence::from_config(&config.evaluation).context("invalid evaluation schedule")?;
    info!(
        mode = %config.evaluation.mode,
        cadence = %cadence,
        reset_after_evaluation = config.evaluation.reset_after_evaluation,
        "Evaluation schedule"
    );

    let job = EvaluationJob::new(
        store.clone(),
        dispatcher,
        config.evaluation.reset_after_evaluation,
    );

    Ok(Arc::new(AppState {
        store,
        scheduler: Arc::new(GoalScheduler::new(job, cadence)),
        mode: config.evaluation.mode,
    }))
}
