#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expr}': {source}")]
    InvalidCron {
        expr: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("cron expression '{0}' never fires")]
    NeverFires(String),

    #[error("interval must be greater than zero")]
    ZeroInterval,
}
