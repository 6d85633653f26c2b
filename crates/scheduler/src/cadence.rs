//! When goal evaluations fire.
//!
//! Production evaluates weekly (Sunday 18:00 local time) and testing every
//! minute; both are cron expressions from [`EvaluationConfig`]. A fixed
//! interval cadence is available for tests and tooling.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;

use doordont_core::config::EvaluationConfig;

use crate::error::SchedulerError;

#[derive(Debug, Clone)]
pub enum Cadence {
    /// Cron schedule evaluated in the server's local time zone.
    Cron {
        /// Normalized 6-field expression.
        expression: String,
        schedule: Schedule,
    },
    /// Fixed period, measured from the end of the previous wait.
    Interval(Duration),
}

impl Cadence {
    /// Parse a 5- or 6-field cron expression.
    pub fn cron(expr: &str) -> Result<Self, SchedulerError> {
        let expression = normalize_cron(expr);
        let schedule =
            Schedule::from_str(&expression).map_err(|source| SchedulerError::InvalidCron {
                expr: expr.to_string(),
                source,
            })?;
        if schedule.upcoming(Local).next().is_none() {
            return Err(SchedulerError::NeverFires(expr.to_string()));
        }
        Ok(Self::Cron {
            expression,
            schedule,
        })
    }

    pub fn interval(period: Duration) -> Result<Self, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        Ok(Self::Interval(period))
    }

    /// The cadence selected by the operating mode or an explicit override.
    pub fn from_config(config: &EvaluationConfig) -> Result<Self, SchedulerError> {
        Self::cron(config.cron_expression())
    }

    /// First fire strictly after `after`.
    pub fn next_fire_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        match self {
            Self::Cron { schedule, .. } => schedule.after(after).next(),
            Self::Interval(period) => chrono::Duration::from_std(*period)
                .ok()
                .and_then(|period| after.clone().checked_add_signed(period)),
        }
    }

    /// The next fire and how long to sleep from `now` until it.
    ///
    /// Cron fires are never earlier than the `previous` fire, so a clock
    /// stepped backwards cannot repeat a slot that already fired.
    pub fn next_fire(
        &self,
        now: DateTime<Local>,
        previous: Option<DateTime<Local>>,
    ) -> Option<(DateTime<Local>, Duration)> {
        match self {
            Self::Interval(period) => Some((self.next_fire_after(&now)?, *period)),
            Self::Cron { .. } => {
                let base = previous.map_or(now, |previous| previous.max(now));
                let next = self.next_fire_after(&base)?;
                Some((next, (next - now).to_std().unwrap_or(Duration::ZERO)))
            }
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cron { expression, .. } => write!(f, "cron '{expression}'"),
            Self::Interval(period) => write!(f, "every {}s", period.as_secs()),
        }
    }
}

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use doordont_core::config::{OperatingMode, PRODUCTION_CRON, TESTING_CRON};

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn normalize_cron_5_to_6_fields() {
        assert_eq!(normalize_cron("0 18 * * Sun"), "0 0 18 * * Sun");
        assert_eq!(normalize_cron("  */5 * * * *  "), "0 */5 * * * *");
        assert_eq!(normalize_cron("0 * * * * *"), "0 * * * * *");
    }

    #[test]
    fn production_fires_sunday_evening() {
        let cadence = Cadence::cron(PRODUCTION_CRON).unwrap();
        // 2026-10-19 is a Monday.
        let next = cadence
            .next_fire_after(&utc("2026-10-19T12:00:00Z"))
            .unwrap();
        assert_eq!(next, utc("2026-10-25T18:00:00Z"));

        // Exactly on a fire time: the next one is a week later.
        let after = cadence.next_fire_after(&next).unwrap();
        assert_eq!(after, utc("2026-11-01T18:00:00Z"));
    }

    #[test]
    fn testing_fires_every_minute() {
        let cadence = Cadence::cron(TESTING_CRON).unwrap();
        let next = cadence
            .next_fire_after(&utc("2026-10-21T09:15:30Z"))
            .unwrap();
        assert_eq!(next, utc("2026-10-21T09:16:00Z"));
    }

    #[test]
    fn invalid_cron_is_rejected() {
        let err = Cadence::cron("not a cron").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCron { .. }));
        assert!(err.to_string().contains("not a cron"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            Cadence::interval(Duration::ZERO),
            Err(SchedulerError::ZeroInterval)
        ));
    }

    #[test]
    fn interval_adds_period() {
        let cadence = Cadence::interval(Duration::from_secs(90)).unwrap();
        let next = cadence
            .next_fire_after(&utc("2026-10-21T09:00:00Z"))
            .unwrap();
        assert_eq!(next, utc("2026-10-21T09:01:30Z"));

        let now = Local::now();
        let (at, delay) = cadence.next_fire(now, Some(now)).unwrap();
        assert_eq!(delay, Duration::from_secs(90));
        assert_eq!(at - now, chrono::Duration::seconds(90));
    }

    #[test]
    fn cron_delay_is_bounded_by_period() {
        let cadence = Cadence::cron(TESTING_CRON).unwrap();
        let (_, delay) = cadence.next_fire(Local::now(), None).unwrap();
        assert!(delay <= Duration::from_secs(60));
    }

    #[test]
    fn clock_stepped_back_does_not_refire_slot() {
        let cadence = Cadence::cron(TESTING_CRON).unwrap();
        let local = |h, m, s| Local.with_ymd_and_hms(2026, 10, 21, h, m, s).single().unwrap();

        let (at, delay) = cadence.next_fire(local(9, 15, 50), None).unwrap();
        assert_eq!(at, local(9, 16, 0));
        assert_eq!(delay, Duration::from_secs(10));

        // Fired at 09:16:00, then the clock jumped back ten seconds.
        let (at, delay) = cadence
            .next_fire(local(9, 15, 50), Some(local(9, 16, 0)))
            .unwrap();
        assert_eq!(at, local(9, 17, 0));
        assert_eq!(delay, Duration::from_secs(70));

        // A previous fire in the past does not hold the schedule back.
        let (at, _) = cadence
            .next_fire(local(9, 30, 5), Some(local(9, 16, 0)))
            .unwrap();
        assert_eq!(at, local(9, 31, 0));
    }

    #[test]
    fn from_config_honors_override() {
        let config = EvaluationConfig {
            mode: OperatingMode::Production,
            cron_override: Some("30 7 * * Mon".to_string()),
            reset_after_evaluation: false,
        };
        let cadence = Cadence::from_config(&config).unwrap();
        assert_eq!(cadence.to_string(), "cron '0 30 7 * * Mon'");
    }
}
