use std::env;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("invalid timezone {0:?}")]
    InvalidTimezone(String),
    #[error("invalid alert policy {0:?} (expected \"every_tick\" or \"once\")")]
    InvalidAlertPolicy(String),
    #[error("invalid time of day {0:?} (expected HH:MM)")]
    InvalidTimeOfDay(String),
}

/// What to do when an assignment is still missing data on a tick past its
/// checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    /// Re-alert on every evaluation that finds the slot still empty.
    EveryTick,
    /// Alert once per assignment, checkpoint and day.
    Once,
}

pub struct Config {
    pub database_url: String,
    pub timezone: Tz,
    pub alert_policy: AlertPolicy,
    pub alert_send_timeout: Duration,
    pub offender_sweep_time: NaiveTime,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let timezone = match env::var("MONITOR_TIMEZONE") {
            Ok(raw) => parse_timezone(&raw)?,
            Err(_) => chrono_tz::UTC,
        };

        let alert_policy = match env::var("ALERT_POLICY") {
            Ok(raw) => parse_alert_policy(&raw)?,
            Err(_) => AlertPolicy::EveryTick,
        };

        let alert_send_timeout = env::var("ALERT_SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let offender_sweep_time = match env::var("OFFENDER_SWEEP_TIME") {
            Ok(raw) => parse_time_of_day(&raw)?,
            Err(_) => NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        };

        Ok(Config {
            database_url,
            timezone,
            alert_policy,
            alert_send_timeout,
            offender_sweep_time,
        })
    }
}

fn parse_timezone(raw: &str) -> Result<Tz, ConfigError> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(raw.to_string()))
}

fn parse_alert_policy(raw: &str) -> Result<AlertPolicy, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "every_tick" => Ok(AlertPolicy::EveryTick),
        "once" => Ok(AlertPolicy::Once),
        _ => Err(ConfigError::InvalidAlertPolicy(raw.to_string())),
    }
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ConfigError::InvalidTimeOfDay(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_timezones() {
        assert_eq!(parse_timezone("America/New_York").unwrap(), chrono_tz::America::New_York);
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn parses_alert_policies() {
        assert_eq!(parse_alert_policy("every_tick").unwrap(), AlertPolicy::EveryTick);
        assert_eq!(parse_alert_policy(" ONCE ").unwrap(), AlertPolicy::Once);
        assert!(matches!(
            parse_alert_policy("sometimes"),
            Err(ConfigError::InvalidAlertPolicy(_))
        ));
    }

    #[test]
    fn parses_times_of_day() {
        assert_eq!(
            parse_time_of_day("07:30").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert!(parse_time_of_day("7:30pm").is_err());
        assert!(parse_time_of_day("25:00").is_err());
    }
}
