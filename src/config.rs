//! Service settings read from Rocket's figment (`Rocket.toml` and `ROCKET_*` variables).

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use rocket::figment::Figment;
use serde::Deserialize;

use crate::internal_error::{InternalError, InternalResult};

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// SQLite path, or `:memory:`.
    #[serde(default = "default_database")]
    pub database: String,

    /// Local hour used for dated adds and for rolled-over tasks.
    #[serde(default = "default_anchor_hour")]
    pub anchor_hour: u32,

    /// Fixed offset that defines "local time". The host offset is used when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    #[serde(default = "default_scratch_key")]
    pub scratch_key: String,
}

fn default_database() -> String {
    "dayboard.db".to_string()
}

fn default_anchor_hour() -> u32 {
    9
}

fn default_scratch_key() -> String {
    "my_scratchpad".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            anchor_hour: default_anchor_hour(),
            utc_offset_minutes: None,
            scratch_key: default_scratch_key(),
        }
    }
}

impl DashboardConfig {
    pub fn from_figment(figment: &Figment) -> InternalResult<DashboardConfig> {
        let config: DashboardConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InternalResult<()> {
        if self.anchor_hour > 23 {
            return Err(InternalError::Config(format!(
                "anchor_hour must be 0..=23, got {}",
                self.anchor_hour
            )));
        }
        if self.scratch_key.is_empty() {
            return Err(InternalError::Config("scratch_key must not be empty".into()));
        }
        if let Some(minutes) = self.utc_offset_minutes {
            if FixedOffset::east_opt(minutes * 60).is_none() {
                return Err(InternalError::Config(format!(
                    "utc_offset_minutes out of range: {}",
                    minutes
                )));
            }
        }
        Ok(())
    }

    pub fn local_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .unwrap_or_else(|| Local::now().offset().fix())
    }

    pub fn clock(&self) -> LocalClock {
        LocalClock {
            offset: self.local_offset(),
            anchor_hour: self.anchor_hour,
        }
    }
}

/// Converts between stored instants and the user's local days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    pub offset: FixedOffset,
    pub anchor_hour: u32,
}

impl LocalClock {
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&(local - shift))
    }

    /// `day` at the anchor hour, local time.
    pub fn anchored(&self, day: NaiveDate) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.anchor_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        self.to_utc(day.and_time(time))
    }

    /// Same local time of day as `instant`, on `day`.
    pub fn on_day(&self, instant: DateTime<Utc>, day: NaiveDate) -> DateTime<Utc> {
        let local_time = instant.with_timezone(&self.offset).time();
        self.to_utc(day.and_time(local_time))
    }
}
