use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::chart::{error::InvalidTimeError, types::AstronomicalInstant, types::matches_shape};

pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Civil birth time to Julian Day (UT). Stateless; every call is reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeResolver;

impl TimeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Interprets `date` + `time` as wall-clock time in `timezone_id` on that date.
    ///
    /// Fall-back overlaps resolve to the earlier instant. Times inside a spring-forward gap use
    /// the offset in force before the transition.
    pub fn resolve(
        &self,
        date: &str,
        time: &str,
        timezone_id: &str,
    ) -> Result<AstronomicalInstant, InvalidTimeError> {
        let local = parse_local(date, time)?;
        let tz = Tz::from_str(timezone_id.trim())
            .map_err(|_| InvalidTimeError::UnknownTimezone(timezone_id.to_string()))?;
        let utc = local_to_utc(tz, local)?;
        Ok(self.resolve_utc(utc))
    }

    pub fn resolve_utc(&self, utc: DateTime<Utc>) -> AstronomicalInstant {
        let seconds = utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9;
        AstronomicalInstant::from_julian_day(UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY)
    }

    /// Millisecond-rounded UTC view of an instant, `None` outside chrono's range.
    pub fn to_utc(&self, instant: AstronomicalInstant) -> Option<DateTime<Utc>> {
        let millis = ((instant.julian_day() - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1000.0).round();
        if !millis.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis(millis as i64)
    }
}

fn parse_local(date: &str, time: &str) -> Result<NaiveDateTime, InvalidTimeError> {
    if !matches_shape(date, "dddd-dd-dd") {
        return Err(InvalidTimeError::MalformedDate(date.to_string()));
    }
    if !matches_shape(time, "dd:dd") {
        return Err(InvalidTimeError::MalformedTime(time.to_string()));
    }

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| InvalidTimeError::MalformedDate(date.to_string()))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| InvalidTimeError::MalformedTime(time.to_string()))?;
    Ok(date.and_time(time))
}

fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, InvalidTimeError> {
    if let Some(resolved) = tz.from_local_datetime(&local).earliest() {
        return Ok(resolved.with_timezone(&Utc));
    }

    // Spring-forward gap: apply the offset that was in force a day earlier.
    let unmappable = || InvalidTimeError::Unmappable {
        local: local.to_string(),
        timezone: tz.name().to_string(),
    };
    let probe = local
        .checked_sub_signed(TimeDelta::hours(24))
        .ok_or_else(unmappable)?;
    let offset_seconds = tz.offset_from_utc_datetime(&probe).fix().local_minus_utc();
    let utc = local
        .checked_sub_signed(TimeDelta::seconds(i64::from(offset_seconds)))
        .ok_or_else(unmappable)?;
    Ok(Utc.from_utc_datetime(&utc))
}
