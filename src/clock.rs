use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Calendar convention shared by every date the engine derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timezone {
    #[default]
    Local,
    Utc,
}

impl Timezone {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "utc" => Some(Self::Utc),
            _ => None,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date of `instant` under this clock's convention.
    fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate;

    fn today(&self) -> NaiveDate {
        self.date_of(self.now())
    }
}

/// Whole calendar days between two dates, regardless of order.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> u32 {
    (b - a).num_days().unsigned_abs() as u32
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Timezone,
}

impl SystemClock {
    pub fn new(timezone: Timezone) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self.timezone {
            Timezone::Local => instant.with_timezone(&Local).date_naive(),
            Timezone::Utc => instant.date_naive(),
        }
    }
}

/// Settable UTC clock for tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Clock pinned to noon UTC on `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(noon_utc(date))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = now;
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set(noon_utc(date));
    }

    pub fn advance_days(&self, days: i64) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += Duration::days(days);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.date_naive()
    }
}

fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(12, 0, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::default()))
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn days_between_is_symmetric_and_whole() {
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 3, 11)), 10);
        assert_eq!(days_between(date(2024, 3, 11), date(2024, 3, 1)), 10);
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 3, 1)), 0);
        assert_eq!(days_between(date(2024, 2, 28), date(2024, 3, 1)), 2);
    }

    #[test]
    fn utc_clock_ignores_time_of_day() {
        let clock = SystemClock::new(Timezone::Utc);
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 1).unwrap();
        assert_eq!(clock.date_of(late), date(2024, 3, 1));
        assert_eq!(clock.date_of(early), date(2024, 3, 2));
        assert_eq!(days_between(clock.date_of(late), clock.date_of(early)), 1);
    }

    #[test]
    fn manual_clock_advances_by_days() {
        let clock = ManualClock::at_date(date(2024, 3, 1));
        assert_eq!(clock.today(), date(2024, 3, 1));
        clock.advance_days(3);
        assert_eq!(clock.today(), date(2024, 3, 4));
        clock.set_date(date(2024, 1, 1));
        assert_eq!(clock.today(), date(2024, 1, 1));
    }

    #[test]
    fn timezone_parse_accepts_known_conventions() {
        assert_eq!(Timezone::parse("UTC"), Some(Timezone::Utc));
        assert_eq!(Timezone::parse(" local "), Some(Timezone::Local));
        assert_eq!(Timezone::parse("mars"), None);
    }
}
