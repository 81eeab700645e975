//! Moment-style date handling on top of chrono
//!
//! Expressions written for task queries use moment.js vocabulary: format
//! tokens like `YYYY-MM-DD dddd`, `fromNow()`, `isSame(x, 'day')`. This
//! module maps that vocabulary onto `chrono`. Times are naive local times;
//! where an absolute instant is needed (`X`, `x`, `valueOf`) they are read as
//! UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_WEEK: f64 = 604_800_000.0;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const DAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

/// Format tokens, longest first so that `MMMM` wins over `MM`
const TOKENS: &[&str] = &[
    "YYYY", "gggg", "GGGG", "MMMM", "DDDD", "dddd", "SSS", "MMM", "DDD", "ddd", "YY", "gg", "GG",
    "MM", "Mo", "DD", "Do", "dd", "do", "ww", "wo", "WW", "Wo", "HH", "hh", "kk", "mm", "ss", "SS",
    "ZZ", "Q", "M", "D", "d", "E", "e", "w", "W", "H", "h", "k", "m", "s", "S", "A", "a", "Z", "X",
    "x",
];

/// Calendar unit used by arithmetic and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Year,
    Quarter,
    Month,
    Week,
    IsoWeek,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Single-letter aliases are case-sensitive: `M` is month, `m` minute.
        match s {
            "y" => return Ok(TimeUnit::Year),
            "Q" => return Ok(TimeUnit::Quarter),
            "M" => return Ok(TimeUnit::Month),
            "w" => return Ok(TimeUnit::Week),
            "W" => return Ok(TimeUnit::IsoWeek),
            "d" | "D" => return Ok(TimeUnit::Day),
            "h" => return Ok(TimeUnit::Hour),
            "m" => return Ok(TimeUnit::Minute),
            "s" => return Ok(TimeUnit::Second),
            "ms" => return Ok(TimeUnit::Millisecond),
            _ => {}
        }
        match s.to_lowercase().as_str() {
            "year" | "years" => Ok(TimeUnit::Year),
            "quarter" | "quarters" => Ok(TimeUnit::Quarter),
            "month" | "months" => Ok(TimeUnit::Month),
            "week" | "weeks" => Ok(TimeUnit::Week),
            "isoweek" | "isoweeks" => Ok(TimeUnit::IsoWeek),
            "day" | "days" | "date" | "dates" => Ok(TimeUnit::Day),
            "hour" | "hours" => Ok(TimeUnit::Hour),
            "minute" | "minutes" => Ok(TimeUnit::Minute),
            "second" | "seconds" => Ok(TimeUnit::Second),
            "millisecond" | "milliseconds" => Ok(TimeUnit::Millisecond),
            _ => Err(format!("unknown time unit '{}'", s)),
        }
    }
}

/// A point in time with moment.js-like operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Moment(NaiveDateTime);

impl Moment {
    pub fn new(value: NaiveDateTime) -> Self {
        Self(value)
    }

    /// Creates a moment at midnight of `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }

    /// Parses the date formats tasks and expressions use
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:mm`, `YYYY-MM-DDTHH:mm`, and the
    /// same with seconds and optional fractional seconds.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text.strip_suffix('Z').unwrap_or(text);
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(Self::from_date(date));
        }
        [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
        ]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(Self)
    }

    /// Creates a moment from milliseconds since the Unix epoch
    pub fn from_millis(millis: i64) -> Option<Self> {
        chrono::DateTime::from_timestamp_millis(millis).map(|dt| Self(dt.naive_utc()))
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Milliseconds since the Unix epoch, reading the time as UTC
    pub fn value_of(&self) -> i64 {
        self.0.and_utc().timestamp_millis()
    }

    /// Day of the week, 0 for Sunday
    pub fn day(&self) -> u32 {
        self.0.weekday().num_days_from_sunday()
    }

    /// Day of the month, from 1
    pub fn day_of_month(&self) -> u32 {
        self.0.day()
    }

    /// Month, from 0 for January
    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }

    pub fn day_of_year(&self) -> u32 {
        self.0.ordinal()
    }

    /// Week of the year with weeks starting on Sunday, week 1 holding Jan 1
    pub fn locale_week(&self) -> u32 {
        locale_week(self.date()).1
    }

    /// ISO 8601 week number
    pub fn iso_week(&self) -> u32 {
        self.0.iso_week().week()
    }

    /// Formats using moment.js tokens; text inside `[...]` is copied as is
    pub fn format(&self, pattern: &str) -> String {
        let mut out = String::new();
        let mut rest = pattern;
        while let Some(c) = rest.chars().next() {
            if c == '[' {
                if let Some(end) = rest.find(']') {
                    out.push_str(&rest[1..end]);
                    rest = &rest[end + 1..];
                    continue;
                }
            }
            match TOKENS.iter().find(|t| rest.starts_with(**t)) {
                Some(token) => {
                    out.push_str(&self.format_token(token));
                    rest = &rest[token.len()..];
                }
                None => {
                    out.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        out
    }

    fn format_token(&self, token: &str) -> String {
        let dt = &self.0;
        match token {
            "YYYY" => format!("{:04}", dt.year()),
            "YY" => format!("{:02}", dt.year().rem_euclid(100)),
            "gggg" => format!("{:04}", locale_week(dt.date()).0),
            "gg" => format!("{:02}", locale_week(dt.date()).0.rem_euclid(100)),
            "GGGG" => format!("{:04}", dt.iso_week().year()),
            "GG" => format!("{:02}", dt.iso_week().year().rem_euclid(100)),
            "Q" => (dt.month0() / 3 + 1).to_string(),
            "MMMM" => MONTH_NAMES[dt.month0() as usize].to_string(),
            "MMM" => MONTH_NAMES[dt.month0() as usize][..3].to_string(),
            "MM" => format!("{:02}", dt.month()),
            "Mo" => ordinal(dt.month()),
            "M" => dt.month().to_string(),
            "DDDD" => format!("{:03}", dt.ordinal()),
            "DDD" => dt.ordinal().to_string(),
            "DD" => format!("{:02}", dt.day()),
            "Do" => ordinal(dt.day()),
            "D" => dt.day().to_string(),
            "dddd" => DAY_NAMES[self.day() as usize].to_string(),
            "ddd" => DAY_NAMES[self.day() as usize][..3].to_string(),
            "dd" => DAY_NAMES[self.day() as usize][..2].to_string(),
            "do" => ordinal(self.day()),
            "d" | "e" => self.day().to_string(),
            "E" => dt.weekday().number_from_monday().to_string(),
            "ww" => format!("{:02}", self.locale_week()),
            "wo" => ordinal(self.locale_week()),
            "w" => self.locale_week().to_string(),
            "WW" => format!("{:02}", self.iso_week()),
            "Wo" => ordinal(self.iso_week()),
            "W" => self.iso_week().to_string(),
            "HH" => format!("{:02}", dt.hour()),
            "H" => dt.hour().to_string(),
            "hh" => format!("{:02}", hour12(dt.hour())),
            "h" => hour12(dt.hour()).to_string(),
            "kk" => format!("{:02}", hour24_from_one(dt.hour())),
            "k" => hour24_from_one(dt.hour()).to_string(),
            "mm" => format!("{:02}", dt.minute()),
            "m" => dt.minute().to_string(),
            "ss" => format!("{:02}", dt.second()),
            "s" => dt.second().to_string(),
            "SSS" => format!("{:03}", dt.nanosecond() / 1_000_000),
            "SS" => format!("{:02}", dt.nanosecond() / 10_000_000),
            "S" => (dt.nanosecond() / 100_000_000).to_string(),
            "A" => if dt.hour() < 12 { "AM" } else { "PM" }.to_string(),
            "a" => if dt.hour() < 12 { "am" } else { "pm" }.to_string(),
            "ZZ" => "+0000".to_string(),
            "Z" => "+00:00".to_string(),
            "X" => (self.value_of().div_euclid(1000)).to_string(),
            "x" => self.value_of().to_string(),
            other => other.to_string(),
        }
    }

    /// ISO 8601 text, e.g. `2023-06-12T00:00:00.000Z`
    pub fn to_iso_string(&self) -> String {
        self.format("YYYY-MM-DD[T]HH:mm:ss.SSS[Z]")
    }

    /// Describes this moment relative to `now`, e.g. `in 2 days`
    pub fn from_now(&self, now: &Moment) -> String {
        self.from(now)
    }

    /// Describes this moment relative to `base`, e.g. `3 months ago`
    pub fn from(&self, base: &Moment) -> String {
        let millis = (self.value_of() - base.value_of()) as f64;
        let phrase = humanize(millis.abs());
        if millis < 0.0 {
            format!("{} ago", phrase)
        } else {
            format!("in {}", phrase)
        }
    }

    /// Distance between the two moments without `in`/`ago`, e.g. `3 months`
    pub fn distance(&self, base: &Moment) -> String {
        humanize((self.value_of() - base.value_of()).abs() as f64)
    }

    /// Adds `amount` of `unit`; month and year amounts are rounded
    ///
    /// Returns `None` for non-finite amounts and for results outside the
    /// supported date range.
    pub fn add(&self, amount: f64, unit: TimeUnit) -> Option<Self> {
        match unit {
            TimeUnit::Year => self.add_months(whole(amount)?.checked_mul(12)?),
            TimeUnit::Quarter => self.add_months(whole(amount)?.checked_mul(3)?),
            TimeUnit::Month => self.add_months(whole(amount)?),
            _ => {
                let millis = whole(amount * unit_millis(unit))?;
                self.0
                    .checked_add_signed(Duration::try_milliseconds(millis)?)
                    .map(Self)
            }
        }
    }

    fn add_months(&self, months: i64) -> Option<Self> {
        let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        let shifted = if months >= 0 {
            self.0.checked_add_months(magnitude)
        } else {
            self.0.checked_sub_months(magnitude)
        };
        shifted.map(Self)
    }

    /// Rounds down to the start of `unit`
    pub fn start_of(&self, unit: TimeUnit) -> Self {
        let date = self.date();
        let at_midnight = |d: NaiveDate| Self(d.and_time(NaiveTime::MIN));
        match unit {
            TimeUnit::Year => at_midnight(first_of_year(date)),
            TimeUnit::Quarter => {
                let month = date.month0() / 3 * 3 + 1;
                at_midnight(NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date))
            }
            TimeUnit::Month => at_midnight(date.with_day(1).unwrap_or(date)),
            TimeUnit::Week => {
                at_midnight(days_before(date, date.weekday().num_days_from_sunday()))
            }
            TimeUnit::IsoWeek => {
                at_midnight(days_before(date, date.weekday().num_days_from_monday()))
            }
            TimeUnit::Day => at_midnight(date),
            TimeUnit::Hour => Self(truncate(self.0, 3_600)),
            TimeUnit::Minute => Self(truncate(self.0, 60)),
            TimeUnit::Second => Self(truncate(self.0, 1)),
            TimeUnit::Millisecond => *self,
        }
    }

    /// Rounds up to the last millisecond of `unit`
    pub fn end_of(&self, unit: TimeUnit) -> Self {
        if unit == TimeUnit::Millisecond {
            return *self;
        }
        let start = self.start_of(unit);
        start
            .add(1.0, unit)
            .and_then(|next| next.add(-1.0, TimeUnit::Millisecond))
            .unwrap_or(start)
    }

    /// True if both moments fall in the same `unit` (exact match without unit)
    pub fn is_same(&self, other: &Moment, unit: Option<TimeUnit>) -> bool {
        match unit {
            None => self == other,
            Some(unit) => self.start_of(unit) == other.start_of(unit),
        }
    }

    /// True if this moment is before `other`, compared at `unit` granularity
    pub fn is_before(&self, other: &Moment, unit: Option<TimeUnit>) -> bool {
        match unit {
            None => self < other,
            Some(unit) => self.end_of(unit) < *other,
        }
    }

    /// True if this moment is after `other`, compared at `unit` granularity
    pub fn is_after(&self, other: &Moment, unit: Option<TimeUnit>) -> bool {
        match unit {
            None => self > other,
            Some(unit) => *other < self.start_of(unit),
        }
    }

    /// Difference `self - other` in `unit`, truncated unless `precise`
    pub fn diff(&self, other: &Moment, unit: TimeUnit, precise: bool) -> f64 {
        let raw = match unit {
            TimeUnit::Year => month_diff(self, other) / 12.0,
            TimeUnit::Quarter => month_diff(self, other) / 3.0,
            TimeUnit::Month => month_diff(self, other),
            _ => (self.value_of() - other.value_of()) as f64 / unit_millis(unit),
        };
        if precise {
            raw
        } else {
            raw.trunc()
        }
    }
}

impl fmt::Display for Moment {
    /// Same shape as moment's `toString()`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format("ddd MMM DD YYYY HH:mm:ss [GMT]ZZ"))
    }
}

fn unit_millis(unit: TimeUnit) -> f64 {
    match unit {
        TimeUnit::Week | TimeUnit::IsoWeek => MS_PER_WEEK,
        TimeUnit::Day => MS_PER_DAY,
        TimeUnit::Hour => MS_PER_HOUR,
        TimeUnit::Minute => MS_PER_MINUTE,
        TimeUnit::Second => MS_PER_SECOND,
        TimeUnit::Millisecond => 1.0,
        // Calendar units never reach here; keep an average for completeness.
        TimeUnit::Year => 365.2425 * MS_PER_DAY,
        TimeUnit::Quarter => 91.310_625 * MS_PER_DAY,
        TimeUnit::Month => 30.436_875 * MS_PER_DAY,
    }
}

/// Rounds to an `i64`, `None` when the value does not fit
fn whole(amount: f64) -> Option<i64> {
    let rounded = amount.round();
    (rounded.is_finite() && rounded.abs() < i64::MAX as f64).then_some(rounded as i64)
}

/// `date` moved back `days`, clamped at the earliest representable date
fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

fn truncate(dt: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    let secs = dt.and_utc().timestamp();
    let truncated = secs - secs.rem_euclid(seconds);
    chrono::DateTime::from_timestamp(truncated, 0)
        .map(|d| d.naive_utc())
        .unwrap_or(dt)
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

/// Signed month difference `a - b`, with a fractional part
fn month_diff(a: &Moment, b: &Moment) -> f64 {
    if a.day_of_month() < b.day_of_month() {
        return -month_diff(b, a);
    }
    let whole = (b.year() - a.year()) as i64 * 12 + (b.0.month() as i64 - a.0.month() as i64);
    let anchor = match a.add_months(whole) {
        Some(m) => m,
        None => return 0.0,
    };
    let to_b = (b.value_of() - anchor.value_of()) as f64;
    let adjust = if to_b < 0.0 {
        match a.add_months(whole - 1) {
            Some(anchor2) => to_b / (anchor.value_of() - anchor2.value_of()) as f64,
            None => 0.0,
        }
    } else {
        match a.add_months(whole + 1) {
            Some(anchor2) => to_b / (anchor2.value_of() - anchor.value_of()) as f64,
            None => 0.0,
        }
    };
    let result = -(whole as f64 + adjust);
    if result == 0.0 {
        0.0
    } else {
        result
    }
}

/// Week-year and week number with Sunday-based weeks, week 1 holding Jan 1
fn locale_week(date: NaiveDate) -> (i32, u32) {
    let week_start = days_before(date, date.weekday().num_days_from_sunday());
    let week_year = week_start
        .checked_add_days(Days::new(6))
        .unwrap_or(NaiveDate::MAX)
        .year();
    let first_week_start = NaiveDate::from_ymd_opt(week_year, 1, 1)
        .map(|jan1| days_before(jan1, jan1.weekday().num_days_from_sunday()))
        .unwrap_or(week_start);
    let week = (week_start - first_week_start).num_days() / 7 + 1;
    (week_year, week as u32)
}

fn hour12(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

fn hour24_from_one(hour: u32) -> u32 {
    if hour == 0 {
        24
    } else {
        hour
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Relative-time phrase using moment's default thresholds
fn humanize(millis: f64) -> String {
    let seconds = (millis / MS_PER_SECOND).round();
    let minutes = (millis / MS_PER_MINUTE).round();
    let hours = (millis / MS_PER_HOUR).round();
    let days_exact = millis / MS_PER_DAY;
    let days = days_exact.round();
    let months = (days_exact * 4800.0 / 146_097.0).round();
    let years = (days_exact * 4800.0 / 146_097.0 / 12.0).round();

    if seconds < 45.0 {
        "a few seconds".to_string()
    } else if minutes <= 1.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes)
    } else if hours <= 1.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours)
    } else if days <= 1.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{} days", days)
    } else if months <= 1.0 {
        "a month".to_string()
    } else if months < 11.0 {
        format!("{} months", months)
    } else if years <= 1.0 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Moment {
        Moment::parse(s).unwrap()
    }

    #[test]
    fn parses_dates_and_times() {
        assert_eq!(m("2023-06-12").format("YYYY-MM-DD HH:mm"), "2023-06-12 00:00");
        assert_eq!(m("2023-06-12 14:05").format("YYYY-MM-DD HH:mm"), "2023-06-12 14:05");
        assert_eq!(m("2023-06-12T14:05:09").format("HH:mm:ss"), "14:05:09");
        assert!(Moment::parse("not a date").is_none());
    }

    #[test]
    fn formats_day_names() {
        assert_eq!(m("2023-06-12").format("YYYY-MM-DD dddd"), "2023-06-12 Monday");
        assert_eq!(m("2023-06-11").format("ddd dd d"), "Sun Su 0");
    }

    #[test]
    fn brackets_escape_tokens() {
        assert_eq!(m("2023-05-12").format("YYYY[%%]-MM[%%] MMM"), "2023%%-05%% May");
        assert_eq!(m("2023-06-12").format("[%%]d[%%]dddd"), "%%1%%Monday");
        assert_eq!(m("2023-06-12").format("[Week] WW"), "Week 24");
    }

    #[test]
    fn unknown_characters_pass_through() {
        assert_eq!(m("2023-06-12").format("YYYY %%MM%% MMMM"), "2023 %%06%% June");
        assert_eq!(m("2023-06-12").format("été"), "été");
    }

    #[test]
    fn ordinals_and_quarters() {
        assert_eq!(m("2023-06-01").format("Do"), "1st");
        assert_eq!(m("2023-06-02").format("Do"), "2nd");
        assert_eq!(m("2023-06-13").format("Do"), "13th");
        assert_eq!(m("2023-06-23").format("Do Q"), "23rd 2");
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(m("2023-06-12 00:30").format("h:mm a"), "12:30 am");
        assert_eq!(m("2023-06-12 13:30").format("hh:mm A"), "01:30 PM");
    }

    #[test]
    fn week_numbers() {
        // Sunday 1 January 2023 starts locale week 1; ISO week 52 of 2022.
        assert_eq!(m("2023-01-01").format("w W GGGG gggg"), "1 52 2022 2023");
        assert_eq!(m("2022-12-31").format("w gggg"), "53 2022");
        // Friday 31 December 2021 shares a week with 1 January 2022.
        assert_eq!(m("2021-12-31").format("w gggg"), "1 2022");
    }

    #[test]
    fn from_now_phrases() {
        let now = m("2023-06-10 20:00");
        assert_eq!(m("2023-06-10 19:59:30").from_now(&now), "a few seconds ago");
        assert_eq!(m("2023-06-10 20:30").from_now(&now), "in 30 minutes");
        assert_eq!(m("2023-06-11").from_now(&now), "in 4 hours");
        assert_eq!(m("2023-06-09").from_now(&now), "a day ago");
        assert_eq!(m("2023-06-02").from_now(&now), "9 days ago");
        assert_eq!(m("2023-07-10").from_now(&now), "in a month");
        assert_eq!(m("2022-06-10").from_now(&now), "a year ago");
        assert_eq!(m("2020-06-10").from_now(&now), "3 years ago");
        assert_eq!(m("2020-06-10").distance(&now), "3 years");
    }

    #[test]
    fn add_and_subtract() {
        let start = m("2023-01-31");
        assert_eq!(start.add(1.0, TimeUnit::Month).unwrap().format("YYYY-MM-DD"), "2023-02-28");
        assert_eq!(start.add(-1.0, TimeUnit::Year).unwrap().format("YYYY-MM-DD"), "2022-01-31");
        assert_eq!(start.add(2.0, TimeUnit::Week).unwrap().format("YYYY-MM-DD"), "2023-02-14");
        assert_eq!(start.add(-3.0, TimeUnit::Hour).unwrap().format("YYYY-MM-DD HH"), "2023-01-30 21");
    }

    #[test]
    fn add_out_of_range_is_none() {
        let start = m("2023-01-31");
        assert!(start.add(1e300, TimeUnit::Year).is_none());
        assert!(start.add(1e15, TimeUnit::Quarter).is_none());
        assert!(start.add(-1e300, TimeUnit::Millisecond).is_none());
        assert!(start.add(f64::INFINITY, TimeUnit::Day).is_none());
        assert!(start.add(f64::NAN, TimeUnit::Hour).is_none());
        assert!(start.add(1e12, TimeUnit::Week).is_none());
    }

    #[test]
    fn start_and_end_of_units() {
        let t = m("2023-06-14 13:45:10");
        assert_eq!(t.start_of(TimeUnit::Day).format("YYYY-MM-DD HH:mm"), "2023-06-14 00:00");
        assert_eq!(t.start_of(TimeUnit::Week).format("YYYY-MM-DD"), "2023-06-11");
        assert_eq!(t.start_of(TimeUnit::IsoWeek).format("YYYY-MM-DD"), "2023-06-12");
        assert_eq!(t.start_of(TimeUnit::Month).format("YYYY-MM-DD"), "2023-06-01");
        assert_eq!(t.start_of(TimeUnit::Quarter).format("YYYY-MM-DD"), "2023-04-01");
        assert_eq!(t.start_of(TimeUnit::Hour).format("HH:mm:ss"), "13:00:00");
        assert_eq!(t.end_of(TimeUnit::Day).format("YYYY-MM-DD HH:mm:ss.SSS"), "2023-06-14 23:59:59.999");
        assert_eq!(t.end_of(TimeUnit::Month).format("YYYY-MM-DD"), "2023-06-30");
    }

    #[test]
    fn comparisons_with_granularity() {
        let now = m("2023-06-10 20:00");
        let today = m("2023-06-10");
        let yesterday = m("2023-06-09");
        assert!(today.is_same(&now, Some(TimeUnit::Day)));
        assert!(!today.is_same(&now, None));
        assert!(today.is_before(&now, None));
        assert!(!today.is_before(&now, Some(TimeUnit::Day)));
        assert!(yesterday.is_before(&now, Some(TimeUnit::Day)));
        assert!(now.is_after(&yesterday, Some(TimeUnit::Day)));
        assert!(!now.is_after(&today, Some(TimeUnit::Day)));
    }

    #[test]
    fn diffs() {
        let a = m("2023-06-12");
        let b = m("2023-06-10 20:00");
        assert_eq!(a.diff(&b, TimeUnit::Day, false), 1.0);
        assert_eq!(a.diff(&b, TimeUnit::Hour, false), 28.0);
        assert_eq!(m("2023-03-31").diff(&m("2023-01-31"), TimeUnit::Month, false), 2.0);
        assert_eq!(m("2021-06-12").diff(&a, TimeUnit::Year, false), -2.0);
    }

    #[test]
    fn units_parse_case_sensitively() {
        assert_eq!("M".parse::<TimeUnit>(), Ok(TimeUnit::Month));
        assert_eq!("m".parse::<TimeUnit>(), Ok(TimeUnit::Minute));
        assert_eq!("Days".parse::<TimeUnit>(), Ok(TimeUnit::Day));
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn display_and_iso() {
        let t = m("2023-06-12");
        assert_eq!(t.to_string(), "Mon Jun 12 2023 00:00:00 GMT+0000");
        assert_eq!(t.to_iso_string(), "2023-06-12T00:00:00.000Z");
    }
}
