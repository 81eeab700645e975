//! Optional task dates as seen by expressions

use std::fmt;

use chrono::NaiveDateTime;

use super::moment::{Moment, TimeUnit};

/// A named bucket for a date, with a number that orders the buckets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCategory {
    pub name: String,
    pub sort_order: i64,
    /// `%%<sort_order>%% <name>`, or empty when the name is empty
    pub group_text: String,
}

impl DateCategory {
    pub fn new(name: impl Into<String>, sort_order: i64) -> Self {
        let name = name.into();
        let group_text = if name.is_empty() {
            String::new()
        } else {
            format!("%%{}%% {}", sort_order, name)
        };
        Self {
            name,
            sort_order,
            group_text,
        }
    }
}

/// A task date that may be missing
///
/// Absence is not an error: every formatting operation takes a fallback and
/// returns it untouched when there is no date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TasksDate {
    moment: Option<Moment>,
}

impl TasksDate {
    pub fn new(date: Option<NaiveDateTime>) -> Self {
        Self {
            moment: date.map(Moment::new),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn moment(&self) -> Option<Moment> {
        self.moment
    }

    pub fn is_absent(&self) -> bool {
        self.moment.is_none()
    }

    /// Formats with a moment-style `pattern`, or returns `if_absent`
    pub fn format(&self, pattern: &str, if_absent: &str) -> String {
        match &self.moment {
            Some(moment) => moment.format(pattern),
            None => if_absent.to_string(),
        }
    }

    pub fn format_as_date(&self, if_absent: &str) -> String {
        self.format("YYYY-MM-DD", if_absent)
    }

    pub fn format_as_date_and_time(&self, if_absent: &str) -> String {
        self.format("YYYY-MM-DD HH:mm", if_absent)
    }

    pub fn to_iso_string(&self) -> String {
        self.moment
            .as_ref()
            .map(Moment::to_iso_string)
            .unwrap_or_default()
    }

    /// Overdue, Today, Future or Undated relative to the day of `now`
    pub fn category(&self, now: &Moment) -> DateCategory {
        match &self.moment {
            None => DateCategory::new("Undated", 4),
            Some(date) if date.is_before(now, Some(TimeUnit::Day)) => {
                DateCategory::new("Overdue", 1)
            }
            Some(date) if date.is_same(now, Some(TimeUnit::Day)) => DateCategory::new("Today", 2),
            Some(_) => DateCategory::new("Future", 3),
        }
    }

    /// Relative-time bucket such as `3 days ago` or `in a month`
    ///
    /// The sort order puts past buckets before future ones, earliest first.
    pub fn from_now(&self, now: &Moment) -> DateCategory {
        match &self.moment {
            None => DateCategory::new("", 0),
            Some(date) => DateCategory::new(date.from_now(now), from_now_sort_order(date, now)),
        }
    }
}

impl fmt::Display for TasksDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_as_date(""))
    }
}

/// Orders relative-time buckets by the first day each bucket covers
fn from_now_sort_order(date: &Moment, now: &Moment) -> i64 {
    let earlier = !date.is_after(now, Some(TimeUnit::Day));
    let phrase = date.from_now(now);
    let phrase = phrase
        .strip_prefix("in ")
        .or_else(|| phrase.strip_suffix(" ago"))
        .unwrap_or(&phrase);

    let words: Vec<&str> = phrase.split_whitespace().collect();
    let (amount, unit) = match words.as_slice() {
        ["a", "few", ..] => (0.0, TimeUnit::Second),
        [count, unit] => {
            let amount = match *count {
                "a" | "an" => 1.0,
                n => n.parse().unwrap_or(0.0),
            };
            (amount, unit.parse().unwrap_or(TimeUnit::Day))
        }
        _ => (0.0, TimeUnit::Day),
    };

    let offset = if earlier { -amount } else { amount };
    let start = now.add(offset, unit).unwrap_or(*now);
    let prefix: i64 = if earlier { 1 } else { 3 };
    let day_number: i64 = start.format("YYYYMMDD").parse().unwrap_or(0);
    prefix * 100_000_000 + day_number
}
