//! Scripting surface of the host objects
//!
//! Maps camelCase property and method names onto the typed accessors of the
//! facade types. This is the full list of what an expression can observe.

use chrono::{Datelike, Timelike};

use crate::domain::TasksFile;
use crate::scripting::moment::{Moment, TimeUnit};
use crate::scripting::task_properties::{StatusProperties, TaskProperties};
use crate::scripting::tasks_date::{DateCategory, TasksDate};

use super::builtins::{arg, string_arg};
use super::value::{Host, ScriptObject, Value};

const MOMENT_DEFAULT_FORMAT: &str = "YYYY-MM-DDTHH:mm:ssZ";

impl<'a> ScriptObject<'a> for TaskProperties<'a> {
    fn type_name(&self) -> &'static str {
        "Task"
    }

    fn get(&self, property: &str, _now: &Moment) -> Option<Value<'a>> {
        let value = match property {
            "created" => Host::Date(self.created()).into(),
            "start" => Host::Date(self.start()).into(),
            "scheduled" => Host::Date(self.scheduled()).into(),
            "due" => Host::Date(self.due()).into(),
            "done" => Host::Date(self.done()).into(),
            "cancelled" => Host::Date(self.cancelled()).into(),
            "happens" => Host::Date(self.happens()).into(),
            "status" => Host::Status(self.status()).into(),
            "file" => Host::File(self.file()).into(),
            "tags" => Value::strings(self.tags().iter().cloned()),
            "priorityName" => Value::str(self.priority_name()),
            "priorityNumber" => Value::Number(f64::from(self.priority_number())),
            "urgency" => Value::Number(self.urgency()),
            "description" => Value::str(self.description()),
            "descriptionWithoutTags" => Value::String(self.description_without_tags()),
            "originalMarkdown" => Value::str(self.original_markdown()),
            "blockLink" => Value::str(self.block_link()),
            "heading" => Value::str(self.heading()),
            "hasHeading" => Value::Bool(self.has_heading()),
            "isDone" => Value::Bool(self.is_done()),
            "isRecurring" => Value::Bool(self.is_recurring()),
            "recurrenceRule" => Value::str(self.recurrence_rule()),
            "id" => Value::str(self.id()),
            "lineNumber" => Value::Number(self.line_number() as f64),
            "indentation" => Value::str(self.indentation()),
            "listMarker" => Value::str(self.list_marker()),
            _ => return None,
        };
        Some(value)
    }

    fn methods(&self) -> &'static [&'static str] {
        &[]
    }

    fn call(&self, _method: &str, _args: &[Value<'a>], _now: &Moment) -> Option<Result<Value<'a>, String>> {
        None
    }

    fn display(&self) -> String {
        self.description().to_string()
    }
}

impl<'a> ScriptObject<'a> for StatusProperties<'a> {
    fn type_name(&self) -> &'static str {
        "Status"
    }

    fn get(&self, property: &str, _now: &Moment) -> Option<Value<'a>> {
        let value = match property {
            "name" => self.name(),
            "symbol" => self.symbol(),
            "nextSymbol" => self.next_symbol(),
            "type" => self.status_type(),
            "typeGroupText" => return Some(Value::String(self.type_group_text())),
            _ => return None,
        };
        Some(Value::str(value))
    }

    fn methods(&self) -> &'static [&'static str] {
        &[]
    }

    fn call(&self, _method: &str, _args: &[Value<'a>], _now: &Moment) -> Option<Result<Value<'a>, String>> {
        None
    }

    fn display(&self) -> String {
        self.name().to_string()
    }
}

impl<'a> ScriptObject<'a> for TasksFile {
    fn type_name(&self) -> &'static str {
        "TasksFile"
    }

    fn get(&self, property: &str, _now: &Moment) -> Option<Value<'a>> {
        let value = match property {
            "path" => Value::str(self.path()),
            "root" => Value::String(self.root()),
            "folder" => Value::String(self.folder()),
            "filename" => Value::str(self.filename()),
            "filenameWithoutExtension" => Value::str(self.filename_without_extension()),
            "pathWithoutExtension" => Value::str(self.path_without_extension()),
            "tags" => Value::strings(self.tags()),
            "frontmatterTags" => Value::strings(self.frontmatter_tags()),
            "frontmatter" => Value::Record(
                self.frontmatter()
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
            _ => return None,
        };
        Some(value)
    }

    fn methods(&self) -> &'static [&'static str] {
        &["hasProperty", "property"]
    }

    fn call(&self, method: &str, args: &[Value<'a>], _now: &Moment) -> Option<Result<Value<'a>, String>> {
        let key = string_arg(args, 0).unwrap_or_default();
        let result = match method {
            "hasProperty" => Value::Bool(self.has_property(&key)),
            "property" => Value::from_json(&self.property(&key)),
            _ => return None,
        };
        Some(Ok(result))
    }

    fn display(&self) -> String {
        self.path().to_string()
    }
}

impl<'a> ScriptObject<'a> for TasksDate {
    fn type_name(&self) -> &'static str {
        "TasksDate"
    }

    fn get(&self, property: &str, now: &Moment) -> Option<Value<'a>> {
        let value = match property {
            "moment" => self
                .moment()
                .map_or(Value::Null, |m| Host::Moment(m).into()),
            "category" => Host::Category(self.category(now)).into(),
            "fromNow" => Host::Category(self.from_now(now)).into(),
            _ => return None,
        };
        Some(value)
    }

    fn methods(&self) -> &'static [&'static str] {
        &["format", "formatAsDate", "formatAsDateAndTime", "toISOString", "toString"]
    }

    fn call(&self, method: &str, args: &[Value<'a>], _now: &Moment) -> Option<Result<Value<'a>, String>> {
        let if_absent = |i: usize| string_arg(args, i).unwrap_or_default();
        let result = match method {
            "format" => {
                let pattern = string_arg(args, 0).unwrap_or_else(|| MOMENT_DEFAULT_FORMAT.to_string());
                self.format(&pattern, &if_absent(1))
            }
            "formatAsDate" => self.format_as_date(&if_absent(0)),
            "formatAsDateAndTime" => self.format_as_date_and_time(&if_absent(0)),
            "toISOString" => self.to_iso_string(),
            "toString" => self.to_string(),
            _ => return None,
        };
        Some(Ok(Value::String(result)))
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl<'a> ScriptObject<'a> for DateCategory {
    fn type_name(&self) -> &'static str {
        "DateCategory"
    }

    fn get(&self, property: &str, _now: &Moment) -> Option<Value<'a>> {
        match property {
            "name" => Some(Value::str(self.name.as_str())),
            "sortOrder" => Some(Value::Number(self.sort_order as f64)),
            "groupText" => Some(Value::str(self.group_text.as_str())),
            _ => None,
        }
    }

    fn methods(&self) -> &'static [&'static str] {
        &[]
    }

    fn call(&self, _method: &str, _args: &[Value<'a>], _now: &Moment) -> Option<Result<Value<'a>, String>> {
        None
    }

    fn display(&self) -> String {
        self.name.clone()
    }
}

const MOMENT_METHODS: &[&str] = &[
    "add", "clone", "date", "day", "dayOfYear", "daysInMonth", "diff", "endOf", "format", "from",
    "fromNow", "hour", "hours", "isAfter", "isBefore", "isSame", "isSameOrAfter", "isSameOrBefore",
    "isValid", "isoWeek", "isoWeekday", "millisecond", "minute", "minutes", "month", "quarter",
    "second", "seconds", "startOf", "subtract", "toISOString", "toJSON", "toString", "unix",
    "valueOf", "week", "weekday", "year",
];

impl<'a> ScriptObject<'a> for Moment {
    fn type_name(&self) -> &'static str {
        "Moment"
    }

    fn get(&self, _property: &str, _now: &Moment) -> Option<Value<'a>> {
        None
    }

    fn methods(&self) -> &'static [&'static str] {
        MOMENT_METHODS
    }

    fn call(&self, method: &str, args: &[Value<'a>], now: &Moment) -> Option<Result<Value<'a>, String>> {
        if !MOMENT_METHODS.contains(&method) {
            return None;
        }
        Some(moment_method(self, method, args, now))
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

fn moment_method<'a>(m: &Moment, method: &str, args: &[Value<'a>], now: &Moment) -> Result<Value<'a>, String> {
    let number = |n: u32| Ok(Value::Number(f64::from(n)));
    match method {
        "format" => {
            let pattern = string_arg(args, 0).unwrap_or_else(|| MOMENT_DEFAULT_FORMAT.to_string());
            Ok(Value::String(m.format(&pattern)))
        }
        "fromNow" => Ok(Value::String(if arg(args, 0).is_truthy() {
            m.distance(now)
        } else {
            m.from_now(now)
        })),
        "from" => {
            let base = to_moment(&arg(args, 0), now)?;
            Ok(Value::String(if arg(args, 1).is_truthy() {
                m.distance(&base)
            } else {
                m.from(&base)
            }))
        }
        "isBefore" | "isAfter" | "isSame" | "isSameOrBefore" | "isSameOrAfter" => {
            let other = to_moment(&arg(args, 0), now)?;
            let unit = unit_arg(args, 1)?;
            let result = match method {
                "isBefore" => m.is_before(&other, unit),
                "isAfter" => m.is_after(&other, unit),
                "isSame" => m.is_same(&other, unit),
                "isSameOrBefore" => m.is_same(&other, unit) || m.is_before(&other, unit),
                _ => m.is_same(&other, unit) || m.is_after(&other, unit),
            };
            Ok(Value::Bool(result))
        }
        "isValid" => Ok(Value::Bool(true)),
        "add" | "subtract" => {
            if !args.is_empty() && !matches!(args[0], Value::Number(_) | Value::String(_)) {
                return Err(format!("{}() expects an amount and a unit", method));
            }
            let amount = arg(args, 0).to_number();
            if !amount.is_finite() {
                return Err(format!("{}() amount must be a finite number", method));
            }
            let unit = unit_arg(args, 1)?.unwrap_or(TimeUnit::Millisecond);
            let signed = if method == "add" { amount } else { -amount };
            m.add(signed, unit)
                .map(|shifted| Host::Moment(shifted).into())
                .ok_or_else(|| format!("{}() went out of the supported date range", method))
        }
        "startOf" | "endOf" => {
            let unit = unit_arg(args, 0)?
                .ok_or_else(|| format!("{}() needs a unit", method))?;
            let moved = if method == "startOf" {
                m.start_of(unit)
            } else {
                m.end_of(unit)
            };
            Ok(Host::Moment(moved).into())
        }
        "diff" => {
            let other = to_moment(&arg(args, 0), now)?;
            let unit = unit_arg(args, 1)?.unwrap_or(TimeUnit::Millisecond);
            Ok(Value::Number(m.diff(&other, unit, arg(args, 2).is_truthy())))
        }
        "clone" => Ok(Host::Moment(*m).into()),
        "valueOf" => Ok(Value::Number(m.value_of() as f64)),
        "unix" => Ok(Value::Number(m.value_of().div_euclid(1000) as f64)),
        "toISOString" | "toJSON" => Ok(Value::String(m.to_iso_string())),
        "toString" => Ok(Value::String(m.to_string())),
        getter => {
            if !args.is_empty() {
                return Err(format!("{}() does not accept arguments; moments are read-only", getter));
            }
            let dt = m.datetime();
            match getter {
                "day" | "weekday" => number(m.day()),
                "isoWeekday" => number(dt.weekday().number_from_monday()),
                "date" => number(m.day_of_month()),
                "month" => number(m.month0()),
                "quarter" => number(m.month0() / 3 + 1),
                "year" => Ok(Value::Number(f64::from(m.year()))),
                "hour" | "hours" => number(m.hour()),
                "minute" | "minutes" => number(m.minute()),
                "second" | "seconds" => number(m.second()),
                "millisecond" => number(dt.nanosecond() / 1_000_000),
                "week" => number(m.locale_week()),
                "isoWeek" => number(m.iso_week()),
                "dayOfYear" => number(m.day_of_year()),
                "daysInMonth" => number(m.end_of(TimeUnit::Month).day_of_month()),
                other => Err(format!("{} is not a function", other)),
            }
        }
    }
}

fn unit_arg(args: &[Value<'_>], i: usize) -> Result<Option<TimeUnit>, String> {
    match args.get(i) {
        None | Some(Value::Undefined) => Ok(None),
        Some(Value::String(unit)) => unit.parse().map(Some),
        Some(other) => Err(format!("expected a time unit, got {}", other.type_name())),
    }
}

/// Reads a value as a moment: moments, present dates, date strings, epoch
/// milliseconds; `undefined` means now
pub fn to_moment(value: &Value<'_>, now: &Moment) -> Result<Moment, String> {
    match value {
        Value::Undefined => Ok(*now),
        Value::Object(Host::Moment(m)) => Ok(*m),
        Value::Object(Host::Date(date)) => date
            .moment()
            .ok_or_else(|| "cannot use an absent date as a moment".to_string()),
        Value::String(text) => Moment::parse(text).ok_or_else(|| format!("Invalid date: '{}'", text)),
        Value::Number(millis) if millis.is_finite() => {
            Moment::from_millis(*millis as i64).ok_or_else(|| format!("Invalid date: {}", millis))
        }
        other => Err(format!("cannot use {} as a date", other.type_name())),
    }
}

/// The `moment(...)` entry point
pub fn call_moment<'a>(args: &[Value<'a>], now: &Moment) -> Result<Value<'a>, String> {
    if args.len() > 1 {
        return Err("moment() with a format argument is not supported".to_string());
    }
    to_moment(&arg(args, 0), now).map(|m| Host::Moment(m).into())
}
