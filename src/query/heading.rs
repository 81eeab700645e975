//! Turning evaluator output into group headings
//!
//! A heading's `sort_key` is the rendered text as-is. Its `display_text` is
//! the same text with every `%%...%%` segment removed, so an expression can
//! prefix hidden ordering text such as `%%1%% Overdue`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::scripting::Value;

static HIDDEN_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)%%.*?%%").expect("valid hidden segment regex"));

/// A group title
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Heading {
    /// Orders groups; byte-wise, case-sensitive
    pub sort_key: String,
    /// Shown to the user
    pub display_text: String,
}

impl Heading {
    pub fn new(sort_key: impl Into<String>) -> Self {
        let sort_key = sort_key.into();
        let display_text = strip_hidden(&sort_key);
        Self {
            sort_key,
            display_text,
        }
    }
}

/// Removes every `%%...%%` segment. An unpaired `%%` stays.
pub fn strip_hidden(text: &str) -> String {
    HIDDEN_SEGMENT.replace_all(text, "").into_owned()
}

/// Renders one evaluation result into zero or more headings.
///
/// Nullish and empty results give no heading. Arrays give one heading per
/// non-empty element, each distinct text once.
pub fn render(value: &Value<'_>) -> Vec<Heading> {
    match value {
        Value::Array(items) => {
            let mut headings: Vec<Heading> = Vec::new();
            for item in items {
                if item.is_nullish() {
                    continue;
                }
                let text = item.to_js_string();
                if !text.is_empty() && !headings.iter().any(|h| h.sort_key == text) {
                    headings.push(Heading::new(text));
                }
            }
            headings
        }
        other if other.is_nullish() => Vec::new(),
        other => {
            let text = other.to_js_string();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Heading::new(text)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(value: Value<'_>) -> Vec<String> {
        render(&value).into_iter().map(|h| h.sort_key).collect()
    }

    #[test]
    fn nullish_and_empty_give_no_heading() {
        assert!(render(&Value::Undefined).is_empty());
        assert!(render(&Value::Null).is_empty());
        assert!(render(&Value::str("")).is_empty());
        assert!(render(&Value::Array(vec![])).is_empty());
    }

    #[test]
    fn scalars_render_like_javascript() {
        assert_eq!(keys(Value::Number(3.0)), ["3"]);
        assert_eq!(keys(Value::Number(2.5)), ["2.5"]);
        assert_eq!(keys(Value::Bool(false)), ["false"]);
        assert_eq!(keys(Value::str("Work")), ["Work"]);
    }

    #[test]
    fn arrays_fan_out_and_dedupe() {
        let value = Value::Array(vec![
            Value::str("#a"),
            Value::str(""),
            Value::Null,
            Value::str("#b"),
            Value::str("#a"),
            Value::Array(vec![Value::str("x"), Value::str("y")]),
        ]);
        assert_eq!(keys(value), ["#a", "#b", "x,y"]);
    }

    #[test]
    fn hidden_segments_are_stripped_from_display() {
        let heading = Heading::new("%%1%% Overdue");
        assert_eq!(heading.sort_key, "%%1%% Overdue");
        assert_eq!(heading.display_text, " Overdue");

        assert_eq!(strip_hidden("a%%x%%b%%y%%c"), "abc");
        assert_eq!(strip_hidden("50%% done"), "50%% done");
        assert_eq!(strip_hidden("plain"), "plain");
    }
}
