//! Task domain model
//!
//! A task is one checklist line of a markdown file, already parsed by the
//! host. Tasks are immutable values: the `with_*` builders return a new task
//! instead of editing one in place.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use super::file::TasksFile;
use super::priority::Priority;
use super::status::Status;

/// Matches a tag together with the whitespace in front of it
static HASH_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|\s)#[^\s!@#$%^&*(),.?":{}|<>]+"#).expect("valid hashtag regex")
});

/// Returns the tags in `text`, in order of appearance
pub fn extract_tags(text: &str) -> Vec<String> {
    HASH_TAG
        .find_iter(text)
        .map(|m| m.as_str().trim_start().to_string())
        .collect()
}

/// A recurrence rule such as `every week on Monday when done`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recurrence {
    pub rule: String,
}

impl Recurrence {
    pub fn new(rule: impl Into<String>) -> Self {
        Self { rule: rule.into() }
    }
}

/// The dates a task can carry
///
/// Dates without a time of day are stored at midnight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskDates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<NaiveDateTime>,
}

impl TaskDates {
    /// Returns the earliest of start, scheduled and due
    pub fn happens(&self) -> Option<NaiveDateTime> {
        [self.start, self.scheduled, self.due]
            .into_iter()
            .flatten()
            .min()
    }
}

/// A task line from a markdown file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    /// Identity assigned by the host (may be empty)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Description text, without the checkbox and the list marker
    pub description: String,

    /// Resolved status
    pub status: Status,

    /// All dates on the task
    pub dates: TaskDates,

    /// Priority, `Priority::None` when the task has no marker
    pub priority: Priority,

    /// Recurrence rule, if the task repeats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,

    /// Tags in order of appearance, each starting with `#`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Block link at the end of the line, e.g. ` ^abc123`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub block_link: String,

    /// The line exactly as it appears in the file
    pub original_markdown: String,

    /// Nearest heading above the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    /// Zero-based line number within the file
    pub line_number: usize,

    /// Whitespace in front of the list marker
    #[serde(skip_serializing_if = "String::is_empty")]
    pub indentation: String,

    /// `-`, `*`, `+` or `1.`
    pub list_marker: String,

    /// File containing the task
    pub file: TasksFile,
}

impl Task {
    /// Creates a todo task in an unnamed file
    pub fn new(description: impl Into<String>) -> Self {
        let description = description.into();
        let status = Status::todo();
        Self {
            id: String::new(),
            original_markdown: format!("- [{}] {}", status.symbol, description),
            description,
            status,
            dates: TaskDates::default(),
            priority: Priority::None,
            recurrence: None,
            tags: Vec::new(),
            block_link: String::new(),
            heading: None,
            line_number: 0,
            indentation: String::new(),
            list_marker: "-".to_string(),
            file: TasksFile::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_created(mut self, date: NaiveDate) -> Self {
        self.dates.created = Some(midnight(date));
        self
    }

    pub fn with_start(mut self, date: NaiveDate) -> Self {
        self.dates.start = Some(midnight(date));
        self
    }

    pub fn with_scheduled(mut self, date: NaiveDate) -> Self {
        self.dates.scheduled = Some(midnight(date));
        self
    }

    pub fn with_due(mut self, date: NaiveDate) -> Self {
        self.dates.due = Some(midnight(date));
        self
    }

    pub fn with_done(mut self, date: NaiveDate) -> Self {
        self.dates.done = Some(midnight(date));
        self
    }

    pub fn with_cancelled(mut self, date: NaiveDate) -> Self {
        self.dates.cancelled = Some(midnight(date));
        self
    }

    pub fn with_dates(mut self, dates: TaskDates) -> Self {
        self.dates = dates;
        self
    }

    pub fn with_recurrence(mut self, rule: impl Into<String>) -> Self {
        self.recurrence = Some(Recurrence::new(rule));
        self
    }

    /// Replaces the tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_block_link(mut self, block_link: impl Into<String>) -> Self {
        self.block_link = block_link.into();
        self
    }

    pub fn with_original_markdown(mut self, line: impl Into<String>) -> Self {
        self.original_markdown = line.into();
        self
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn with_file(mut self, file: TasksFile) -> Self {
        self.file = file;
        self
    }

    /// Returns true if the task needs no further action
    pub fn is_done(&self) -> bool {
        self.status.is_completed()
    }

    /// Returns true if the task has a recurrence rule
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Returns the recurrence rule text, empty for non-recurring tasks
    pub fn recurrence_rule(&self) -> &str {
        self.recurrence.as_ref().map(|r| r.rule.as_str()).unwrap_or("")
    }

    /// Returns the description with every tag removed and whitespace collapsed
    pub fn description_without_tags(&self) -> String {
        let stripped = HASH_TAG.replace_all(&self.description, "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Returns a short label identifying the task in diagnostics
    pub fn label(&self) -> String {
        let location = if self.file.path().is_empty() {
            format!("line {}", self.line_number + 1)
        } else {
            format!("{}:{}", self.file.path(), self.line_number + 1)
        };
        if self.id.is_empty() {
            format!("'{}' ({})", self.description, location)
        } else {
            format!("{} '{}' ({})", self.id, self.description, location)
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn new_task_is_todo() {
        let task = Task::new("Write report");
        assert_eq!(task.status, Status::todo());
        assert_eq!(task.original_markdown, "- [ ] Write report");
        assert!(!task.is_done());
        assert!(!task.is_recurring());
        assert_eq!(task.recurrence_rule(), "");
    }

    #[test]
    fn builders_return_new_values() {
        let original = Task::new("Pay bills");
        let due = original.clone().with_due(date("2023-06-12"));
        assert!(original.dates.due.is_none());
        assert_eq!(
            due.dates.due.map(|d| d.date()),
            Some(date("2023-06-12"))
        );
    }

    #[test]
    fn happens_is_earliest_scheduling_date() {
        let task = Task::new("x")
            .with_due(date("2023-06-10"))
            .with_scheduled(date("2023-06-08"))
            .with_start(date("2023-06-09"))
            .with_created(date("2023-01-01"));
        assert_eq!(task.dates.happens().map(|d| d.date()), Some(date("2023-06-08")));
        assert!(Task::new("y").dates.happens().is_none());
    }

    #[test]
    fn done_and_cancelled_count_as_done() {
        assert!(Task::new("x").with_status(Status::done()).is_done());
        assert!(Task::new("x").with_status(Status::cancelled()).is_done());
        assert!(!Task::new("x").with_status(Status::in_progress()).is_done());
    }

    #[test]
    fn description_without_tags_collapses_whitespace() {
        let task = Task::new("#context/home Buy   milk #errand  today #x/y");
        assert_eq!(task.description_without_tags(), "Buy milk today");
    }

    #[test]
    fn description_without_tags_keeps_inline_hashes() {
        let task = Task::new("Fix issue#12 now");
        assert_eq!(task.description_without_tags(), "Fix issue#12 now");
    }

    #[test]
    fn recurrence_rule_is_exposed() {
        let task = Task::new("Water plants").with_recurrence("every week when done");
        assert!(task.is_recurring());
        assert_eq!(task.recurrence_rule(), "every week when done");
    }

    #[test]
    fn label_mentions_file_and_line() {
        let task = Task::new("Call Bob")
            .with_file(TasksFile::new("inbox.md"))
            .with_line_number(4);
        assert_eq!(task.label(), "'Call Bob' (inbox.md:5)");
        assert_eq!(task.with_id("t-1").label(), "t-1 'Call Bob' (inbox.md:5)");
    }

    #[test]
    fn extracts_tags_in_order() {
        assert_eq!(
            extract_tags("#home Call Bob #errand/phone, then #x"),
            vec!["#home", "#errand/phone", "#x"]
        );
        assert!(extract_tags("issue#12 costs 5#").is_empty());
    }
}
