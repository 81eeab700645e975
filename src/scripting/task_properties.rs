//! Read-only view of a task for expressions
//!
//! `TaskProperties` derives every queryable value from a `Task` and the
//! evaluation time. Getters never fail: a missing date is an absent
//! `TasksDate`, a missing heading or rule is an empty string.

use chrono::NaiveDateTime;

use crate::domain::{urgency, Status, Task, TasksFile};

use super::tasks_date::TasksDate;

/// Task facade bound to `task` in expressions
#[derive(Debug, Clone, Copy)]
pub struct TaskProperties<'a> {
    task: &'a Task,
    now: NaiveDateTime,
}

impl<'a> TaskProperties<'a> {
    pub fn new(task: &'a Task, now: NaiveDateTime) -> Self {
        Self { task, now }
    }

    pub fn task(&self) -> &'a Task {
        self.task
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    // Dates

    pub fn created(&self) -> TasksDate {
        TasksDate::new(self.task.dates.created)
    }

    pub fn start(&self) -> TasksDate {
        TasksDate::new(self.task.dates.start)
    }

    pub fn scheduled(&self) -> TasksDate {
        TasksDate::new(self.task.dates.scheduled)
    }

    pub fn due(&self) -> TasksDate {
        TasksDate::new(self.task.dates.due)
    }

    pub fn done(&self) -> TasksDate {
        TasksDate::new(self.task.dates.done)
    }

    pub fn cancelled(&self) -> TasksDate {
        TasksDate::new(self.task.dates.cancelled)
    }

    /// Earliest of start, scheduled and due
    pub fn happens(&self) -> TasksDate {
        TasksDate::new(self.task.dates.happens())
    }

    // Status and file

    pub fn status(&self) -> StatusProperties<'a> {
        StatusProperties::new(&self.task.status)
    }

    pub fn file(&self) -> &'a TasksFile {
        &self.task.file
    }

    // Everything else

    pub fn tags(&self) -> &'a [String] {
        &self.task.tags
    }

    pub fn priority_name(&self) -> &'static str {
        self.task.priority.name()
    }

    pub fn priority_number(&self) -> u8 {
        self.task.priority.number()
    }

    pub fn urgency(&self) -> f64 {
        urgency(self.task, self.now.date())
    }

    pub fn description(&self) -> &'a str {
        &self.task.description
    }

    pub fn description_without_tags(&self) -> String {
        self.task.description_without_tags()
    }

    pub fn original_markdown(&self) -> &'a str {
        &self.task.original_markdown
    }

    pub fn block_link(&self) -> &'a str {
        &self.task.block_link
    }

    pub fn heading(&self) -> &'a str {
        self.task.heading.as_deref().unwrap_or("")
    }

    pub fn has_heading(&self) -> bool {
        self.task.heading.is_some()
    }

    pub fn is_done(&self) -> bool {
        self.task.is_done()
    }

    pub fn is_recurring(&self) -> bool {
        self.task.is_recurring()
    }

    pub fn recurrence_rule(&self) -> &'a str {
        self.task.recurrence_rule()
    }

    pub fn id(&self) -> &'a str {
        &self.task.id
    }

    pub fn line_number(&self) -> usize {
        self.task.line_number
    }

    pub fn indentation(&self) -> &'a str {
        &self.task.indentation
    }

    pub fn list_marker(&self) -> &'a str {
        &self.task.list_marker
    }
}

/// Status facade, `task.status` in expressions
#[derive(Debug, Clone, Copy)]
pub struct StatusProperties<'a> {
    status: &'a Status,
}

impl<'a> StatusProperties<'a> {
    pub fn new(status: &'a Status) -> Self {
        Self { status }
    }

    pub fn name(&self) -> &'a str {
        &self.status.name
    }

    pub fn symbol(&self) -> &'a str {
        &self.status.symbol
    }

    pub fn next_symbol(&self) -> &'a str {
        &self.status.next_symbol
    }

    /// Type name, e.g. `TODO` or `IN_PROGRESS`
    pub fn status_type(&self) -> &'static str {
        self.status.status_type.as_str()
    }

    /// Type with a hidden sort prefix, e.g. `%%2%%TODO`
    pub fn type_group_text(&self) -> String {
        self.status.type_group_text()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::Priority;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 10)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn absent_values_are_typed_empties() {
        let task = Task::new("Plain");
        let props = TaskProperties::new(&task, now());
        assert!(props.due().is_absent());
        assert!(props.happens().is_absent());
        assert_eq!(props.heading(), "");
        assert!(!props.has_heading());
        assert_eq!(props.recurrence_rule(), "");
        assert!(props.tags().is_empty());
        assert_eq!(props.block_link(), "");
    }

    #[test]
    fn dates_and_happens() {
        let task = Task::new("x")
            .with_due(date("2023-06-12"))
            .with_scheduled(date("2023-06-11"));
        let props = TaskProperties::new(&task, now());
        assert_eq!(props.due().format_as_date(""), "2023-06-12");
        assert_eq!(props.happens().format_as_date(""), "2023-06-11");
    }

    #[test]
    fn completion_dates() {
        let task = Task::new("x")
            .with_done(date("2023-06-09"))
            .with_cancelled(date("2023-06-10"));
        let props = TaskProperties::new(&task, now());
        assert_eq!(props.done().format_as_date(""), "2023-06-09");
        assert_eq!(props.cancelled().format_as_date(""), "2023-06-10");
        assert!(props.created().is_absent());
    }

    #[test]
    fn priority_and_urgency() {
        let task = Task::new("x").with_priority(Priority::High);
        let props = TaskProperties::new(&task, now());
        assert_eq!(props.priority_name(), "High");
        assert_eq!(props.priority_number(), 1);
        assert!((props.urgency() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn status_properties() {
        let task = Task::new("x").with_status(Status::in_progress());
        let status = TaskProperties::new(&task, now()).status();
        assert_eq!(status.name(), "In Progress");
        assert_eq!(status.symbol(), "/");
        assert_eq!(status.next_symbol(), "x");
        assert_eq!(status.status_type(), "IN_PROGRESS");
        assert_eq!(status.type_group_text(), "%%1%%IN_PROGRESS");
    }

    #[test]
    fn heading_and_file() {
        let task = Task::new("x")
            .with_heading("Errands")
            .with_file(TasksFile::new("home/list.md"));
        let props = TaskProperties::new(&task, now());
        assert!(props.has_heading());
        assert_eq!(props.heading(), "Errands");
        assert_eq!(props.file().filename(), "list.md");
    }
}
