//! Task fixtures
//!
//! Tasks handed to taskfn come from a YAML or JSON document (chosen by file
//! extension, `.json` for JSON and anything else for YAML):
//!
//! ```yaml
//! files:
//!   work/plan.md:
//!     frontmatter: { tags: [project] }
//!     tags: [{ tag: "#review" }]
//! tasks:
//!   - description: "Send the draft #review"
//!     status: "/"
//!     due: 2023-06-12
//!     priority: high
//!     path: work/plan.md
//!     line: 4
//!     heading: This week
//! ```
//!
//! Statuses are given by symbol and resolved through the configured
//! [`StatusRegistry`]. Tags default to the ones found in the description.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    extract_tags, CachedMetadata, Priority, StatusRegistry, Task, TaskDates, TasksFile,
};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Task {index}: invalid {field} date '{value}'")]
    InvalidDate {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("Task {index}: {message}")]
    InvalidPriority { index: usize, message: String },

    #[error("Task {index}: description is empty")]
    EmptyDescription { index: usize },
}

/// One entry of the `tasks:` list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    pub id: Option<String>,
    pub description: String,
    /// Status symbol, `" "` when missing
    pub status: Option<String>,
    pub priority: Option<String>,
    pub created: Option<String>,
    pub start: Option<String>,
    pub scheduled: Option<String>,
    pub due: Option<String>,
    pub done: Option<String>,
    pub cancelled: Option<String>,
    pub recurrence: Option<String>,
    pub tags: Option<Vec<String>>,
    pub block_link: Option<String>,
    pub original_markdown: Option<String>,
    pub heading: Option<String>,
    pub path: Option<String>,
    #[serde(alias = "line_number")]
    pub line: Option<usize>,
    pub indentation: Option<String>,
    pub list_marker: Option<String>,
}

/// A whole fixture document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskDocument {
    pub files: HashMap<String, CachedMetadata>,
    pub tasks: Vec<TaskRecord>,
}

impl TaskDocument {
    /// Builds tasks in document order
    pub fn into_tasks(self, statuses: &StatusRegistry) -> Result<Vec<Task>, StoreError> {
        let TaskDocument { files, tasks } = self;
        tasks
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_task(index + 1, &files, statuses))
            .collect()
    }
}

impl TaskRecord {
    fn into_task(
        self,
        index: usize,
        files: &HashMap<String, CachedMetadata>,
        statuses: &StatusRegistry,
    ) -> Result<Task, StoreError> {
        if self.description.trim().is_empty() {
            return Err(StoreError::EmptyDescription { index });
        }

        let date = |field: &'static str, value: &Option<String>| -> Result<Option<NaiveDateTime>, StoreError> {
            value
                .as_deref()
                .map(|text| {
                    parse_date(text).ok_or_else(|| StoreError::InvalidDate {
                        index,
                        field,
                        value: text.to_string(),
                    })
                })
                .transpose()
        };
        let dates = TaskDates {
            created: date("created", &self.created)?,
            start: date("start", &self.start)?,
            scheduled: date("scheduled", &self.scheduled)?,
            due: date("due", &self.due)?,
            done: date("done", &self.done)?,
            cancelled: date("cancelled", &self.cancelled)?,
        };

        let priority = match &self.priority {
            Some(text) => text
                .parse::<Priority>()
                .map_err(|message| StoreError::InvalidPriority { index, message })?,
            None => Priority::None,
        };

        let status = statuses.by_symbol(self.status.as_deref().unwrap_or(" "));
        let file = match self.path {
            Some(path) => {
                let metadata = files.get(&path).cloned().unwrap_or_default();
                TasksFile::with_metadata(path, metadata)
            }
            None => TasksFile::default(),
        };
        let tags = self
            .tags
            .unwrap_or_else(|| extract_tags(&self.description));
        let indentation = self.indentation.unwrap_or_default();
        let list_marker = self.list_marker.unwrap_or_else(|| "-".to_string());
        let original_markdown = self.original_markdown.unwrap_or_else(|| {
            format!(
                "{}{} [{}] {}",
                indentation, list_marker, status.symbol, self.description
            )
        });

        let mut task = Task::new(self.description)
            .with_status(status)
            .with_priority(priority)
            .with_dates(dates)
            .with_tags(tags)
            .with_file(file)
            .with_line_number(self.line.unwrap_or(0))
            .with_original_markdown(original_markdown);
        if let Some(id) = self.id {
            task = task.with_id(id);
        }
        if let Some(rule) = self.recurrence {
            task = task.with_recurrence(rule);
        }
        if let Some(block_link) = self.block_link {
            task = task.with_block_link(block_link);
        }
        if let Some(heading) = self.heading {
            task = task.with_heading(heading);
        }
        task.indentation = indentation;
        task.list_marker = list_marker;
        Ok(task)
    }
}

/// Parses `YYYY-MM-DD`, optionally followed by a time
fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Reads task fixtures from disk
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a store for the document at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the document without resolving tasks
    pub fn read_document(&self) -> Result<TaskDocument> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read tasks: {}", self.path.display()))?;

        let is_json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON tasks: {}", self.path.display()))
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML tasks: {}", self.path.display()))
        }
    }

    /// Reads all tasks, resolving statuses through `statuses`
    pub fn read_all(&self, statuses: &StatusRegistry) -> Result<Vec<Task>> {
        let tasks = self
            .read_document()?
            .into_tasks(statuses)
            .with_context(|| format!("Invalid task in {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;
    use tempfile::TempDir;

    const YAML: &str = r##"
files:
  work/plan.md:
    frontmatter:
      tags: [project]
tasks:
  - description: "Send the draft #review"
    status: "/"
    due: 2023-06-12
    priority: high
    path: work/plan.md
    line: 4
    heading: This week
  - description: "Plain"
"##;

    #[test]
    fn reads_yaml_fixture() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.yaml");
        fs::write(&path, YAML).unwrap();

        let tasks = TaskStore::new(&path).read_all(&StatusRegistry::new()).unwrap();
        assert_eq!(tasks.len(), 2);

        let first = &tasks[0];
        assert_eq!(first.status, Status::in_progress());
        assert_eq!(first.priority, Priority::High);
        assert_eq!(first.tags, vec!["#review"]);
        assert_eq!(first.line_number, 4);
        assert_eq!(first.heading.as_deref(), Some("This week"));
        assert_eq!(first.file.tags(), vec!["#project"]);
        assert_eq!(first.original_markdown, "- [/] Send the draft #review");
        assert_eq!(
            first.dates.due,
            NaiveDate::from_ymd_opt(2023, 6, 12).unwrap().and_hms_opt(0, 0, 0)
        );

        assert_eq!(tasks[1].status, Status::todo());
        assert_eq!(tasks[1].file.path(), "");
    }

    #[test]
    fn reads_json_fixture() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"{"tasks": [{"description": "a", "status": "x", "done": "2023-06-01 09:30"}]}"#,
        )
        .unwrap();

        let tasks = TaskStore::new(&path).read_all(&StatusRegistry::new()).unwrap();
        assert!(tasks[0].is_done());
        assert_eq!(
            tasks[0].dates.done,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap().and_hms_opt(9, 30, 0)
        );
    }

    #[test]
    fn reports_bad_dates_and_priorities() {
        let doc: TaskDocument =
            serde_yaml::from_str("tasks:\n  - description: a\n    due: tomorrow\n").unwrap();
        assert_eq!(
            doc.into_tasks(&StatusRegistry::new()).unwrap_err(),
            StoreError::InvalidDate {
                index: 1,
                field: "due",
                value: "tomorrow".to_string()
            }
        );

        let doc: TaskDocument =
            serde_yaml::from_str("tasks:\n  - description: a\n    priority: urgent\n").unwrap();
        assert!(matches!(
            doc.into_tasks(&StatusRegistry::new()),
            Err(StoreError::InvalidPriority { index: 1, .. })
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = TaskStore::new(dir.path().join("nope.yaml"))
            .read_all(&StatusRegistry::new())
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read tasks"));
    }
}
