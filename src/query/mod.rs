//! Queries: filter, sort and group instructions over a task set
//!
//! A query is written one instruction per line:
//!
//! ```text
//! # comments and blank lines are ignored
//! filter by function !task.isDone
//! sort by function reverse task.urgency
//! group by function task.due.category.groupText
//! group by function ungrouped last task.tags
//! ```
//!
//! Filters run first, then sorts, then each grouping level subdivides the
//! previous one.

pub mod filter;
pub mod grouper;
pub mod heading;
pub mod sorter;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::Task;
use crate::scripting::{CompileError, EvaluationContext, EvaluationError, ExpressionCache};

pub use filter::FilterInstruction;
pub use grouper::{Group, GroupInstruction, UngroupedPlacement};
pub use heading::Heading;
pub use sorter::{SortInstruction, SortKey};

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("line {line}: do not understand query instruction: {text}")]
    Unknown { line: usize, text: String },

    #[error("line {line}: {error}")]
    Compile { line: usize, error: CompileError },
}

/// The instructions of one query, in declaration order per kind
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<FilterInstruction>,
    pub sorts: Vec<SortInstruction>,
    pub groups: Vec<GroupInstruction>,
}

/// Result of running a query: the group tree plus per-task failures
#[derive(Debug, Clone, Serialize)]
pub struct GroupedTasks<'t> {
    pub groups: Vec<Group<'t>>,
    pub errors: Vec<EvaluationError>,
}

impl GroupedTasks<'_> {
    /// Number of distinct tasks placed in any group
    pub fn task_count(&self) -> usize {
        let mut seen: Vec<&Task> = Vec::new();
        for group in &self.groups {
            for task in group.all_tasks() {
                if !seen.iter().any(|s| std::ptr::eq(*s, task)) {
                    seen.push(task);
                }
            }
        }
        seen.len()
    }
}

const GROUP_PREFIX: &str = "group by function";
const SORT_PREFIX: &str = "sort by function";
const FILTER_PREFIX: &str = "filter by function";

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses query text, failing on the first bad line. `ungrouped`
    /// applies to group lines that do not declare a placement.
    pub fn parse(
        source: &str,
        cache: &ExpressionCache,
        ungrouped: UngroupedPlacement,
    ) -> Result<Self, QueryError> {
        let (query, mut errors) = Self::parse_partial(source, cache, ungrouped);
        if errors.is_empty() {
            Ok(query)
        } else {
            Err(errors.swap_remove(0))
        }
    }

    /// Parses query text, skipping lines that fail. The query keeps every
    /// valid instruction; the failures come back alongside it.
    pub fn parse_partial(
        source: &str,
        cache: &ExpressionCache,
        ungrouped: UngroupedPlacement,
    ) -> (Self, Vec<QueryError>) {
        let mut query = Query::new();
        let mut errors = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Err(error) = query.add_line(line, index + 1, cache, ungrouped) {
                debug!(line = index + 1, %error, "skipped query line");
                errors.push(error);
            }
        }
        (query, errors)
    }

    fn add_line(
        &mut self,
        line: &str,
        number: usize,
        cache: &ExpressionCache,
        ungrouped: UngroupedPlacement,
    ) -> Result<(), QueryError> {
        let compile = |text: &str| {
            cache.get_or_compile(text).map_err(|error| QueryError::Compile {
                line: number,
                error,
            })
        };
        let unknown = || QueryError::Unknown {
            line: number,
            text: line.to_string(),
        };

        if let Some(rest) = strip_keyword(line, FILTER_PREFIX) {
            self.filters.push(FilterInstruction::new(compile(rest)?));
        } else if let Some(rest) = strip_keyword(line, SORT_PREFIX) {
            let (reverse, rest) = match strip_keyword(rest, "reverse") {
                Some(rest) => (true, rest),
                None => (false, rest),
            };
            self.sorts.push(SortInstruction::new(compile(rest)?).reversed(reverse));
        } else if let Some(rest) = strip_keyword(line, GROUP_PREFIX) {
            let (reverse, rest) = match strip_keyword(rest, "reverse") {
                Some(rest) => (true, rest),
                None => (false, rest),
            };
            let (placement, rest) = match strip_keyword(rest, "ungrouped") {
                Some(rest) => {
                    let (word, expression) = rest.split_once(char::is_whitespace).ok_or_else(unknown)?;
                    (
                        word.parse::<UngroupedPlacement>().map_err(|_| unknown())?,
                        expression.trim_start(),
                    )
                }
                None => (ungrouped, rest),
            };
            self.groups.push(
                GroupInstruction::new(compile(rest)?)
                    .reversed(reverse)
                    .with_ungrouped(placement),
            );
        } else {
            return Err(unknown());
        }
        Ok(())
    }

    /// Filters, sorts and groups `tasks`. Always completes; failures for
    /// individual tasks are collected in `errors`.
    pub fn execute<'t>(&self, tasks: &'t [Task], context: &EvaluationContext) -> GroupedTasks<'t> {
        let mut errors = Vec::new();
        let mut selected = filter::filter(tasks.iter().collect(), &self.filters, context, &mut errors);
        debug!(
            total = tasks.len(),
            kept = selected.len(),
            "filtered tasks"
        );
        sorter::sort(&mut selected, &self.sorts, context, &mut errors);
        let groups = grouper::group(&selected, &self.groups, context, &mut errors);
        GroupedTasks { groups, errors }
    }
}

/// Strips a leading keyword followed by whitespace
fn strip_keyword<'s>(line: &'s str, keyword: &str) -> Option<&'s str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}
