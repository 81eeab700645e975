//! `taskfn group`

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;

use super::output::Output;
use crate::query::{
    FilterInstruction, GroupInstruction, Query, SortInstruction, UngroupedPlacement,
};
use crate::scripting::{EvaluationContext, ExpressionCache, Moment};
use crate::storage::{Config, TaskStore};

/// Arguments of one `group` invocation
#[derive(Debug, Clone)]
pub struct GroupRequest {
    pub tasks: PathBuf,
    pub groups: Vec<String>,
    pub sorts: Vec<String>,
    pub filters: Vec<String>,
    pub query: Option<PathBuf>,
    pub now: Option<String>,
    pub ungrouped: UngroupedPlacement,
}

/// Parses `--now`, defaulting to the local clock
pub fn parse_now(now: Option<&str>) -> Result<NaiveDateTime> {
    match now {
        Some(text) => Moment::parse(text)
            .map(|m| m.datetime())
            .ok_or_else(|| anyhow!("Invalid --now value '{}', expected YYYY-MM-DD [HH:mm]", text)),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

/// Builds the query from the query file and the flags
///
/// Instructions that fail to compile are left out and described in the
/// returned messages; only an unreadable query file is an error.
pub fn build_query(request: &GroupRequest, cache: &ExpressionCache) -> Result<(Query, Vec<String>)> {
    let (mut query, mut problems) = match &request.query {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read query: {}", path.display()))?;
            let (query, errors) = Query::parse_partial(&source, cache, request.ungrouped);
            let problems = errors
                .iter()
                .map(|error| format!("{}: {}", path.display(), error))
                .collect();
            (query, problems)
        }
        None => (Query::new(), Vec::new()),
    };

    for text in &request.filters {
        match cache.get_or_compile(text) {
            Ok(expression) => query.filters.push(FilterInstruction::new(expression)),
            Err(error) => problems.push(error.to_string()),
        }
    }
    for text in &request.sorts {
        match cache.get_or_compile(text) {
            Ok(expression) => query.sorts.push(SortInstruction::new(expression)),
            Err(error) => problems.push(error.to_string()),
        }
    }
    for text in &request.groups {
        match cache.get_or_compile(text) {
            Ok(expression) => query
                .groups
                .push(GroupInstruction::new(expression).with_ungrouped(request.ungrouped)),
            Err(error) => problems.push(error.to_string()),
        }
    }
    Ok((query, problems))
}

pub fn run(request: &GroupRequest, config: &Config, output: &Output) -> Result<()> {
    let now = parse_now(request.now.as_deref())?;
    output.verbose_ctx("group", &format!("Evaluating at {}", now));

    let cache = ExpressionCache::new();
    let (query, problems) = build_query(request, &cache)?;
    for problem in &problems {
        output.warning(&format!("Skipping instruction. {}", problem));
    }
    output.verbose_ctx(
        "group",
        &format!(
            "{} filter(s), {} sort(s), {} grouping level(s)",
            query.filters.len(),
            query.sorts.len(),
            query.groups.len()
        ),
    );

    let tasks = TaskStore::new(&request.tasks).read_all(&config.statuses)?;
    output.verbose_ctx("group", &format!("Loaded {} tasks", tasks.len()));

    let result = query.execute(&tasks, &EvaluationContext::new(now));
    output.verbose_ctx(
        "group",
        &format!(
            "{} groups, {} tasks placed, {} errors",
            result.groups.len(),
            result.task_count(),
            result.errors.len()
        ),
    );
    output.grouped(&result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GroupRequest {
        GroupRequest {
            tasks: PathBuf::from("tasks.yaml"),
            groups: vec!["task.tags".to_string()],
            sorts: vec!["task.due".to_string()],
            filters: Vec::new(),
            query: None,
            now: None,
            ungrouped: UngroupedPlacement::Last,
        }
    }

    #[test]
    fn flags_become_instructions() {
        let cache = ExpressionCache::new();
        let (query, problems) = build_query(&request(), &cache).unwrap();
        assert!(problems.is_empty());
        assert_eq!(query.groups.len(), 1);
        assert_eq!(query.groups[0].ungrouped, UngroupedPlacement::Last);
        assert_eq!(query.sorts.len(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn bad_flag_expression_is_skipped() {
        let mut request = request();
        request.groups = vec!["task.(".to_string(), "task.tags".to_string()];
        let (query, problems) = build_query(&request, &ExpressionCache::new()).unwrap();
        assert_eq!(query.groups.len(), 1);
        assert_eq!(query.groups[0].expression.text(), "task.tags");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("task.("));
    }

    #[test]
    fn missing_query_file_fails() {
        let mut request = request();
        request.query = Some(PathBuf::from("/nonexistent/query.txt"));
        assert!(build_query(&request, &ExpressionCache::new()).is_err());
    }

    #[test]
    fn parses_now() {
        let now = parse_now(Some("2023-06-10 20:00")).unwrap();
        assert_eq!(now.to_string(), "2023-06-10 20:00:00");
        assert!(parse_now(Some("soon")).is_err());
    }
}
