//! Keeping tasks by expression predicate

use std::sync::Arc;

use crate::domain::Task;
use crate::scripting::{CompiledExpression, EvaluationContext, EvaluationError, Value};

/// One `filter by function` predicate
#[derive(Debug, Clone)]
pub struct FilterInstruction {
    pub expression: Arc<CompiledExpression>,
}

impl FilterInstruction {
    pub fn new(expression: Arc<CompiledExpression>) -> Self {
        Self { expression }
    }

    /// `Ok(true)` keeps the task. Only booleans and nullish results are
    /// accepted.
    pub fn matches(&self, task: &Task, context: &EvaluationContext) -> Result<bool, EvaluationError> {
        match self.expression.evaluate(task, context)? {
            Value::Bool(keep) => Ok(keep),
            Value::Null | Value::Undefined => Ok(false),
            other => Err(EvaluationError::new(
                self.expression.text(),
                task,
                format!(
                    "filtering function must return true, false, null or undefined, but returned {}",
                    other.type_of()
                ),
            )),
        }
    }
}

/// Keeps the tasks every filter accepts, in order
pub fn filter<'t>(
    tasks: Vec<&'t Task>,
    filters: &[FilterInstruction],
    context: &EvaluationContext,
    errors: &mut Vec<EvaluationError>,
) -> Vec<&'t Task> {
    tasks
        .into_iter()
        .filter(|task| {
            filters.iter().all(|f| match f.matches(task, context) {
                Ok(keep) => keep,
                Err(error) => {
                    errors.push(error);
                    false
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(
            NaiveDate::from_ymd_opt(2023, 6, 10)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
        )
    }

    fn predicate(text: &str) -> FilterInstruction {
        FilterInstruction::new(Arc::new(CompiledExpression::compile(text).unwrap()))
    }

    #[test]
    fn keeps_only_true() {
        let tasks = [
            Task::new("home").with_tags(["#home"]),
            Task::new("work").with_tags(["#work"]),
        ];
        let mut errors = Vec::new();
        let kept = filter(
            tasks.iter().collect(),
            &[predicate("task.tags.includes('#work')")],
            &ctx(),
            &mut errors,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].description, "work");
        assert!(errors.is_empty());
    }

    #[test]
    fn nullish_drops_and_other_types_error() {
        let task = Task::new("a");
        assert_eq!(predicate("null").matches(&task, &ctx()), Ok(false));
        assert_eq!(predicate("undefined").matches(&task, &ctx()), Ok(false));

        let err = predicate("task.description").matches(&task, &ctx()).unwrap_err();
        assert!(err.message.contains("returned string"));
    }

    #[test]
    fn errors_exclude_the_task() {
        let tasks = [Task::new("a")];
        let mut errors = Vec::new();
        let kept = filter(tasks.iter().collect(), &[predicate("1")], &ctx(), &mut errors);
        assert!(kept.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
