//! Expression engine
//!
//! An instruction is one line of JavaScript-flavoured expression text. It is
//! tokenized, parsed and name-resolved once into a [`CompiledExpression`],
//! then evaluated per task against the read-only task facade. Only `task`,
//! `now` and `moment` are bound; any other free name fails at compile time.
//!
//! ```
//! use chrono::NaiveDate;
//! use taskfn::domain::Task;
//! use taskfn::scripting::expression::{CompiledExpression, EvaluationContext};
//!
//! let expr = CompiledExpression::compile("task.tags.sort().join(', ')").unwrap();
//! let task = Task::new("Pack #b #a").with_tags(["#b", "#a"]);
//! let now = NaiveDate::from_ymd_opt(2023, 6, 10).unwrap().and_hms_opt(20, 0, 0).unwrap();
//! let value = expr.evaluate(&task, &EvaluationContext::new(now)).unwrap();
//! assert_eq!(value.to_js_string(), "#a, #b");
//! ```

mod builtins;
mod host;
mod interpreter;
mod lexer;
mod parser;
mod value;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Task;

pub use value::{Host, ScriptObject, Value};

use parser::Program;

/// One line of expression text as the user wrote it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub raw_text: String,
}

impl Instruction {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

/// Everything an evaluation may depend on besides the task
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext {
    /// Bound to `now`; the only clock expressions see
    pub now: NaiveDateTime,
}

impl EvaluationContext {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

/// The instruction did not parse or used an unbound name
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[error("Failed compiling '{instruction}': {message} (at position {position})")]
pub struct CompileError {
    pub instruction: String,
    pub message: String,
    /// Character offset into the instruction
    pub position: usize,
}

/// Evaluating an instruction failed for one task
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[error("Failed evaluating '{instruction}' for task '{task}' ({path}:{line_number}): {message}")]
pub struct EvaluationError {
    pub instruction: String,
    pub task: String,
    pub task_id: String,
    pub path: String,
    pub line_number: usize,
    pub message: String,
}

impl EvaluationError {
    pub fn new(instruction: &str, task: &Task, message: impl Into<String>) -> Self {
        Self {
            instruction: instruction.to_string(),
            task: task.description.clone(),
            task_id: task.id.clone(),
            path: task.file.path().to_string(),
            line_number: task.line_number,
            message: message.into(),
        }
    }
}

/// A parsed, resolved instruction; immutable and reusable across tasks
#[derive(Debug)]
pub struct CompiledExpression {
    instruction: Instruction,
    program: Program,
}

impl CompiledExpression {
    pub fn compile(text: &str) -> Result<Self, CompileError> {
        let program = parser::parse(text).map_err(|e| CompileError {
            instruction: text.to_string(),
            message: e.message,
            position: e.offset,
        })?;
        Ok(Self {
            instruction: Instruction::new(text),
            program,
        })
    }

    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    pub fn text(&self) -> &str {
        &self.instruction.raw_text
    }

    /// Evaluates against one task. Nothing carries over between calls.
    pub fn evaluate<'a>(
        &'a self,
        task: &'a Task,
        context: &EvaluationContext,
    ) -> Result<Value<'a>, EvaluationError> {
        interpreter::run(&self.program, task, context.now).map_err(|message| {
            let error = EvaluationError::new(self.text(), task, message);
            warn!(
                instruction = %error.instruction,
                task = %error.task,
                path = %error.path,
                line = error.line_number,
                "{}",
                error.message
            );
            error
        })
    }
}

/// Append-only map from instruction text to its compiled form
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: RwLock<HashMap<String, Arc<CompiledExpression>>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached expression, compiling it on first use.
    /// Failed compilations are not cached.
    pub fn get_or_compile(&self, text: &str) -> Result<Arc<CompiledExpression>, CompileError> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(compiled) = entries.get(text) {
                debug!(instruction = text, "expression cache hit");
                return Ok(Arc::clone(compiled));
            }
        }

        let compiled = Arc::new(CompiledExpression::compile(text)?);
        debug!(instruction = text, "compiled expression");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            entries.entry(text.to_string()).or_insert(compiled),
        ))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, Status, TasksFile};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 10)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn eval(text: &str, task: &Task) -> String {
        let expr = CompiledExpression::compile(text).unwrap();
        let value = expr.evaluate(task, &EvaluationContext::new(now())).unwrap();
        value.to_js_string()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_due_date() {
        let task = Task::new("a").with_due(day(2023, 6, 12));
        assert_eq!(eval("task.due.format('YYYY-MM-DD dddd')", &task), "2023-06-12 Monday");
    }

    #[test]
    fn absent_date_formats_to_fallback() {
        let task = Task::new("a");
        assert_eq!(eval("task.due.format('YYYY-MM-DD', 'no date')", &task), "no date");
        assert_eq!(eval("task.due.formatAsDate()", &task), "");
    }

    #[test]
    fn sorts_and_joins_tags() {
        let task = Task::new("a #b #a").with_tags(["#b", "#a"]);
        assert_eq!(eval("task.tags.sort().join(', ')", &task), "#a, #b");
        assert_eq!(eval("task.tags.join(', ')", &task), "#b, #a");
    }

    #[test]
    fn filters_tags_with_arrow() {
        let task = Task::new("a").with_tags(["#context/home", "#x", "#context/work"]);
        assert_eq!(
            eval("task.tags.filter(t => t.includes('#context/')).join('|')", &task),
            "#context/home|#context/work"
        );
    }

    #[test]
    fn sequence_with_assignment() {
        let task = Task::new("a").with_priority(Priority::High);
        assert_eq!(
            eval("p = task.priorityNumber, p < 3 ? 'urgent' : 'later'", &task),
            "urgent"
        );
    }

    #[test]
    fn closures_capture_enclosing_parameters() {
        let task = Task::new("a").with_tags(["#a", "#b"]);
        assert_eq!(
            eval("task.tags.map(t => [1, 2].map(n => t + n).join('')).join(' ')", &task),
            "#a1#a2 #b1#b2"
        );
    }

    #[test]
    fn optional_chaining_short_circuits() {
        let task = Task::new("a");
        assert_eq!(eval("task.due.moment?.format('YYYY')", &task), "undefined");
        assert_eq!(eval("task.due.moment?.format('YYYY') ?? 'none'", &task), "none");
    }

    #[test]
    fn status_and_file_properties() {
        let task = Task::new("a")
            .with_status(Status::done())
            .with_file(TasksFile::new("work/projects/plan.md"));
        assert_eq!(eval("task.status.name + ':' + task.status.type", &task), "Done:DONE");
        assert_eq!(eval("task.file.folder", &task), "work/projects/");
        assert_eq!(eval("task.file.filenameWithoutExtension", &task), "plan");
    }

    #[test]
    fn now_is_the_context_time() {
        let task = Task::new("a");
        assert_eq!(eval("now.format('YYYY-MM-DD HH:mm')", &task), "2023-06-10 20:00");
        assert_eq!(eval("moment('2023-06-12').diff(now, 'days')", &task), "1");
    }

    #[test]
    fn regex_literals() {
        let task = Task::new("Call Bob about #work");
        assert_eq!(eval("task.description.replace(/#\\w+/g, '').trim()", &task), "Call Bob about");
        assert_eq!(eval("/bob/i.test(task.description)", &task), "true");
    }

    #[test]
    fn lookaround_regex_fails_to_compile() {
        let err = CompiledExpression::compile("/#(?!done)\\w+/.test(task.description)").unwrap_err();
        assert!(err.message.contains("invalid regular expression"));
    }

    #[test]
    fn unbalanced_parentheses_fail_to_compile() {
        let err = CompiledExpression::compile("task.due.format((").unwrap_err();
        assert_eq!(err.instruction, "task.due.format((");
        assert!(err.to_string().contains("task.due.format(("));
    }

    #[test]
    fn unknown_names_fail_to_compile() {
        let err = CompiledExpression::compile("window.alert(1)").unwrap_err();
        assert!(err.message.contains("window"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn runtime_errors_name_the_task() {
        let task = Task::new("Broken")
            .with_id("t1")
            .with_line_number(7)
            .with_file(TasksFile::new("a/b.md"));
        let expr = CompiledExpression::compile("task.nothing.length").unwrap();
        let err = expr.evaluate(&task, &EvaluationContext::new(now())).unwrap_err();
        assert_eq!(err.task_id, "t1");
        assert_eq!(err.path, "a/b.md");
        assert_eq!(err.line_number, 7);
        assert!(err.message.contains("Cannot read properties of undefined"));
    }

    #[test]
    fn unbounded_recursion_is_an_error() {
        let task = Task::new("a");
        let expr = CompiledExpression::compile("f = x => f(x), f(1)").unwrap();
        let err = expr.evaluate(&task, &EvaluationContext::new(now())).unwrap_err();
        assert!(err.message.contains("call depth"));
    }

    #[test]
    fn evaluations_do_not_share_state() {
        let expr = CompiledExpression::compile("n = (n ?? 0) + 1").unwrap();
        let task = Task::new("a");
        let ctx = EvaluationContext::new(now());
        assert_eq!(expr.evaluate(&task, &ctx).unwrap().to_js_string(), "1");
        assert_eq!(expr.evaluate(&task, &ctx).unwrap().to_js_string(), "1");
    }

    #[test]
    fn cache_reuses_compiled_expressions() {
        let cache = ExpressionCache::new();
        let first = cache.get_or_compile("task.description").unwrap();
        let second = cache.get_or_compile("task.description").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        assert!(cache.get_or_compile("(").is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn compiled_expressions_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledExpression>();
        assert_send_sync::<ExpressionCache>();
    }
}
