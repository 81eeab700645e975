//! taskfn - expression-driven grouping, sorting and filtering of tasks
//!
//! Users attach single-line, JavaScript-flavoured expressions such as
//! `task.due.format("YYYY-MM-DD dddd")` or
//! `task.tags.filter(t => t.includes("#context/"))` to a query. Each
//! expression is compiled once and evaluated against a read-only view of
//! every task; the results become group headings, sort keys or filter
//! decisions.
//!
//! - [`domain`] - task records as handed over by the host
//! - [`scripting`] - the task facade, date wrappers and expression engine
//! - [`query`] - heading rendering, grouping, sorting and filtering
//! - [`storage`] - task fixtures and configuration files
//! - [`cli`] - the `taskfn` command-line host

pub mod cli;
pub mod domain;
pub mod query;
pub mod scripting;
pub mod storage;

pub use domain::{Task, TasksFile};
pub use query::{GroupedTasks, Heading, Query};
pub use scripting::{CompiledExpression, EvaluationContext, ExpressionCache};
