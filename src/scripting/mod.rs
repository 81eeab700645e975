//! Scripting surface
//!
//! The read-only facades expressions see (`TaskProperties`, `TasksDate`,
//! `Moment`) and the expression engine that evaluates instructions against
//! them.

pub mod expression;
pub mod moment;
mod task_properties;
mod tasks_date;

pub use expression::{
    CompileError, CompiledExpression, EvaluationContext, EvaluationError, ExpressionCache,
    Instruction, Value,
};
pub use moment::{Moment, TimeUnit};
pub use task_properties::{StatusProperties, TaskProperties};
pub use tasks_date::{DateCategory, TasksDate};
