//! Ordering tasks by expression keys

use std::cmp::Ordering;
use std::sync::Arc;

use crate::domain::Task;
use crate::scripting::expression::Host;
use crate::scripting::{CompiledExpression, EvaluationContext, EvaluationError, Value};

/// One `sort by function` key
#[derive(Debug, Clone)]
pub struct SortInstruction {
    pub expression: Arc<CompiledExpression>,
    pub reverse: bool,
}

impl SortInstruction {
    pub fn new(expression: Arc<CompiledExpression>) -> Self {
        Self {
            expression,
            reverse: false,
        }
    }

    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// Comparable form of an evaluation result.
///
/// Variant order is the cross-type order: absent values first, then
/// booleans, numbers, strings, dates and arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Absent,
    Bool(bool),
    Number(f64),
    String(String),
    /// Epoch milliseconds
    Date(i64),
    Array(Vec<SortKey>),
}

impl SortKey {
    pub fn from_value(value: &Value<'_>) -> Self {
        match value {
            Value::Undefined | Value::Null => SortKey::Absent,
            Value::Bool(b) => SortKey::Bool(*b),
            Value::Number(n) => SortKey::Number(*n),
            Value::String(s) => SortKey::String(s.clone()),
            Value::Array(items) => SortKey::Array(items.iter().map(SortKey::from_value).collect()),
            Value::Object(Host::Date(date)) => match date.moment() {
                Some(moment) => SortKey::Date(moment.value_of()),
                None => SortKey::Absent,
            },
            Value::Object(Host::Moment(moment)) => SortKey::Date(moment.value_of()),
            other => SortKey::String(other.to_js_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Absent => 0,
            SortKey::Bool(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::String(_) => 3,
            SortKey::Date(_) => 4,
            SortKey::Array(_) => 5,
        }
    }

    /// Total order over keys; NaN sorts after every other number
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::String(a), SortKey::String(b)) => a.cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Array(a), SortKey::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.compare(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Stable-sorts `tasks` by the instructions, first instruction most
/// significant. A task whose key fails sorts after all others for that key.
pub fn sort<'t>(
    tasks: &mut Vec<&'t Task>,
    instructions: &[SortInstruction],
    context: &EvaluationContext,
    errors: &mut Vec<EvaluationError>,
) {
    if instructions.is_empty() {
        return;
    }

    let mut keyed: Vec<(Vec<Option<SortKey>>, &'t Task)> = tasks
        .iter()
        .map(|&task| {
            let keys = instructions
                .iter()
                .map(|instruction| match instruction.expression.evaluate(task, context) {
                    Ok(value) => Some(SortKey::from_value(&value)),
                    Err(error) => {
                        errors.push(error);
                        None
                    }
                })
                .collect();
            (keys, task)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        instructions
            .iter()
            .zip(a.iter().zip(b))
            .map(|(instruction, pair)| match pair {
                (Some(x), Some(y)) if instruction.reverse => y.compare(x),
                (Some(x), Some(y)) => x.compare(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    *tasks = keyed.into_iter().map(|(_, task)| task).collect();
}
