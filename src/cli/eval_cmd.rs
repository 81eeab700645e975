//! `taskfn eval` and `taskfn check`

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::json;

use super::group_cmd::parse_now;
use super::output::Output;
use crate::scripting::{CompileError, CompiledExpression, EvaluationContext, Value};
use crate::storage::{Config, TaskStore};

/// JSON form of an expression result
pub fn value_to_json(value: &Value<'_>) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Number(n) if n.is_finite() => json!(n),
        Value::String(s) => json!(s),
        Value::Array(items) => items.iter().map(value_to_json).collect(),
        Value::Record(fields) => fields
            .iter()
            .map(|(key, value)| (key.clone(), value_to_json(value)))
            .collect::<serde_json::Map<_, _>>()
            .into(),
        other => json!(other.to_js_string()),
    }
}

#[derive(Serialize)]
struct EvalRow {
    task: String,
    path: String,
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn eval(
    tasks: &Path,
    expression: &str,
    now: Option<&str>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let compiled = CompiledExpression::compile(expression)?;
    let context = EvaluationContext::new(parse_now(now)?);
    let tasks = TaskStore::new(tasks).read_all(&config.statuses)?;
    output.verbose_ctx("eval", &format!("Evaluating against {} tasks", tasks.len()));

    let mut rows = Vec::with_capacity(tasks.len());
    for task in &tasks {
        let row = match compiled.evaluate(task, &context) {
            Ok(value) => {
                if !output.is_json() {
                    println!("{}: {}", task.label(), value.to_js_string());
                }
                EvalRow {
                    task: task.description.clone(),
                    path: task.file.path().to_string(),
                    line: task.line_number,
                    value: Some(value_to_json(&value)),
                    error: None,
                }
            }
            Err(error) => {
                if !output.is_json() {
                    output.warning(&error.to_string());
                }
                EvalRow {
                    task: task.description.clone(),
                    path: task.file.path().to_string(),
                    line: task.line_number,
                    value: None,
                    error: Some(error.message),
                }
            }
        };
        rows.push(row);
    }

    if output.is_json() {
        output.data(&rows);
    }
    Ok(())
}

pub fn check(expressions: &[String], output: &Output) -> Result<()> {
    let results: Vec<Result<(), CompileError>> = expressions
        .iter()
        .map(|text| CompiledExpression::compile(text).map(|_| ()))
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();

    if output.is_json() {
        let items: Vec<_> = expressions
            .iter()
            .zip(&results)
            .map(|(text, result)| match result {
                Ok(()) => json!({ "instruction": text, "ok": true }),
                Err(error) => json!({
                    "instruction": text,
                    "ok": false,
                    "message": error.message,
                    "position": error.position,
                }),
            })
            .collect();
        output.data(&items);
    } else {
        for (text, result) in expressions.iter().zip(&results) {
            match result {
                Ok(()) => println!("ok: {}", text),
                Err(error) => println!("error: {}", error),
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} expressions failed to compile", failed, expressions.len());
    }
    Ok(())
}
