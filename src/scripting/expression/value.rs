//! Runtime values
//!
//! `Value<'a>` borrows from the task being evaluated and from the compiled
//! expression, and lives only for one evaluation. Conversions follow
//! JavaScript rules closely enough for one-line instructions: truthiness,
//! `+` concatenation, loose and strict equality, number rendering.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::domain::TasksFile;
use crate::scripting::moment::Moment;
use crate::scripting::task_properties::{StatusProperties, TaskProperties};
use crate::scripting::tasks_date::{DateCategory, TasksDate};

use super::parser::{Arrow, RegexLiteral};

/// Property and method surface of a host object
///
/// The evaluator only ever talks to host data through this trait, and only
/// for the closed set of types in [`Host`].
pub trait ScriptObject<'a> {
    /// Name used in error messages
    fn type_name(&self) -> &'static str;

    /// Property value, or `None` for an unknown property
    fn get(&self, property: &str, now: &Moment) -> Option<Value<'a>>;

    /// Method names `call` accepts
    fn methods(&self) -> &'static [&'static str];

    /// Invokes a method, or `None` when the object has no such method
    fn call(&self, method: &str, args: &[Value<'a>], now: &Moment)
        -> Option<Result<Value<'a>, String>>;

    /// Text used when the object ends up in a string or heading
    fn display(&self) -> String;
}

/// The host objects expressions can reach
#[derive(Debug, Clone)]
pub enum Host<'a> {
    Task(TaskProperties<'a>),
    Status(StatusProperties<'a>),
    File(&'a TasksFile),
    Date(TasksDate),
    Moment(Moment),
    Category(DateCategory),
}

impl<'a> Host<'a> {
    pub fn as_script(&self) -> &dyn ScriptObject<'a> {
        match self {
            Host::Task(task) => task,
            Host::Status(status) => status,
            Host::File(file) => *file,
            Host::Date(date) => date,
            Host::Moment(moment) => moment,
            Host::Category(category) => category,
        }
    }

    fn same_as(&self, other: &Host<'a>) -> bool {
        match (self, other) {
            (Host::Task(a), Host::Task(b)) => std::ptr::eq(a.task(), b.task()),
            (Host::Status(a), Host::Status(b)) => a.symbol() == b.symbol() && a.name() == b.name(),
            (Host::File(a), Host::File(b)) => a.path() == b.path(),
            (Host::Date(a), Host::Date(b)) => a == b,
            (Host::Moment(a), Host::Moment(b)) => a == b,
            (Host::Category(a), Host::Category(b)) => a == b,
            _ => false,
        }
    }
}

/// A variable frame; arrow calls push one, the instruction itself has one
pub struct Env<'a> {
    slots: RefCell<Vec<Value<'a>>>,
    parent: Option<Rc<Env<'a>>>,
}

impl<'a> Env<'a> {
    pub fn new(slots: Vec<Value<'a>>, parent: Option<Rc<Env<'a>>>) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(slots),
            parent,
        })
    }

    /// The frame `depth` levels up, shared
    pub fn frame_at(self: &Rc<Self>, depth: usize) -> Option<Rc<Self>> {
        let mut env = Rc::clone(self);
        for _ in 0..depth {
            env = Rc::clone(env.parent.as_ref()?);
        }
        Some(env)
    }

    /// Drops every slot value
    pub fn clear(&self) {
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        drop(slots);
    }

    fn frame(&self, depth: usize) -> Option<&Env<'a>> {
        let mut env = self;
        for _ in 0..depth {
            env = env.parent.as_deref()?;
        }
        Some(env)
    }

    pub fn get(&self, depth: usize, slot: usize) -> Option<Value<'a>> {
        self.frame(depth)?.slots.borrow().get(slot).cloned()
    }

    pub fn set(&self, depth: usize, slot: usize, value: Value<'a>) -> bool {
        let Some(frame) = self.frame(depth) else {
            return false;
        };
        match frame.slots.borrow_mut().get_mut(slot) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }
}

/// Something callable
#[derive(Clone)]
pub enum Function<'a> {
    Arrow { arrow: &'a Arrow, env: Rc<Env<'a>> },
    /// The `moment(...)` entry point
    Moment,
    /// A method read off a value without calling it
    Method {
        receiver: Box<Value<'a>>,
        name: String,
    },
}

impl fmt::Debug for Function<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Arrow { arrow, .. } => write!(f, "Arrow({:?})", arrow.params),
            Function::Moment => f.write_str("moment"),
            Function::Method { name, .. } => write!(f, "Method({})", name),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value<'a>>),
    /// Plain data object, e.g. frontmatter
    Record(Vec<(String, Value<'a>)>),
    Regex(Rc<RegexLiteral>),
    Object(Host<'a>),
    Function(Function<'a>),
}

impl<'a> Value<'a> {
    pub fn str(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Array(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// Converts JSON data such as frontmatter
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Record(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null | Value::Array(_) | Value::Record(_) | Value::Regex(_) | Value::Object(_) => {
                "object"
            }
        }
    }

    /// Descriptive type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Regex(_) => "regex",
            Value::Object(host) => host.as_script().type_name(),
            other => other.type_of(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(Host::Moment(m)) => m.value_of() as f64,
            Value::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// Primitive form used by `+` and relational operators
    pub fn to_primitive(&self) -> Value<'a> {
        match self {
            Value::Object(Host::Moment(m)) => Value::Number(m.value_of() as f64),
            Value::Array(_) | Value::Record(_) | Value::Regex(_) | Value::Object(_) | Value::Function(_) => {
                Value::String(self.to_js_string())
            }
            primitive => primitive.clone(),
        }
    }

    /// JavaScript `String(value)`
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => join(items, ","),
            Value::Record(_) => "[object Object]".to_string(),
            Value::Regex(r) => format!("/{}/{}", r.source, r.flags),
            Value::Object(host) => host.as_script().display(),
            Value::Function(_) => "function".to_string(),
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.same_as(b),
            (Value::Regex(a), Value::Regex(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Array(_) | Value::Record(_) | Value::Object(_), Value::Number(_) | Value::String(_)) => {
                self.to_primitive().loose_equals(other)
            }
            (Value::Number(_) | Value::String(_), Value::Array(_) | Value::Record(_) | Value::Object(_)) => {
                self.loose_equals(&other.to_primitive())
            }
            _ => self.strict_equals(other),
        }
    }

    /// SameValueZero, used by `includes`
    pub fn same_value_zero(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value<'_> {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value<'_> {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<'a> From<Host<'a>> for Value<'a> {
    fn from(host: Host<'a>) -> Self {
        Value::Object(host)
    }
}

/// `Array.prototype.join`: nullish elements become empty strings
pub fn join(items: &[Value<'_>], separator: &str) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_js_string()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan", JavaScript does not
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        t => t.parse().unwrap_or(f64::NAN),
    }
}

/// Renders a number the way JavaScript's `String(n)` does
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if n.fract() == 0.0 && abs < 1e21 {
        return format!("{}", n as i128);
    }
    if !(1e-6..1e21).contains(&abs) {
        let text = format!("{:e}", n);
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        };
    }
    format!("{}", n)
}
