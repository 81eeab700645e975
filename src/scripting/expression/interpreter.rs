//! Tree-walking evaluator for resolved programs

use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::domain::Task;
use crate::scripting::moment::Moment;
use crate::scripting::task_properties::TaskProperties;

use super::builtins::{self, Invoke};
use super::host::call_moment;
use super::parser::{Arrow, BinaryOp, Binding, Expr, Global, LogicalOp, Program, UnaryOp};
use super::value::{Env, Function, Host, Value};

/// Arrow calls nested deeper than this fail instead of overflowing the stack
const MAX_CALL_DEPTH: usize = 128;

/// Same for nested evaluation across all active calls
const MAX_EVAL_DEPTH: usize = 1024;

enum Interrupt {
    Error(String),
    /// `?.` hit a nullish value; unwinds to the enclosing chain
    ShortCircuit,
}

impl From<String> for Interrupt {
    fn from(message: String) -> Self {
        Interrupt::Error(message)
    }
}

type Flow<T> = Result<T, Interrupt>;

/// Evaluates `program` for one task
pub fn run<'a>(program: &'a Program, task: &'a Task, now: NaiveDateTime) -> Result<Value<'a>, String> {
    let env = Env::new(vec![Value::Undefined; program.top_level.len()], None);
    run_in(program, task, now, env)
}

fn run_in<'a>(
    program: &'a Program,
    task: &'a Task,
    now: NaiveDateTime,
    env: Rc<Env<'a>>,
) -> Result<Value<'a>, String> {
    let mut interpreter = Interpreter {
        task: TaskProperties::new(task, now),
        now: Moment::new(now),
        depth: 0,
        eval_depth: 0,
        assigned: Vec::new(),
    };
    let result = interpreter.eval(&program.body, &env);
    // An arrow stored into a frame it captures keeps that frame alive.
    env.clear();
    for frame in interpreter.assigned.drain(..) {
        frame.clear();
    }
    match result {
        Ok(value) => Ok(value),
        Err(Interrupt::ShortCircuit) => Ok(Value::Undefined),
        Err(Interrupt::Error(message)) => Err(message),
    }
}

struct Interpreter<'a> {
    task: TaskProperties<'a>,
    now: Moment,
    depth: usize,
    eval_depth: usize,
    /// Frames written by assignment, cleared when the run ends
    assigned: Vec<Rc<Env<'a>>>,
}

impl<'a> Interpreter<'a> {
    fn eval(&mut self, expr: &'a Expr, env: &Rc<Env<'a>>) -> Flow<Value<'a>> {
        if self.eval_depth >= MAX_EVAL_DEPTH {
            return Err(Interrupt::Error("Maximum call depth exceeded".to_string()));
        }
        self.eval_depth += 1;
        let result = self.eval_node(expr, env);
        self.eval_depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &'a Expr, env: &Rc<Env<'a>>) -> Flow<Value<'a>> {
        let value = match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Str(s) => Value::String(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Undefined => Value::Undefined,
            Expr::Regex(literal) => Value::Regex(Rc::new(literal.as_ref().clone())),
            Expr::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<Flow<Vec<_>>>()?,
            ),
            Expr::Name(name) => self.lookup(name.binding, &name.name, env)?,
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, env)?;
                if *optional && object.is_nullish() {
                    return Err(Interrupt::ShortCircuit);
                }
                self.get_property(&object, property)?
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let object = self.eval(object, env)?;
                if *optional && object.is_nullish() {
                    return Err(Interrupt::ShortCircuit);
                }
                let index = self.eval(index, env)?;
                self.get_index(&object, &index)?
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, env)?,
            Expr::Chain(inner) => match self.eval(inner, env) {
                Err(Interrupt::ShortCircuit) => Value::Undefined,
                other => other?,
            },
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, env)?;
                match op {
                    UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                    UnaryOp::Neg => Value::Number(-operand.to_number()),
                    UnaryOp::Plus => Value::Number(operand.to_number()),
                    UnaryOp::TypeOf => Value::str(operand.type_of()),
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, &left, &right)?
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, env)?;
                let take_left = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if take_left {
                    left
                } else {
                    self.eval(right, env)?
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(consequent, env)?
                } else {
                    self.eval(alternate, env)?
                }
            }
            Expr::Assign { target, value } => {
                let value = self.eval(value, env)?;
                match target.binding {
                    Binding::Local { depth, slot } if env.set(depth, slot, value.clone()) => {
                        self.remember_assigned(env, depth);
                        value
                    }
                    _ => {
                        return Err(Interrupt::Error(format!(
                            "cannot assign to '{}'",
                            target.name
                        )))
                    }
                }
            }
            Expr::Sequence(items) => {
                let mut last = Value::Undefined;
                for item in items {
                    last = self.eval(item, env)?;
                }
                last
            }
            Expr::Arrow(arrow) => Value::Function(Function::Arrow {
                arrow: arrow.as_ref(),
                env: Rc::clone(env),
            }),
        };
        Ok(value)
    }

    fn lookup(&self, binding: Binding, name: &str, env: &Env<'a>) -> Flow<Value<'a>> {
        match binding {
            Binding::Global(Global::Task) => Ok(Host::Task(self.task).into()),
            Binding::Global(Global::Now) => Ok(Host::Moment(self.now).into()),
            Binding::Global(Global::Moment) => Ok(Value::Function(Function::Moment)),
            Binding::Local { depth, slot } => env
                .get(depth, slot)
                .ok_or_else(|| Interrupt::Error(format!("'{}' is not defined", name))),
            Binding::Unresolved => Err(Interrupt::Error(format!("'{}' is not defined", name))),
        }
    }

    fn eval_call(
        &mut self,
        callee: &'a Expr,
        args: &'a [Expr],
        optional: bool,
        env: &Rc<Env<'a>>,
    ) -> Flow<Value<'a>> {
        // Method calls keep their receiver.
        let method = match callee {
            Expr::Member {
                object,
                property,
                optional: member_optional,
            } => {
                let receiver = self.eval(object, env)?;
                if *member_optional && receiver.is_nullish() {
                    return Err(Interrupt::ShortCircuit);
                }
                Some((receiver, property.clone()))
            }
            Expr::Index {
                object,
                index,
                optional: index_optional,
            } => {
                let receiver = self.eval(object, env)?;
                if *index_optional && receiver.is_nullish() {
                    return Err(Interrupt::ShortCircuit);
                }
                let name = self.eval(index, env)?.to_js_string();
                Some((receiver, name))
            }
            _ => None,
        };

        match method {
            Some((receiver, name)) => {
                if optional && self.get_property(&receiver, &name)?.is_nullish() {
                    return Err(Interrupt::ShortCircuit);
                }
                let args = self.eval_args(args, env)?;
                self.call_method(receiver, &name, args)
            }
            None => {
                let function = self.eval(callee, env)?;
                if optional && function.is_nullish() {
                    return Err(Interrupt::ShortCircuit);
                }
                let args = self.eval_args(args, env)?;
                Ok(self.call_function(&function, args)?)
            }
        }
    }

    fn eval_args(&mut self, args: &'a [Expr], env: &Rc<Env<'a>>) -> Flow<Vec<Value<'a>>> {
        args.iter().map(|arg| self.eval(arg, env)).collect()
    }

    fn get_property(&self, object: &Value<'a>, name: &str) -> Flow<Value<'a>> {
        let method = |methods: &'static [&'static str]| {
            methods.contains(&name).then(|| {
                Value::Function(Function::Method {
                    receiver: Box::new(object.clone()),
                    name: name.to_string(),
                })
            })
        };
        let found = match object {
            Value::Undefined | Value::Null => {
                return Err(Interrupt::Error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    object.to_js_string(),
                    name
                )))
            }
            Value::String(s) => builtins::string_property(s, name).or_else(|| method(builtins::STRING_METHODS)),
            Value::Array(items) => builtins::array_property(items, name).or_else(|| method(builtins::ARRAY_METHODS)),
            Value::Number(_) => method(builtins::NUMBER_METHODS),
            Value::Bool(_) => method(&["toString"]),
            Value::Regex(r) => builtins::regex_property(r, name).or_else(|| method(builtins::REGEX_METHODS)),
            Value::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()),
            Value::Object(host) => {
                let script = host.as_script();
                script.get(name, &self.now).or_else(|| method(script.methods()))
            }
            Value::Function(_) => None,
        };
        Ok(found.unwrap_or(Value::Undefined))
    }

    fn get_index(&self, object: &Value<'a>, index: &Value<'a>) -> Flow<Value<'a>> {
        match object {
            Value::String(s) => Ok(builtins::string_index(s, index)),
            Value::Array(items) => Ok(builtins::array_index(items, index)),
            other => self.get_property(other, &index.to_js_string()),
        }
    }

    fn call_method(&mut self, receiver: Value<'a>, name: &str, args: Vec<Value<'a>>) -> Flow<Value<'a>> {
        if receiver.is_nullish() {
            return Err(Interrupt::Error(format!(
                "Cannot read properties of {} (reading '{}')",
                receiver.to_js_string(),
                name
            )));
        }

        let now = self.now;
        let result = {
            let mut invoke = |f: &Value<'a>, call_args: Vec<Value<'a>>| self.call_function(f, call_args);
            let invoke: &mut Invoke<'_, 'a> = &mut invoke;
            match &receiver {
                Value::String(s) => builtins::string_method(s, name, &args, invoke),
                Value::Array(items) => builtins::array_method(items, name, &args, invoke),
                Value::Number(n) => builtins::number_method(*n, name, &args),
                Value::Bool(b) if name == "toString" => Some(Ok(Value::String(b.to_string()))),
                Value::Regex(r) => builtins::regex_method(r, name, &args),
                Value::Object(host) => host.as_script().call(name, &args, &now),
                _ => None,
            }
        };

        match result {
            Some(outcome) => Ok(outcome?),
            None => {
                let property = self.get_property(&receiver, name)?;
                if let Value::Function(_) = property {
                    return Ok(self.call_function(&property, args)?);
                }
                Err(Interrupt::Error(format!(
                    "{}.{} is not a function",
                    receiver.type_name(),
                    name
                )))
            }
        }
    }

    fn remember_assigned(&mut self, env: &Rc<Env<'a>>, depth: usize) {
        let Some(frame) = env.frame_at(depth) else {
            return;
        };
        if !self.assigned.last().is_some_and(|last| Rc::ptr_eq(last, &frame)) {
            self.assigned.push(frame);
        }
    }

    fn call_function(&mut self, function: &Value<'a>, args: Vec<Value<'a>>) -> Result<Value<'a>, String> {
        let Value::Function(function) = function else {
            return Err(format!("{} is not a function", function.type_name()));
        };
        match function {
            Function::Arrow { arrow, env } => {
                let arrow: &'a Arrow = arrow;
                if self.depth >= MAX_CALL_DEPTH {
                    return Err("Maximum call depth exceeded".to_string());
                }
                let mut slots = args;
                slots.resize(arrow.params.len(), Value::Undefined);
                let frame = Env::new(slots, Some(Rc::clone(env)));
                self.depth += 1;
                let result = self.eval(&arrow.body, &frame);
                self.depth -= 1;
                match result {
                    Ok(value) => Ok(value),
                    Err(Interrupt::ShortCircuit) => Ok(Value::Undefined),
                    Err(Interrupt::Error(message)) => Err(message),
                }
            }
            Function::Moment => call_moment(&args, &self.now),
            Function::Method { receiver, name } => {
                match self.call_method(receiver.as_ref().clone(), name, args) {
                    Ok(value) => Ok(value),
                    Err(Interrupt::ShortCircuit) => Ok(Value::Undefined),
                    Err(Interrupt::Error(message)) => Err(message),
                }
            }
        }
    }
}

fn binary<'a>(op: BinaryOp, left: &Value<'a>, right: &Value<'a>) -> Result<Value<'a>, String> {
    let value = match op {
        BinaryOp::Add => {
            let (l, r) = (left.to_primitive(), right.to_primitive());
            if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                let (l, r) = (l.to_js_string(), r.to_js_string());
                builtins::check_string_length(l.len() + r.len())?;
                Value::String(l + &r)
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (l, r) = (left.to_primitive(), right.to_primitive());
            let ordering = match (&l, &r) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => l.to_number().partial_cmp(&r.to_number()),
            };
            Value::Bool(match ordering {
                None => false,
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
            })
        }
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::expression::parser::parse;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 10)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    /// True if every frame the run allocated is gone afterwards
    fn frames_released(source: &str) -> bool {
        let program = parse(source).unwrap();
        let task = Task::new("t");
        let env = Env::new(vec![Value::Undefined; program.top_level.len()], None);
        let top = Rc::downgrade(&env);
        let result = run_in(&program, &task, now(), env);
        assert!(result.is_ok(), "{source}: {:?}", result.err());
        drop(result);
        top.upgrade().is_none()
    }

    #[test]
    fn recursive_arrow_releases_top_level_frame() {
        assert!(frames_released("f = x => x > 3 ? x : f(x + 1), f(0)"));
    }

    #[test]
    fn arrow_stored_in_inner_frame_is_released() {
        assert!(frames_released("(n => (n = () => n, 1))(0)"));
    }

    #[test]
    fn deep_recursion_through_a_tall_body_stops() {
        let body = vec!["x"; 200].join(" + ");
        let source = format!("f = x => x < 0 ? x : f({}), f(1)", body);
        let program = parse(&source).unwrap();
        let task = Task::new("t");
        let err = run(&program, &task, now()).unwrap_err();
        assert_eq!(err, "Maximum call depth exceeded");
    }

    #[test]
    fn oversized_string_is_an_error() {
        let program = parse("'ab'.repeat(1e15)").unwrap();
        let task = Task::new("t");
        assert_eq!(run(&program, &task, now()).unwrap_err(), "Invalid string length");
    }
}
