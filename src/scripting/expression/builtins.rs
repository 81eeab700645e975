//! Methods on strings, arrays, numbers and regexes
//!
//! Indexes count characters, not UTF-16 units. Arrays are values: methods
//! that would mutate in JavaScript (`sort`, `reverse`, `pop`, `shift`)
//! return a result and leave the receiver untouched.

use std::cmp::Ordering;
use std::rc::Rc;

use super::parser::RegexLiteral;
use super::value::{format_number, join, Value};

/// Calls a function value with arguments
pub type Invoke<'i, 'a> = dyn FnMut(&Value<'a>, Vec<Value<'a>>) -> Result<Value<'a>, String> + 'i;

pub const STRING_METHODS: &[&str] = &[
    "at", "charAt", "concat", "endsWith", "includes", "indexOf", "lastIndexOf", "localeCompare",
    "match", "padEnd", "padStart", "repeat", "replace", "replaceAll", "search", "slice", "split",
    "startsWith", "substring", "toLocaleLowerCase", "toLocaleUpperCase", "toLowerCase", "toString",
    "toUpperCase", "trim", "trimEnd", "trimStart", "valueOf",
];

pub const ARRAY_METHODS: &[&str] = &[
    "at", "concat", "every", "filter", "find", "findIndex", "flat", "flatMap", "forEach",
    "includes", "indexOf", "join", "lastIndexOf", "map", "pop", "reduce", "reverse", "shift",
    "slice", "some", "sort", "toString",
];

pub const NUMBER_METHODS: &[&str] = &["toFixed", "toString", "valueOf"];

pub const REGEX_METHODS: &[&str] = &["exec", "test", "toString"];

/// Longest string a script may build, in bytes
pub const MAX_STRING_LENGTH: usize = 1 << 29;

/// Fails like a JavaScript `RangeError` once `len` exceeds [`MAX_STRING_LENGTH`]
pub fn check_string_length(len: usize) -> Result<(), String> {
    if len > MAX_STRING_LENGTH {
        Err("Invalid string length".to_string())
    } else {
        Ok(())
    }
}

/// Argument `i`, or `undefined`
pub fn arg<'a>(args: &[Value<'a>], i: usize) -> Value<'a> {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

/// Integer argument, `None` when missing or undefined
pub fn int_arg(args: &[Value<'_>], i: usize) -> Option<f64> {
    match args.get(i) {
        None | Some(Value::Undefined) => None,
        Some(value) => Some(to_integer(value.to_number())),
    }
}

/// String argument, `None` when missing or undefined
pub fn string_arg(args: &[Value<'_>], i: usize) -> Option<String> {
    match args.get(i) {
        None | Some(Value::Undefined) => None,
        Some(value) => Some(value.to_js_string()),
    }
}

fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Resolves a possibly negative index against `len`, clamped to `0..=len`
fn relative_index(index: f64, len: usize) -> usize {
    let len_f = len as f64;
    if index < 0.0 {
        (len_f + index).max(0.0) as usize
    } else {
        index.min(len_f) as usize
    }
}

fn char_to_byte(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

fn byte_to_char(s: &str, byte_index: usize) -> usize {
    s[..byte_index].chars().count()
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    if start >= end {
        return String::new();
    }
    s.chars().skip(start).take(end - start).collect()
}

pub fn string_property<'a>(s: &str, name: &str) -> Option<Value<'a>> {
    match name {
        "length" => Some(Value::Number(s.chars().count() as f64)),
        _ => None,
    }
}

pub fn string_index<'a>(s: &str, index: &Value<'a>) -> Value<'a> {
    match index {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => s
            .chars()
            .nth(*n as usize)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Undefined),
        other => string_property(s, &other.to_js_string()).unwrap_or(Value::Undefined),
    }
}

/// Invokes a string method, or `None` when `method` is not one
pub fn string_method<'a>(
    s: &str,
    method: &str,
    args: &[Value<'a>],
    invoke: &mut Invoke<'_, 'a>,
) -> Option<Result<Value<'a>, String>> {
    let len = s.chars().count();
    let result = match method {
        "toUpperCase" | "toLocaleUpperCase" => Ok(Value::String(s.to_uppercase())),
        "toLowerCase" | "toLocaleLowerCase" => Ok(Value::String(s.to_lowercase())),
        "trim" => Ok(Value::str(s.trim())),
        "trimStart" => Ok(Value::str(s.trim_start())),
        "trimEnd" => Ok(Value::str(s.trim_end())),
        "toString" | "valueOf" => Ok(Value::str(s)),
        "includes" => {
            let needle = string_arg(args, 0).unwrap_or_else(|| "undefined".to_string());
            Ok(Value::Bool(s.contains(&needle)))
        }
        "startsWith" => {
            let needle = string_arg(args, 0).unwrap_or_else(|| "undefined".to_string());
            let from = relative_index(int_arg(args, 1).unwrap_or(0.0).max(0.0), len);
            Ok(Value::Bool(s[char_to_byte(s, from)..].starts_with(&needle)))
        }
        "endsWith" => {
            let needle = string_arg(args, 0).unwrap_or_else(|| "undefined".to_string());
            let end = int_arg(args, 1).map_or(len, |e| relative_index(e.max(0.0), len));
            Ok(Value::Bool(s[..char_to_byte(s, end)].ends_with(&needle)))
        }
        "indexOf" => {
            let needle = string_arg(args, 0).unwrap_or_else(|| "undefined".to_string());
            let from = relative_index(int_arg(args, 1).unwrap_or(0.0).max(0.0), len);
            let offset = char_to_byte(s, from);
            Ok(Value::Number(
                s[offset..]
                    .find(&needle)
                    .map_or(-1.0, |b| byte_to_char(s, offset + b) as f64),
            ))
        }
        "lastIndexOf" => {
            let needle = string_arg(args, 0).unwrap_or_else(|| "undefined".to_string());
            Ok(Value::Number(
                s.rfind(&needle).map_or(-1.0, |b| byte_to_char(s, b) as f64),
            ))
        }
        "slice" => {
            let start = relative_index(int_arg(args, 0).unwrap_or(0.0), len);
            let end = int_arg(args, 1).map_or(len, |e| relative_index(e, len));
            Ok(Value::String(char_slice(s, start, end)))
        }
        "substring" => {
            let clamp = |n: f64| n.max(0.0).min(len as f64) as usize;
            let a = clamp(int_arg(args, 0).unwrap_or(0.0));
            let b = int_arg(args, 1).map_or(len, clamp);
            Ok(Value::String(char_slice(s, a.min(b), a.max(b))))
        }
        "charAt" => {
            let i = int_arg(args, 0).unwrap_or(0.0);
            Ok(Value::String(if i < 0.0 {
                String::new()
            } else {
                s.chars().nth(i as usize).map(String::from).unwrap_or_default()
            }))
        }
        "at" => {
            let i = int_arg(args, 0).unwrap_or(0.0);
            let index = if i < 0.0 { len as f64 + i } else { i };
            Ok(if index < 0.0 {
                Value::Undefined
            } else {
                s.chars()
                    .nth(index as usize)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined)
            })
        }
        "concat" => concat(s, args),
        "padStart" | "padEnd" => {
            let target = int_arg(args, 0).unwrap_or(0.0).max(0.0);
            let fill = string_arg(args, 1).unwrap_or_else(|| " ".to_string());
            if target <= len as f64 || fill.is_empty() {
                Ok(Value::str(s))
            } else if target > MAX_STRING_LENGTH as f64 {
                Err("Invalid string length".to_string())
            } else {
                let padding: String = fill.chars().cycle().take(target as usize - len).collect();
                check_string_length(padding.len() + s.len()).map(|()| {
                    Value::String(if method == "padStart" {
                        format!("{}{}", padding, s)
                    } else {
                        format!("{}{}", s, padding)
                    })
                })
            }
        }
        "repeat" => {
            let count = int_arg(args, 0).unwrap_or(0.0);
            if count < 0.0 || count.is_infinite() {
                Err(format!("Invalid count value: {}", format_number(count)))
            } else if s.len() as f64 * count > MAX_STRING_LENGTH as f64 {
                Err("Invalid string length".to_string())
            } else {
                Ok(Value::String(s.repeat(count as usize)))
            }
        }
        "localeCompare" => {
            let other = string_arg(args, 0).unwrap_or_else(|| "undefined".to_string());
            let ordering = s
                .to_lowercase()
                .cmp(&other.to_lowercase())
                .then_with(|| s.cmp(&other));
            Ok(Value::Number(match ordering {
                Ordering::Less => -1.0,
                Ordering::Equal => 0.0,
                Ordering::Greater => 1.0,
            }))
        }
        "split" => split(s, args),
        "replace" => replace(s, args, false, invoke),
        "replaceAll" => replace(s, args, true, invoke),
        "match" => regex_arg(args, 0).map(|r| match_regex(s, &r, r.is_global())),
        "search" => regex_arg(args, 0).map(|r| {
            Value::Number(
                r.regex
                    .find(s)
                    .map_or(-1.0, |m| byte_to_char(s, m.start()) as f64),
            )
        }),
        _ => return None,
    };
    Some(result)
}

fn concat<'a>(s: &str, args: &[Value<'a>]) -> Result<Value<'a>, String> {
    let mut out = s.to_string();
    for a in args {
        let text = a.to_js_string();
        check_string_length(out.len().saturating_add(text.len()))?;
        out.push_str(&text);
    }
    Ok(Value::String(out))
}

/// A regex argument; strings are compiled as patterns, as `new RegExp` would
fn regex_arg(args: &[Value<'_>], i: usize) -> Result<Rc<RegexLiteral>, String> {
    match arg(args, i) {
        Value::Regex(r) => Ok(r),
        Value::Undefined => RegexLiteral::new("(?:)", "").map(Rc::new),
        other => RegexLiteral::new(&other.to_js_string(), "").map(Rc::new),
    }
}

fn split<'a>(s: &str, args: &[Value<'a>]) -> Result<Value<'a>, String> {
    let limit = int_arg(args, 1).map_or(usize::MAX, |l| l.max(0.0) as usize);
    let parts: Vec<String> = match arg(args, 0) {
        Value::Undefined => vec![s.to_string()],
        Value::Regex(r) => r.regex.split(s).map(String::from).collect(),
        sep => {
            let sep = sep.to_js_string();
            if sep.is_empty() {
                s.chars().map(String::from).collect()
            } else {
                s.split(sep.as_str()).map(String::from).collect()
            }
        }
    };
    Ok(Value::strings(parts.into_iter().take(limit)))
}

/// One match found by `replace`, as character-aware text pieces
struct Found<'s> {
    start: usize,
    end: usize,
    groups: Vec<Option<&'s str>>,
    names: Vec<(String, usize)>,
}

fn replace<'a>(
    s: &str,
    args: &[Value<'a>],
    all: bool,
    invoke: &mut Invoke<'_, 'a>,
) -> Result<Value<'a>, String> {
    let replacement = arg(args, 1);
    let found: Vec<Found<'_>> = match arg(args, 0) {
        Value::Regex(r) => {
            if all && !r.is_global() {
                return Err("replaceAll must be called with a global RegExp".to_string());
            }
            let names: Vec<(String, usize)> = r
                .regex
                .capture_names()
                .enumerate()
                .filter_map(|(i, n)| n.map(|n| (n.to_string(), i)))
                .collect();
            let limit = if r.is_global() { usize::MAX } else { 1 };
            r.regex
                .captures_iter(s)
                .take(limit)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    Some(Found {
                        start: whole.start(),
                        end: whole.end(),
                        groups: (1..caps.len()).map(|i| caps.get(i).map(|m| m.as_str())).collect(),
                        names: names.clone(),
                    })
                })
                .collect()
        }
        pattern => {
            let pattern = pattern.to_js_string();
            let starts: Vec<usize> = if all {
                s.match_indices(pattern.as_str()).map(|(b, _)| b).collect()
            } else {
                s.find(pattern.as_str()).into_iter().collect()
            };
            starts
                .into_iter()
                .map(|start| Found {
                    start,
                    end: start + pattern.len(),
                    groups: Vec::new(),
                    names: Vec::new(),
                })
                .collect()
        }
    };

    let mut out = String::new();
    let mut last = 0;
    for m in found {
        out.push_str(&s[last..m.start]);
        let matched = &s[m.start..m.end];
        let text = match &replacement {
            Value::Function(_) => {
                let mut call_args = vec![Value::str(matched)];
                call_args.extend(
                    m.groups
                        .iter()
                        .map(|g| g.map_or(Value::Undefined, Value::str)),
                );
                call_args.push(Value::Number(byte_to_char(s, m.start) as f64));
                call_args.push(Value::str(s));
                invoke(&replacement, call_args)?.to_js_string()
            }
            other => expand_replacement(
                &other.to_js_string(),
                matched,
                &m.groups,
                &m.names,
                &s[..m.start],
                &s[m.end..],
            ),
        };
        out.push_str(&text);
        last = m.end;
        check_string_length(out.len() + (s.len() - last))?;
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

/// Expands `$&`, `$1`, `$<name>`, `` $` ``, `$'` and `$$` in a replacement
fn expand_replacement(
    template: &str,
    matched: &str,
    groups: &[Option<&str>],
    names: &[(String, usize)],
    before: &str,
    after: &str,
) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' || i + 1 == chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        match chars[i + 1] {
            '$' => {
                out.push('$');
                i += 2;
            }
            '&' => {
                out.push_str(matched);
                i += 2;
            }
            '`' => {
                out.push_str(before);
                i += 2;
            }
            '\'' => {
                out.push_str(after);
                i += 2;
            }
            '<' if !names.is_empty() => {
                let close = chars[i + 2..].iter().position(|c| *c == '>');
                match close {
                    Some(len) => {
                        let name: String = chars[i + 2..i + 2 + len].iter().collect();
                        let group = names
                            .iter()
                            .find(|(n, _)| *n == name)
                            .and_then(|(_, index)| groups.get(index - 1).copied().flatten());
                        out.push_str(group.unwrap_or(""));
                        i += 3 + len;
                    }
                    None => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            d if d.is_ascii_digit() => {
                let one = d.to_digit(10).unwrap_or(0) as usize;
                let two = chars
                    .get(i + 2)
                    .and_then(|c| c.to_digit(10))
                    .map(|d2| one * 10 + d2 as usize);
                match two {
                    Some(n) if n >= 1 && n <= groups.len() => {
                        out.push_str(groups[n - 1].unwrap_or(""));
                        i += 3;
                    }
                    _ if one >= 1 && one <= groups.len() => {
                        out.push_str(groups[one - 1].unwrap_or(""));
                        i += 2;
                    }
                    _ => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
    out
}

fn match_regex<'a>(s: &str, r: &RegexLiteral, global: bool) -> Value<'a> {
    if global {
        let all: Vec<Value<'a>> = r.regex.find_iter(s).map(|m| Value::str(m.as_str())).collect();
        return if all.is_empty() {
            Value::Null
        } else {
            Value::Array(all)
        };
    }
    match r.regex.captures(s) {
        None => Value::Null,
        Some(caps) => Value::Array(
            (0..caps.len())
                .map(|i| caps.get(i).map_or(Value::Undefined, |m| Value::str(m.as_str())))
                .collect(),
        ),
    }
}

pub fn regex_property<'a>(r: &RegexLiteral, name: &str) -> Option<Value<'a>> {
    match name {
        "source" => Some(Value::str(r.source.as_str())),
        "flags" => Some(Value::str(r.flags.as_str())),
        "global" => Some(Value::Bool(r.is_global())),
        _ => None,
    }
}

pub fn regex_method<'a>(r: &RegexLiteral, method: &str, args: &[Value<'a>]) -> Option<Result<Value<'a>, String>> {
    let input = string_arg(args, 0).unwrap_or_else(|| "undefined".to_string());
    let result = match method {
        "test" => Value::Bool(r.regex.is_match(&input)),
        "exec" => match_regex(&input, r, false),
        "toString" => Value::String(format!("/{}/{}", r.source, r.flags)),
        _ => return None,
    };
    Some(Ok(result))
}

pub fn number_method<'a>(n: f64, method: &str, args: &[Value<'a>]) -> Option<Result<Value<'a>, String>> {
    let result = match method {
        "toFixed" => {
            let digits = int_arg(args, 0).unwrap_or(0.0);
            if !(0.0..=100.0).contains(&digits) {
                Err("toFixed() digits argument must be between 0 and 100".to_string())
            } else if !n.is_finite() || n.abs() >= 1e21 {
                Ok(Value::String(format_number(n)))
            } else {
                Ok(Value::String(format!("{:.*}", digits as usize, n)))
            }
        }
        "toString" => match int_arg(args, 0).unwrap_or(10.0) as u32 {
            10 => Ok(Value::String(format_number(n))),
            radix @ 2..=36 if n.fract() == 0.0 && n.is_finite() => Ok(Value::String(to_radix(n as i64, radix))),
            2..=36 => Err("toString() with a radix only supports integers".to_string()),
            _ => Err("toString() radix must be between 2 and 36".to_string()),
        },
        "valueOf" => Ok(Value::Number(n)),
        _ => return None,
    };
    Some(result)
}

fn to_radix(n: i64, radix: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    let mut rest = n.unsigned_abs();
    while rest > 0 {
        let d = (rest % u64::from(radix)) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('?'));
        rest /= u64::from(radix);
    }
    if n < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

pub fn array_property<'a>(items: &[Value<'a>], name: &str) -> Option<Value<'a>> {
    match name {
        "length" => Some(Value::Number(items.len() as f64)),
        _ => None,
    }
}

pub fn array_index<'a>(items: &[Value<'a>], index: &Value<'a>) -> Value<'a> {
    match index {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => {
            items.get(*n as usize).cloned().unwrap_or(Value::Undefined)
        }
        Value::String(key) => match key.parse::<usize>() {
            Ok(i) => items.get(i).cloned().unwrap_or(Value::Undefined),
            Err(_) => array_property(items, key).unwrap_or(Value::Undefined),
        },
        _ => Value::Undefined,
    }
}

/// Stable merge sort with a fallible comparator
///
/// Never panics on an inconsistent comparator, unlike `slice::sort_by`.
pub fn stable_sort<T, E>(
    mut items: Vec<T>,
    cmp: &mut dyn FnMut(&T, &T) -> Result<Ordering, E>,
) -> Result<Vec<T>, E> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = stable_sort(items, cmp)?;
    let right = stable_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => cmp(b, a)? == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    Ok(merged)
}

fn callback_args<'a>(item: &Value<'a>, index: usize) -> Vec<Value<'a>> {
    vec![item.clone(), Value::Number(index as f64)]
}

/// Invokes an array method, or `None` when `method` is not one
pub fn array_method<'a>(
    items: &[Value<'a>],
    method: &str,
    args: &[Value<'a>],
    invoke: &mut Invoke<'_, 'a>,
) -> Option<Result<Value<'a>, String>> {
    let len = items.len();
    let callback = arg(args, 0);
    let result = match method {
        "join" => {
            let separator = string_arg(args, 0).unwrap_or_else(|| ",".to_string());
            let separators = separator.len().saturating_mul(items.len().saturating_sub(1));
            check_string_length(separators).map(|()| Value::String(join(items, &separator)))
        }
        "toString" => Ok(Value::String(join(items, ","))),
        "reverse" => Ok(Value::Array(items.iter().rev().cloned().collect())),
        "sort" => sort(items, &callback, invoke),
        "slice" => {
            let start = relative_index(int_arg(args, 0).unwrap_or(0.0), len);
            let end = int_arg(args, 1).map_or(len, |e| relative_index(e, len));
            Ok(Value::Array(if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            }))
        }
        "concat" => {
            let mut out = items.to_vec();
            for a in args {
                match a {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::Array(out))
        }
        "flat" => {
            let depth = int_arg(args, 0).unwrap_or(1.0).max(0.0) as usize;
            Ok(Value::Array(flatten(items, depth)))
        }
        "includes" => {
            let needle = arg(args, 0);
            Ok(Value::Bool(items.iter().any(|i| i.same_value_zero(&needle))))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            Ok(Value::Number(
                items
                    .iter()
                    .position(|i| i.strict_equals(&needle))
                    .map_or(-1.0, |p| p as f64),
            ))
        }
        "lastIndexOf" => {
            let needle = arg(args, 0);
            Ok(Value::Number(
                items
                    .iter()
                    .rposition(|i| i.strict_equals(&needle))
                    .map_or(-1.0, |p| p as f64),
            ))
        }
        "pop" => Ok(items.last().cloned().unwrap_or(Value::Undefined)),
        "shift" => Ok(items.first().cloned().unwrap_or(Value::Undefined)),
        "at" => {
            let i = int_arg(args, 0).unwrap_or(0.0);
            let index = if i < 0.0 { len as f64 + i } else { i };
            Ok(if index < 0.0 {
                Value::Undefined
            } else {
                items.get(index as usize).cloned().unwrap_or(Value::Undefined)
            })
        }
        "filter" => each(items, &callback, invoke, |out: &mut Vec<Value<'a>>, item, result| {
            if result.is_truthy() {
                out.push(item.clone());
            }
            true
        })
        .map(Value::Array),
        "map" => each(items, &callback, invoke, |out: &mut Vec<Value<'a>>, _, result| {
            out.push(result);
            true
        })
        .map(Value::Array),
        "flatMap" => each(items, &callback, invoke, |out: &mut Vec<Value<'a>>, _, result| {
            match result {
                Value::Array(inner) => out.extend(inner),
                other => out.push(other),
            }
            true
        })
        .map(Value::Array),
        "forEach" => each(items, &callback, invoke, |_: &mut Vec<Value<'a>>, _, _| true).map(|_| Value::Undefined),
        "find" => each(items, &callback, invoke, |out: &mut Vec<Value<'a>>, item, result| {
            if result.is_truthy() {
                out.push(item.clone());
                return false;
            }
            true
        })
        .map(|found| found.into_iter().next().unwrap_or(Value::Undefined)),
        "findIndex" => {
            let mut position = -1.0;
            let mut index = 0;
            each(items, &callback, invoke, |_: &mut Vec<Value<'a>>, _, result| {
                if result.is_truthy() {
                    position = index as f64;
                    return false;
                }
                index += 1;
                true
            })
            .map(|_| Value::Number(position))
        }
        "some" => each(items, &callback, invoke, |out: &mut Vec<Value<'a>>, _, result| {
            if result.is_truthy() {
                out.push(Value::Bool(true));
                return false;
            }
            true
        })
        .map(|found| Value::Bool(!found.is_empty())),
        "every" => each(items, &callback, invoke, |out: &mut Vec<Value<'a>>, _, result| {
            if !result.is_truthy() {
                out.push(Value::Bool(false));
                return false;
            }
            true
        })
        .map(|failed| Value::Bool(failed.is_empty())),
        "reduce" => reduce(items, &callback, args.get(1).cloned(), invoke),
        _ => return None,
    };
    Some(result)
}

/// Runs `callback` per element; `step` collects and returns false to stop
fn each<'a>(
    items: &[Value<'a>],
    callback: &Value<'a>,
    invoke: &mut Invoke<'_, 'a>,
    mut step: impl FnMut(&mut Vec<Value<'a>>, &Value<'a>, Value<'a>) -> bool,
) -> Result<Vec<Value<'a>>, String> {
    if !matches!(callback, Value::Function(_)) {
        return Err(format!("{} is not a function", callback.to_js_string()));
    }
    let mut out = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let result = invoke(callback, callback_args(item, index))?;
        if !step(&mut out, item, result) {
            break;
        }
    }
    Ok(out)
}

fn reduce<'a>(
    items: &[Value<'a>],
    callback: &Value<'a>,
    initial: Option<Value<'a>>,
    invoke: &mut Invoke<'_, 'a>,
) -> Result<Value<'a>, String> {
    if !matches!(callback, Value::Function(_)) {
        return Err(format!("{} is not a function", callback.to_js_string()));
    }
    let (mut acc, start) = match initial {
        Some(init) => (init, 0),
        None => match items.first() {
            Some(first) => (first.clone(), 1),
            None => return Err("Reduce of empty array with no initial value".to_string()),
        },
    };
    for (index, item) in items.iter().enumerate().skip(start) {
        acc = invoke(callback, vec![acc, item.clone(), Value::Number(index as f64)])?;
    }
    Ok(acc)
}

fn sort<'a>(items: &[Value<'a>], comparator: &Value<'a>, invoke: &mut Invoke<'_, 'a>) -> Result<Value<'a>, String> {
    let sorted = match comparator {
        Value::Undefined => stable_sort::<_, String>(items.to_vec(), &mut |a: &Value<'a>, b: &Value<'a>| {
            Ok(default_compare(a, b))
        })?,
        Value::Function(_) => stable_sort::<_, String>(items.to_vec(), &mut |a: &Value<'a>, b: &Value<'a>| {
            let result = invoke(comparator, vec![a.clone(), b.clone()])?.to_number();
            Ok(if result < 0.0 {
                Ordering::Less
            } else if result > 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            })
        })?,
        other => {
            return Err(format!(
                "The comparison function must be either a function or undefined, got {}",
                other.type_name()
            ))
        }
    };
    Ok(Value::Array(sorted))
}

/// Default `sort()` order: by string form, `undefined` last
fn default_compare(a: &Value<'_>, b: &Value<'_>) -> Ordering {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => Ordering::Equal,
        (Value::Undefined, _) => Ordering::Greater,
        (_, Value::Undefined) => Ordering::Less,
        _ => a.to_js_string().cmp(&b.to_js_string()),
    }
}

fn flatten<'a>(items: &[Value<'a>], depth: usize) -> Vec<Value<'a>> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => out.extend(flatten(inner, depth - 1)),
            other => out.push(other.clone()),
        }
    }
    out
}
