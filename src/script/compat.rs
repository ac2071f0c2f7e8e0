//! JavaScript-flavoured surface for rule expressions.
//!
//! Pipeline authors write conditions such as
//! `filename.toLowerCase().endsWith(".csv")`. The expression engine speaks
//! Rhai, so sources go through [`normalize_source`] and the engine gets the
//! familiar string helpers through [`register_helpers`] and JavaScript number
//! semantics through [`register_operators`].
//!
//! Known differences from JavaScript: `&&`, `||` and `!` only accept
//! booleans (use `Boolean(name) && age > 1`), and they yield a boolean
//! rather than one of their operands.

use super::bindings::is_truthy;
use regex::Regex;
use rhai::{Dynamic, Engine, ImmutableString, FLOAT, INT};
use std::sync::OnceLock;

/// Rewrite JavaScript-only syntax into its Rhai equivalent.
///
/// * `===` / `!==` become `==` / `!=`
/// * `'single quoted'` strings become `"double quoted"` strings
///
/// Text inside string literals is left untouched.
pub fn normalize_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '`' => {
                out.push(c);
                copy_literal(&mut chars, &mut out, c);
            }
            '\'' => {
                out.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push('\\'),
                        },
                        '"' => out.push_str("\\\""),
                        '\'' => break,
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            '=' | '!' if chars.peek() == Some(&'=') => {
                chars.next();
                out.push(c);
                out.push('=');
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }

    out
}

fn copy_literal(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
    quote: char,
) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == quote {
            return;
        }
    }
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn clamp_index(index: INT, len: usize) -> usize {
    if index < 0 {
        0
    } else {
        (index as usize).min(len)
    }
}

/// Title-case every word: first character upper case, the rest lower case.
pub fn to_title_case(s: &str) -> String {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| Regex::new(r"\w\S*").expect("word pattern is valid"));

    word.replace_all(s, |caps: &regex::Captures<'_>| {
        let mut chars = caps[0].chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    })
    .into_owned()
}

/// Register JavaScript-style string helpers on `engine`.
pub fn register_helpers(engine: &mut Engine) {
    engine
        .register_fn("toLowerCase", |s: &str| s.to_lowercase())
        .register_fn("toUpperCase", |s: &str| s.to_uppercase())
        .register_fn("trim", |s: &str| s.trim().to_string())
        .register_fn("startsWith", |s: &str, prefix: &str| s.starts_with(prefix))
        .register_fn("endsWith", |s: &str, suffix: &str| s.ends_with(suffix))
        .register_fn("includes", |s: &str, needle: &str| s.contains(needle))
        .register_fn("indexOf", |s: &str, needle: &str| -> INT {
            match s.find(needle) {
                Some(byte_idx) => s[..byte_idx].chars().count() as INT,
                None => -1,
            }
        })
        .register_fn("substring", |s: &str, start: INT| -> String {
            let len = s.chars().count();
            char_slice(s, clamp_index(start, len), len)
        })
        .register_fn("substring", |s: &str, start: INT, end: INT| -> String {
            let len = s.chars().count();
            let (a, b) = (clamp_index(start, len), clamp_index(end, len));
            char_slice(s, a.min(b), a.max(b))
        })
        .register_fn("charAt", |s: &str, index: INT| -> String {
            let len = s.chars().count();
            let i = clamp_index(index, len);
            char_slice(s, i, i + 1)
        })
        .register_fn("toTitleCase", |s: &str| to_title_case(s))
        .register_fn("toString", |value: Dynamic| value.to_string())
        .register_fn("parseInt", |s: &str| -> Dynamic {
            s.trim()
                .parse::<INT>()
                .map(Dynamic::from)
                .unwrap_or(Dynamic::UNIT)
        })
        .register_fn("parseFloat", |s: &str| -> Dynamic {
            s.trim()
                .parse::<FLOAT>()
                .map(Dynamic::from)
                .unwrap_or(Dynamic::UNIT)
        })
        .register_get("length", |s: &mut ImmutableString| s.chars().count() as INT)
        .register_fn("Boolean", |value: Dynamic| is_truthy(&value));
}

/// JavaScript `Number(s)` for a string operand: blank is zero, anything
/// unparseable is NaN.
fn js_number(s: &str) -> FLOAT {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    s.parse().unwrap_or(FLOAT::NAN)
}

/// Integer division with JavaScript results: exact quotients stay integers,
/// everything else (including division by zero) is a float.
fn js_divide(a: INT, b: INT) -> Dynamic {
    match (a.checked_rem(b), a.checked_div(b)) {
        (Some(0), Some(quotient)) => Dynamic::from(quotient),
        _ => Dynamic::from(a as FLOAT / b as FLOAT),
    }
}

/// Integer remainder; a zero divisor gives NaN.
fn js_remainder(a: INT, b: INT) -> Dynamic {
    match a.checked_rem(b) {
        Some(rem) => Dynamic::from(rem),
        None => Dynamic::from(a as FLOAT % b as FLOAT),
    }
}

fn register_loose_comparison(engine: &mut Engine, op: &str, cmp: fn(FLOAT, FLOAT) -> bool) {
    engine
        .register_fn(op, move |s: &str, n: INT| cmp(js_number(s), n as FLOAT))
        .register_fn(op, move |n: INT, s: &str| cmp(n as FLOAT, js_number(s)))
        .register_fn(op, move |s: &str, n: FLOAT| cmp(js_number(s), n))
        .register_fn(op, move |n: FLOAT, s: &str| cmp(n, js_number(s)));
}

/// Override arithmetic and comparison operators with JavaScript number
/// semantics.
///
/// * `/` and `%` on two integers never truncate or fault on a zero divisor
/// * `==`, `!=`, `<`, `<=`, `>`, `>=` between a string and a number compare
///   numerically after converting the string
///
/// `&&`, `||` and `!` cannot be overloaded and still require booleans;
/// rules wrap other operands in `Boolean(..)`.
pub fn register_operators(engine: &mut Engine) {
    // Built-in operators bypass registered overloads unless this is off
    engine.set_fast_operators(false);

    engine
        .register_fn("/", js_divide)
        .register_fn("%", js_remainder);

    register_loose_comparison(engine, "==", |a, b| a == b);
    register_loose_comparison(engine, "!=", |a, b| a != b);
    register_loose_comparison(engine, "<", |a, b| a < b);
    register_loose_comparison(engine, "<=", |a, b| a <= b);
    register_loose_comparison(engine, ">", |a, b| a > b);
    register_loose_comparison(engine, ">=", |a, b| a >= b);
}
