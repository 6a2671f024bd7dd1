//! The `each` helper: one registration per data row.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::callable::{Invoke, TestBody, TestOutcome};

/// Body run once per row; receives the row as is.
pub type RowBody = Arc<dyn Fn(Value) -> TestOutcome + Send + Sync>;

/// Table-driven registration bound to one declarator mode.
#[derive(Clone)]
pub struct Table {
    invoke: Invoke,
}

impl Table {
    /// A table registering through `invoke`.
    pub fn new(invoke: Invoke) -> Self {
        Self { invoke }
    }

    /// Bind the rows to register.
    pub fn rows(&self, rows: Vec<Value>) -> Rows {
        Rows {
            invoke: self.invoke.clone(),
            rows,
        }
    }

    /// Whether both handles share the same delegate.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.invoke, &other.invoke)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Table")
    }
}

/// Rows waiting for a title template and a body.
pub struct Rows {
    invoke: Invoke,
    rows: Vec<Value>,
}

impl Rows {
    /// Register one test per row. The title is formatted per row with
    /// [`format_title`].
    pub fn register<F>(self, template: &str, body: F, timeout: Option<Duration>)
    where
        F: Fn(Value) -> TestOutcome + Send + Sync + 'static,
    {
        let body: RowBody = Arc::new(body);
        for (index, row) in self.rows.into_iter().enumerate() {
            let title = format_title(template, &row, index);
            let body = body.clone();
            (self.invoke)(&title, TestBody::new(move || body(row)), timeout);
        }
    }
}

/// Format a row title.
///
/// Array rows feed positional placeholders in order; any other row is a
/// single positional argument. Supported: `%s` (display), `%d` (number),
/// `%i` (integer), `%p` / `%j` / `%o` (JSON), `%#` (row index), `%%`, and
/// `$field` for object rows.
pub fn format_title(template: &str, row: &Value, index: usize) -> String {
    let mut args = match row {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    }
    .into_iter();

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' => match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some('#') => {
                    chars.next();
                    out.push_str(&index.to_string());
                }
                Some(spec @ ('s' | 'd' | 'i' | 'p' | 'j' | 'o')) => {
                    chars.next();
                    match args.next() {
                        Some(value) => out.push_str(&render(spec, value)),
                        None => {
                            out.push('%');
                            out.push(spec);
                        }
                    }
                }
                _ => out.push('%'),
            },
            '$' if row.is_object() => {
                let mut field = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        field.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match row.get(field.as_str()) {
                    Some(value) if !field.is_empty() => out.push_str(&display(value)),
                    _ => {
                        out.push('$');
                        out.push_str(&field);
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn render(spec: char, value: &Value) -> String {
    match spec {
        's' => display(value),
        'd' => match value.as_f64() {
            Some(_) => value.to_string(),
            None => "NaN".to_string(),
        },
        'i' => match value.as_f64() {
            Some(n) => (n.trunc() as i64).to_string(),
            None => "NaN".to_string(),
        },
        _ => value.to_string(),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
