//! Rendering of command results as JSON, YAML or tables

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::Table;
use jpx_core::Runtime;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

static JMESPATH_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// JMESPath runtime with the extended function set
pub fn get_jmespath_runtime() -> &'static Runtime {
    JMESPATH_RUNTIME.get_or_init(|| Runtime::builder().with_all_extensions().build())
}

/// Quote bare backtick literals so `` `running` `` compiles as `` `"running"` ``.
///
/// JMESPath allows elided quotes inside backticks; the compiler wants JSON.
fn normalize_backtick_literals(query: &str) -> String {
    static BACKTICK_RE: OnceLock<Regex> = OnceLock::new();
    let re = BACKTICK_RE.get_or_init(|| {
        Regex::new(r"`([^`\\]*(?:\\.[^`\\]*)*)`").expect("backtick pattern is valid")
    });

    re.replace_all(query, |caps: &regex::Captures| {
        let content = &caps[1];
        let trimmed = content.trim();

        if serde_json::from_str::<Value>(trimmed).is_ok() {
            format!("`{}`", content)
        } else {
            let escaped = trimmed.replace('\\', "\\\\").replace('"', "\\\"");
            format!("`\"{}\"`", escaped)
        }
    })
    .into_owned()
}

pub fn compile_jmespath(
    query: &str,
) -> Result<jpx_core::Expression<'static>, jpx_core::JmespathError> {
    get_jmespath_runtime().compile(&normalize_backtick_literals(query))
}

/// Apply a JMESPath query to an already serialized value
pub fn apply_query(value: Value, query: Option<&str>) -> Result<Value> {
    match query {
        Some(query_str) => {
            let expr = compile_jmespath(query_str)
                .with_context(|| format!("Invalid JMESPath expression: {}", query_str))?;
            expr.search(&value).context("JMESPath query failed")
        }
        None => Ok(value),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

pub fn print_output<T: Serialize>(
    data: T,
    format: OutputFormat,
    query: Option<&str>,
) -> Result<()> {
    let value = apply_query(serde_json::to_value(data)?, query)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&value)?),
        OutputFormat::Table => println!("{}", render_table(&value)),
    }

    Ok(())
}

/// Render a value as a table: one row per element for arrays, key/value rows for objects
pub fn render_table(value: &Value) -> String {
    match value {
        Value::Array(items) if items.iter().any(Value::is_object) => {
            let headers = column_names(items);
            let mut table = Table::new();
            table.set_header(headers.iter().map(|h| h.to_uppercase()));

            for item in items {
                let empty = Map::new();
                let obj = item.as_object().unwrap_or(&empty);
                table.add_row(
                    headers
                        .iter()
                        .map(|h| format_cell(h, obj.get(h).unwrap_or(&Value::Null))),
                );
            }
            table.to_string()
        }
        Value::Array(items) if !items.is_empty() => {
            let mut table = Table::new();
            table.set_header(vec!["VALUE"]);
            for item in items {
                table.add_row(vec![format_value(item)]);
            }
            table.to_string()
        }
        Value::Array(_) => "No results".to_string(),
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["FIELD", "VALUE"]);
            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_cell(key, val)]);
            }
            table.to_string()
        }
        other => format_value(other),
    }
}

/// Union of keys across rows, in first-seen order
fn column_names(items: &[Value]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for obj in items.iter().filter_map(Value::as_object) {
        for key in obj.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    names
}

fn format_cell(column: &str, value: &Value) -> String {
    let text = format_value(value);
    if column == "state" {
        colorize_state(&text)
    } else {
        text
    }
}

/// Colour an instance lifecycle state
pub fn colorize_state(state: &str) -> String {
    match state {
        "running" | "available" | "ok" => state.green().to_string(),
        "pending" | "stopping" | "shutting-down" | "initializing" => state.yellow().to_string(),
        "stopped" => state.dimmed().to_string(),
        "terminated" | "impaired" | "failed" => state.red().to_string(),
        _ => state.to_string(),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) if arr.iter().all(|v| !v.is_object() && !v.is_array()) => arr
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) if obj.values().all(Value::is_string) => obj
            .iter()
            .map(|(k, v)| format!("{}={}", k, format_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}
