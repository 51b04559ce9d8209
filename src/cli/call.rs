//! `call` and `tools` subcommands

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};

use crate::mcp::protocol::ToolCallResult;
use crate::mcp::tools::Tool;
use crate::mcp::Dispatcher;

/// Output format for call results and tool listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Tool call arguments
#[derive(Args, Clone, Debug)]
pub struct CallArgs {
    /// Tool name, e.g. list_budgets
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Input arguments as JSON object
    ///
    /// Example: --input '{"window": "7d", "aggregate": "namespace"}'
    ///
    #[arg(short = 'i', long, value_name = "JSON")]
    pub input: Option<String>,

    /// Input argument as key=value (can be repeated)
    ///
    /// Values are parsed as JSON if possible, otherwise as strings.
    /// Properties the tool declares as strings are always passed as strings.
    /// Example: -a window=7d -a accumulate=true -a budgetId=123
    ///
    #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,

    /// Output format: text or json
    #[arg(short = 'o', long, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Args, Clone, Debug)]
pub struct ToolsArgs {
    /// Output format: text or json
    #[arg(short = 'o', long, default_value = "text")]
    pub output: OutputFormat,
}

/// Run a single tool call and print the envelope.
///
/// Returns whether the envelope reported an error.
pub async fn run_call(args: CallArgs, dispatcher: &Dispatcher) -> Result<bool> {
    let schema = args.tool.parse::<Tool>().ok().map(Tool::input_schema);
    let input = build_input(args.input.as_deref(), &args.args, schema.as_ref())?;

    let result = dispatcher
        .call(&args.tool, Some(input))
        .await
        .with_context(|| format!("Tool call failed: {}", args.tool))?;

    let mut stdout = std::io::stdout().lock();
    write_result(&mut stdout, &result, args.output)?;

    Ok(result.is_error)
}

/// Print the tool registry
pub fn run_tools(args: ToolsArgs) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write_tools(&mut stdout, args.output)
}

/// Build the call input from `--input` and `-a` args (args override input)
fn build_input(input: Option<&str>, args: &[String], schema: Option<&Value>) -> Result<Value> {
    let mut value = match input {
        Some(input_json) => serde_json::from_str(input_json).context("Invalid JSON in --input")?,
        None => json!({}),
    };

    if !args.is_empty() {
        value = merge_json(value, parse_args_to_json(args, schema)?);
    }

    Ok(value)
}

/// Parse KEY=VALUE pairs into a JSON object.
///
/// Keys the tool schema declares as strings keep their raw value, so
/// `-a budgetId=123` stays `"123"`.
fn parse_args_to_json(args: &[String], schema: Option<&Value>) -> Result<Value> {
    let mut obj = serde_json::Map::new();

    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid argument format: '{}'. Expected KEY=VALUE", arg))?;

        let json_value: Value = if is_string_property(schema, key) {
            Value::String(value.to_string())
        } else {
            // JSON if it parses, string otherwise
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
        };

        obj.insert(key.to_string(), json_value);
    }

    Ok(Value::Object(obj))
}

fn is_string_property(schema: Option<&Value>, key: &str) -> bool {
    schema
        .and_then(|s| s.pointer(&format!("/properties/{}/type", key)))
        .and_then(Value::as_str)
        == Some("string")
}

/// Merge two JSON objects (overlay wins)
fn merge_json(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_obj), Value::Object(overlay_obj)) => {
            for (k, v) in overlay_obj {
                base_obj.insert(k, v);
            }
            Value::Object(base_obj)
        }
        (_, overlay) => overlay,
    }
}

fn write_result(out: &mut impl Write, result: &ToolCallResult, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(result)?)?,
        OutputFormat::Text => {
            let text = result.text_content();
            if result.is_error {
                writeln!(out, "Error: {}", text)?;
            } else {
                writeln!(out, "{}", text)?;
            }
        }
    }
    Ok(())
}

fn write_tools(out: &mut impl Write, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            let tools: Vec<_> = Tool::ALL.iter().map(|tool| tool.info()).collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&tools)?)?;
        }
        OutputFormat::Text => {
            writeln!(out, "Available tools:")?;
            writeln!(out)?;
            for tool in Tool::ALL {
                writeln!(out, "  {} - {}", tool.name(), tool.description())?;
            }
            writeln!(out)?;
            writeln!(out, "Total: {} tools", Tool::ALL.len())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::*;
    use crate::test_support::MockKubecost;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_to_json() {
        let value = parse_args_to_json(&strings(&["window=7d", "accumulate=true", "intervalDay=3"]), None).unwrap();
        assert_eq!(value, json!({ "window": "7d", "accumulate": true, "intervalDay": 3 }));

        assert!(parse_args_to_json(&strings(&["window"]), None).is_err());
    }

    #[test]
    fn test_string_properties_stay_strings() {
        let schema = Tool::GetBudget.input_schema();
        let value = parse_args_to_json(&strings(&["budgetId=123"]), Some(&schema)).unwrap();
        assert_eq!(value, json!({ "budgetId": "123" }));

        let schema = Tool::CreateBudget.input_schema();
        let value = parse_args_to_json(&strings(&["name=2024", "intervalDay=3", "spendLimit=10"]), Some(&schema)).unwrap();
        assert_eq!(value, json!({ "name": "2024", "intervalDay": 3, "spendLimit": 10 }));
    }

    #[test]
    fn test_args_override_input() {
        let value = build_input(Some(r#"{"window":"30d","aggregate":"namespace"}"#), &strings(&["window=7d"]), None).unwrap();
        assert_eq!(value, json!({ "window": "7d", "aggregate": "namespace" }));
    }

    #[test]
    fn test_invalid_input_json() {
        assert!(build_input(Some("{nope"), &[], None).is_err());
        assert_eq!(build_input(None, &[], None).unwrap(), json!({}));
    }

    #[test]
    fn test_write_result_formats() {
        let mut out = Vec::new();
        write_result(&mut out, &ToolCallResult::error("boom"), OutputFormat::Text).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Error: boom\n");

        let mut out = Vec::new();
        write_result(&mut out, &ToolCallResult::text("ok"), OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["isError"], json!(false));
        assert_eq!(value["content"][0]["text"], json!("ok"));
    }

    #[test]
    fn test_write_tools_lists_all() {
        let mut out = Vec::new();
        write_tools(&mut out, OutputFormat::Text).unwrap();
        let text = String::from_utf8(out).unwrap();
        for tool in Tool::ALL {
            assert!(text.contains(tool.name()));
        }
        assert!(text.contains("Total: 8 tools"));

        let mut out = Vec::new();
        write_tools(&mut out, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_run_call_reports_error_flag() {
        let mock = MockKubecost::start().await;
        mock.on(Method::GET, "/model/budget/b1", StatusCode::NOT_FOUND, json!({}));
        let dispatcher = Dispatcher::new(mock.client());

        let args = CallArgs {
            tool: "get_budget".to_string(),
            input: None,
            args: strings(&["budgetId=b1"]),
            output: OutputFormat::Json,
        };
        assert!(run_call(args, &dispatcher).await.unwrap());

        mock.on(Method::DELETE, "/model/budget/123", StatusCode::OK, json!({}));
        let args = CallArgs {
            tool: "delete_budget".to_string(),
            input: None,
            args: strings(&["budgetId=123"]),
            output: OutputFormat::Text,
        };
        assert!(!run_call(args, &dispatcher).await.unwrap());
        assert_eq!(mock.requests().last().unwrap().path, "/model/budget/123");

        let args = CallArgs {
            tool: "get_budget".to_string(),
            input: Some("{}".to_string()),
            args: vec![],
            output: OutputFormat::Text,
        };
        assert!(run_call(args, &dispatcher).await.is_err());
    }
}
