//! CalcScript document runner.
//!
//! Splits a markdown document into front matter and fenced blocks, runs the
//! engine's three passes, and prints values to stdout with diagnostics on
//! stderr. `--json` swaps the human output for one machine-readable object.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use calcscript::{Block, CalcScript, DocumentResult, EvalOptions, Inferred};
use calcscript_core::{Severity, Value};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
CalcScript document runner

Usage: calcscript [OPTIONS] <document.md>

Options:
  --set <name=value>   Override an input for this run (repeatable)
  --json               Emit values, types and diagnostics as one JSON object
  --types              Show inferred types next to values
  --list-functions     List every standard library function and exit
  -h, --help           Show this help
";

#[derive(Default)]
struct CliOptions {
    file: Option<PathBuf>,
    json: bool,
    types: bool,
    list_functions: bool,
    overrides: Vec<(String, Value)>,
}

fn main() -> ExitCode {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "warn");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode, String> {
    let opts = parse_args(env::args().skip(1))?;
    let engine = CalcScript::with_standard_library();

    if opts.list_functions {
        for meta in engine.registry().catalog() {
            println!("calc.{}.{}  {}", meta.namespace, meta.usage, meta.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(path) = &opts.file else {
        return Err(format!("expected a document path\n\n{}", USAGE));
    };
    let text = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;

    let (front_matter, blocks) = split_document(&text);
    debug!(blocks = blocks.len(), "document split");

    let mut eval_options = EvalOptions::new(chrono::Local::now().naive_local());
    for (name, value) in opts.overrides {
        eval_options = eval_options.override_input(name, value);
    }

    let mut result = engine.run(front_matter, blocks, &eval_options);
    let file_name = path.display().to_string();
    result.diagnostics = result
        .diagnostics
        .into_iter()
        .map(|d| d.in_file(file_name.clone()))
        .collect();

    if opts.json {
        print_json(&result)?;
    } else {
        print_human(&result, opts.types);
    }

    if result.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<CliOptions, String> {
    let mut args = args;
    let mut opts = CliOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => opts.json = true,
            "--types" => opts.types = true,
            "--list-functions" => opts.list_functions = true,
            "--set" => {
                let spec = args.next().ok_or("--set needs a name=value argument")?;
                let (name, raw) = spec
                    .split_once('=')
                    .ok_or_else(|| format!("--set '{}' must look like name=value", spec))?;
                opts.overrides
                    .push((name.to_string(), parse_override_value(raw)));
            }
            "-h" | "--help" => {
                print!("{}", USAGE);
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown flag '{}'\n\n{}", other, USAGE));
            }
            path => {
                if opts.file.is_some() {
                    return Err("expected exactly one document path".to_string());
                }
                opts.file = Some(PathBuf::from(path));
            }
        }
    }
    Ok(opts)
}

/// Override values arrive as shell words. JSON scalars are taken at face
/// value; anything else rides through as text, which input coercion may
/// still promote (a bare `2024-01-05` becomes a date for a date input).
fn parse_override_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(x) => Value::Number(x),
            None => Value::Text(raw.to_string()),
        },
        Ok(serde_json::Value::Bool(b)) => Value::Bool(b),
        Ok(serde_json::Value::String(s)) => Value::Text(s),
        Ok(serde_json::Value::Null) => Value::Null,
        _ => Value::Text(raw.to_string()),
    }
}

/// Cut a markdown document into leading `---` front matter and fenced
/// blocks. Prose between fences is presentation, not program, and is
/// dropped here; block line numbers stay document-absolute so diagnostics
/// point at the real file.
fn split_document(text: &str) -> (Option<String>, Vec<Block>) {
    let lines: Vec<&str> = text.lines().collect();
    let mut cursor = 0;

    let front_matter = if lines.first().map(|l| l.trim_end()) == Some("---") {
        match lines[1..].iter().position(|l| l.trim_end() == "---") {
            Some(close) => {
                let body = lines[1..close + 1].join("\n");
                cursor = close + 2;
                Some(body)
            }
            None => None,
        }
    } else {
        None
    };

    let mut blocks = Vec::new();
    while cursor < lines.len() {
        let line = lines[cursor];
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            let lang = rest.split_whitespace().next().unwrap_or("").to_string();
            let first_content = cursor + 1;
            let mut end = first_content;
            while end < lines.len() && !lines[end].trim_start().starts_with("```") {
                end += 1;
            }
            if end == lines.len() {
                warn!(line = cursor + 1, "fence is never closed; taking the rest of the file");
            }
            let content = lines[first_content..end].join("\n");
            blocks.push(Block::new(lang, content, (first_content + 1) as u32));
            cursor = (end + 1).min(lines.len());
        } else {
            cursor += 1;
        }
    }

    (front_matter, blocks)
}

fn print_json(result: &DocumentResult) -> Result<(), String> {
    let payload = serde_json::json!({
        "values": result.values,
        "types": result.types,
        "diagnostics": result.diagnostics,
    });
    let text = serde_json::to_string_pretty(&payload)
        .map_err(|err| format!("cannot serialize result: {}", err))?;
    println!("{}", text);
    Ok(())
}

fn print_human(result: &DocumentResult, with_types: bool) {
    for diag in &result.diagnostics {
        let level = match diag.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let line = diag.line.map(|l| format!(" line {}:", l)).unwrap_or_default();
        let node = diag
            .node_name
            .as_deref()
            .map(|n| format!(" ({})", n))
            .unwrap_or_default();
        eprintln!("{}[{}]{}{} {}", level, diag.code, line, node, diag.message);
    }

    for (name, value) in &result.values {
        if with_types {
            let ty = result
                .types
                .get(name)
                .map(describe)
                .unwrap_or_else(|| "unknown".to_string());
            println!("{}: {} = {}", name, ty, value);
        } else {
            println!("{} = {}", name, value);
        }
    }
}

fn describe(ty: &Inferred) -> String {
    match ty {
        Inferred::Unknown => "unknown".to_string(),
        Inferred::Scalar { kind } => kind.to_string(),
        Inferred::Vector { kind } => format!("list of {}", kind),
        Inferred::Table { columns, .. } => format!("table of {} columns", columns.len()),
        Inferred::Object { fields } => format!("object of {} fields", fields.len()),
    }
}
