//! The command-line frontend: one subcommand per registered task.
//!
//! `run_cli` is the whole composition root a task binary needs:
//!
//! ```no_run
//! use std::process::ExitCode;
//!
//! fn main() -> ExitCode {
//!     let mut registry = clk::Registry::new();
//!     // ... register tasks ...
//!     clk::cli::run_cli(&registry)
//! }
//! ```
//!
//! With no arguments it prints the task table; with `--inspect` it prints a
//! JSON description of every task; with a task name it parses the remaining
//! tokens against that task's compiled parser and invokes the body.

use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::builder::{self, CompileError};
use crate::invoke;
use crate::signature::{Annotation, ParamKind};
use crate::tasks::{Registry, Task};

const PROG: &str = "clk";

/// Build the combined parser: one subcommand per task, in registration
/// order.
///
/// The top level deliberately has no `-h` of its own; running with no
/// arguments prints the task table instead, and each task's subcommand
/// carries the usual `-h`/`--help`.
///
/// # Errors
///
/// Fails with the first task whose signature cannot be compiled.
pub fn make_parser(registry: &Registry) -> Result<Command, CompileError> {
    let mut command = Command::new(PROG)
        .disable_help_flag(true)
        .disable_help_subcommand(true)
        .subcommand_value_name("TASK")
        .subcommand_help_heading("Tasks")
        .arg(
            Arg::new("inspect")
                .long("inspect")
                .action(ArgAction::SetTrue)
                .help("Print a JSON description of every task"),
        );
    for task in registry.iter() {
        command = command.subcommand(builder::build_parser(
            Command::new(task.full_name()),
            &task.signature,
        )?);
    }
    Ok(command)
}

/// Parser for a single task, with the program name baked into usage lines.
///
/// # Errors
///
/// Same failure modes as [`make_parser`].
pub fn make_single_parser(task: &Task) -> Result<Command, CompileError> {
    let full_name = task.full_name();
    builder::build_parser(
        Command::new(full_name.clone()).bin_name(format!("{PROG} {full_name}")),
        &task.signature,
    )
}

/// Parse `std::env::args_os()` and dispatch.
pub fn run_cli(registry: &Registry) -> ExitCode {
    run_cli_from(registry, std::env::args_os())
}

/// Like [`run_cli`], but with an explicit argument vector. The first element
/// is the binary name, as in `std::env::args_os()`.
pub fn run_cli_from<I, T>(registry: &Registry, argv: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    init_tracing();

    let parser = match make_parser(registry) {
        Ok(parser) => parser,
        Err(e) => {
            report_compile_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let matches = match parser.try_get_matches_from(argv) {
        Ok(matches) => matches,
        Err(e) => return exit_for_clap_error(&e),
    };

    if matches.get_flag("inspect") {
        return print_inspect(registry);
    }

    match matches.subcommand() {
        Some((task_name, task_matches)) => run_task(registry, task_name, task_matches),
        None => print_task_table(registry),
    }
}

fn run_task(registry: &Registry, name: &str, matches: &ArgMatches) -> ExitCode {
    let Some(task) = registry.get(name) else {
        // Unreachable through the compiled parser; kept for direct callers.
        eprintln!("No task named `{name}`");
        return ExitCode::FAILURE;
    };
    debug!(task = name, "dispatching");
    match invoke::invoke(task, matches) {
        Ok(Some(value)) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_task_table(registry: &Registry) -> ExitCode {
    match render_task_table(registry) {
        Ok(table) => {
            print!("{table}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_compile_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Render the task table shown when no task is named: one row per task with
/// its usage line, names padded to a column and tinted with the task's
/// style when one was registered.
///
/// # Errors
///
/// Fails if any task's parser cannot be compiled (the usage column comes
/// from the compiled parser).
pub fn render_task_table(registry: &Registry) -> Result<String, CompileError> {
    if registry.is_empty() {
        return Ok("No tasks registered.\n".to_string());
    }

    let mut rows = Vec::with_capacity(registry.len());
    for task in registry.iter() {
        rows.push((task.full_name(), task.style.clone(), usage_line(task)?));
    }
    let width = rows.iter().map(|(name, ..)| name.len()).max().unwrap_or(0);

    let mut out = String::from("Available tasks:\n");
    for (name, style, usage) in rows {
        // Pad from the unstyled length; color codes would skew `{:<width$}`.
        let padding = " ".repeat(width - name.len());
        let shown = match style {
            Some(color) => name.as_str().color(color.as_str()).to_string(),
            None => name,
        };
        out.push_str(&format!("  {shown}{padding}  {usage}\n"));
    }
    Ok(out)
}

fn usage_line(task: &Task) -> Result<String, CompileError> {
    let mut command = make_single_parser(task)?;
    let rendered = command.render_usage().to_string();
    let usage = rendered.strip_prefix("Usage: ").unwrap_or(&rendered);
    Ok(usage.to_string())
}

/// Machine-readable description of one synthesized argument.
#[derive(Debug, Serialize)]
pub struct ArgSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    pub variadic: bool,
    /// For the extra negative flag of a `bool?` pair: the parameter it
    /// clears.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negates: Option<String>,
}

/// Machine-readable description of one task.
#[derive(Debug, Serialize)]
pub struct TaskSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub usage: String,
    pub args: Vec<ArgSchema>,
}

/// Root structure for `--inspect` output.
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub tasks: Vec<TaskSchema>,
}

/// Describe every registered task, compiled parsers included, so external
/// tooling can see exactly which options were generated.
///
/// # Errors
///
/// Fails with the first task whose signature cannot be compiled.
pub fn inspect(registry: &Registry) -> Result<InspectOutput, CompileError> {
    let mut tasks = Vec::with_capacity(registry.len());
    for task in registry.iter() {
        let mut command = make_single_parser(task)?;
        // Read the arguments before rendering: rendering builds the command,
        // which materializes the implicit --help argument.
        let args = command.get_arguments().map(|arg| arg_schema(task, arg)).collect();
        let rendered = command.render_usage().to_string();
        let usage = rendered
            .strip_prefix("Usage: ")
            .unwrap_or(&rendered)
            .to_string();

        tasks.push(TaskSchema {
            name: task.full_name(),
            group: task.group.clone(),
            style: task.style.clone(),
            usage,
            args,
        });
    }
    Ok(InspectOutput { tasks })
}

fn arg_schema(task: &Task, arg: &Arg) -> ArgSchema {
    let id = arg.get_id().to_string();
    let param = task.signature.params.iter().find(|p| p.name == id);

    let (arg_type, variadic, choices, default) = match param {
        Some(p) => (
            annotation_json_type(&p.annotation),
            p.kind == ParamKind::Variadic,
            match &p.annotation {
                Annotation::Literal(values) => values.iter().map(ToString::to_string).collect(),
                _ => Vec::new(),
            },
            p.default
                .as_ref()
                .filter(|v| !v.is_null())
                .map(ToString::to_string),
        ),
        // The negative half of a `bool?` pair has no parameter of its own.
        None => ("boolean".to_string(), false, Vec::new(), None),
    };
    let negates = match param {
        Some(_) => None,
        // Exactly one `no_` was prepended; the rest is the parameter name,
        // which may itself start with `no_`.
        None => id.strip_prefix("no_").map(str::to_string),
    };

    ArgSchema {
        name: id,
        arg_type,
        required: arg.is_required_set(),
        short: arg.get_short(),
        long: arg.get_long().map(str::to_string),
        default,
        choices,
        variadic,
        negates,
    }
}

fn annotation_json_type(annotation: &Annotation) -> String {
    match annotation {
        Annotation::Bool | Annotation::OptBool => "boolean".to_string(),
        Annotation::Int | Annotation::OptInt => "integer".to_string(),
        Annotation::Float | Annotation::OptFloat => "number".to_string(),
        Annotation::Str | Annotation::OptStr => "string".to_string(),
        Annotation::Path => "path".to_string(),
        Annotation::Literal(_) => "choice".to_string(),
        Annotation::Other(name) => name.clone(),
    }
}

fn print_inspect(registry: &Registry) -> ExitCode {
    match inspect(registry) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error serialising inspect output: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            report_compile_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_compile_error(error: &CompileError) {
    match error {
        CompileError::UnsupportedSignature { signature, reason } => {
            eprintln!("error: this task signature has no command-line mapping");
            eprintln!("  signature: {signature}");
            eprintln!("  reason: {reason}");
        }
        CompileError::Option(e) => eprintln!("error: {e}"),
    }
}

/// Usage errors exit 2, matching the conventional parser exit code; help
/// and version are successes.
fn exit_for_clap_error(error: &clap::Error) -> ExitCode {
    let _ = error.print();
    match error.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
            ExitCode::SUCCESS
        }
        _ => ExitCode::from(2),
    }
}

fn init_tracing() {
    // A host application may already have installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use crate::tasks::TaskBody;
    use crate::value::Value;

    fn noop() -> TaskBody {
        TaskBody::sync(|_args| {})
    }

    fn sample_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .add(Task::new(
                "build",
                Signature::parse("verbose: bool = false, count: int = 3").unwrap(),
                noop(),
            ))
            .unwrap();
        registry
            .add(
                Task::new("serve", Signature::parse("port: int").unwrap(), noop())
                    .with_group("docs")
                    .with_style("cyan"),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_parser_has_one_subcommand_per_task() {
        let registry = sample_registry();
        let parser = make_parser(&registry).unwrap();
        let names: Vec<&str> = parser
            .get_subcommands()
            .map(clap::Command::get_name)
            .collect();
        assert_eq!(names, ["build", "docs.serve"]);
    }

    #[test]
    fn test_task_table_lists_every_task_with_usage() {
        let registry = sample_registry();
        let table = render_task_table(&registry).unwrap();
        assert!(table.starts_with("Available tasks:"), "header missing:\n{table}");
        assert!(table.contains("build"), "task name missing:\n{table}");
        assert!(table.contains("docs.serve"), "grouped name missing:\n{table}");
        assert!(
            table.contains("clk docs.serve <PORT>"),
            "usage line missing:\n{table}"
        );
    }

    #[test]
    fn test_empty_registry_table() {
        let registry = Registry::new();
        assert_eq!(render_task_table(&registry).unwrap(), "No tasks registered.\n");
    }

    #[test]
    fn test_usage_line_strips_prefix() {
        let task = Task::new("build", Signature::parse("count: int").unwrap(), noop());
        let usage = usage_line(&task).unwrap();
        assert_eq!(usage, "clk build <COUNT>");
    }

    #[test]
    fn test_inspect_describes_flags_and_positionals() {
        let registry = sample_registry();
        let output = inspect(&registry).unwrap();
        assert_eq!(output.tasks.len(), 2);

        let build = &output.tasks[0];
        assert_eq!(build.name, "build");
        let verbose = &build.args[0];
        assert_eq!(verbose.name, "verbose");
        assert_eq!(verbose.arg_type, "boolean");
        assert_eq!(verbose.short, Some('v'));
        assert_eq!(verbose.long.as_deref(), Some("verbose"));
        let count = &build.args[1];
        assert_eq!(count.arg_type, "integer");
        assert_eq!(count.default.as_deref(), Some("3"));

        let serve = &output.tasks[1];
        assert_eq!(serve.name, "docs.serve");
        assert_eq!(serve.group.as_deref(), Some("docs"));
        assert_eq!(serve.style.as_deref(), Some("cyan"));
        assert!(serve.args[0].required);
    }

    #[test]
    fn test_inspect_marks_negative_flag_of_opt_bool_pair() {
        let mut registry = Registry::new();
        registry
            .add(Task::new(
                "toggle",
                Signature::parse("flag: bool? = none").unwrap(),
                noop(),
            ))
            .unwrap();
        let output = inspect(&registry).unwrap();
        let args = &output.tasks[0].args;
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].name, "flag");
        assert_eq!(args[0].negates, None);
        assert_eq!(args[1].name, "no_flag");
        assert_eq!(args[1].negates.as_deref(), Some("flag"));
    }

    #[test]
    fn test_inspect_schema_has_no_help_entry() {
        let registry = sample_registry();
        let output = inspect(&registry).unwrap();
        for task in &output.tasks {
            assert!(
                task.args.iter().all(|arg| arg.name != "help"),
                "implicit help leaked into `{}`",
                task.name
            );
        }
    }

    #[test]
    fn test_inspect_negative_of_already_prefixed_param() {
        let mut registry = Registry::new();
        registry
            .add(Task::new(
                "paint",
                Signature::parse("no_color: bool? = none").unwrap(),
                noop(),
            ))
            .unwrap();
        let output = inspect(&registry).unwrap();
        let args = &output.tasks[0].args;
        assert_eq!(args[0].name, "no_color");
        assert_eq!(args[0].negates, None);
        assert_eq!(args[1].name, "no_no_color");
        assert_eq!(args[1].negates.as_deref(), Some("no_color"));
    }

    #[test]
    fn test_inspect_serializes_to_json() {
        let registry = sample_registry();
        let output = inspect(&registry).unwrap();
        let json = serde_json::to_string_pretty(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["tasks"][0]["name"], "build");
        assert_eq!(parsed["tasks"][0]["args"][0]["type"], "boolean");
        // Optional fields absent rather than null.
        assert!(parsed["tasks"][0].get("group").is_none());
    }

    #[test]
    fn test_unsupported_signature_fails_parser_construction() {
        let mut registry = Registry::new();
        registry
            .add(Task::new(
                "broken",
                Signature::parse("verbose: bool").unwrap(),
                noop(),
            ))
            .unwrap();
        assert!(matches!(
            make_parser(&registry),
            Err(CompileError::UnsupportedSignature { .. })
        ));
    }

    #[test]
    fn test_result_value_round_trip_through_dispatch() {
        let mut registry = Registry::new();
        registry
            .add(Task::new(
                "double",
                Signature::parse("n: int").unwrap(),
                TaskBody::sync(|args: Vec<Value>| {
                    Value::Int(args[0].as_int().unwrap_or(0) * 2)
                }),
            ))
            .unwrap();
        let parser = make_parser(&registry).unwrap();
        let matches = parser.try_get_matches_from(["clk", "double", "21"]).unwrap();
        let (name, task_matches) = matches.subcommand().unwrap();
        let task = registry.get(name).unwrap();
        let result = invoke::invoke(task, task_matches).unwrap();
        assert_eq!(result, Some(Value::Int(42)));
    }
}
