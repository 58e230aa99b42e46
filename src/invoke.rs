//! Rebuilding call arguments from parsed matches and driving task bodies.

use std::path::PathBuf;

use clap::ArgMatches;
use futures::future::BoxFuture;
use tracing::debug;

use crate::builder::negate_id;
use crate::signature::{Annotation, Param, ParamKind, Signature};
use crate::tasks::{Task, TaskBody, TaskError, TaskOutcome, TaskReturn};
use crate::value::Value;

/// Call `task` with the values parsed into `matches`.
///
/// Arguments are rebuilt in declaration order, with every token of a
/// variadic parameter spliced in at its position, so the body receives the
/// same argument vector however the values arrived on the command line.
/// Asynchronous work (an async body, or a deferred future handed back by a
/// sync body) is driven to completion on a fresh single-threaded runtime
/// before this returns.
///
/// `matches` must come from the parser compiled for this task's signature.
///
/// # Errors
///
/// Returns the error the task body produced, or a runtime construction
/// error for asynchronous work.
pub fn invoke(task: &Task, matches: &ArgMatches) -> TaskOutcome {
    let args = collect_args(&task.signature, matches)?;
    debug!(task = %task.full_name(), args = args.len(), "invoking task");
    match &task.body {
        TaskBody::Sync(body) => match body(args) {
            TaskReturn::Ready(outcome) => outcome,
            TaskReturn::Deferred(future) => block_on(future),
        },
        TaskBody::Async(body) => block_on(body(args)),
    }
}

fn block_on(future: BoxFuture<'_, TaskOutcome>) -> TaskOutcome {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

fn collect_args(signature: &Signature, matches: &ArgMatches) -> Result<Vec<Value>, TaskError> {
    let mut args = Vec::with_capacity(signature.params.len());
    for param in &signature.params {
        match param.kind {
            ParamKind::Variadic => splice_variadic(param, matches, &mut args)?,
            _ => args.push(single_value(param, matches)?),
        }
    }
    Ok(args)
}

fn splice_variadic(
    param: &Param,
    matches: &ArgMatches,
    args: &mut Vec<Value>,
) -> Result<(), TaskError> {
    match &param.annotation {
        Annotation::Path => {
            if let Some(values) = matches.get_many::<PathBuf>(&param.name) {
                args.extend(values.cloned().map(Value::Path));
            }
        }
        Annotation::Str => {
            if let Some(values) = matches.get_many::<String>(&param.name) {
                args.extend(values.cloned().map(Value::Str));
            }
        }
        _ => return Err(no_value(&param.name)),
    }
    Ok(())
}

fn single_value(param: &Param, matches: &ArgMatches) -> Result<Value, TaskError> {
    let name = param.name.as_str();
    let value = match &param.annotation {
        Annotation::Bool => Value::Bool(matches.get_flag(name)),
        Annotation::OptBool => match &param.default {
            // A concrete default degraded to a single flag at compile time.
            Some(Value::Bool(_)) => Value::Bool(matches.get_flag(name)),
            Some(Value::Null) => opt_bool_value(name, matches),
            _ => return Err(no_value(name)),
        },
        Annotation::Int => matches
            .get_one::<i64>(name)
            .copied()
            .map(Value::Int)
            .ok_or_else(|| no_value(name))?,
        Annotation::OptInt => matches
            .get_one::<i64>(name)
            .copied()
            .map_or(Value::Null, Value::Int),
        Annotation::Float => matches
            .get_one::<f64>(name)
            .copied()
            .map(Value::Float)
            .ok_or_else(|| no_value(name))?,
        Annotation::OptFloat => matches
            .get_one::<f64>(name)
            .copied()
            .map_or(Value::Null, Value::Float),
        Annotation::Str => matches
            .get_one::<String>(name)
            .cloned()
            .map(Value::Str)
            .ok_or_else(|| no_value(name))?,
        Annotation::OptStr => matches
            .get_one::<String>(name)
            .cloned()
            .map_or(Value::Null, Value::Str),
        Annotation::Literal(values) => literal_value(name, values, matches)?,
        Annotation::Path | Annotation::Other(_) => return Err(no_value(name)),
    };
    Ok(value)
}

/// An optional boolean reads its flag pair: the negative flag wins when
/// present (the pair overrides each other in the parser, so at most one is
/// set), and neither flag means the parameter stays absent.
fn opt_bool_value(name: &str, matches: &ArgMatches) -> Value {
    if matches.get_flag(&negate_id(name)) {
        Value::Bool(false)
    } else if matches.get_flag(name) {
        Value::Bool(true)
    } else {
        Value::Null
    }
}

/// Choice values are parsed as strings; integer sets are converted back so
/// the body sees the constant it declared.
fn literal_value(name: &str, values: &[Value], matches: &ArgMatches) -> Result<Value, TaskError> {
    let raw = matches
        .get_one::<String>(name)
        .ok_or_else(|| no_value(name))?;
    match values.first() {
        Some(Value::Int(_)) => Ok(Value::Int(raw.parse()?)),
        _ => Ok(Value::Str(raw.clone())),
    }
}

fn no_value(name: &str) -> TaskError {
    format!("no parsed value for parameter `{name}`").into()
}
