//! Shared helpers for integration tests.

#![allow(clippy::expect_used, clippy::unwrap_used)]
// Not every test file uses every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use clk::{Registry, Signature, Task, TaskBody, Value};

/// Register a single capture task, parse `tokens` against the compiled
/// parser, invoke the task, and return the argument vector the body
/// received.
///
/// Panics on any failure; use [`try_run_case`] to assert on errors.
pub fn run_case(signature: &str, tokens: &[&str]) -> Vec<Value> {
    try_run_case(signature, tokens).unwrap()
}

/// Like [`run_case`], but every failure (parse, compile, match, invoke)
/// comes back as its rendered message.
pub fn try_run_case(signature: &str, tokens: &[&str]) -> Result<Vec<Value>, String> {
    let captured: Arc<Mutex<Option<Vec<Value>>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&captured);

    let mut registry = Registry::new();
    registry
        .add(Task::new(
            "capture",
            Signature::parse(signature).map_err(|e| e.to_string())?,
            TaskBody::sync(move |args| {
                *sink.lock().unwrap() = Some(args);
            }),
        ))
        .map_err(|e| e.to_string())?;

    let parser = clk::cli::make_parser(&registry).map_err(|e| e.to_string())?;
    let mut argv = vec!["clk", "capture"];
    argv.extend_from_slice(tokens);
    let matches = parser.try_get_matches_from(argv).map_err(|e| e.to_string())?;
    let (_, task_matches) = matches.subcommand().ok_or("no subcommand matched")?;

    let task = registry.get("capture").ok_or("task not registered")?;
    clk::invoke(task, task_matches).map_err(|e| e.to_string())?;

    let args = captured.lock().unwrap().take();
    args.ok_or_else(|| "task body never ran".to_string())
}
