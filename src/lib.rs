//! # clk
//!
//! A typed task runner: register plain functions as tasks, each with a
//! typed signature, and get a complete command-line interface for free.
//! Every task becomes a subcommand with deterministic short/long options
//! derived from its parameter names, typed positionals, and `--help`; sync
//! and async bodies are driven uniformly.
//!
//! ```
//! use clk::{Registry, Signature, Task, TaskBody, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = Registry::new();
//! registry.add(Task::new(
//!     "greet",
//!     Signature::parse("name: str, shout: bool = false")?,
//!     TaskBody::sync(|args: Vec<Value>| {
//!         let mut greeting = format!("Hello, {}!", args[0]);
//!         if args[1] == Value::Bool(true) {
//!             greeting = greeting.to_uppercase();
//!         }
//!         Value::Str(greeting)
//!     }),
//! ))?;
//!
//! // In a task binary, main would end with:
//! // clk::cli::run_cli(&registry)
//! # Ok(())
//! # }
//! ```
//!
//! `greet` is now invoked as `clk greet World -s`, shows up in the task
//! table, and documents itself under `clk greet --help`.

pub mod builder;
pub mod cli;
pub mod invoke;
pub mod options;
pub mod parser;
pub mod signature;
pub mod tasks;
pub mod value;

pub use builder::{CompileError, Unsupported, build_parser};
pub use cli::{run_cli, run_cli_from};
pub use invoke::invoke;
pub use options::{OptionError, OptionPair, OptionRegistry, Polarity};
pub use parser::ParseError;
pub use signature::{Annotation, Param, ParamKind, Signature};
pub use tasks::{
    Customize, DuplicateTask, Registry, Task, TaskBody, TaskError, TaskOutcome, TaskReturn,
    task_name_from_ident,
};
pub use value::Value;
