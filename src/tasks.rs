//! Task metadata and the registry that owns it.
//!
//! A [`Task`] pairs a body with the metadata the CLI layer needs: a name,
//! an optional group, an optional display style, and a [`Signature`]. The
//! [`Registry`] keeps tasks in registration order and enforces unique full
//! names, so the generated command list is stable run over run.

use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::signature::Signature;
use crate::value::Value;

/// Whatever a task body fails with.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// What a finished task produced: an optional output value, or an error.
pub type TaskOutcome = Result<Option<Value>, TaskError>;

/// What a synchronous body hands back: a finished outcome, or asynchronous
/// work for the invocation layer to drive.
pub enum TaskReturn {
    Ready(TaskOutcome),
    Deferred(BoxFuture<'static, TaskOutcome>),
}

impl TaskReturn {
    /// Wrap a future so a synchronous body can hand back async work.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        TaskReturn::Deferred(Box::pin(future))
    }
}

impl From<()> for TaskReturn {
    fn from((): ()) -> Self {
        TaskReturn::Ready(Ok(None))
    }
}

impl From<Value> for TaskReturn {
    fn from(value: Value) -> Self {
        TaskReturn::Ready(Ok(Some(value)))
    }
}

impl From<Option<Value>> for TaskReturn {
    fn from(value: Option<Value>) -> Self {
        TaskReturn::Ready(Ok(value))
    }
}

impl From<TaskOutcome> for TaskReturn {
    fn from(outcome: TaskOutcome) -> Self {
        TaskReturn::Ready(outcome)
    }
}

/// A task implementation.
///
/// `Sync` bodies run on the calling thread and may still hand back deferred
/// asynchronous work through [`TaskReturn::Deferred`]; `Async` bodies are
/// futures from the start. Either way the invocation layer drives the work
/// to completion before returning.
pub enum TaskBody {
    Sync(Box<dyn Fn(Vec<Value>) -> TaskReturn + Send + Sync>),
    Async(Box<dyn Fn(Vec<Value>) -> BoxFuture<'static, TaskOutcome> + Send + Sync>),
}

impl TaskBody {
    /// Wrap a synchronous function. The return type converts through
    /// [`TaskReturn`], so plain `()`, a [`Value`], an `Option<Value>`, or a
    /// full outcome all work.
    pub fn sync<F, R>(body: F) -> Self
    where
        F: Fn(Vec<Value>) -> R + Send + Sync + 'static,
        R: Into<TaskReturn>,
    {
        TaskBody::Sync(Box::new(move |args| body(args).into()))
    }

    /// Wrap an asynchronous function.
    pub fn async_fn<F, Fut>(body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        TaskBody::Async(Box::new(move |args| Box::pin(body(args))))
    }
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskBody::Sync(_) => f.write_str("TaskBody::Sync"),
            TaskBody::Async(_) => f.write_str("TaskBody::Async"),
        }
    }
}

/// Derive a CLI task name from a function identifier: underscores become
/// hyphens, so `build_docs` is invoked as `build-docs`.
#[must_use]
pub fn task_name_from_ident(ident: &str) -> String {
    ident.replace('_', "-")
}

/// A registered task: a body plus the metadata the CLI layer needs.
#[derive(Debug)]
pub struct Task {
    pub name: String,
    /// Grouped tasks are invoked as `group.name`.
    pub group: Option<String>,
    /// Color for the task's name in the task table, e.g. `"cyan"`.
    pub style: Option<String>,
    pub signature: Signature,
    pub body: TaskBody,
}

impl Task {
    pub fn new(name: impl Into<String>, signature: Signature, body: TaskBody) -> Self {
        Task {
            name: name.into(),
            group: None,
            style: None,
            signature,
            body,
        }
    }

    /// Task named after a function identifier (see [`task_name_from_ident`]).
    pub fn from_fn(ident: &str, signature: Signature, body: TaskBody) -> Self {
        Self::new(task_name_from_ident(ident), signature, body)
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// The dotted `group.name`, or the bare name for ungrouped tasks.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Two registrations resolved to the same full name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task named `{0}` already exists")]
pub struct DuplicateTask(pub String);

/// An ordered collection of tasks, keyed by full name.
///
/// The registry is a plain value: build one in `main`, add tasks, and hand
/// it to [`crate::cli::run_cli`]. Iteration yields tasks in registration
/// order.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateTask`] if a task with the same full name has
    /// already been registered.
    pub fn add(&mut self, task: Task) -> Result<(), DuplicateTask> {
        let full_name = task.full_name();
        if self.index.contains_key(&full_name) {
            return Err(DuplicateTask(full_name));
        }
        self.index.insert(full_name, self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Look up a task by its full name.
    #[must_use]
    pub fn get(&self, full_name: &str) -> Option<&Task> {
        self.index
            .get(full_name)
            .and_then(|&index| self.tasks.get(index))
    }

    /// Tasks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// A registrar that fills in `group` and `style` for every task added
    /// through it. A task's own settings win over the registrar's.
    pub fn customize(&mut self) -> Customize<'_> {
        Customize {
            registry: self,
            group: None,
            style: None,
        }
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

/// Pre-binds `group`/`style` for a batch of registrations, the way a module
/// of related tasks is usually added.
pub struct Customize<'a> {
    registry: &'a mut Registry,
    group: Option<String>,
    style: Option<String>,
}

impl Customize<'_> {
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Add a task, filling in this registrar's group and style where the
    /// task didn't set its own.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateTask`] if the resolved full name is taken.
    pub fn add(&mut self, mut task: Task) -> Result<(), DuplicateTask> {
        if task.group.is_none() {
            task.group = self.group.clone();
        }
        if task.style.is_none() {
            task.style = self.style.clone();
        }
        self.registry.add(task)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    fn noop() -> TaskBody {
        TaskBody::sync(|_args| {})
    }

    #[test]
    fn test_full_name_joins_group_with_dot() {
        let task = Task::new("build", Signature::default(), noop());
        assert_eq!(task.full_name(), "build");
        let task = Task::new("build", Signature::default(), noop()).with_group("docs");
        assert_eq!(task.full_name(), "docs.build");
    }

    #[test]
    fn test_from_fn_hyphenates_identifier() {
        let task = Task::from_fn("build_docs", Signature::default(), noop());
        assert_eq!(task.name, "build-docs");
    }

    #[test]
    fn test_duplicate_full_name_is_rejected() {
        let mut registry = Registry::new();
        registry.add(Task::new("x", Signature::default(), noop())).unwrap();
        let err = registry
            .add(Task::new("x", Signature::default(), noop()))
            .unwrap_err();
        assert_eq!(err, DuplicateTask("x".to_string()));
        assert_eq!(err.to_string(), "task named `x` already exists");
    }

    #[test]
    fn test_same_name_in_different_groups_is_fine() {
        let mut registry = Registry::new();
        registry
            .add(Task::new("x", Signature::default(), noop()).with_group("a"))
            .unwrap();
        registry
            .add(Task::new("x", Signature::default(), noop()).with_group("b"))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a.x").is_some());
        assert!(registry.get("b.x").is_some());
        assert!(registry.get("x").is_none());
    }

    #[test]
    fn test_iteration_preserves_registration_order() {
        let mut registry = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.add(Task::new(name, Signature::default(), noop())).unwrap();
        }
        let names: Vec<String> = registry.iter().map(Task::full_name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_customize_fills_missing_group_and_style() {
        let mut registry = Registry::new();
        let mut docs = registry.customize().group("docs").style("cyan");
        docs.add(Task::new("build", Signature::default(), noop())).unwrap();
        docs.add(Task::new("serve", Signature::default(), noop()).with_style("red"))
            .unwrap();

        let build = registry.get("docs.build").unwrap();
        assert_eq!(build.style.as_deref(), Some("cyan"));
        let serve = registry.get("docs.serve").unwrap();
        assert_eq!(serve.style.as_deref(), Some("red"));
        assert_eq!(serve.group.as_deref(), Some("docs"));
    }
}
