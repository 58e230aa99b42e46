//! Registration, naming, grouping, and lookup behavior of the task
//! registry.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use clk::{DuplicateTask, Registry, Signature, Task, TaskBody, task_name_from_ident};

fn noop() -> TaskBody {
    TaskBody::sync(|_args| {})
}

fn named(name: &str) -> Task {
    Task::new(name, Signature::default(), noop())
}

#[test]
fn test_ident_naming_turns_underscores_into_hyphens() {
    assert_eq!(task_name_from_ident("build_docs"), "build-docs");
    assert_eq!(task_name_from_ident("clean"), "clean");
    let task = Task::from_fn("build_docs", Signature::default(), noop());
    assert_eq!(task.full_name(), "build-docs");
}

#[test]
fn test_grouped_tasks_join_with_a_dot() {
    let task = named("build").with_group("docs");
    assert_eq!(task.full_name(), "docs.build");
}

#[test]
fn test_duplicate_names_are_rejected_with_the_full_name() {
    let mut registry = Registry::new();
    registry.add(named("deploy")).unwrap();
    assert_eq!(
        registry.add(named("deploy")),
        Err(DuplicateTask("deploy".to_string()))
    );

    // Grouping disambiguates: `deploy` and `prod.deploy` coexist.
    registry.add(named("deploy").with_group("prod")).unwrap();
    assert_eq!(
        registry.add(named("deploy").with_group("prod")),
        Err(DuplicateTask("prod.deploy".to_string()))
    );
}

#[test]
fn test_lookup_is_by_full_name_only() {
    let mut registry = Registry::new();
    registry.add(named("build").with_group("docs")).unwrap();
    assert!(registry.get("docs.build").is_some());
    assert!(registry.get("build").is_none());
    assert!(registry.get("docs").is_none());
}

#[test]
fn test_registration_order_is_preserved() {
    let mut registry = Registry::new();
    for name in ["c", "a", "b"] {
        registry.add(named(name)).unwrap();
    }
    let names: Vec<String> = registry.iter().map(Task::full_name).collect();
    assert_eq!(names, ["c", "a", "b"]);
}

#[test]
fn test_customize_prefills_group_and_style() {
    let mut registry = Registry::new();
    let mut docs = registry.customize().group("docs").style("cyan");
    docs.add(named("build")).unwrap();
    docs.add(named("serve").with_style("magenta")).unwrap();
    docs.add(named("clean").with_group("ci")).unwrap();

    assert_eq!(registry.get("docs.build").unwrap().style.as_deref(), Some("cyan"));
    assert_eq!(
        registry.get("docs.serve").unwrap().style.as_deref(),
        Some("magenta")
    );
    // The task's own group won over the registrar's.
    assert!(registry.get("ci.clean").is_some());
    assert_eq!(registry.get("ci.clean").unwrap().style.as_deref(), Some("cyan"));
}

#[test]
fn test_customize_detects_duplicates_within_the_group() {
    let mut registry = Registry::new();
    let mut docs = registry.customize().group("docs");
    docs.add(named("build")).unwrap();
    assert_eq!(
        docs.add(named("build")),
        Err(DuplicateTask("docs.build".to_string()))
    );
}
