//! Test building a query from a pattern stored as statements.

use crate::e2e_tests::helpers::{res, run, store, uri};
use crate::query::{GraphMatch, QUERY_NAMESPACE, QueryError};
use crate::store::MemoryStore;
use crate::types::{Entity, Literal, Statement};

fn control(name: &str) -> Entity {
    Entity::uri(&format!("{QUERY_NAMESPACE}{name}"))
}

fn people() -> MemoryStore {
    [
        Statement::new(uri("alice"), uri("type"), uri("Person")),
        Statement::new(uri("bob"), uri("type"), uri("Person")),
        Statement::new(uri("alice"), uri("email"), Literal::new("alice@example.org")),
    ]
    .into_iter()
    .collect()
}

/// Blank nodes become variables; the optional graph becomes optional edges.
#[test]
fn test_pattern_with_optional_graph() {
    let q = uri("query");
    let person = Entity::blank();
    let email = Entity::blank();
    let optional_graph = uri("optional-part");

    let model: MemoryStore = [
        Statement::new(person.clone(), uri("type"), uri("Person")),
        Statement::with_meta(person, uri("email"), email, optional_graph.clone()),
        Statement::new(q.clone(), control("optional"), optional_graph),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, Some(&q)).expect("from_store");
    assert!(query.explanation().contains("(Optional)"));

    let sink = run(&query, &people());
    assert_eq!(sink.columns.len(), 2);
    assert_eq!(sink.rows.len(), 2);

    let person_var = &sink.columns[0];
    let mut people_found: Vec<_> = sink.column(person_var).into_iter().flatten().cloned().collect();
    people_found.sort();
    assert_eq!(people_found, vec![res("alice"), res("bob")]);
}

/// Statements in an undeclared graph are ignored; without a query node
/// there is no optional graph at all.
#[test]
fn test_undeclared_graph_ignored() {
    let person = Entity::blank();
    let model: MemoryStore = [
        Statement::new(person.clone(), uri("type"), uri("Person")),
        Statement::with_meta(person, uri("email"), Entity::blank(), uri("elsewhere")),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, None).expect("from_store");
    assert!(!query.explanation().contains("(Optional)"));
    assert_eq!(query.variables().expect("compiles").len(), 1);
}

/// Window options are read from the query node.
#[test]
fn test_window_options() {
    let q = uri("query");
    let model: MemoryStore = [
        Statement::new(Entity::blank(), uri("type"), uri("Person")),
        Statement::new(q.clone(), control("returnStart"), Literal::new("1")),
        Statement::new(q.clone(), control("returnLimit"), Literal::new("5")),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, Some(&q)).expect("from_store");
    assert_eq!(query.return_start(), 1);
    assert_eq!(query.return_limit(), Some(5));
    assert_eq!(run(&query, &people()).rows.len(), 1);
}

/// Unusable option values leave the defaults in place.
#[test]
fn test_bad_window_options() {
    let q = uri("query");
    let model: MemoryStore = [
        Statement::new(Entity::blank(), uri("type"), uri("Person")),
        Statement::new(q.clone(), control("returnStart"), uri("not-a-literal")),
        Statement::new(q.clone(), control("returnLimit"), Literal::new("many")),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, Some(&q)).expect("from_store");
    assert_eq!(query.return_start(), 0);
    assert_eq!(query.return_limit(), None);
}

/// `distinctFrom` between two blank nodes keeps them apart.
#[test]
fn test_distinct_from() {
    let a = Entity::blank();
    let b = Entity::blank();
    let model: MemoryStore = [
        Statement::new(a.clone(), uri("knows"), b.clone()),
        Statement::new(a, control("distinctFrom"), b),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, None).expect("from_store");
    let source = store(&[("x", "knows", "x"), ("x", "knows", "y")]);
    let sink = run(&query, &source);
    assert_eq!(sink.rows.len(), 1);
    assert_eq!(sink.rows[0][1].target, Some(res("y")));
}

/// `select` lists the query's variables instead of adding an edge.
#[test]
fn test_select_declares_variables() {
    let q = uri("query");
    let person = Entity::blank();
    let model: MemoryStore = [
        Statement::new(person.clone(), uri("type"), uri("Person")),
        Statement::new(q.clone(), control("select"), person),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, Some(&q)).expect("from_store");
    assert!(!query.explanation().contains("select"));

    let source = store(&[("alice", "type", "Person")]);
    let sink = run(&query, &source);
    assert_eq!(sink.rows.len(), 1);
    assert_eq!(sink.rows[0][0].target, Some(res("alice")));
}

/// A selected named entity is a variable wherever it appears.
#[test]
fn test_select_named_entity() {
    let q = uri("query");
    let who = uri("who");
    let model: MemoryStore = [
        Statement::new(who.clone(), uri("type"), uri("Person")),
        Statement::new(q.clone(), control("select"), who),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, Some(&q)).expect("from_store");
    let sink = run(&query, &people());
    assert_eq!(sink.columns.len(), 1);
    assert_eq!(sink.columns[0].name(), "http://example.org/who");
    assert_eq!(sink.rows.len(), 2);
}

#[test]
fn test_select_literal_rejected() {
    let q = uri("query");
    let model: MemoryStore = [
        Statement::new(Entity::blank(), uri("type"), uri("Person")),
        Statement::new(q.clone(), control("select"), Literal::new("x")),
    ]
    .into_iter()
    .collect();

    let err = GraphMatch::from_store(&model, Some(&q)).expect_err("literal selected");
    assert!(matches!(err, QueryError::Format(_)));
}

#[test]
fn test_distinct_from_literal_rejected() {
    let a = Entity::blank();
    let model: MemoryStore = [
        Statement::new(a.clone(), uri("knows"), Entity::blank()),
        Statement::new(a, control("distinctFrom"), Literal::new("b")),
    ]
    .into_iter()
    .collect();

    let err = GraphMatch::from_store(&model, None).expect_err("literal object");
    assert!(matches!(err, QueryError::Format(_)));
}

/// `distinctFrom` between constants is skipped, not turned into an edge.
#[test]
fn test_distinct_from_constants_ignored() {
    let a = Entity::blank();
    let model: MemoryStore = [
        Statement::new(a, uri("type"), uri("Person")),
        Statement::new(uri("alice"), control("distinctFrom"), uri("bob")),
    ]
    .into_iter()
    .collect();

    let query = GraphMatch::from_store(&model, None).expect("from_store");
    assert!(!query.explanation().contains("distinctFrom"));
    assert_eq!(run(&query, &people()).rows.len(), 2);
}
