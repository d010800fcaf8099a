//! Test distinctness constraints between variables.

use crate::e2e_tests::helpers::{rows, run, store, uri};
use crate::query::GraphMatch;
use crate::types::{Edge, Variable};

/// Two people of the same type, never the same person twice.
#[test]
fn test_make_distinct() {
    let source = store(&[
        ("a", "type", "Person"),
        ("b", "type", "Person"),
        ("c", "type", "Person"),
    ]);
    let x = Variable::new("x");
    let y = Variable::new("y");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("type"), uri("Person")));
    query.add_edge(Edge::new(y.clone(), uri("type"), uri("Person")));

    assert_eq!(run(&query, &source).rows.len(), 9);

    query.make_distinct(x.clone(), y.clone());
    let sink = run(&query, &source);
    let found = rows(&sink, &[&x, &y]);
    assert_eq!(found.len(), 6);
    assert!(found.iter().all(|row| row[0] != row[1]));
}

/// Suppressed rows do not count toward the window.
#[test]
fn test_distinct_before_window() {
    let source = store(&[("a", "type", "Person"), ("b", "type", "Person")]);
    let x = Variable::new("x");
    let y = Variable::new("y");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("type"), uri("Person")));
    query.add_edge(Edge::new(y.clone(), uri("type"), uri("Person")));
    query.make_distinct(x.clone(), y.clone());
    query.set_return_limit(5);

    let sink = run(&query, &source);
    assert_eq!(sink.rows.len(), 2);
}
