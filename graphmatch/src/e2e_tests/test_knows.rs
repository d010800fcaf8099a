//! Test the basic two-variable pattern.

use std::collections::BTreeSet;

use crate::e2e_tests::helpers::{res, row_set, run, store, uri};
use crate::query::GraphMatch;
use crate::types::{Edge, Variable};

/// Pattern `(?x knows ?y)` against `{(a knows b), (a knows c)}`.
///
/// Expected: exactly the rows `{x=a, y=b}` and `{x=a, y=c}`.
#[test]
fn test_knows_pair() {
    let source = store(&[("a", "knows", "b"), ("a", "knows", "c")]);
    let x = Variable::new("x");
    let y = Variable::new("y");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("knows"), y.clone()));

    let sink = run(&query, &source);
    assert_eq!(sink.columns, vec![x.clone(), y.clone()]);
    assert!(sink.distinct);
    assert!(!sink.ordered);
    assert_eq!(sink.rows.len(), 2);

    let expected: BTreeSet<_> = [
        vec![Some(res("a")), Some(res("b"))],
        vec![Some(res("a")), Some(res("c"))],
    ]
    .into_iter()
    .collect();
    assert_eq!(row_set(&sink, &[&x, &y]), expected);
}

/// A pattern that matches nothing produces no rows but still finishes.
#[test]
fn test_no_match_is_empty_not_error() {
    let source = store(&[("a", "knows", "b")]);
    let x = Variable::new("x");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x, uri("likes"), uri("b")));

    let sink = run(&query, &source);
    assert!(sink.rows.is_empty());
}

/// Running twice against the same source gives the same rows.
#[test]
fn test_repeated_runs_agree() {
    let source = store(&[
        ("a", "knows", "b"),
        ("a", "knows", "c"),
        ("b", "knows", "c"),
        ("c", "knows", "a"),
    ]);
    let x = Variable::new("x");
    let y = Variable::new("y");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("knows"), y.clone()));

    let first = run(&query, &source);
    let second = run(&query, &source);
    assert_eq!(first.rows, second.rows);
    assert_eq!(row_set(&first, &[&x, &y]).len(), 4);
}
