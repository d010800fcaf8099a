//! Test statements without variables.

use crate::e2e_tests::helpers::{res, rows, run, store, uri};
use crate::query::GraphMatch;
use crate::types::{Edge, Variable};

/// A pattern made of one ground statement missing from the source.
///
/// Expected: no `add` call and exactly one `finished` call.
#[test]
fn test_missing_ground_statement() {
    let source = store(&[("a", "knows", "b")]);
    let x = Variable::new("x");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("b"), uri("knows"), uri("a")));
    query.add_edge(Edge::new(x, uri("knows"), uri("b")));

    let sink = run(&query, &source);
    assert!(sink.rows.is_empty());
    assert_eq!(sink.finished, 1);
}

/// A ground statement present in the source does not restrict the rows.
#[test]
fn test_present_ground_statement() {
    let source = store(&[("a", "knows", "b"), ("c", "knows", "b")]);
    let x = Variable::new("x");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("knows"), uri("b")));
    query.add_edge(Edge::new(x.clone(), uri("knows"), uri("b")));

    let sink = run(&query, &source);
    let mut found: Vec<_> = rows(&sink, &[&x]);
    found.sort();
    assert_eq!(found, vec![vec![Some(res("a"))], vec![Some(res("c"))]]);
}

/// An optional ground statement that is missing does not eliminate rows.
#[test]
fn test_optional_ground_statement_is_not_required() {
    let source = store(&[("a", "knows", "b")]);
    let x = Variable::new("x");

    let mut query = GraphMatch::new();
    query.add_optional_edge(Edge::new(uri("z"), uri("knows"), uri("z")));
    query.add_edge(Edge::new(x.clone(), uri("knows"), uri("b")));

    let sink = run(&query, &source);
    assert_eq!(rows(&sink, &[&x]), vec![vec![Some(res("a"))]]);
}
