//! Test joins where a variable already holds several candidate values.

use std::collections::BTreeSet;

use crate::e2e_tests::helpers::{lit, res, row_set, run, store, uri};
use crate::query::GraphMatch;
use crate::store::MemoryStore;
use crate::types::{Edge, Literal, Statement, Variable};

/// Friends of friends: `?x knows ?y . ?y knows ?z`.
#[test]
fn test_chain_join() {
    let source = store(&[
        ("a", "knows", "b"),
        ("a", "knows", "c"),
        ("b", "knows", "d"),
        ("c", "knows", "d"),
        ("c", "knows", "e"),
        ("e", "likes", "a"),
    ]);
    let x = Variable::new("x");
    let y = Variable::new("y");
    let z = Variable::new("z");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("knows"), y.clone()));
    query.add_edge(Edge::new(y.clone(), uri("knows"), z.clone()));

    let sink = run(&query, &source);
    let expected: BTreeSet<_> = [
        vec![Some(res("a")), Some(res("b")), Some(res("d"))],
        vec![Some(res("a")), Some(res("c")), Some(res("d"))],
        vec![Some(res("a")), Some(res("c")), Some(res("e"))],
    ]
    .into_iter()
    .collect();
    assert_eq!(row_set(&sink, &[&x, &y, &z]), expected);
    assert_eq!(sink.rows.len(), 3);
}

/// A shared value set is narrowed per value by a later statement.
#[test]
fn test_narrowing_shared_values() {
    let source: MemoryStore = [
        Statement::new(uri("a"), uri("knows"), uri("b")),
        Statement::new(uri("a"), uri("knows"), uri("c")),
        Statement::new(uri("a"), uri("knows"), uri("d")),
        Statement::new(uri("b"), uri("name"), Literal::new("Bob")),
        Statement::new(uri("d"), uri("name"), Literal::new("Dan")),
    ]
    .into_iter()
    .collect();
    let y = Variable::new("y");
    let n = Variable::new("n");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("knows"), y.clone()));
    query.add_edge(Edge::new(y.clone(), uri("name"), n.clone()));

    let sink = run(&query, &source);
    let expected: BTreeSet<_> = [
        vec![Some(res("b")), Some(lit("Bob"))],
        vec![Some(res("d")), Some(lit("Dan"))],
    ]
    .into_iter()
    .collect();
    assert_eq!(row_set(&sink, &[&y, &n]), expected);
}

/// Literal candidates can never match in the subject position.
#[test]
fn test_literal_candidates_dropped_from_subject() {
    let source: MemoryStore = [
        Statement::new(uri("a"), uri("tag"), Literal::new("x")),
        Statement::new(uri("a"), uri("tag"), uri("t1")),
        Statement::new(uri("a"), uri("tag"), uri("t2")),
        Statement::new(uri("t1"), uri("label"), Literal::new("first")),
    ]
    .into_iter()
    .collect();
    let t = Variable::new("t");
    let l = Variable::new("l");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("tag"), t.clone()));
    query.add_edge(Edge::new(t.clone(), uri("label"), l.clone()));

    let sink = run(&query, &source);
    let expected: BTreeSet<_> = [vec![Some(res("t1")), Some(lit("first"))]].into_iter().collect();
    assert_eq!(row_set(&sink, &[&t, &l]), expected);
}

/// Repeated variables must take the same value in one match.
#[test]
fn test_repeated_variable() {
    let source = store(&[
        ("a", "knows", "a"),
        ("a", "knows", "b"),
        ("b", "knows", "b"),
        ("c", "type", "Person"),
        ("a", "type", "Person"),
    ]);
    let x = Variable::new("x");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("knows"), x.clone()));

    let sink = run(&query, &source);
    let expected: BTreeSet<_> = [vec![Some(res("a"))], vec![Some(res("b"))]].into_iter().collect();
    assert_eq!(row_set(&sink, &[&x]), expected);

    // With x already narrowed to several values.
    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("type"), uri("Person")));
    query.add_edge(Edge::new(x.clone(), uri("knows"), x.clone()));
    let sink = run(&query, &source);
    assert_eq!(row_set(&sink, &[&x]), [vec![Some(res("a"))]].into_iter().collect());
}
