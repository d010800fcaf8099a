//! Test the `return_start` / `return_limit` window.

use crate::e2e_tests::helpers::{rows, run, store, uri};
use crate::query::GraphMatch;
use crate::types::{Edge, Variable};

fn five_friends() -> crate::store::MemoryStore {
    store(&[
        ("a", "knows", "b"),
        ("a", "knows", "c"),
        ("a", "knows", "d"),
        ("a", "knows", "e"),
        ("a", "knows", "f"),
    ])
}

/// Given 5 matching rows, start=2 and limit=2 yield rows 3 and 4.
#[test]
fn test_window_start_and_limit() {
    let source = five_friends();
    let y = Variable::new("y");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("knows"), y.clone()));
    let all = rows(&run(&query, &source), &[&y]);
    assert_eq!(all.len(), 5);

    query.set_return_start(2);
    query.set_return_limit(2);
    let windowed = rows(&run(&query, &source), &[&y]);
    assert_eq!(windowed, all[2..4].to_vec());

    // Same input, same rows.
    assert_eq!(rows(&run(&query, &source), &[&y]), windowed);
}

/// A start past the end yields nothing; a zero limit yields nothing.
#[test]
fn test_window_edges() {
    let source = five_friends();
    let y = Variable::new("y");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("knows"), y));

    query.set_return_start(10);
    assert!(run(&query, &source).rows.is_empty());

    query.set_return_start(0);
    query.set_return_limit(0);
    assert!(run(&query, &source).rows.is_empty());

    query.set_return_limit(-1);
    assert_eq!(run(&query, &source).rows.len(), 5);

    query.set_return_start(-3);
    query.set_return_limit(3);
    assert_eq!(run(&query, &source).rows.len(), 3);
}
