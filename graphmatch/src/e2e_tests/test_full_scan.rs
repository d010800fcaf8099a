//! Test that a statement with three unbound positions is rejected.

use crate::e2e_tests::helpers::{store, uri};
use crate::query::{BufferSink, GraphMatch, QueryError};
use crate::testing::CountingSource;
use crate::types::{Edge, Variable};

/// `(?s ?p ?o)` fails with an execution error before the source is touched.
#[test]
fn test_all_unbound_rejected_before_store_access() {
    let source = CountingSource::new(store(&[("a", "knows", "b")]));

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(
        Variable::new("s"),
        Variable::new("p"),
        Variable::new("o"),
    ));

    let mut sink = BufferSink::new();
    let err = query.run(&source, &mut sink).expect_err("full scan");
    assert!(matches!(err, QueryError::Execution(_)));
    assert_eq!(source.total_calls(), 0);
    assert!(sink.rows.is_empty());
    assert_eq!(sink.columns.len(), 3);
    assert_eq!(sink.finished, 1);
}

/// The rejection also precedes the ground statement checks.
#[test]
fn test_rejected_before_ground_checks() {
    let source = CountingSource::new(store(&[("a", "knows", "b")]));

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("knows"), uri("b")));
    query.add_edge(Edge::new(
        Variable::new("s"),
        Variable::new("p"),
        Variable::new("o"),
    ));

    let mut sink = BufferSink::new();
    let err = query.run(&source, &mut sink).expect_err("full scan");
    assert!(matches!(err, QueryError::Execution(_)));
    assert_eq!(source.contains_calls(), 0);
    assert_eq!(source.total_calls(), 0);
}

/// Three variables are fine once an earlier statement binds one of them.
#[test]
fn test_three_variables_after_binding() {
    let source = CountingSource::new(store(&[
        ("a", "type", "Person"),
        ("a", "knows", "b"),
        ("a", "likes", "c"),
    ]));
    let s = Variable::new("s");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(s.clone(), uri("type"), uri("Person")));
    query.add_edge(Edge::new(s, Variable::new("p"), Variable::new("o")));

    let mut sink = BufferSink::new();
    query.run(&source, &mut sink).expect("run");
    assert_eq!(sink.rows.len(), 3);
    assert!(source.select_calls() >= 2);
}
