//! Test that source failures reach the caller.

use crate::e2e_tests::helpers::uri;
use crate::query::{BufferSink, GraphMatch, QueryError};
use crate::store::StoreError;
use crate::testing::FailingSource;
use crate::types::{Edge, Variable};

/// A failing select surfaces as `QueryError::Store`; the sink is still finished.
#[test]
fn test_select_failure_propagates() {
    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(Variable::new("x"), uri("knows"), uri("b")));

    let mut sink = BufferSink::new();
    let err = query.run(&FailingSource, &mut sink).expect_err("store error");
    assert_eq!(
        err,
        QueryError::Store(StoreError::Backend("source offline".to_owned()))
    );
    assert_eq!(sink.finished, 1);
}

/// A failing existence check on a ground statement surfaces the same way.
#[test]
fn test_contains_failure_propagates() {
    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("knows"), uri("b")));
    query.add_edge(Edge::new(Variable::new("x"), uri("knows"), uri("b")));

    let mut sink = BufferSink::new();
    let err = query.run(&FailingSource, &mut sink).expect_err("store error");
    assert!(matches!(err, QueryError::Store(_)));
}

/// Reading a query model from a failing source fails.
#[test]
fn test_from_store_failure() {
    let err = GraphMatch::from_store(&FailingSource, None).expect_err("store error");
    assert!(matches!(err, QueryError::Store(_)));
}
