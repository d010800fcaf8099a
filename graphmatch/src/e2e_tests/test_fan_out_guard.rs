//! Test the branch limits and cancellation.

use crate::config::EngineConfig;
use crate::e2e_tests::helpers::{store, uri};
use crate::query::{BufferSink, CancellationToken, GraphMatch, QueryError};
use crate::store::MemoryStore;
use crate::types::{Edge, Variable};

fn everyone_knows_everyone(n: usize) -> MemoryStore {
    let names: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
    let mut triples = Vec::new();
    for a in &names {
        for b in &names {
            triples.push((a.as_str(), "knows", b.as_str()));
        }
    }
    store(&triples)
}

fn chain_query(config: EngineConfig) -> GraphMatch {
    let x = Variable::new("x");
    let y = Variable::new("y");
    let z = Variable::new("z");
    let mut query = GraphMatch::with_config(config);
    query.add_edge(Edge::new(x, uri("knows"), y.clone()));
    query.add_edge(Edge::new(y, uri("knows"), z));
    query
}

/// Too many live branches abort the run.
#[test]
fn test_branch_limit() {
    let source = everyone_knows_everyone(6);
    let query = chain_query(EngineConfig {
        max_branches: Some(50),
        max_batch_matches: None,
    });

    let mut sink = BufferSink::new();
    let err = query.run(&source, &mut sink).expect_err("limit");
    assert_eq!(err, QueryError::BranchLimit { limit: 50 });
    assert!(sink.rows.is_empty());
    assert_eq!(sink.finished, 1);
}

/// The same query succeeds under a generous limit.
#[test]
fn test_branch_limit_not_reached() {
    let source = everyone_knows_everyone(4);
    let query = chain_query(EngineConfig {
        max_branches: Some(1000),
        max_batch_matches: None,
    });

    let mut sink = BufferSink::new();
    query.run(&source, &mut sink).expect("run");
    assert_eq!(sink.rows.len(), 64);
}

/// A batched lookup returning too many statements aborts the run.
#[test]
fn test_batch_match_limit() {
    let source = everyone_knows_everyone(5);
    let query = chain_query(EngineConfig {
        max_branches: None,
        max_batch_matches: Some(10),
    });

    let mut sink = BufferSink::new();
    let err = query.run(&source, &mut sink).expect_err("limit");
    assert_eq!(err, QueryError::BranchLimit { limit: 10 });
    assert_eq!(sink.finished, 1);
}

/// A cancelled token stops the run and still finishes the sink.
#[test]
fn test_cancelled_run() {
    let source = everyone_knows_everyone(3);
    let query = chain_query(EngineConfig::default());
    let token = CancellationToken::new();
    token.cancel();

    let mut sink = BufferSink::new();
    let err = query
        .run_with_cancel(&source, &mut sink, &token)
        .expect_err("cancelled");
    assert_eq!(err, QueryError::Cancelled);
    assert!(sink.rows.is_empty());
    assert_eq!(sink.finished, 1);
}

/// An untouched token does not affect the run.
#[test]
fn test_uncancelled_token() {
    let source = everyone_knows_everyone(3);
    let query = chain_query(EngineConfig::default());

    let mut sink = BufferSink::new();
    query
        .run_with_cancel(&source, &mut sink, &CancellationToken::new())
        .expect("run");
    assert_eq!(sink.rows.len(), 27);
}
