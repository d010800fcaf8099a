//! Test that concurrent first runs share a single compilation.

use std::sync::Barrier;

use crate::e2e_tests::helpers::{store, uri};
use crate::query::{BufferSink, GraphMatch};
use crate::types::{Edge, Variable};

const THREADS: usize = 8;

/// N threads racing on the first run compile the pattern exactly once and
/// all see the same rows.
#[test]
fn test_concurrent_first_runs_compile_once() {
    let source = store(&[("a", "knows", "b"), ("a", "knows", "c"), ("b", "knows", "c")]);
    let x = Variable::new("x");
    let y = Variable::new("y");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x, uri("knows"), y));

    let barrier = Barrier::new(THREADS);
    let row_counts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    let mut sink = BufferSink::new();
                    query.run(&source, &mut sink).expect("run");
                    assert_eq!(sink.finished, 1);
                    sink.rows.len()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread panicked"))
            .collect()
    });

    assert_eq!(query.compilations(), 1);
    assert!(row_counts.iter().all(|&count| count == 3));
}

/// Concurrent runs against different sources do not interfere.
#[test]
fn test_concurrent_runs_different_sources() {
    let small = store(&[("a", "knows", "b")]);
    let large = store(&[("a", "knows", "b"), ("c", "knows", "d"), ("e", "knows", "f")]);

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(Variable::new("x"), uri("knows"), Variable::new("y")));

    std::thread::scope(|scope| {
        let first = scope.spawn(|| {
            let mut sink = BufferSink::new();
            query.run(&small, &mut sink).expect("run");
            sink.rows.len()
        });
        let second = scope.spawn(|| {
            let mut sink = BufferSink::new();
            query.run(&large, &mut sink).expect("run");
            sink.rows.len()
        });
        assert_eq!(first.join().expect("thread panicked"), 1);
        assert_eq!(second.join().expect("thread panicked"), 3);
    });
    assert_eq!(query.compilations(), 1);
}
