//! Test that a sink can stop delivery.

use crate::e2e_tests::helpers::{store, uri};
use crate::query::{BufferSink, GraphMatch};
use crate::types::{Edge, Variable};

/// A sink returning `false` receives no further rows but is still finished.
#[test]
fn test_sink_stops_delivery() {
    let source = store(&[
        ("a", "knows", "b"),
        ("a", "knows", "c"),
        ("a", "knows", "d"),
        ("a", "knows", "e"),
    ]);

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(Variable::new("x"), uri("knows"), Variable::new("y")));

    let mut sink = BufferSink::stop_after(2);
    query.run(&source, &mut sink).expect("run");
    assert_eq!(sink.rows.len(), 2);
    assert_eq!(sink.finished, 1);
}
