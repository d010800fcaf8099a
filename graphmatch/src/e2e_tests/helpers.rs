//! Common helpers for end-to-end tests.

use std::collections::BTreeSet;

use crate::query::{BufferSink, GraphMatch};
use crate::store::{MemoryStore, SelectableSource};
use crate::testing::init_tracing;
use crate::types::{Entity, Literal, Resource, Statement, Variable};

/// An entity in the test namespace.
pub fn uri(name: &str) -> Entity {
    Entity::uri(&format!("http://example.org/{name}"))
}

/// A resource for an entity in the test namespace.
pub fn res(name: &str) -> Resource {
    uri(name).into()
}

pub fn lit(value: &str) -> Resource {
    Literal::new(value).into()
}

/// Build a store of entity-to-entity statements.
pub fn store(triples: &[(&str, &str, &str)]) -> MemoryStore {
    triples
        .iter()
        .map(|(s, p, o)| Statement::new(uri(s), uri(p), uri(o)))
        .collect()
}

/// Run a query, expecting success.
pub fn run<S: SelectableSource + ?Sized>(query: &GraphMatch, source: &S) -> BufferSink {
    init_tracing();
    let mut sink = BufferSink::new();
    query.run(source, &mut sink).expect("query run failed");
    assert_eq!(sink.finished, 1, "finished must be delivered exactly once");
    sink
}

/// Rows projected onto `variables`, in row order.
pub fn rows(sink: &BufferSink, variables: &[&Variable]) -> Vec<Vec<Option<Resource>>> {
    let columns: Vec<Vec<Option<&Resource>>> = variables.iter().map(|v| sink.column(v)).collect();
    (0..sink.rows.len())
        .map(|i| columns.iter().map(|column| column[i].cloned()).collect())
        .collect()
}

/// Rows projected onto `variables`, as a set.
pub fn row_set(sink: &BufferSink, variables: &[&Variable]) -> BTreeSet<Vec<Option<Resource>>> {
    rows(sink, variables).into_iter().collect()
}
