// Life of a query:
// 1. Edges, filters and hints are collected on a `GraphMatch`
// 2. First use compiles them, exactly once:
//     - Variable table and slot resolution
//     - Ground statements split into a checklist
//     - Greedy scheduling into statement groups
// 3. Each run:
//     - Checks the ground statements against the source
//     - Joins the groups one by one into a branch set
//     - Expands the surviving branches into rows
//     - Streams the windowed rows to the sink
//
// System components:
//  - Resource model
//  - Source contract and in-memory store
//  - Compiler, scheduler and join engine

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
mod e2e_tests;
pub mod query;
pub mod store;
#[cfg(test)]
mod testing;
pub mod types;

pub use config::{ConfigError, EngineConfig};
pub use query::{
    BufferSink, CancellationToken, GraphMatch, QueryError, QueryResult, QueryResultSink,
    VariableBinding, substitute,
};
