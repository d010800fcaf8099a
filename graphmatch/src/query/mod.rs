//! Graph-pattern queries.
//!
//! A `GraphMatch` holds a pattern of required and optional edges whose
//! positions are constants or variables. Running it against a
//! `SelectableSource` streams every binding of the variables that satisfies
//! the pattern to a `QueryResultSink`.
//!
//! # Example
//!
//! ```
//! use graphmatch::query::{BufferSink, GraphMatch};
//! use graphmatch::store::MemoryStore;
//! use graphmatch::types::{Edge, Entity, Statement, Variable};
//!
//! let knows = Entity::uri("http://example.org/knows");
//! let alice = Entity::uri("http://example.org/alice");
//! let bob = Entity::uri("http://example.org/bob");
//! let store: MemoryStore = [Statement::new(alice, knows.clone(), bob)].into_iter().collect();
//!
//! let x = Variable::new("x");
//! let y = Variable::new("y");
//! let mut query = GraphMatch::new();
//! query.add_edge(Edge::new(x, knows, y));
//!
//! let mut sink = BufferSink::new();
//! query.run(&store, &mut sink)?;
//! assert_eq!(sink.rows.len(), 1);
//! # Ok::<(), graphmatch::query::QueryError>(())
//! ```

mod bindings;
mod cancel;
mod compiler;
mod engine;
mod error;
mod expansion;
mod graph_match;
mod scheduler;
mod sink;

pub use cancel::CancellationToken;
pub use error::{QueryError, QueryResult};
pub use graph_match::{GraphMatch, QUERY_NAMESPACE};
pub use sink::{BufferSink, QueryResultSink, VariableBinding, substitute};
