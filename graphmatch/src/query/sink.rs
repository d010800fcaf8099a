//! Result sinks.
//!
//! A run reports its results through the `QueryResultSink` protocol:
//! `init` once with the column variables, `add` once per row, and
//! `finished` exactly once on every path that reached `init`.

use serde::Serialize;

use crate::types::{Edge, Entity, Resource, Statement, Variable};

/// One column of a result row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariableBinding {
    pub variable: Variable,
    /// `None` when the variable is unbound in this row.
    pub target: Option<Resource>,
}

impl VariableBinding {
    #[must_use]
    pub const fn new(variable: Variable, target: Option<Resource>) -> Self {
        Self { variable, target }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.variable.name()
    }
}

/// Receives the rows of a query run.
pub trait QueryResultSink {
    /// Called once before any row with the result columns.
    fn init(&mut self, _variables: &[Variable], _distinct: bool, _ordered: bool) {}

    /// Deliver one row. Returning `false` stops delivery of further rows.
    fn add(&mut self, row: &[VariableBinding]) -> bool;

    /// Called once when the run is over, including failed runs.
    fn finished(&mut self) {}

    fn add_comments(&mut self, _comments: &str) {}
}

/// A sink that keeps everything it receives.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub columns: Vec<Variable>,
    pub distinct: bool,
    pub ordered: bool,
    pub rows: Vec<Vec<VariableBinding>>,
    pub comments: Vec<String>,
    /// Number of `finished` calls received.
    pub finished: usize,
    stop_after: Option<usize>,
}

impl BufferSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that asks the run to stop once it holds `rows` rows.
    #[must_use]
    pub fn stop_after(rows: usize) -> Self {
        Self {
            stop_after: Some(rows),
            ..Self::default()
        }
    }

    /// Get the value bound to `variable` in every row, in row order.
    #[must_use]
    pub fn column(&self, variable: &Variable) -> Vec<Option<&Resource>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .find(|binding| &binding.variable == variable)
                    .and_then(|binding| binding.target.as_ref())
            })
            .collect()
    }
}

impl QueryResultSink for BufferSink {
    fn init(&mut self, variables: &[Variable], distinct: bool, ordered: bool) {
        self.columns = variables.to_vec();
        self.distinct = distinct;
        self.ordered = ordered;
    }

    fn add(&mut self, row: &[VariableBinding]) -> bool {
        self.rows.push(row.to_vec());
        self.stop_after.is_none_or(|limit| self.rows.len() < limit)
    }

    fn finished(&mut self) {
        self.finished += 1;
    }

    fn add_comments(&mut self, comments: &str) {
        self.comments.push(comments.to_owned());
    }
}

/// Replace the variables of a template with a row's values.
///
/// `meta` defaults to the default graph. Returns `None` when a variable of
/// the template is unbound in the row, or when a literal would land in the
/// subject, predicate or meta position.
#[must_use]
pub fn substitute(
    row: &[VariableBinding],
    template: &Edge,
    meta: Option<&Resource>,
) -> Option<Statement> {
    let resolve = |resource: &Resource| -> Option<Resource> {
        match resource {
            Resource::Variable(variable) => row
                .iter()
                .find(|binding| &binding.variable == variable)?
                .target
                .clone(),
            Resource::Entity(_) | Resource::Literal(_) => Some(resource.clone()),
        }
    };
    let entity = |resource: &Resource| -> Option<Entity> {
        match resolve(resource)? {
            Resource::Entity(entity) => Some(entity),
            Resource::Literal(_) | Resource::Variable(_) => None,
        }
    };

    let meta = match meta {
        Some(meta) => entity(meta)?,
        None => Entity::DefaultGraph,
    };
    Some(Statement::with_meta(
        entity(&template.subject)?,
        entity(&template.predicate)?,
        resolve(&template.object)?,
        meta,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Literal;

    #[test]
    fn test_buffer_sink_stop_after() {
        let x = Variable::new("x");
        let mut sink = BufferSink::stop_after(2);
        sink.init(std::slice::from_ref(&x), true, false);
        let row = [VariableBinding::new(x.clone(), None)];
        assert!(sink.add(&row));
        assert!(!sink.add(&row));
        sink.finished();
        assert_eq!(sink.columns, vec![x]);
        assert_eq!(sink.rows.len(), 2);
        assert_eq!(sink.finished, 1);
        assert!(sink.distinct);
    }

    #[test]
    fn test_substitute() {
        let x = Variable::new("x");
        let name = Variable::new("name");
        let row = [
            VariableBinding::new(x.clone(), Some(Entity::uri("http://a").into())),
            VariableBinding::new(name.clone(), Some(Literal::new("Alice").into())),
        ];

        let template = Edge::new(x.clone(), Entity::uri("http://name"), name.clone());
        let statement = substitute(&row, &template, None).expect("substituted");
        assert_eq!(
            statement,
            Statement::new(
                Entity::uri("http://a"),
                Entity::uri("http://name"),
                Literal::new("Alice")
            )
        );

        let graph = Resource::from(Entity::uri("http://g"));
        let in_graph = substitute(&row, &template, Some(&graph)).expect("substituted");
        assert_eq!(in_graph.meta, Entity::uri("http://g"));

        // A literal cannot be a subject.
        let reversed = Edge::new(name, Entity::uri("http://of"), x);
        assert_eq!(substitute(&row, &reversed, None), None);

        // Unbound variable.
        let unbound = Edge::new(Variable::new("other"), Entity::uri("http://p"), Literal::new("v"));
        assert_eq!(substitute(&row, &unbound, None), None);
    }
}
