//! The `GraphMatch` query object.
//!
//! A `GraphMatch` collects required and optional edges, value filters,
//! distinctness constraints and property hints. The first call to `run` or
//! `explanation` compiles them into a `QueryPlan` exactly once, even when
//! several threads race on it. Every later run reuses the plan and only
//! allocates its own branch set, so one `GraphMatch` can serve concurrent
//! runs against different sources.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use super::cancel::CancellationToken;
use super::compiler::{PatternSetup, QueryPlan};
use super::engine::{JoinEngine, reject_full_scans};
use super::error::{QueryError, QueryResult};
use super::expansion::windowed_rows;
use super::sink::{QueryResultSink, VariableBinding};
use crate::config::EngineConfig;
use crate::store::{LiteralFilter, SelectFilter, SelectableSource};
use crate::types::{Edge, Entity, Resource, Statement, StatementTemplate, Variable};

/// Namespace of the control predicates understood by `GraphMatch::from_store`.
pub const QUERY_NAMESPACE: &str = "http://purl.oclc.org/NET/rsquary/";

/// A graph-pattern query.
#[derive(Debug, Default)]
pub struct GraphMatch {
    setup: PatternSetup,
    return_start: usize,
    return_limit: Option<usize>,
    query_meta: Option<Entity>,
    config: EngineConfig,
    plan: OnceLock<Result<Arc<QueryPlan>, QueryError>>,
    compilations: AtomicUsize,
}

impl GraphMatch {
    /// Create an empty query with an unbounded configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty query with the given limits.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Build a query from a pattern stored as data.
    ///
    /// Blank nodes in the model act as variables, and so does every named
    /// entity that `query_node` lists with `select`. Options attached to
    /// `query_node` set the result window, `distinctFrom` statements between
    /// two variables become distinctness constraints, and statements in a
    /// graph declared `optional` by `query_node` become optional edges. Every
    /// other default-graph statement is a required edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be read, selects a literal, or
    /// has a `distinctFrom` statement with a literal object.
    pub fn from_store<S: SelectableSource + ?Sized>(
        model: &S,
        query_node: Option<&Entity>,
    ) -> QueryResult<Self> {
        let mut query = Self::new();
        let select = control_predicate("select");
        let start = control_predicate("returnStart");
        let limit = control_predicate("returnLimit");
        let distinct_from = control_predicate("distinctFrom");
        let optional = control_predicate("optional");

        let mut variables = PatternVariables::default();
        if let Some(node) = query_node {
            if let Some(value) = integer_option(model, node, &start)? {
                query.set_return_start(value);
            }
            if let Some(value) = integer_option(model, node, &limit)? {
                query.set_return_limit(value);
            }
            for selected in model.select_objects(node, &select)? {
                match selected {
                    Resource::Entity(entity) => variables.select(entity),
                    Resource::Literal(_) | Resource::Variable(_) => {
                        return Err(QueryError::format(format!(
                            "query variables cannot be literals, found {selected}"
                        )));
                    }
                }
            }
        }

        let mut statements = Vec::new();
        model.select(&SelectFilter::all(), &mut |statement: &Statement| {
            statements.push(statement.clone());
            true
        })?;

        for statement in &statements {
            if statement.predicate == distinct_from {
                let Resource::Entity(object) = &statement.object else {
                    return Err(QueryError::format(format!(
                        "distinctFrom cannot have a literal object: {statement}"
                    )));
                };
                if variables.is_variable(&statement.subject) && variables.is_variable(object) {
                    let a = variables.for_entity(&statement.subject);
                    let b = variables.for_entity(object);
                    query.make_distinct(a, b);
                } else {
                    tracing::warn!(%statement, "ignoring distinctFrom between non-variables");
                }
                continue;
            }
            if [&select, &start, &limit, &optional].contains(&&statement.predicate) {
                continue;
            }

            let edge = Edge::new(
                variables.resolve(&statement.subject.clone().into()),
                variables.resolve(&statement.predicate.clone().into()),
                variables.resolve(&statement.object),
            );
            if statement.meta == Entity::DefaultGraph {
                query.add_edge(edge);
            } else if let Some(node) = query_node {
                let declared = StatementTemplate {
                    subject: Some(node.clone()),
                    predicate: Some(optional.clone()),
                    object: Some(statement.meta.clone().into()),
                    meta: None,
                };
                if model.contains(&declared)? {
                    query.add_optional_edge(edge);
                }
            }
        }

        tracing::debug!(
            edges = query.setup.edges.len(),
            optional_edges = query.setup.optional_edges.len(),
            "built query from data"
        );
        Ok(query)
    }

    fn invalidate(&mut self) {
        self.plan = OnceLock::new();
    }

    /// Add a required edge.
    pub fn add_edge(&mut self, edge: Edge) {
        self.setup.edges.push(edge);
        self.invalidate();
    }

    /// Add an optional edge.
    pub fn add_optional_edge(&mut self, edge: Edge) {
        self.setup.optional_edges.push(edge);
        self.invalidate();
    }

    /// Restrict the values of `variable` to literals passing `filter`.
    pub fn add_value_filter(&mut self, variable: Variable, filter: Arc<dyn LiteralFilter>) {
        self.setup.value_filters.push((variable, filter));
        self.invalidate();
    }

    /// Suppress rows where `a` and `b` are bound to the same resource.
    pub fn make_distinct(&mut self, a: Variable, b: Variable) {
        self.setup.distinct.push((a, b));
        self.invalidate();
    }

    /// Declare `predicate` functional: one object per subject.
    pub fn add_functional_property(&mut self, predicate: Entity) {
        self.setup.hints.functional.insert(predicate);
        self.invalidate();
    }

    /// Declare `predicate` inverse functional: one subject per object.
    pub fn add_inverse_functional_property(&mut self, predicate: Entity) {
        self.setup.hints.inverse_functional.insert(predicate);
        self.invalidate();
    }

    /// Skip the first `start` rows. Negative values are treated as 0.
    pub fn set_return_start(&mut self, start: i64) {
        self.return_start = usize::try_from(start).unwrap_or(0);
    }

    #[must_use]
    pub const fn return_start(&self) -> usize {
        self.return_start
    }

    /// Deliver at most `limit` rows. Negative values mean no limit.
    pub fn set_return_limit(&mut self, limit: i64) {
        self.return_limit = usize::try_from(limit).ok();
    }

    #[must_use]
    pub const fn return_limit(&self) -> Option<usize> {
        self.return_limit
    }

    /// Only match statements in graph `meta`, or in any graph when `None`.
    pub fn set_query_meta(&mut self, meta: Option<Entity>) {
        self.query_meta = meta;
    }

    #[must_use]
    pub const fn query_meta(&self) -> Option<&Entity> {
        self.query_meta.as_ref()
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn plan(&self) -> QueryResult<Arc<QueryPlan>> {
        self.plan
            .get_or_init(|| {
                self.compilations.fetch_add(1, Ordering::Relaxed);
                QueryPlan::build(&self.setup).map(Arc::new)
            })
            .clone()
    }

    /// Number of times the pattern has been compiled.
    #[cfg(test)]
    pub(crate) fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// The result columns, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn variables(&self) -> QueryResult<Vec<Variable>> {
        Ok(self.plan()?.variables.variables().to_vec())
    }

    /// Describe the execution plan. Never fails; a pattern that does not
    /// compile is described by its error.
    #[must_use]
    pub fn explanation(&self) -> String {
        match self.plan() {
            Ok(plan) => plan.explanation().to_owned(),
            Err(err) => format!("Query could not be compiled: {err}\n"),
        }
    }

    /// Run the query against `source`, streaming rows to `sink`.
    ///
    /// A pattern that does not compile fails before the sink is touched.
    /// Otherwise `sink.init` is called first and `sink.finished` exactly
    /// once, whether the run succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid, needs a full scan, trips
    /// a configured limit, or the source fails.
    pub fn run<S, K>(&self, source: &S, sink: &mut K) -> QueryResult<()>
    where
        S: SelectableSource + ?Sized,
        K: QueryResultSink + ?Sized,
    {
        self.execute(source, sink, None)
    }

    /// Run the query, stopping with `QueryError::Cancelled` once `cancel` is set.
    ///
    /// # Errors
    ///
    /// Same as `run`, plus cancellation.
    pub fn run_with_cancel<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> QueryResult<()>
    where
        S: SelectableSource + ?Sized,
        K: QueryResultSink + ?Sized,
    {
        self.execute(source, sink, Some(cancel))
    }

    fn execute<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        cancel: Option<&CancellationToken>,
    ) -> QueryResult<()>
    where
        S: SelectableSource + ?Sized,
        K: QueryResultSink + ?Sized,
    {
        let plan = self.plan()?;
        sink.init(plan.variables.variables(), true, false);
        let result = self.deliver(&plan, source, sink, cancel);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "query failed");
        }
        sink.finished();
        result
    }

    fn deliver<S, K>(
        &self,
        plan: &QueryPlan,
        source: &S,
        sink: &mut K,
        cancel: Option<&CancellationToken>,
    ) -> QueryResult<()>
    where
        S: SelectableSource + ?Sized,
        K: QueryResultSink + ?Sized,
    {
        reject_full_scans(plan)?;

        let engine = JoinEngine::new(source, plan, self.query_meta.as_ref(), &self.config, cancel);
        if !engine.check_ground_facts()? {
            return Ok(());
        }
        let Some(branches) = engine.execute()? else {
            return Ok(());
        };

        let mut row: Vec<VariableBinding> = plan
            .variables
            .variables()
            .iter()
            .map(|variable| VariableBinding::new(variable.clone(), None))
            .collect();
        let mut delivered = 0usize;
        for values in windowed_rows(&branches, &plan.distinct, self.return_start, self.return_limit) {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(QueryError::Cancelled);
            }
            for (binding, value) in row.iter_mut().zip(values) {
                binding.target = value.cloned();
            }
            delivered += 1;
            if !sink.add(&row) {
                tracing::debug!(rows = delivered, "sink stopped delivery");
                break;
            }
        }

        tracing::debug!(branches = branches.len(), rows = delivered, "query finished");
        Ok(())
    }
}

fn control_predicate(name: &str) -> Entity {
    Entity::uri(&format!("{QUERY_NAMESPACE}{name}"))
}

/// Read an integer option of the query node. Missing, non-literal or
/// unparsable values leave the option unset.
fn integer_option<S: SelectableSource + ?Sized>(
    model: &S,
    node: &Entity,
    predicate: &Entity,
) -> QueryResult<Option<i64>> {
    let objects = model.select_objects(node, predicate)?;
    Ok(objects
        .first()
        .and_then(Resource::as_literal)
        .and_then(|literal| literal.value().trim().parse().ok()))
}

/// Variables standing in for the blank nodes and selected entities of a
/// query model.
#[derive(Debug, Default)]
struct PatternVariables {
    selected: HashSet<Entity>,
    assigned: HashMap<Entity, Variable>,
}

impl PatternVariables {
    fn select(&mut self, entity: Entity) {
        if entity.is_blank() {
            tracing::debug!(%entity, "blank nodes are always variables");
            return;
        }
        self.selected.insert(entity);
    }

    fn is_variable(&self, entity: &Entity) -> bool {
        entity.is_blank() || self.selected.contains(entity)
    }

    fn for_entity(&mut self, entity: &Entity) -> Variable {
        self.assigned
            .entry(entity.clone())
            .or_insert_with(|| {
                let name = match entity {
                    Entity::Blank(id) => format!("b{id}"),
                    Entity::Uri(uri) => uri.to_string(),
                    Entity::DefaultGraph => entity.to_string(),
                };
                Variable::new(&name)
            })
            .clone()
    }

    fn resolve(&mut self, resource: &Resource) -> Resource {
        match resource {
            Resource::Entity(entity) if self.is_variable(entity) => self.for_entity(entity).into(),
            Resource::Entity(_) | Resource::Literal(_) | Resource::Variable(_) => resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sink::BufferSink;
    use crate::store::MemoryStore;

    fn uri(s: &str) -> Entity {
        Entity::uri(&format!("http://example.org/{s}"))
    }

    #[test]
    fn test_window_setters() {
        let mut query = GraphMatch::new();
        query.set_return_start(-4);
        assert_eq!(query.return_start(), 0);
        query.set_return_start(3);
        assert_eq!(query.return_start(), 3);

        assert_eq!(query.return_limit(), None);
        query.set_return_limit(5);
        assert_eq!(query.return_limit(), Some(5));
        query.set_return_limit(-1);
        assert_eq!(query.return_limit(), None);
    }

    #[test]
    fn test_compile_error_touches_no_sink() {
        let query = GraphMatch::new();
        let mut sink = BufferSink::new();
        let err = query.run(&MemoryStore::new(), &mut sink).expect_err("empty pattern");
        assert!(matches!(err, QueryError::Format(_)));
        assert_eq!(sink.finished, 0);
        assert!(sink.columns.is_empty());
        assert!(query.explanation().starts_with("Query could not be compiled"));
        assert_eq!(query.compilations(), 1);
    }

    #[test]
    fn test_adding_edge_recompiles() {
        let mut query = GraphMatch::new();
        let x = Variable::new("x");
        query.add_edge(Edge::new(x.clone(), uri("p"), uri("o")));
        let _ = query.explanation();
        let _ = query.explanation();
        assert_eq!(query.compilations(), 1);

        query.add_optional_edge(Edge::new(x, uri("q"), Variable::new("y")));
        assert!(query.explanation().contains("(Optional)"));
        assert_eq!(query.compilations(), 2);
    }

    #[test]
    fn test_query_meta_restricts_graph() {
        let store: MemoryStore = [
            Statement::with_meta(uri("a"), uri("p"), uri("b"), uri("g1")),
            Statement::with_meta(uri("c"), uri("p"), uri("d"), uri("g2")),
        ]
        .into_iter()
        .collect();

        let x = Variable::new("x");
        let mut query = GraphMatch::new();
        query.add_edge(Edge::new(x.clone(), uri("p"), Variable::new("y")));
        query.set_query_meta(Some(uri("g2")));

        let mut sink = BufferSink::new();
        query.run(&store, &mut sink).expect("run");
        assert_eq!(sink.column(&x), vec![Some(&Resource::from(uri("c")))]);
    }
}
