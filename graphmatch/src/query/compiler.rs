//! Pattern compiler.
//!
//! Turns the edges, filters and distinctness constraints collected by
//! `GraphMatch` into an immutable `QueryPlan`:
//! - a variable table in first-seen order with a reverse lookup
//! - every pattern position resolved to a constant or a variable index
//! - ground (variable-free) statements split off into a checklist
//! - the remaining statements ordered and grouped by the scheduler
//!
//! # Invariants
//!
//! - Every `Slot::Variable` index is smaller than the variable table length.
//! - A compiled statement always holds at least one variable.
//! - At least one compiled statement is required (not optional).

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::error::{QueryError, QueryResult};
use super::scheduler::{PropertyHints, schedule};
use crate::store::LiteralFilter;
use crate::types::{Edge, Entity, Resource, Variable};

/// The three positions of a pattern statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Subject,
    Predicate,
    Object,
}

impl Position {
    pub(crate) const ALL: [Self; 3] = [Self::Subject, Self::Predicate, Self::Object];
}

/// A resolved pattern position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot {
    /// A fixed resource.
    Constant(Resource),
    /// An index into the variable table.
    Variable(usize),
}

impl Slot {
    pub(crate) const fn variable(&self) -> Option<usize> {
        match self {
            Self::Variable(index) => Some(*index),
            Self::Constant(_) => None,
        }
    }
}

/// One compiled pattern triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompiledStatement {
    pub(crate) subject: Slot,
    pub(crate) predicate: Slot,
    pub(crate) object: Slot,
    /// A non-match must not eliminate the branches that reached this statement.
    pub(crate) optional: bool,
}

impl CompiledStatement {
    pub(crate) const fn slot(&self, position: Position) -> &Slot {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    /// Count the positions holding a variable.
    pub(crate) fn num_vars(&self) -> usize {
        Position::ALL
            .iter()
            .filter(|&&p| self.slot(p).variable().is_some())
            .count()
    }

    /// Distinct variable indexes, in subject, predicate, object order.
    pub(crate) fn variables(&self) -> Vec<usize> {
        let mut variables = Vec::with_capacity(3);
        for position in Position::ALL {
            if let Some(index) = self.slot(position).variable() {
                if !variables.contains(&index) {
                    variables.push(index);
                }
            }
        }
        variables
    }

    /// Render the statement with variable names from `table`.
    pub(crate) fn describe(&self, table: &VariableTable) -> String {
        let render = |slot: &Slot| match slot {
            Slot::Constant(resource) => resource.to_string(),
            Slot::Variable(index) => table.variable(*index).to_string(),
        };
        let mut text = format!(
            "{} {} {}",
            render(&self.subject),
            render(&self.predicate),
            render(&self.object)
        );
        if self.optional {
            text.push_str(" (Optional)");
        }
        text
    }
}

/// Variables of a pattern in first-seen order, with their value filters.
#[derive(Debug, Default)]
pub(crate) struct VariableTable {
    variables: Vec<Variable>,
    index: HashMap<Variable, usize>,
    filters: Vec<Vec<Arc<dyn LiteralFilter>>>,
}

impl VariableTable {
    fn declare(&mut self, variable: &Variable) {
        if !self.index.contains_key(variable) {
            self.index.insert(variable.clone(), self.variables.len());
            self.variables.push(variable.clone());
            self.filters.push(Vec::new());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.variables.len()
    }

    pub(crate) fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub(crate) fn variable(&self, index: usize) -> &Variable {
        &self.variables[index]
    }

    pub(crate) fn index_of(&self, variable: &Variable) -> Option<usize> {
        self.index.get(variable).copied()
    }

    pub(crate) fn filters(&self, index: usize) -> &[Arc<dyn LiteralFilter>] {
        &self.filters[index]
    }

    /// Check a candidate value against the filters of variable `index`.
    ///
    /// A filtered variable only accepts literals that pass every filter.
    pub(crate) fn accepts(&self, index: usize, value: &Resource) -> bool {
        let filters = &self.filters[index];
        if filters.is_empty() {
            return true;
        }
        value
            .as_literal()
            .is_some_and(|literal| filters.iter().all(|f| f.matches(literal)))
    }
}

/// A statement without variables, checked once before the join starts.
#[derive(Debug, Clone)]
pub(crate) struct GroundFact {
    pub(crate) edge: Edge,
    pub(crate) optional: bool,
}

/// Everything `GraphMatch` accumulates before the first run.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternSetup {
    pub(crate) edges: Vec<Edge>,
    pub(crate) optional_edges: Vec<Edge>,
    pub(crate) value_filters: Vec<(Variable, Arc<dyn LiteralFilter>)>,
    pub(crate) distinct: Vec<(Variable, Variable)>,
    pub(crate) hints: PropertyHints,
}

/// The compiled, scheduled form of a pattern. Immutable once built.
#[derive(Debug)]
pub(crate) struct QueryPlan {
    pub(crate) variables: VariableTable,
    pub(crate) ground: Vec<GroundFact>,
    pub(crate) groups: Vec<Vec<CompiledStatement>>,
    pub(crate) distinct: Vec<(usize, usize)>,
    explanation: String,
}

impl QueryPlan {
    /// Compile and schedule a pattern.
    pub(crate) fn build(setup: &PatternSetup) -> QueryResult<Self> {
        let mut variables = VariableTable::default();
        for edge in setup.edges.iter().chain(&setup.optional_edges) {
            for resource in edge.positions() {
                if let Resource::Variable(variable) = resource {
                    variables.declare(variable);
                }
            }
        }

        for (variable, filter) in &setup.value_filters {
            match variables.index_of(variable) {
                Some(index) => variables.filters[index].push(Arc::clone(filter)),
                None => tracing::warn!(%variable, "value filter on a variable the pattern never uses"),
            }
        }

        let mut distinct = Vec::new();
        for (a, b) in &setup.distinct {
            if let (Some(a), Some(b)) = (variables.index_of(a), variables.index_of(b)) {
                distinct.push((a, b));
            }
        }

        let mut ground = Vec::new();
        let mut statements = Vec::new();
        let required = setup.edges.iter().map(|e| (e, false));
        let optional = setup.optional_edges.iter().map(|e| (e, true));
        for (edge, is_optional) in required.chain(optional) {
            let statement = CompiledStatement {
                subject: resolve(&edge.subject, &variables),
                predicate: resolve(&edge.predicate, &variables),
                object: resolve(&edge.object, &variables),
                optional: is_optional,
            };
            if statement.num_vars() == 0 {
                ground.push(GroundFact {
                    edge: edge.clone(),
                    optional: is_optional,
                });
            } else {
                statements.push(statement);
            }
        }

        if !statements.iter().any(|s| !s.optional) {
            return Err(QueryError::format(
                "a query must have at least one non-optional statement with a variable",
            ));
        }

        let groups = schedule(statements, variables.len(), &setup.hints);
        let mut plan = Self {
            variables,
            ground,
            groups,
            distinct,
            explanation: String::new(),
        };
        plan.explanation = plan.render_explanation();

        tracing::debug!(
            variables = plan.variables.len(),
            ground = plan.ground.len(),
            groups = plan.groups.len(),
            "compiled query plan"
        );
        Ok(plan)
    }

    pub(crate) fn explanation(&self) -> &str {
        &self.explanation
    }

    fn render_explanation(&self) -> String {
        let mut text = String::from("Query:\n");
        for fact in &self.ground {
            let _ = write!(text, " Check: {}", fact.edge);
            if fact.optional {
                text.push_str(" (Optional)");
            }
            text.push('\n');
        }
        for group in &self.groups {
            let described: Vec<String> = group.iter().map(|s| s.describe(&self.variables)).collect();
            if described.len() == 1 {
                let _ = writeln!(text, " {}", described[0]);
            } else {
                let _ = writeln!(text, " {{{}}}", described.join(" & "));
            }
        }
        text
    }
}

fn resolve(resource: &Resource, variables: &VariableTable) -> Slot {
    match resource {
        Resource::Variable(variable) => variables
            .index_of(variable)
            .map_or_else(|| Slot::Constant(resource.clone()), Slot::Variable),
        Resource::Entity(_) | Resource::Literal(_) => Slot::Constant(resource.clone()),
    }
}

/// Get the constant entity in a slot, if the slot holds one.
pub(crate) const fn constant_entity(slot: &Slot) -> Option<&Entity> {
    match slot {
        Slot::Constant(Resource::Entity(entity)) => Some(entity),
        Slot::Constant(_) | Slot::Variable(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CompareOp, NumericCompareFilter};
    use crate::types::Literal;

    fn uri(s: &str) -> Entity {
        Entity::uri(s)
    }

    #[test]
    fn test_variables_in_first_seen_order() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let z = Variable::new("z");
        let setup = PatternSetup {
            edges: vec![
                Edge::new(y.clone(), uri("http://p"), x.clone()),
                Edge::new(x.clone(), uri("http://q"), y.clone()),
            ],
            optional_edges: vec![Edge::new(x, uri("http://r"), z)],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        let names: Vec<&str> = plan.variables.variables().iter().map(Variable::name).collect();
        assert_eq!(names, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_ground_statements_split_off() {
        let x = Variable::new("x");
        let setup = PatternSetup {
            edges: vec![
                Edge::new(uri("http://a"), uri("http://p"), uri("http://b")),
                Edge::new(x, uri("http://p"), uri("http://b")),
            ],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        assert_eq!(plan.ground.len(), 1);
        assert_eq!(plan.groups.iter().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_no_required_variable_statement_is_format_error() {
        let x = Variable::new("x");
        let setup = PatternSetup {
            edges: vec![Edge::new(uri("http://a"), uri("http://p"), uri("http://b"))],
            optional_edges: vec![Edge::new(x, uri("http://p"), uri("http://b"))],
            ..PatternSetup::default()
        };
        let err = QueryPlan::build(&setup).expect_err("should fail");
        assert!(matches!(err, QueryError::Format(_)));

        let err = QueryPlan::build(&PatternSetup::default()).expect_err("should fail");
        assert!(matches!(err, QueryError::Format(_)));
    }

    #[test]
    fn test_value_filters_attach_to_variables() {
        let x = Variable::new("x");
        let age = Variable::new("age");
        let setup = PatternSetup {
            edges: vec![Edge::new(x, uri("http://age"), age.clone())],
            value_filters: vec![(
                age.clone(),
                Arc::new(NumericCompareFilter::new(18.0, CompareOp::GreaterThanOrEqual)),
            )],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        let index = plan.variables.index_of(&age).expect("age declared");
        assert_eq!(plan.variables.filters(index).len(), 1);
        assert!(plan.variables.accepts(index, &Literal::new("21").into()));
        assert!(!plan.variables.accepts(index, &Literal::new("12").into()));
        assert!(!plan.variables.accepts(index, &uri("http://a").into()));
    }

    #[test]
    fn test_explanation_lists_checks_and_groups() {
        let x = Variable::new("x");
        let e = Variable::new("e");
        let setup = PatternSetup {
            edges: vec![
                Edge::new(uri("http://a"), uri("http://p"), uri("http://b")),
                Edge::new(x.clone(), uri("http://type"), uri("http://Person")),
            ],
            optional_edges: vec![Edge::new(x, uri("http://email"), e)],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        assert_eq!(
            plan.explanation(),
            "Query:\n \
             Check: <http://a> <http://p> <http://b>\n \
             ?x <http://type> <http://Person>\n \
             ?x <http://email> ?e (Optional)\n"
        );
    }

    #[test]
    fn test_statement_variables_are_distinct() {
        let x = Variable::new("x");
        let setup = PatternSetup {
            edges: vec![Edge::new(x.clone(), uri("http://p"), x)],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        let statement = &plan.groups[0][0];
        assert_eq!(statement.num_vars(), 2);
        assert_eq!(statement.variables(), vec![0]);
    }
}
