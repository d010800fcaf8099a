//! Join engine.
//!
//! Runs a compiled plan against a source, one scheduled group at a time.
//! Each statement is classified against the current `UnionBindings` and
//! joined with one of four strategies:
//! - some position multiply bound: one batched lookup over every candidate
//!   value, then per-branch pairing of candidates with matches
//! - nothing unbound: a single existence check
//! - one position unbound: one lookup whose value set is shared by every branch
//! - two positions unbound: one lookup, one new branch per branch and match
//!
//! A statement with all three positions unbound would scan the whole source
//! and is rejected with `QueryError::Execution`.
//!
//! # Invariants
//!
//! - Store access happens in a bounded number of bulk calls per statement,
//!   never once per branch.
//! - A required statement that leaves no branch ends the run with no rows.
//! - An optional statement never removes a value that reached it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::bindings::{Branch, BindingSet, SlotState, UnionBindings, ValueSet};
use super::cancel::CancellationToken;
use super::compiler::{CompiledStatement, Position, QueryPlan, Slot};
use super::error::{QueryError, QueryResult};
use super::expansion::Combinations;
use crate::config::EngineConfig;
use crate::store::{LiteralFilter, SelectFilter, SelectableSource};
use crate::types::{Edge, Entity, Resource, Statement, StatementTemplate};

/// Result of joining one statement into the branch set.
enum StepOutcome {
    /// The step produced this branch set.
    Replace(Vec<Branch>),
    /// A required statement failed; the query has no solutions.
    Fail,
}

/// Variable values a matching statement would bind, one entry per distinct variable.
type Assignment = Vec<(usize, Resource)>;

/// Reject statements that would run with all three positions unbound.
///
/// Walks the schedule with the variables each earlier statement binds, so
/// the check needs no store access.
pub(crate) fn reject_full_scans(plan: &QueryPlan) -> QueryResult<()> {
    let mut seen = vec![false; plan.variables.len()];
    for group in &plan.groups {
        for statement in group {
            let all_unbound = Position::ALL.iter().all(|&position| {
                statement
                    .slot(position)
                    .variable()
                    .is_some_and(|index| !seen[index])
            });
            if all_unbound {
                return Err(QueryError::execution(format!(
                    "statement {} would select every statement in the store",
                    statement.describe(&plan.variables)
                )));
            }
            for index in statement.variables() {
                seen[index] = true;
            }
        }
    }
    Ok(())
}

/// Executes one run of a plan against a source.
pub(crate) struct JoinEngine<'a, S: SelectableSource + ?Sized> {
    source: &'a S,
    plan: &'a QueryPlan,
    meta: Option<&'a Entity>,
    config: &'a EngineConfig,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, S: SelectableSource + ?Sized> JoinEngine<'a, S> {
    pub(crate) const fn new(
        source: &'a S,
        plan: &'a QueryPlan,
        meta: Option<&'a Entity>,
        config: &'a EngineConfig,
        cancel: Option<&'a CancellationToken>,
    ) -> Self {
        Self {
            source,
            plan,
            meta,
            config,
            cancel,
        }
    }

    fn check_cancelled(&self) -> QueryResult<()> {
        if self.cancel.is_some_and(CancellationToken::is_cancelled) {
            tracing::debug!("query cancelled");
            return Err(QueryError::Cancelled);
        }
        Ok(())
    }

    /// Check every required ground statement against the source.
    ///
    /// Returns `false` as soon as one is missing.
    pub(crate) fn check_ground_facts(&self) -> QueryResult<bool> {
        for fact in self.plan.ground.iter().filter(|f| !f.optional) {
            let present = match ground_template(&fact.edge, self.meta) {
                Some(template) => self.source.contains(&template)?,
                None => false,
            };
            if !present {
                tracing::debug!(statement = %fact.edge, "ground statement not in source");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Join every scheduled group.
    ///
    /// Returns the surviving branches, or `None` if a required statement
    /// could not be matched.
    pub(crate) fn execute(&self) -> QueryResult<Option<Vec<Branch>>> {
        let mut bindings = BindingSet::new(self.plan.variables.len(), self.plan.groups.len());
        let mut seen = vec![false; self.plan.variables.len()];

        for (group_index, group) in self.plan.groups.iter().enumerate() {
            self.check_cancelled()?;
            tracing::debug!(group = group_index, statements = group.len(), "joining group");

            for statement in group {
                let variables = statement.variables();
                let prior: Vec<usize> = variables.iter().copied().filter(|&v| seen[v]).collect();
                for index in variables {
                    seen[index] = true;
                }
                if !self.join_statement(group_index, statement, &prior, &mut bindings)? {
                    tracing::debug!(
                        group = group_index,
                        statement = %statement.describe(&self.plan.variables),
                        "required statement did not match"
                    );
                    return Ok(None);
                }
            }
        }

        let branches = bindings.into_branches();
        let groups = self.plan.groups.len();
        tracing::debug!(
            branches = branches.len(),
            complete = branches
                .iter()
                .filter(|b| (0..groups).all(|g| b.matched(g)))
                .count(),
            "join finished"
        );
        Ok(Some(branches))
    }

    /// Join one statement. Returns `false` if the query can no longer match.
    ///
    /// `prior` lists the statement's variables that an earlier statement
    /// binds. A branch missing one of them, left behind by a failed optional
    /// statement, does not take part: it is carried over unchanged when the
    /// statement is optional and dropped otherwise.
    fn join_statement(
        &self,
        group: usize,
        statement: &CompiledStatement,
        prior: &[usize],
        bindings: &mut BindingSet,
    ) -> QueryResult<bool> {
        let (branches, skipped): (Vec<Branch>, Vec<Branch>) = bindings
            .take_branches()
            .into_iter()
            .partition(|branch| branch.has_all(prior));
        if !skipped.is_empty() {
            tracing::debug!(
                group,
                skipped = skipped.len(),
                statement = %statement.describe(&self.plan.variables),
                "branches missing a prior binding"
            );
        }
        if branches.is_empty() {
            if !statement.optional {
                return Ok(false);
            }
            bindings.replace_branches(skipped);
            return Ok(true);
        }

        // Classify against the participating branches only.
        let narrowed;
        let union = if skipped.is_empty() {
            bindings.union()
        } else {
            narrowed = UnionBindings::from_branches(&branches, self.plan.variables.len());
            &narrowed
        };

        let states = Position::ALL.map(|position| union.state(statement.slot(position)));
        let multiple = states.iter().filter(|s| s.is_multiple()).count();
        let unbound = states.iter().filter(|s| s.is_unbound()).count();

        let outcome = if multiple > 0 {
            self.join_multiply_bound(group, statement, &states, branches)?
        } else {
            match unbound {
                0 => self.join_ground(group, statement, union, branches)?,
                1 => self.join_single_unbound(group, statement, union, &states, branches)?,
                2 => self.join_paired(group, statement, union, branches)?,
                _ => {
                    return Err(QueryError::execution(format!(
                        "statement {} would select every statement in the store",
                        statement.describe(&self.plan.variables)
                    )));
                }
            }
        };

        match outcome {
            StepOutcome::Fail => Ok(false),
            StepOutcome::Replace(next) if next.is_empty() && !statement.optional => Ok(false),
            StepOutcome::Replace(mut next) => {
                if statement.optional {
                    next.extend(skipped);
                }
                if let Some(limit) = self.config.max_branches {
                    if next.len() > limit {
                        return Err(branch_limit(limit));
                    }
                }
                bindings.replace_branches(next);
                Ok(true)
            }
        }
    }

    /// Some position holds several candidate values.
    fn join_multiply_bound(
        &self,
        group: usize,
        statement: &CompiledStatement,
        states: &[SlotState<'_>; 3],
        branches: Vec<Branch>,
    ) -> QueryResult<StepOutcome> {
        let filter = SelectFilter {
            subjects: alternatives(states[0]).map(entities),
            predicates: alternatives(states[1]).map(entities),
            objects: alternatives(states[2]),
            metas: self.meta.map(|m| vec![m.clone()]),
            literal_filters: self.object_filters(statement),
        };
        let matches = self.select_batch(&filter)?;
        tracing::debug!(
            group,
            strategy = "multiply-bound",
            matches = matches.len(),
            branches = branches.len(),
            "batched lookup"
        );

        if matches.is_empty() {
            return Ok(unmatched(statement, branches));
        }

        let variables = statement.variables();
        let assignments: Vec<Assignment> = matches
            .iter()
            .filter_map(|m| self.assignment(statement, m))
            .collect();

        let mut next = Vec::new();
        for branch in &branches {
            let bound: Vec<usize> = variables
                .iter()
                .copied()
                .filter(|&index| branch.binding(index).is_some())
                .collect();

            // Group this branch's confirmed matches by the values of its bound variables.
            let mut by_candidate: BTreeMap<Vec<&Resource>, Vec<&Assignment>> = BTreeMap::new();
            for assignment in &assignments {
                let Some(key) = candidate_key(branch, &bound, assignment) else {
                    continue;
                };
                by_candidate.entry(key).or_default().push(assignment);
            }

            for assignment in by_candidate.values().flatten() {
                let mut spawned = branch.clone();
                for (index, value) in assignment.iter() {
                    spawned.bind(*index, value.clone());
                }
                spawned.mark_matched(group);
                self.push_branch(&mut next, spawned)?;
            }

            if !statement.optional {
                continue;
            }

            // Keep every unmatched candidate combination as its own branch.
            let columns: Vec<Vec<&Resource>> = bound
                .iter()
                .map(|&index| branch.binding(index).map_or_else(Vec::new, |set| set.iter().collect()))
                .collect();
            for candidate in Combinations::new(columns) {
                if by_candidate.contains_key(&candidate) {
                    continue;
                }
                let mut kept = branch.clone();
                for (&index, &value) in bound.iter().zip(&candidate) {
                    kept.bind(index, value.clone());
                }
                self.push_branch(&mut next, kept)?;
            }
        }

        Ok(StepOutcome::Replace(next))
    }

    /// Every position is constant or uniquely bound.
    fn join_ground(
        &self,
        group: usize,
        statement: &CompiledStatement,
        union: &UnionBindings,
        mut branches: Vec<Branch>,
    ) -> QueryResult<StepOutcome> {
        let present = match union.materialize(statement, self.meta)? {
            Some(template) => self.source.contains(&template)?,
            None => false,
        };
        tracing::debug!(group, strategy = "existence", present, "existence check");

        if !present {
            return Ok(unmatched(statement, branches));
        }

        for branch in &mut branches {
            branch.mark_matched(group);
        }
        Ok(StepOutcome::Replace(branches))
    }

    /// Exactly one position is unbound and nothing is multiply bound.
    fn join_single_unbound(
        &self,
        group: usize,
        statement: &CompiledStatement,
        union: &UnionBindings,
        states: &[SlotState<'_>; 3],
        mut branches: Vec<Branch>,
    ) -> QueryResult<StepOutcome> {
        let Some(template) = union.materialize(statement, self.meta)? else {
            return Ok(unmatched(statement, branches));
        };
        let Some((position, index)) = Position::ALL
            .into_iter()
            .zip(states)
            .find_map(|(position, state)| match state {
                SlotState::Unbound(index) => Some((position, *index)),
                _ => None,
            })
        else {
            return Err(QueryError::internal("no unbound position in a one-unbound join"));
        };

        let mut filter = SelectFilter::from(&template);
        filter.literal_filters = self.object_filters(statement);
        let matches = self.select_batch(&filter)?;

        let values: ValueSet = matches
            .iter()
            .map(|m| position_value(m, position))
            .filter(|value| self.plan.variables.accepts(index, value))
            .collect();
        tracing::debug!(
            group,
            strategy = "one-unbound",
            matches = matches.len(),
            values = values.len(),
            "batched lookup"
        );

        if values.is_empty() {
            return Ok(unmatched(statement, branches));
        }

        let values = Arc::new(values);
        for branch in &mut branches {
            branch.bind_all(index, Arc::clone(&values));
            branch.mark_matched(group);
        }
        Ok(StepOutcome::Replace(branches))
    }

    /// Two positions are unbound; their pairing must be kept per match.
    fn join_paired(
        &self,
        group: usize,
        statement: &CompiledStatement,
        union: &UnionBindings,
        branches: Vec<Branch>,
    ) -> QueryResult<StepOutcome> {
        let Some(template) = union.materialize(statement, self.meta)? else {
            return Ok(unmatched(statement, branches));
        };
        let mut filter = SelectFilter::from(&template);
        filter.literal_filters = self.object_filters(statement);
        let matches = self.select_batch(&filter)?;

        let assignments: Vec<Assignment> = matches
            .iter()
            .filter_map(|m| self.assignment(statement, m))
            .collect();
        tracing::debug!(
            group,
            strategy = "two-unbound",
            matches = matches.len(),
            branches = branches.len(),
            "batched lookup"
        );

        if assignments.is_empty() {
            return Ok(unmatched(statement, branches));
        }

        let mut next = Vec::new();
        for branch in branches {
            for assignment in &assignments {
                let mut spawned = branch.clone();
                for (index, value) in assignment {
                    spawned.bind(*index, value.clone());
                }
                spawned.mark_matched(group);
                self.push_branch(&mut next, spawned)?;
            }
        }
        Ok(StepOutcome::Replace(next))
    }

    fn push_branch(&self, branches: &mut Vec<Branch>, branch: Branch) -> QueryResult<()> {
        if let Some(limit) = self.config.max_branches {
            if branches.len() >= limit {
                return Err(branch_limit(limit));
            }
        }
        branches.push(branch);
        Ok(())
    }

    /// Literal filters of the object variable, forwarded to the source.
    fn object_filters(&self, statement: &CompiledStatement) -> Vec<Arc<dyn LiteralFilter>> {
        match statement.object {
            Slot::Variable(index) => self.plan.variables.filters(index).to_vec(),
            Slot::Constant(_) => Vec::new(),
        }
    }

    /// Run a batched select, dropping graph tags and duplicate triples.
    fn select_batch(&self, filter: &SelectFilter) -> QueryResult<Vec<Statement>> {
        let limit = self.config.max_batch_matches;
        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        let mut streamed = 0usize;
        let mut overflow = false;

        self.source.select(filter, &mut |statement: &Statement| {
            streamed += 1;
            if limit.is_some_and(|l| streamed > l) {
                overflow = true;
                return false;
            }
            let triple = statement.without_meta();
            if seen.insert(triple.clone()) {
                matches.push(triple);
            }
            true
        })?;

        match limit {
            Some(limit) if overflow => {
                tracing::warn!(limit, "batched lookup exceeded the match limit");
                Err(branch_limit(limit))
            }
            _ => Ok(matches),
        }
    }

    /// Variable values a matching statement binds.
    ///
    /// Returns `None` when a repeated variable would take two different values
    /// or a value fails the variable's filters.
    fn assignment(&self, statement: &CompiledStatement, matched: &Statement) -> Option<Assignment> {
        let mut assignment: Assignment = Vec::with_capacity(3);
        for position in Position::ALL {
            let Some(index) = statement.slot(position).variable() else {
                continue;
            };
            let value = position_value(matched, position);
            if let Some((_, existing)) = assignment.iter().find(|(i, _)| *i == index) {
                if *existing != value {
                    return None;
                }
                continue;
            }
            if !self.plan.variables.accepts(index, &value) {
                return None;
            }
            assignment.push((index, value));
        }
        Some(assignment)
    }
}

/// Optional statements keep the branches that reached them.
fn unmatched(statement: &CompiledStatement, branches: Vec<Branch>) -> StepOutcome {
    if statement.optional {
        StepOutcome::Replace(branches)
    } else {
        StepOutcome::Fail
    }
}

fn branch_limit(limit: usize) -> QueryError {
    tracing::warn!(limit, "candidate branch limit exceeded");
    QueryError::BranchLimit { limit }
}

/// Values of `bound` in `assignment`, if the branch admits all of them.
fn candidate_key<'r>(branch: &Branch, bound: &[usize], assignment: &'r Assignment) -> Option<Vec<&'r Resource>> {
    bound
        .iter()
        .map(|&index| {
            let (_, value) = assignment.iter().find(|(i, _)| *i == index)?;
            branch
                .binding(index)
                .is_some_and(|set| set.contains(value))
                .then_some(value)
        })
        .collect()
}

/// Acceptable values of a position for a batched select. `None` is a wildcard.
fn alternatives(state: SlotState<'_>) -> Option<Vec<Resource>> {
    match state {
        SlotState::Constant(resource) | SlotState::Unique(_, resource) => Some(vec![resource.clone()]),
        SlotState::Multiple(_, values) => Some(values.iter().cloned().collect()),
        SlotState::Unbound(_) => None,
    }
}

/// Keep only the entities; literals can never be subjects or predicates.
fn entities(values: Vec<Resource>) -> Vec<Entity> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Resource::Entity(entity) => Some(entity),
            Resource::Literal(_) | Resource::Variable(_) => None,
        })
        .collect()
}

fn position_value(statement: &Statement, position: Position) -> Resource {
    match position {
        Position::Subject => statement.subject.clone().into(),
        Position::Predicate => statement.predicate.clone().into(),
        Position::Object => statement.object.clone(),
    }
}

/// Lookup template for a variable-free statement.
fn ground_template(edge: &Edge, meta: Option<&Entity>) -> Option<StatementTemplate> {
    Some(StatementTemplate {
        subject: Some(edge.subject.as_entity()?.clone()),
        predicate: Some(edge.predicate.as_entity()?.clone()),
        object: Some(edge.object.clone()),
        meta: meta.cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compiler::PatternSetup;
    use crate::store::MemoryStore;
    use crate::testing::CountingSource;
    use crate::types::{Literal, Variable};

    fn uri(s: &str) -> Entity {
        Entity::uri(&format!("http://example.org/{s}"))
    }

    fn store() -> MemoryStore {
        [
            Statement::new(uri("alice"), uri("knows"), uri("bob")),
            Statement::new(uri("alice"), uri("knows"), uri("carol")),
            Statement::new(uri("bob"), uri("knows"), uri("carol")),
            Statement::new(uri("bob"), uri("age"), Literal::new("30")),
            Statement::new(uri("carol"), uri("age"), Literal::new("25")),
            Statement::new(uri("carol"), uri("likes"), uri("carol")),
        ]
        .into_iter()
        .collect()
    }

    fn run(setup: &PatternSetup, source: &MemoryStore) -> QueryResult<Option<Vec<Branch>>> {
        let plan = QueryPlan::build(setup)?;
        let config = EngineConfig::default();
        let engine = JoinEngine::new(source, &plan, None, &config, None);
        engine.execute()
    }

    #[test]
    fn test_optional_chain_skips_branches_missing_binding() {
        // alice knows ?y . OPTIONAL ?y email ?e . OPTIONAL ?e ?p ?v
        let y = Variable::new("y");
        let e = Variable::new("e");
        let setup = PatternSetup {
            edges: vec![Edge::new(uri("alice"), uri("knows"), y.clone())],
            optional_edges: vec![
                Edge::new(y, uri("email"), e.clone()),
                Edge::new(e, Variable::new("p"), Variable::new("v")),
            ],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        reject_full_scans(&plan).expect("every statement has a prior variable");

        let source = CountingSource::new(store());
        let config = EngineConfig::default();
        let engine = JoinEngine::new(&source, &plan, None, &config, None);
        let branches = engine.execute().expect("run").expect("matched");

        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].binding(0).map(ValueSet::len), Some(2));
        assert!(branches[0].bindings()[1..].iter().all(Option::is_none));
        // The last statement never reaches the source.
        assert_eq!(source.select_calls(), 2);
    }

    #[test]
    fn test_single_unbound_shares_value_set() {
        let y = Variable::new("y");
        let setup = PatternSetup {
            edges: vec![Edge::new(uri("alice"), uri("knows"), y)],
            ..PatternSetup::default()
        };
        let branches = run(&setup, &store()).expect("run").expect("matched");
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].binding(0).map(ValueSet::len), Some(2));
        assert!(branches[0].matched(0));
    }

    #[test]
    fn test_paired_keeps_pairing() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let setup = PatternSetup {
            edges: vec![Edge::new(x, uri("knows"), y)],
            ..PatternSetup::default()
        };
        let branches = run(&setup, &store()).expect("run").expect("matched");
        assert_eq!(branches.len(), 3);
        assert!(branches.iter().all(|b| b.binding(0).map(ValueSet::len) == Some(1)));
    }

    #[test]
    fn test_repeated_variable_must_agree() {
        let x = Variable::new("x");
        let setup = PatternSetup {
            edges: vec![Edge::new(x.clone(), uri("likes"), x)],
            ..PatternSetup::default()
        };
        let branches = run(&setup, &store()).expect("run").expect("matched");
        assert_eq!(branches.len(), 1);
        assert_eq!(
            branches[0].binding(0).and_then(|s| s.first()),
            Some(&Resource::from(uri("carol")))
        );
    }

    #[test]
    fn test_multiply_bound_join() {
        // alice knows ?y . ?y age ?a
        let y = Variable::new("y");
        let a = Variable::new("a");
        let setup = PatternSetup {
            edges: vec![
                Edge::new(uri("alice"), uri("knows"), y.clone()),
                Edge::new(y, uri("age"), a),
            ],
            ..PatternSetup::default()
        };
        let branches = run(&setup, &store()).expect("run").expect("matched");
        assert_eq!(branches.len(), 2);
        assert!(branches.iter().all(|b| b.matched(0) && b.matched(1)));
    }

    #[test]
    fn test_required_miss_fails() {
        let x = Variable::new("x");
        let setup = PatternSetup {
            edges: vec![Edge::new(x, uri("hates"), uri("bob"))],
            ..PatternSetup::default()
        };
        assert_eq!(run(&setup, &store()).expect("run"), None);
    }

    #[test]
    fn test_full_scan_rejected_statically() {
        let setup = PatternSetup {
            edges: vec![Edge::new(
                Variable::new("s"),
                Variable::new("p"),
                Variable::new("o"),
            )],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        let err = reject_full_scans(&plan).expect_err("full scan");
        assert!(matches!(err, QueryError::Execution(_)));
    }

    #[test]
    fn test_branch_limit() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let setup = PatternSetup {
            edges: vec![Edge::new(x, uri("knows"), y)],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        let config = EngineConfig {
            max_branches: Some(2),
            max_batch_matches: None,
        };
        let source = store();
        let engine = JoinEngine::new(&source, &plan, None, &config, None);
        assert_eq!(engine.execute(), Err(QueryError::BranchLimit { limit: 2 }));
    }

    #[test]
    fn test_cancelled_before_first_group() {
        let y = Variable::new("y");
        let setup = PatternSetup {
            edges: vec![Edge::new(uri("alice"), uri("knows"), y)],
            ..PatternSetup::default()
        };
        let plan = QueryPlan::build(&setup).expect("build");
        let config = EngineConfig::default();
        let token = CancellationToken::new();
        token.cancel();
        let source = store();
        let engine = JoinEngine::new(&source, &plan, None, &config, Some(&token));
        assert_eq!(engine.execute(), Err(QueryError::Cancelled));
    }
}
