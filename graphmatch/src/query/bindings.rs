//! Candidate branches and their aggregate per-variable view.
//!
//! A `Branch` is one partial solution: for each variable it holds the set of
//! values still possible along that path, or nothing if no step has touched
//! the variable yet. Sets are shared between branches through `Arc` so that
//! splitting a branch is cheap.
//!
//! `UnionBindings` is the per-variable union across all live branches. It is
//! recomputed from the branches after every join step and is only used to
//! classify pattern positions before a step picks its strategy.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::compiler::{CompiledStatement, Position, Slot};
use super::error::{QueryError, QueryResult};
use crate::types::{Entity, Resource, StatementTemplate};

/// Values a variable may take along one branch.
pub(crate) type ValueSet = BTreeSet<Resource>;

/// One candidate partial solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Branch {
    bindings: Vec<Option<Arc<ValueSet>>>,
    matched: Vec<bool>,
}

impl Branch {
    pub(crate) fn new(num_vars: usize, num_groups: usize) -> Self {
        Self {
            bindings: vec![None; num_vars],
            matched: vec![false; num_groups],
        }
    }

    pub(crate) fn binding(&self, index: usize) -> Option<&ValueSet> {
        self.bindings[index].as_deref()
    }

    pub(crate) fn bindings(&self) -> &[Option<Arc<ValueSet>>] {
        &self.bindings
    }

    /// Pin a variable to a single value.
    pub(crate) fn bind(&mut self, index: usize, value: Resource) {
        self.bindings[index] = Some(Arc::new(BTreeSet::from([value])));
    }

    /// Share a value set with this branch.
    pub(crate) fn bind_all(&mut self, index: usize, values: Arc<ValueSet>) {
        self.bindings[index] = Some(values);
    }

    pub(crate) fn mark_matched(&mut self, group: usize) {
        self.matched[group] = true;
    }

    pub(crate) fn matched(&self, group: usize) -> bool {
        self.matched[group]
    }

    /// Check if every listed variable has been bound along this branch.
    pub(crate) fn has_all(&self, variables: &[usize]) -> bool {
        variables.iter().all(|&index| self.bindings[index].is_some())
    }
}

/// How a pattern position stands against the current union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState<'a> {
    Constant(&'a Resource),
    Unbound(usize),
    Unique(usize, &'a Resource),
    Multiple(usize, &'a ValueSet),
}

impl SlotState<'_> {
    pub(crate) const fn is_unbound(&self) -> bool {
        matches!(self, Self::Unbound(_))
    }

    pub(crate) const fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(..))
    }
}

/// Union of every live branch's bindings, per variable.
#[derive(Debug, Clone, Default)]
pub(crate) struct UnionBindings {
    values: Vec<Option<ValueSet>>,
}

impl UnionBindings {
    pub(crate) fn unbound(num_vars: usize) -> Self {
        Self {
            values: vec![None; num_vars],
        }
    }

    pub(crate) fn from_branches(branches: &[Branch], num_vars: usize) -> Self {
        let mut union = Self::unbound(num_vars);
        for branch in branches {
            for (index, binding) in branch.bindings.iter().enumerate() {
                if let Some(values) = binding {
                    union.values[index]
                        .get_or_insert_with(BTreeSet::new)
                        .extend(values.iter().cloned());
                }
            }
        }
        union
    }

    pub(crate) fn values(&self, index: usize) -> Option<&ValueSet> {
        self.values[index].as_ref().filter(|set| !set.is_empty())
    }

    /// Classify a pattern position.
    pub(crate) fn state<'a>(&'a self, slot: &'a Slot) -> SlotState<'a> {
        match slot {
            Slot::Constant(resource) => SlotState::Constant(resource),
            Slot::Variable(index) => match self.values(*index) {
                None => SlotState::Unbound(*index),
                Some(set) if set.len() == 1 => match set.first() {
                    Some(value) => SlotState::Unique(*index, value),
                    None => SlotState::Unbound(*index),
                },
                Some(set) => SlotState::Multiple(*index, set),
            },
        }
    }

    /// Resolve a position to its constant, its single bound value, or `None` when unbound.
    ///
    /// Only valid once the caller has ruled out multiply-bound positions.
    pub(crate) fn unique_binding<'a>(&'a self, slot: &'a Slot) -> QueryResult<Option<&'a Resource>> {
        match self.state(slot) {
            SlotState::Constant(resource) | SlotState::Unique(_, resource) => Ok(Some(resource)),
            SlotState::Unbound(_) => Ok(None),
            SlotState::Multiple(index, values) => Err(QueryError::internal(format!(
                "requested a unique binding for variable {index} with {} candidate values",
                values.len()
            ))),
        }
    }

    /// Build the lookup template for a statement whose positions are all
    /// constant, uniquely bound, or unbound.
    ///
    /// Returns `Ok(None)` when a literal would land in the subject or predicate,
    /// which no stored statement can match.
    pub(crate) fn materialize(
        &self,
        statement: &CompiledStatement,
        meta: Option<&Entity>,
    ) -> QueryResult<Option<StatementTemplate>> {
        let mut template = StatementTemplate {
            meta: meta.cloned(),
            ..StatementTemplate::default()
        };
        for position in Position::ALL {
            let Some(value) = self.unique_binding(statement.slot(position))? else {
                continue;
            };
            match position {
                Position::Subject | Position::Predicate => {
                    let Some(entity) = value.as_entity() else {
                        return Ok(None);
                    };
                    if position == Position::Subject {
                        template.subject = Some(entity.clone());
                    } else {
                        template.predicate = Some(entity.clone());
                    }
                }
                Position::Object => template.object = Some(value.clone()),
            }
        }
        Ok(Some(template))
    }
}

/// The live solution set of one run.
#[derive(Debug)]
pub(crate) struct BindingSet {
    branches: Vec<Branch>,
    union: UnionBindings,
    num_vars: usize,
    num_groups: usize,
}

impl BindingSet {
    pub(crate) fn new(num_vars: usize, num_groups: usize) -> Self {
        Self {
            branches: Vec::new(),
            union: UnionBindings::unbound(num_vars),
            num_vars,
            num_groups,
        }
    }

    #[cfg(test)]
    pub(crate) fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub(crate) const fn union(&self) -> &UnionBindings {
        &self.union
    }

    /// Take the branches out for a join step, seeding one empty branch when
    /// no step has produced any yet.
    pub(crate) fn take_branches(&mut self) -> Vec<Branch> {
        if self.branches.is_empty() {
            return vec![Branch::new(self.num_vars, self.num_groups)];
        }
        std::mem::take(&mut self.branches)
    }

    /// Install the result of a join step and recompute the union.
    pub(crate) fn replace_branches(&mut self, branches: Vec<Branch>) {
        self.union = UnionBindings::from_branches(&branches, self.num_vars);
        self.branches = branches;
    }

    pub(crate) fn into_branches(self) -> Vec<Branch> {
        self.branches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Literal;

    fn entity(uri: &str) -> Resource {
        Entity::uri(uri).into()
    }

    #[test]
    fn test_union_classifies_slots() {
        let mut a = Branch::new(3, 1);
        a.bind(0, entity("http://a"));
        a.bind(1, entity("http://x"));
        let mut b = Branch::new(3, 1);
        b.bind(0, entity("http://a"));
        b.bind(1, entity("http://y"));

        let union = UnionBindings::from_branches(&[a, b], 3);
        let constant = Slot::Constant(entity("http://p"));
        assert!(matches!(union.state(&constant), SlotState::Constant(_)));
        assert_eq!(
            union.state(&Slot::Variable(0)),
            SlotState::Unique(0, &entity("http://a"))
        );
        assert!(union.state(&Slot::Variable(1)).is_multiple());
        assert!(union.state(&Slot::Variable(2)).is_unbound());
    }

    #[test]
    fn test_unique_binding_rejects_multiple() {
        let mut branch = Branch::new(1, 1);
        branch.bind_all(
            0,
            Arc::new(BTreeSet::from([entity("http://a"), entity("http://b")])),
        );
        let union = UnionBindings::from_branches(&[branch], 1);
        let err = union.unique_binding(&Slot::Variable(0)).expect_err("multiply bound");
        assert!(matches!(err, QueryError::Internal(_)));
    }

    #[test]
    fn test_materialize() {
        let mut branch = Branch::new(2, 1);
        branch.bind(0, entity("http://a"));
        let union = UnionBindings::from_branches(&[branch], 2);

        let statement = CompiledStatement {
            subject: Slot::Variable(0),
            predicate: Slot::Constant(entity("http://p")),
            object: Slot::Variable(1),
            optional: false,
        };
        let template = union
            .materialize(&statement, None)
            .expect("materialize")
            .expect("entity subject");
        assert_eq!(template.subject, Some(Entity::uri("http://a")));
        assert_eq!(template.predicate, Some(Entity::uri("http://p")));
        assert_eq!(template.object, None);
        assert_eq!(template.meta, None);
    }

    #[test]
    fn test_materialize_literal_subject_fails() {
        let mut branch = Branch::new(1, 1);
        branch.bind(0, Literal::new("Alice").into());
        let union = UnionBindings::from_branches(&[branch], 1);

        let statement = CompiledStatement {
            subject: Slot::Variable(0),
            predicate: Slot::Constant(entity("http://p")),
            object: Slot::Constant(entity("http://o")),
            optional: false,
        };
        assert_eq!(union.materialize(&statement, None).expect("materialize"), None);
    }

    #[test]
    fn test_take_branches_seeds_empty_branch() {
        let mut set = BindingSet::new(2, 3);
        let seeded = set.take_branches();
        assert_eq!(seeded, vec![Branch::new(2, 3)]);

        let mut branch = Branch::new(2, 3);
        branch.bind(0, entity("http://a"));
        branch.mark_matched(0);
        set.replace_branches(vec![branch]);
        assert_eq!(set.branches().len(), 1);
        assert!(set.branches()[0].matched(0));
        assert_eq!(set.union().values(0).map(BTreeSet::len), Some(1));
        assert_eq!(set.union().values(1), None);
    }
}
