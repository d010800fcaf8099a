//! Greedy statement scheduler.
//!
//! Statements are ordered once, at compile time, without looking at data.
//! Each round ranks the remaining statements against the variables seen so
//! far, takes every statement tied for the best rank as one execution group,
//! and marks the group's variables as seen.

use std::collections::HashSet;

use super::compiler::{CompiledStatement, Slot, constant_entity};
use crate::types::Entity;

/// Predicates known to have at most one object per subject (functional) or
/// at most one subject per object (inverse functional).
#[derive(Debug, Clone, Default)]
pub(crate) struct PropertyHints {
    pub(crate) functional: HashSet<Entity>,
    pub(crate) inverse_functional: HashSet<Entity>,
}

/// Scheduling rank of one statement. Lower ranks run earlier.
///
/// Field order is the comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Rank {
    /// Required statements sort before optional ones.
    pub(crate) optional: bool,
    /// Variable positions not bound by any earlier group.
    pub(crate) unseen: usize,
    /// 0 = functional lookup from a known side, 1 = known predicate, 2 = open predicate.
    pub(crate) complexity: u8,
}

/// Rank a statement against a snapshot of already-seen variables.
pub(crate) fn rank(statement: &CompiledStatement, seen: &[bool], hints: &PropertyHints) -> Rank {
    let known = |slot: &Slot| slot.variable().is_none_or(|index| seen[index]);

    let unseen = [&statement.subject, &statement.predicate, &statement.object]
        .into_iter()
        .filter(|slot| !known(slot))
        .count();

    let predicate = constant_entity(&statement.predicate);
    let functional_hit = predicate.is_some_and(|p| {
        (hints.functional.contains(p) && known(&statement.subject))
            || (hints.inverse_functional.contains(p) && known(&statement.object))
    });
    let complexity = if functional_hit {
        0
    } else if known(&statement.predicate) {
        1
    } else {
        2
    };

    Rank {
        optional: statement.optional,
        unseen,
        complexity,
    }
}

/// Order statements into execution groups.
pub(crate) fn schedule(
    mut pool: Vec<CompiledStatement>,
    num_vars: usize,
    hints: &PropertyHints,
) -> Vec<Vec<CompiledStatement>> {
    let mut seen = vec![false; num_vars];
    let mut groups = Vec::new();

    while !pool.is_empty() {
        let ranks: Vec<Rank> = pool.iter().map(|s| rank(s, &seen, hints)).collect();
        let Some(best) = ranks.iter().min().copied() else {
            break;
        };

        let mut group = Vec::new();
        let mut rest = Vec::with_capacity(pool.len());
        for (statement, statement_rank) in pool.into_iter().zip(ranks) {
            if statement_rank == best {
                group.push(statement);
            } else {
                rest.push(statement);
            }
        }
        pool = rest;

        for statement in &group {
            for index in statement.variables() {
                seen[index] = true;
            }
        }
        tracing::trace!(
            optional = best.optional,
            unseen = best.unseen,
            complexity = best.complexity,
            size = group.len(),
            "scheduled statement group"
        );
        groups.push(group);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resource;

    fn constant(uri: &str) -> Slot {
        Slot::Constant(Resource::Entity(Entity::uri(uri)))
    }

    fn statement(subject: Slot, predicate: Slot, object: Slot, optional: bool) -> CompiledStatement {
        CompiledStatement {
            subject,
            predicate,
            object,
            optional,
        }
    }

    #[test]
    fn test_rank_counts_unseen_positions() {
        let st = statement(Slot::Variable(0), constant("http://p"), Slot::Variable(1), false);
        let hints = PropertyHints::default();

        let fresh = rank(&st, &[false, false], &hints);
        assert_eq!(fresh.unseen, 2);
        assert_eq!(fresh.complexity, 1);

        let half = rank(&st, &[true, false], &hints);
        assert_eq!(half.unseen, 1);
        assert!(half < fresh);
    }

    #[test]
    fn test_rank_required_before_optional() {
        let hints = PropertyHints::default();
        let required = statement(Slot::Variable(0), Slot::Variable(1), Slot::Variable(2), false);
        let optional = statement(Slot::Variable(0), constant("http://p"), constant("http://o"), true);
        let seen = [false; 3];
        assert!(rank(&required, &seen, &hints) < rank(&optional, &seen, &hints));
    }

    #[test]
    fn test_rank_complexity() {
        let mut hints = PropertyHints::default();
        hints.functional.insert(Entity::uri("http://mbox"));
        hints.inverse_functional.insert(Entity::uri("http://ssn"));

        let functional = statement(Slot::Variable(0), constant("http://mbox"), Slot::Variable(1), false);
        assert_eq!(rank(&functional, &[true, false], &hints).complexity, 0);
        assert_eq!(rank(&functional, &[false, false], &hints).complexity, 1);

        let inverse = statement(Slot::Variable(0), constant("http://ssn"), Slot::Variable(1), false);
        assert_eq!(rank(&inverse, &[false, true], &hints).complexity, 0);

        let open = statement(Slot::Variable(0), Slot::Variable(1), constant("http://o"), false);
        assert_eq!(rank(&open, &[false, false], &hints).complexity, 2);
        assert_eq!(rank(&open, &[false, true], &hints).complexity, 1);
    }

    #[test]
    fn test_schedule_groups_ties() {
        // ?x type Person . ?y type Dog . ?x owns ?y
        let a = statement(Slot::Variable(0), constant("http://type"), constant("http://Person"), false);
        let b = statement(Slot::Variable(1), constant("http://type"), constant("http://Dog"), false);
        let c = statement(Slot::Variable(0), constant("http://owns"), Slot::Variable(1), false);

        let groups = schedule(vec![c.clone(), a.clone(), b.clone()], 2, &PropertyHints::default());
        assert_eq!(groups, vec![vec![a, b], vec![c]]);
    }

    #[test]
    fn test_schedule_uses_seen_variables() {
        // ?x knows ?y . ?y name "Bob" . ?y age ?a (optional)
        let knows = statement(Slot::Variable(0), constant("http://knows"), Slot::Variable(1), false);
        let name = statement(
            Slot::Variable(1),
            constant("http://name"),
            Slot::Constant(Resource::Literal(crate::types::Literal::new("Bob"))),
            false,
        );
        let age = statement(Slot::Variable(1), constant("http://age"), Slot::Variable(2), true);

        let groups = schedule(
            vec![age.clone(), knows.clone(), name.clone()],
            3,
            &PropertyHints::default(),
        );
        assert_eq!(groups, vec![vec![name], vec![knows], vec![age]]);
    }
}
