//! In-memory statement store.
//!
//! Statements are kept in insertion order. Subject, predicate and object
//! indexes are built on the first select and dropped whenever the store is
//! modified, so bulk loading stays cheap.
//!
//! # Invariants
//!
//! - When present, every index lists exactly the positions of the statements
//!   holding that key, in ascending order.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::{SelectFilter, SelectableSource, StoreError};
use crate::types::{Entity, Resource, Statement, StatementTemplate};

/// Position lists keyed by subject, predicate and object.
#[derive(Debug, Default)]
struct MemoryIndex {
    by_subject: HashMap<Entity, Vec<usize>>,
    by_predicate: HashMap<Entity, Vec<usize>>,
    by_object: HashMap<Resource, Vec<usize>>,
}

impl MemoryIndex {
    fn build(statements: &[Statement]) -> Self {
        let mut index = Self::default();
        for (position, statement) in statements.iter().enumerate() {
            index
                .by_subject
                .entry(statement.subject.clone())
                .or_default()
                .push(position);
            index
                .by_predicate
                .entry(statement.predicate.clone())
                .or_default()
                .push(position);
            index
                .by_object
                .entry(statement.object.clone())
                .or_default()
                .push(position);
        }
        tracing::trace!(statements = statements.len(), "built memory store index");
        index
    }
}

/// An indexed, in-memory statement source.
#[derive(Debug, Default)]
pub struct MemoryStore {
    statements: Vec<Statement>,
    index: OnceLock<MemoryIndex>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement.
    pub fn add(&mut self, statement: Statement) {
        self.statements.push(statement);
        self.index = OnceLock::new();
    }

    /// Remove every statement matching the template.
    pub fn remove(&mut self, template: &StatementTemplate) {
        self.statements.retain(|s| !template.matches(s));
        self.index = OnceLock::new();
    }

    /// Get the number of statements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.statements.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Iterate over all statements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    /// Pick the shortest position list the filter can be answered from.
    ///
    /// Returns `None` when the filter constrains no indexed position and the
    /// whole store has to be scanned.
    fn candidate_positions(&self, filter: &SelectFilter) -> Option<Vec<usize>> {
        let index = self.index.get_or_init(|| MemoryIndex::build(&self.statements));

        let mut best: Option<Vec<usize>> = None;
        let mut consider = |positions: Vec<usize>| {
            if best.as_ref().is_none_or(|b| positions.len() < b.len()) {
                best = Some(positions);
            }
        };

        if let Some(subjects) = &filter.subjects {
            consider(gather(&index.by_subject, subjects));
        }
        if let Some(objects) = &filter.objects {
            consider(gather(&index.by_object, objects));
        }
        if let Some(predicates) = &filter.predicates {
            consider(gather(&index.by_predicate, predicates));
        }
        best
    }
}

/// Merge the position lists of several keys into one ascending, deduplicated list.
fn gather<K: std::hash::Hash + Eq>(index: &HashMap<K, Vec<usize>>, keys: &[K]) -> Vec<usize> {
    let mut positions: Vec<usize> = keys
        .iter()
        .filter_map(|key| index.get(key))
        .flatten()
        .copied()
        .collect();
    positions.sort_unstable();
    positions.dedup();
    positions
}

impl SelectableSource for MemoryStore {
    fn contains(&self, template: &StatementTemplate) -> Result<bool, StoreError> {
        let mut found = false;
        self.select(&SelectFilter::from(template), &mut |_| {
            found = true;
            false
        })?;
        Ok(found)
    }

    fn select(
        &self,
        filter: &SelectFilter,
        sink: &mut dyn FnMut(&Statement) -> bool,
    ) -> Result<(), StoreError> {
        match self.candidate_positions(filter) {
            Some(positions) => {
                for position in positions {
                    let statement = &self.statements[position];
                    if filter.matches(statement) && !sink(statement) {
                        break;
                    }
                }
            }
            None => {
                for statement in &self.statements {
                    if filter.matches(statement) && !sink(statement) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<Statement> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
            index: OnceLock::new(),
        }
    }
}

impl Extend<Statement> for MemoryStore {
    fn extend<I: IntoIterator<Item = Statement>>(&mut self, iter: I) {
        self.statements.extend(iter);
        self.index = OnceLock::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Literal;

    fn sample_store() -> MemoryStore {
        let knows = Entity::uri("http://knows");
        let name = Entity::uri("http://name");
        let a = Entity::uri("http://a");
        let b = Entity::uri("http://b");
        let c = Entity::uri("http://c");
        [
            Statement::new(a.clone(), knows.clone(), b.clone()),
            Statement::new(a.clone(), knows.clone(), c.clone()),
            Statement::new(b.clone(), knows, c),
            Statement::new(a, name.clone(), Literal::new("Alice")),
            Statement::new(b, name, Literal::new("Bob")),
        ]
        .into_iter()
        .collect()
    }

    fn collect(store: &MemoryStore, filter: &SelectFilter) -> Vec<Statement> {
        let mut out = Vec::new();
        store
            .select(filter, &mut |s| {
                out.push(s.clone());
                true
            })
            .expect("select");
        out
    }

    #[test]
    fn test_select_by_subject() {
        let store = sample_store();
        let filter = SelectFilter {
            subjects: Some(vec![Entity::uri("http://a")]),
            ..SelectFilter::default()
        };
        assert_eq!(collect(&store, &filter).len(), 3);
    }

    #[test]
    fn test_select_with_alternatives() {
        let store = sample_store();
        let filter = SelectFilter {
            subjects: Some(vec![Entity::uri("http://a"), Entity::uri("http://b")]),
            predicates: Some(vec![Entity::uri("http://knows")]),
            ..SelectFilter::default()
        };
        assert_eq!(collect(&store, &filter).len(), 3);
    }

    #[test]
    fn test_select_by_object() {
        let store = sample_store();
        let filter = SelectFilter {
            objects: Some(vec![Entity::uri("http://c").into()]),
            ..SelectFilter::default()
        };
        let found = collect(&store, &filter);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|s| s.object == Entity::uri("http://c").into()));
    }

    #[test]
    fn test_select_stops_early() {
        let store = sample_store();
        let mut seen = 0;
        store
            .select(&SelectFilter::all(), &mut |_| {
                seen += 1;
                seen < 2
            })
            .expect("select");
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_contains_and_objects() {
        let store = sample_store();
        let present = Statement::new(
            Entity::uri("http://b"),
            Entity::uri("http://knows"),
            Entity::uri("http://c"),
        );
        assert!(store.contains(&StatementTemplate::from(&present)).expect("contains"));

        let absent = Statement::new(
            Entity::uri("http://c"),
            Entity::uri("http://knows"),
            Entity::uri("http://a"),
        );
        assert!(!store.contains(&StatementTemplate::from(&absent)).expect("contains"));

        let names = store
            .select_objects(&Entity::uri("http://a"), &Entity::uri("http://name"))
            .expect("objects");
        assert_eq!(names, vec![Resource::from(Literal::new("Alice"))]);
    }

    #[test]
    fn test_index_rebuilt_after_add() {
        let mut store = sample_store();
        let filter = SelectFilter {
            subjects: Some(vec![Entity::uri("http://c")]),
            ..SelectFilter::default()
        };
        assert!(collect(&store, &filter).is_empty());

        store.add(Statement::new(
            Entity::uri("http://c"),
            Entity::uri("http://knows"),
            Entity::uri("http://a"),
        ));
        assert_eq!(collect(&store, &filter).len(), 1);

        store.remove(&StatementTemplate {
            subject: Some(Entity::uri("http://c")),
            ..StatementTemplate::default()
        });
        assert!(collect(&store, &filter).is_empty());
        assert_eq!(store.len(), 5);
    }
}
