//! The triple-store contract consumed by the query engine.
//!
//! A source answers three kinds of requests:
//! - Existence tests for a template with wildcards
//! - Bulk selects where each position may be a set of alternatives, plus
//!   literal filters on the object position, streamed to a callback that may
//!   stop the stream early
//! - Single-column object fetches for a (subject, predicate) pair
//!
//! `MemoryStore` is an indexed in-memory implementation.

mod filters;
mod memory;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::types::{Entity, Resource, Statement, StatementTemplate};

pub use filters::{
    CompareOp, LiteralFilter, NumericCompareFilter, StringCompareFilter, StringContainsFilter,
};
pub use memory::MemoryStore;

/// Errors raised by a statement source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A bulk select request.
///
/// Each position is either `None` (any value) or a list of acceptable values.
/// An empty list matches nothing.
#[derive(Default)]
pub struct SelectFilter {
    /// Acceptable subjects.
    pub subjects: Option<Vec<Entity>>,
    /// Acceptable predicates.
    pub predicates: Option<Vec<Entity>>,
    /// Acceptable objects.
    pub objects: Option<Vec<Resource>>,
    /// Acceptable graph tags.
    pub metas: Option<Vec<Entity>>,
    /// Filters the object must pass. Non-literal objects fail any filter.
    pub literal_filters: Vec<Arc<dyn LiteralFilter>>,
}

impl SelectFilter {
    /// A filter matching every statement.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Check if a statement satisfies the filter.
    #[must_use]
    pub fn matches(&self, statement: &Statement) -> bool {
        self.subjects
            .as_ref()
            .is_none_or(|s| s.contains(&statement.subject))
            && self
                .predicates
                .as_ref()
                .is_none_or(|p| p.contains(&statement.predicate))
            && self
                .objects
                .as_ref()
                .is_none_or(|o| o.contains(&statement.object))
            && self.metas.as_ref().is_none_or(|m| m.contains(&statement.meta))
            && self.passes_literal_filters(&statement.object)
    }

    fn passes_literal_filters(&self, object: &Resource) -> bool {
        if self.literal_filters.is_empty() {
            return true;
        }
        object
            .as_literal()
            .is_some_and(|literal| self.literal_filters.iter().all(|f| f.matches(literal)))
    }
}

impl From<&StatementTemplate> for SelectFilter {
    fn from(template: &StatementTemplate) -> Self {
        Self {
            subjects: template.subject.clone().map(|s| vec![s]),
            predicates: template.predicate.clone().map(|p| vec![p]),
            objects: template.object.clone().map(|o| vec![o]),
            metas: template.meta.clone().map(|m| vec![m]),
            literal_filters: Vec::new(),
        }
    }
}

impl fmt::Debug for SelectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectFilter")
            .field("subjects", &self.subjects)
            .field("predicates", &self.predicates)
            .field("objects", &self.objects)
            .field("metas", &self.metas)
            .field("literal_filters", &self.literal_filters.len())
            .finish()
    }
}

/// A source of statements the query engine can search.
///
/// Implementations must be safe to share between threads running queries
/// concurrently; all methods take `&self`.
pub trait SelectableSource {
    /// Check if any statement matches the template.
    fn contains(&self, template: &StatementTemplate) -> Result<bool, StoreError>;

    /// Stream every statement matching the filter to `sink`.
    ///
    /// Streaming stops as soon as `sink` returns `false`.
    fn select(
        &self,
        filter: &SelectFilter,
        sink: &mut dyn FnMut(&Statement) -> bool,
    ) -> Result<(), StoreError>;

    /// Fetch the objects of every statement with the given subject and predicate.
    fn select_objects(
        &self,
        subject: &Entity,
        predicate: &Entity,
    ) -> Result<Vec<Resource>, StoreError> {
        let filter = SelectFilter {
            subjects: Some(vec![subject.clone()]),
            predicates: Some(vec![predicate.clone()]),
            ..SelectFilter::default()
        };
        let mut objects = Vec::new();
        self.select(&filter, &mut |statement| {
            objects.push(statement.object.clone());
            true
        })?;
        Ok(objects)
    }
}
