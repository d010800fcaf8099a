//! Shared helpers for unit and end-to-end tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::store::{SelectFilter, SelectableSource, StoreError};
use crate::types::{Entity, Resource, Statement, StatementTemplate};

/// Install a tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphmatch=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A source wrapper that counts every call made to it.
#[derive(Debug, Default)]
pub struct CountingSource<S> {
    inner: S,
    contains_calls: AtomicUsize,
    select_calls: AtomicUsize,
    select_objects_calls: AtomicUsize,
}

impl<S> CountingSource<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            contains_calls: AtomicUsize::new(0),
            select_calls: AtomicUsize::new(0),
            select_objects_calls: AtomicUsize::new(0),
        }
    }

    pub fn contains_calls(&self) -> usize {
        self.contains_calls.load(Ordering::SeqCst)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Total number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.contains_calls() + self.select_calls() + self.select_objects_calls.load(Ordering::SeqCst)
    }
}

impl<S: SelectableSource> SelectableSource for CountingSource<S> {
    fn contains(&self, template: &StatementTemplate) -> Result<bool, StoreError> {
        self.contains_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.contains(template)
    }

    fn select(
        &self,
        filter: &SelectFilter,
        sink: &mut dyn FnMut(&Statement) -> bool,
    ) -> Result<(), StoreError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.select(filter, sink)
    }

    fn select_objects(
        &self,
        subject: &Entity,
        predicate: &Entity,
    ) -> Result<Vec<Resource>, StoreError> {
        self.select_objects_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.select_objects(subject, predicate)
    }
}

/// A source whose every call fails.
#[derive(Debug, Default)]
pub struct FailingSource;

impl SelectableSource for FailingSource {
    fn contains(&self, _template: &StatementTemplate) -> Result<bool, StoreError> {
        Err(StoreError::Backend("source offline".to_owned()))
    }

    fn select(
        &self,
        _filter: &SelectFilter,
        _sink: &mut dyn FnMut(&Statement) -> bool,
    ) -> Result<(), StoreError> {
        Err(StoreError::Backend("source offline".to_owned()))
    }
}
