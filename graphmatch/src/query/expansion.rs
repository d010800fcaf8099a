//! Result expansion.
//!
//! A surviving branch may still hold several values per variable. Every
//! combination of those values is one result row. Rows are produced lazily,
//! branch by branch, so a window that stops early never materializes the
//! rest of the cross product.

use super::bindings::Branch;
use crate::types::Resource;

/// Lazy cross product over a list of value lists.
///
/// Yields nothing if any list is empty, and a single empty combination when
/// there are no lists at all. The last list varies fastest.
#[derive(Debug)]
pub(crate) struct Combinations<T> {
    lists: Vec<Vec<T>>,
    index: Vec<usize>,
    done: bool,
}

impl<T: Clone> Combinations<T> {
    pub(crate) fn new(lists: Vec<Vec<T>>) -> Self {
        let done = lists.iter().any(Vec::is_empty);
        Self {
            index: vec![0; lists.len()],
            lists,
            done,
        }
    }

    fn advance(&mut self) {
        for position in (0..self.lists.len()).rev() {
            self.index[position] += 1;
            if self.index[position] < self.lists[position].len() {
                return;
            }
            self.index[position] = 0;
        }
        self.done = true;
    }
}

impl<T: Clone> Iterator for Combinations<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = self
            .index
            .iter()
            .zip(&self.lists)
            .map(|(&i, list)| list[i].clone())
            .collect();
        self.advance();
        Some(current)
    }
}

/// Per-variable candidates of one branch. An unbound variable contributes
/// a single `None`.
fn branch_columns(branch: &Branch) -> Vec<Vec<Option<&Resource>>> {
    branch
        .bindings()
        .iter()
        .map(|binding| match binding {
            Some(values) => values.iter().map(Some).collect(),
            None => vec![None],
        })
        .collect()
}

/// Every row of every branch, in branch order.
pub(crate) fn expand(branches: &[Branch]) -> impl Iterator<Item = Vec<Option<&Resource>>> {
    branches
        .iter()
        .flat_map(|branch| Combinations::new(branch_columns(branch)))
}

/// Rows after distinctness constraints and the `[start, start + limit)` window.
pub(crate) fn windowed_rows<'a>(
    branches: &'a [Branch],
    distinct: &'a [(usize, usize)],
    start: usize,
    limit: Option<usize>,
) -> impl Iterator<Item = Vec<Option<&'a Resource>>> {
    expand(branches)
        .filter(move |row| {
            distinct.iter().all(|&(a, b)| match (row[a], row[b]) {
                (Some(x), Some(y)) => x != y,
                _ => true,
            })
        })
        .skip(start)
        .take(limit.unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::bindings::ValueSet;
    use crate::types::Entity;
    use std::sync::Arc;

    fn value(name: &str) -> Resource {
        Entity::uri(&format!("http://{name}")).into()
    }

    fn branch(columns: &[&[&str]]) -> Branch {
        let mut branch = Branch::new(columns.len(), 1);
        for (index, names) in columns.iter().enumerate() {
            if !names.is_empty() {
                let set: ValueSet = names.iter().map(|n| value(n)).collect();
                branch.bind_all(index, Arc::new(set));
            }
        }
        branch
    }

    #[test]
    fn test_combinations() {
        let all: Vec<Vec<u8>> = Combinations::new(vec![vec![1, 2], vec![3, 4, 5]]).collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], vec![1, 3]);
        assert_eq!(all[5], vec![2, 5]);

        assert_eq!(Combinations::<u8>::new(vec![]).count(), 1);
        assert_eq!(Combinations::new(vec![vec![1u8], vec![]]).count(), 0);
    }

    #[test]
    fn test_expand_cross_product_per_branch() {
        let branches = vec![branch(&[&["a"], &["b", "c"]]), branch(&[&["d"], &[]])];
        let rows: Vec<_> = expand(&branches).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec![Some(&value("d")), None]);
    }

    #[test]
    fn test_window() {
        let branches = vec![branch(&[&["a", "b", "c", "d", "e"]])];
        let rows: Vec<_> = windowed_rows(&branches, &[], 2, Some(2)).collect();
        assert_eq!(rows, vec![vec![Some(&value("c"))], vec![Some(&value("d"))]]);

        assert_eq!(windowed_rows(&branches, &[], 0, None).count(), 5);
        assert_eq!(windowed_rows(&branches, &[], 7, None).count(), 0);
        assert_eq!(windowed_rows(&branches, &[], 0, Some(0)).count(), 0);
    }

    #[test]
    fn test_distinct_applied_before_window() {
        let branches = vec![branch(&[&["a", "b"], &["a", "b"]])];
        let rows: Vec<_> = windowed_rows(&branches, &[(0, 1)], 0, None).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row[0] != row[1]));

        let rows: Vec<_> = windowed_rows(&branches, &[(0, 1)], 1, None).collect();
        assert_eq!(rows.len(), 1);
    }
}
