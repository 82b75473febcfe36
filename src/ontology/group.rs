//! A sorted, duplicate-free collection of term IDs.

use super::TermId;

/// A set of [`TermId`]s, e.g. the ancestors of a term or the terms
/// annotated on a disease.
///
/// Stored as a sorted `Vec` so that membership tests are binary searches
/// and iteration order is deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TermGroup {
    ids: Vec<TermId>,
}

impl TermGroup {
    /// Constructs a new, empty [`TermGroup`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a new, empty [`TermGroup`] with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Returns `true` if the group contains no [`TermId`]s.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of [`TermId`]s in the group.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Adds a new [`TermId`] to the group.
    ///
    /// Returns whether the ID was newly inserted, i.e. `false` if the
    /// group already contained it.
    pub fn insert(&mut self, id: TermId) -> bool {
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(idx) => {
                self.ids.insert(idx, id);
                true
            }
        }
    }

    /// Returns `true` if the group contains the [`TermId`].
    pub fn contains(&self, id: &TermId) -> bool {
        self.ids.binary_search(id).is_ok()
    }

    /// Merges all IDs of `other` into `self`.
    pub fn extend_from(&mut self, other: &TermGroup) {
        for id in &other.ids {
            self.insert(*id);
        }
    }

    /// Returns an iterator over the [`TermId`]s in ascending order.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, TermId>> {
        self.ids.iter().copied()
    }
}

impl From<Vec<TermId>> for TermGroup {
    fn from(ids: Vec<TermId>) -> Self {
        let mut group = TermGroup::with_capacity(ids.len());
        for id in ids {
            group.insert(id);
        }
        group
    }
}

impl FromIterator<TermId> for TermGroup {
    fn from_iter<T: IntoIterator<Item = TermId>>(iter: T) -> Self {
        let mut group = TermGroup::new();
        for id in iter {
            group.insert(id);
        }
        group
    }
}

impl<'a> IntoIterator for &'a TermGroup {
    type Item = TermId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, TermId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter().copied()
    }
}
