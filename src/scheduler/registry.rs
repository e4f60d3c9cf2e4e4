//! Resource registry: one entry per address, kept in scheduling order.

use super::resource::{Method, Priority, Resource};

/// Deduplicated resources kept in scheduling order.
///
/// Ordering is `(priority rank, state rank)` under a stable sort, so equal keys
/// keep their admission order. `next_available` is a linear scan over that order.
#[derive(Debug, Default)]
pub struct Registry {
    resources: Vec<Resource>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the resource for `address`, inserting a queued one if absent.
    ///
    /// The flag is `true` when a new entry was created. Existing entries are
    /// returned untouched regardless of `method`/`priority`. New entries are
    /// appended; callers reorder afterwards.
    pub fn admit_or_get(
        &mut self,
        address: &str,
        method: Method,
        priority: Priority,
    ) -> (&Resource, bool) {
        if let Some(idx) = self.position(address) {
            return (&self.resources[idx], false);
        }
        let idx = self.resources.len();
        self.resources.push(Resource::new(address, method, priority));
        (&self.resources[idx], true)
    }

    pub fn find(&self, address: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.address() == address)
    }

    pub fn find_mut(&mut self, address: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.address() == address)
    }

    pub fn reorder(&mut self) {
        self.resources.sort_by_key(Resource::sort_key);
    }

    pub fn next_available(&self) -> Option<&Resource> {
        self.resources.iter().find(|r| r.is_available())
    }

    pub fn next_available_mut(&mut self) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.is_available())
    }

    pub fn has_available(&self) -> bool {
        self.next_available().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    fn position(&self, address: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.address() == address)
    }
}
