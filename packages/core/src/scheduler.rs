//! The dirty-scope scheduler.
//!
//! Scopes re-render in ascending height so that when a parent and child are
//! both dirty in one flush, the parent goes first and may legitimately
//! unmount the child before its turn comes. Among equal heights, insertion
//! order is preserved.

use crate::runtime::Runtime;
use crate::scopes::ScopeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyScope {
    pub id: u32,
    pub height: u32,
}

pub struct Scheduler {
    entries: Vec<DirtyScope>,
    sorted: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { entries: Vec::new(), sorted: true }
    }

    /// Pull everything out of the runtime's dirty queue, recording each
    /// scope with its height. Scopes already queued here are not re-added.
    pub fn collect(&mut self, rt: &mut Runtime) {
        for id in rt.drain_dirty() {
            if self.has_scope(id) {
                continue;
            }
            let Some(height) = rt.scopes.height(ScopeId(id)) else {
                continue;
            };
            self.entries.push(DirtyScope { id, height });
            self.sorted = false;
        }
    }

    /// Pop the lowest scope. Sorting is lazy and stable, so equal heights
    /// come out in insertion order.
    pub fn next(&mut self) -> Option<u32> {
        self.ensure_sorted();
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0).id)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn has_scope(&self, id: u32) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Drop a scope from the queue, for when a parent render unmounts it.
    pub fn remove_scope(&mut self, id: u32) {
        self.entries.retain(|entry| entry.id != id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.sorted = true;
    }

    fn ensure_sorted(&mut self) {
        if self.sorted {
            return;
        }
        // Insertion sort: stable, and the queue is nearly sorted in the
        // common case of one height class per event.
        for i in 1..self.entries.len() {
            let mut j = i;
            while j > 0 && self.entries[j - 1].height > self.entries[j].height {
                self.entries.swap(j - 1, j);
                j -= 1;
            }
        }
        self.sorted = true;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_with_heights(heights: &[u32]) -> (Runtime, Vec<ScopeId>) {
        let mut rt = Runtime::new();
        let scopes = heights.iter().map(|&h| rt.scopes.create(h, -1)).collect();
        (rt, scopes)
    }

    #[test]
    fn scopes_come_out_height_first() {
        let (mut rt, scopes) = runtime_with_heights(&[2, 0, 1]);
        let mut scheduler = Scheduler::new();

        rt.mark_scope_dirty(scopes[0]);
        rt.mark_scope_dirty(scopes[1]);
        rt.mark_scope_dirty(scopes[2]);
        rt.mark_scope_dirty(scopes[0]);
        scheduler.collect(&mut rt);

        assert_eq!(scheduler.count(), 3);
        assert_eq!(scheduler.next(), Some(scopes[1].0));
        assert_eq!(scheduler.next(), Some(scopes[2].0));
        assert_eq!(scheduler.next(), Some(scopes[0].0));
        assert_eq!(scheduler.next(), None);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn equal_heights_preserve_insertion_order() {
        let (mut rt, scopes) = runtime_with_heights(&[1, 1, 1, 0]);
        let mut scheduler = Scheduler::new();

        rt.mark_scope_dirty(scopes[2]);
        rt.mark_scope_dirty(scopes[0]);
        rt.mark_scope_dirty(scopes[3]);
        rt.mark_scope_dirty(scopes[1]);
        scheduler.collect(&mut rt);

        assert_eq!(scheduler.next(), Some(scopes[3].0));
        assert_eq!(scheduler.next(), Some(scopes[2].0));
        assert_eq!(scheduler.next(), Some(scopes[0].0));
        assert_eq!(scheduler.next(), Some(scopes[1].0));
    }

    #[test]
    fn collect_dedups_against_the_queue() {
        let (mut rt, scopes) = runtime_with_heights(&[0]);
        let mut scheduler = Scheduler::new();

        rt.mark_scope_dirty(scopes[0]);
        scheduler.collect(&mut rt);
        rt.mark_scope_dirty(scopes[0]);
        scheduler.collect(&mut rt);

        assert_eq!(scheduler.count(), 1);
        assert!(scheduler.has_scope(scopes[0].0));
    }

    #[test]
    fn destroyed_scopes_are_skipped_and_removable() {
        let (mut rt, scopes) = runtime_with_heights(&[0, 1]);
        let mut scheduler = Scheduler::new();

        rt.mark_scope_dirty(scopes[1]);
        rt.destroy_scope(scopes[1]);
        rt.mark_scope_dirty(scopes[0]);
        scheduler.collect(&mut rt);

        // The destroyed scope never made it into the queue.
        assert_eq!(scheduler.count(), 1);

        scheduler.remove_scope(scopes[0].0);
        assert!(scheduler.is_empty());
    }
}
