//! Scopes are the lifecycle units of the runtime - every component is
//! implemented as a scope.
//!
//! A scope records its place in the tree (parent, height), its ordered hook
//! list, a context map for dependency injection, and the error/suspense
//! boundary state the application layers on top. Scopes are slab-allocated
//! so ids are reused after destruction, just like elements.

use fxhash::FxHashMap;
use slab::Slab;

/// A scope's unique identifier. Not unique across time - destroyed scope
/// slots are reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScopeId(pub u32);

/// What kind of resource a hook entry refers to.
///
/// The tag routes destruction: signals are destroyed in the signal store,
/// string signals in the string store, memos and effects through their own
/// stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookTag {
    Signal,
    StringSignal,
    Memo,
    Effect,
}

pub struct ScopeRecord {
    pub parent: i32,
    pub height: u32,

    // Hooks are append-only during first render; re-renders replay the list
    // through the cursor in the exact same order.
    hooks: Vec<(HookTag, u32)>,
    hook_cursor: usize,

    render_count: u32,
    pub dirty: bool,

    contexts: FxHashMap<u32, i32>,

    pub error_boundary: bool,
    pub error: Option<String>,

    pub suspense_boundary: bool,
    pub pending: bool,
}

impl ScopeRecord {
    fn new(height: u32, parent: i32) -> Self {
        Self {
            parent,
            height,
            hooks: Vec::new(),
            hook_cursor: 0,
            render_count: 0,
            dirty: false,
            contexts: FxHashMap::default(),
            error_boundary: false,
            error: None,
            suspense_boundary: false,
            pending: false,
        }
    }

    pub fn hooks(&self) -> &[(HookTag, u32)] {
        &self.hooks
    }
}

pub struct ScopeArena {
    scopes: Slab<ScopeRecord>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { scopes: Slab::with_capacity(capacity) }
    }

    pub fn create(&mut self, height: u32, parent: i32) -> ScopeId {
        ScopeId(self.scopes.insert(ScopeRecord::new(height, parent)) as u32)
    }

    /// Create a scope one level below its parent.
    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        let height = self.height(parent).map(|h| h + 1).unwrap_or(0);
        self.create(height, parent.0 as i32)
    }

    /// Remove the scope record, returning it so the runtime can release the
    /// resources its hooks own.
    pub fn destroy(&mut self, id: ScopeId) -> Option<ScopeRecord> {
        self.scopes.try_remove(id.0 as usize)
    }

    pub fn contains(&self, id: ScopeId) -> bool {
        self.scopes.contains(id.0 as usize)
    }

    pub fn get(&self, id: ScopeId) -> Option<&ScopeRecord> {
        self.scopes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut ScopeRecord> {
        self.scopes.get_mut(id.0 as usize)
    }

    pub fn height(&self, id: ScopeId) -> Option<u32> {
        self.get(id).map(|s| s.height)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        let record = self.get(id)?;
        (record.parent >= 0).then(|| ScopeId(record.parent as u32))
    }

    /// Start a render pass: bump the render count, rewind the hook cursor,
    /// clear the dirty flag.
    pub fn begin_render(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.render_count += 1;
            scope.hook_cursor = 0;
            scope.dirty = false;
        }
    }

    pub fn is_first_render(&self, id: ScopeId) -> bool {
        self.get(id).map(|s| s.render_count <= 1).unwrap_or(true)
    }

    pub fn render_count(&self, id: ScopeId) -> u32 {
        self.get(id).map(|s| s.render_count).unwrap_or(0)
    }

    pub fn set_dirty(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.dirty = true;
        }
    }

    pub fn push_hook(&mut self, id: ScopeId, tag: HookTag, value: u32) {
        if let Some(scope) = self.get_mut(id) {
            scope.hooks.push((tag, value));
        }
    }

    /// Advance the hook cursor and return the entry under it.
    ///
    /// Returns `None` when the cursor has run past the list - the classic
    /// rules-of-hooks violation. Callers log and limp along; the stores
    /// themselves recover from any id this mis-routes to.
    pub fn next_hook(&mut self, id: ScopeId) -> Option<(HookTag, u32)> {
        let scope = self.get_mut(id)?;
        let entry = scope.hooks.get(scope.hook_cursor).copied();
        scope.hook_cursor += 1;
        entry
    }

    pub fn hook_count(&self, id: ScopeId) -> usize {
        self.get(id).map(|s| s.hooks.len()).unwrap_or(0)
    }

    pub fn provide_context(&mut self, id: ScopeId, key: u32, value: i32) {
        if let Some(scope) = self.get_mut(id) {
            scope.contexts.insert(key, value);
        }
    }

    /// Look a context key up on the scope, then walk the parent chain.
    pub fn consume_context(&self, id: ScopeId, key: u32) -> Option<i32> {
        let mut search = Some(id);
        while let Some(scope_id) = search {
            let scope = self.get(scope_id)?;
            if let Some(&value) = scope.contexts.get(&key) {
                return Some(value);
            }
            search = (scope.parent >= 0).then(|| ScopeId(scope.parent as u32));
        }
        None
    }

    pub fn set_error_boundary(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.error_boundary = true;
        }
    }

    pub fn set_error(&mut self, id: ScopeId, message: impl Into<String>) {
        if let Some(scope) = self.get_mut(id) {
            scope.error = Some(message.into());
        }
    }

    /// Attach an error to the nearest enclosing error boundary, starting at
    /// the scope itself. Does not unwind; returns the boundary that caught
    /// it, if any.
    pub fn propagate_error(&mut self, id: ScopeId, message: impl Into<String>) -> Option<ScopeId> {
        let boundary = self.find_error_boundary(id)?;
        self.set_error(boundary, message);
        Some(boundary)
    }

    pub fn has_error(&self, id: ScopeId) -> bool {
        self.get(id).map(|s| s.error.is_some()).unwrap_or(false)
    }

    pub fn error_message(&self, id: ScopeId) -> Option<String> {
        self.get(id)?.error.clone()
    }

    pub fn find_error_boundary(&self, id: ScopeId) -> Option<ScopeId> {
        let mut search = Some(id);
        while let Some(scope_id) = search {
            let scope = self.get(scope_id)?;
            if scope.error_boundary {
                return Some(scope_id);
            }
            search = (scope.parent >= 0).then(|| ScopeId(scope.parent as u32));
        }
        None
    }

    pub fn set_suspense_boundary(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.suspense_boundary = true;
        }
    }

    pub fn set_pending(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.pending = true;
        }
    }

    pub fn resolve_pending(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.pending = false;
        }
    }

    pub fn is_pending(&self, id: ScopeId) -> bool {
        self.get(id).map(|s| s.pending).unwrap_or(false)
    }

    /// Whether any scope at or below the boundary is flagged pending.
    pub fn has_pending_descendant(&self, boundary: ScopeId) -> bool {
        self.scopes.iter().any(|(key, scope)| {
            scope.pending && self.is_self_or_ancestor(boundary, ScopeId(key as u32))
        })
    }

    fn is_self_or_ancestor(&self, ancestor: ScopeId, descendant: ScopeId) -> bool {
        let mut search = Some(descendant);
        while let Some(scope_id) = search {
            if scope_id == ancestor {
                return true;
            }
            search = self.parent(scope_id);
        }
        false
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.scopes.iter().map(|(key, _)| ScopeId(key as u32))
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_sit_one_below_their_parent() {
        let mut scopes = ScopeArena::new();
        let root = scopes.create(0, -1);
        let child = scopes.create_child(root);
        let grandchild = scopes.create_child(child);

        assert_eq!(scopes.height(root), Some(0));
        assert_eq!(scopes.height(child), Some(1));
        assert_eq!(scopes.height(grandchild), Some(2));
        assert_eq!(scopes.parent(grandchild), Some(child));
        assert_eq!(scopes.parent(root), None);
    }

    #[test]
    fn hooks_replay_in_push_order() {
        let mut scopes = ScopeArena::new();
        let scope = scopes.create(0, -1);

        scopes.begin_render(scope);
        assert!(scopes.is_first_render(scope));
        scopes.push_hook(scope, HookTag::Signal, 11);
        scopes.push_hook(scope, HookTag::Memo, 4);
        scopes.push_hook(scope, HookTag::Effect, 2);

        scopes.begin_render(scope);
        assert!(!scopes.is_first_render(scope));
        assert_eq!(scopes.next_hook(scope), Some((HookTag::Signal, 11)));
        assert_eq!(scopes.next_hook(scope), Some((HookTag::Memo, 4)));
        assert_eq!(scopes.next_hook(scope), Some((HookTag::Effect, 2)));
        assert_eq!(scopes.next_hook(scope), None);
    }

    #[test]
    fn begin_render_clears_the_dirty_flag() {
        let mut scopes = ScopeArena::new();
        let scope = scopes.create(0, -1);
        scopes.set_dirty(scope);
        assert!(scopes.get(scope).unwrap().dirty);

        scopes.begin_render(scope);
        assert!(!scopes.get(scope).unwrap().dirty);
    }

    #[test]
    fn context_lookup_walks_the_parent_chain() {
        let mut scopes = ScopeArena::new();
        let root = scopes.create(0, -1);
        let child = scopes.create_child(root);
        let grandchild = scopes.create_child(child);

        scopes.provide_context(root, 1, 42);
        scopes.provide_context(child, 2, 7);

        assert_eq!(scopes.consume_context(grandchild, 1), Some(42));
        assert_eq!(scopes.consume_context(grandchild, 2), Some(7));
        assert_eq!(scopes.consume_context(root, 2), None);
        assert_eq!(scopes.consume_context(grandchild, 3), None);
    }

    #[test]
    fn errors_land_on_the_nearest_boundary() {
        let mut scopes = ScopeArena::new();
        let root = scopes.create(0, -1);
        let middle = scopes.create_child(root);
        let leaf = scopes.create_child(middle);

        scopes.set_error_boundary(root);
        scopes.set_error_boundary(middle);

        let caught = scopes.propagate_error(leaf, "render failed");
        assert_eq!(caught, Some(middle));
        assert!(scopes.has_error(middle));
        assert!(!scopes.has_error(root));
        assert_eq!(scopes.error_message(middle).as_deref(), Some("render failed"));
    }

    #[test]
    fn pending_descendants_are_visible_to_their_boundary() {
        let mut scopes = ScopeArena::new();
        let root = scopes.create(0, -1);
        let boundary = scopes.create_child(root);
        let leaf = scopes.create_child(boundary);
        let outsider = scopes.create_child(root);

        scopes.set_suspense_boundary(boundary);
        scopes.set_pending(leaf);

        assert!(scopes.has_pending_descendant(boundary));
        assert!(scopes.has_pending_descendant(root));
        assert!(!scopes.has_pending_descendant(outsider));

        scopes.resolve_pending(leaf);
        assert!(!scopes.has_pending_descendant(boundary));
    }
}
