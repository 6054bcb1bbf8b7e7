//! The reactive runtime: value stores, scope arena, template and handler
//! registries composed behind one "current reactive context".
//!
//! The context is an integer identity - a scope id while a component
//! renders, a memo or effect context while one computes, or -1 when nothing
//! is tracking. Any signal read while a context is installed subscribes that
//! context; any signal write walks the subscriber set and routes each entry
//! through the memo/effect side tables into the dirty-scope queue.
//!
//! The runtime never recurses from a write into a re-render. Writes only
//! queue; the scheduler and app shell drive rendering from the outside.

use fxhash::{FxBuildHasher, FxHashMap};
use indexmap::IndexSet;

use crate::events::HandlerRegistry;
use crate::reactive::{EffectStore, MemoStore};
use crate::scopes::{HookTag, ScopeArena, ScopeId};
use crate::signals::{SignalStore, StringStore};
use crate::templates::TemplateRegistry;
use crate::virtual_dom::Capacities;

/// Saved context state around one render pass. Nested renders stack these
/// on the call stack.
#[derive(Clone, Copy, Debug)]
pub struct RenderFrame {
    prev_scope: i32,
    prev_context: i32,
}

pub struct Runtime {
    pub signals: SignalStore,
    pub strings: StringStore,
    pub scopes: ScopeArena,
    pub templates: TemplateRegistry,
    pub handlers: HandlerRegistry,
    pub memos: MemoStore,
    pub effects: EffectStore,

    current_scope: i32,
    current_context: i32,

    dirty: IndexSet<u32, FxBuildHasher>,
    memo_by_context: FxHashMap<u32, u32>,
    effect_by_context: FxHashMap<u32, u32>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_capacities(&Capacities::default())
    }

    pub fn with_capacities(caps: &Capacities) -> Self {
        Self {
            signals: SignalStore::with_capacity(caps.signals),
            strings: StringStore::new(),
            scopes: ScopeArena::with_capacity(caps.scopes),
            templates: TemplateRegistry::new(),
            handlers: HandlerRegistry::with_capacity(caps.handlers),
            memos: MemoStore::new(),
            effects: EffectStore::new(),
            current_scope: -1,
            current_context: -1,
            dirty: IndexSet::default(),
            memo_by_context: FxHashMap::default(),
            effect_by_context: FxHashMap::default(),
        }
    }

    pub fn current_scope(&self) -> i32 {
        self.current_scope
    }

    pub fn current_context(&self) -> i32 {
        self.current_context
    }

    pub(crate) fn install_context(&mut self, ctx: i32) {
        self.current_context = ctx;
    }

    pub(crate) fn register_memo_context(&mut self, ctx: u32, memo: u32) {
        self.memo_by_context.insert(ctx, memo);
    }

    pub(crate) fn register_effect_context(&mut self, ctx: u32, effect: u32) {
        self.effect_by_context.insert(ctx, effect);
    }

    /// Open a render pass: install the scope as current scope and tracking
    /// context, rewind its hook cursor. The returned frame restores the
    /// previous state when passed to [`end_scope_render`].
    ///
    /// [`end_scope_render`]: Runtime::end_scope_render
    pub fn begin_scope_render(&mut self, scope: ScopeId) -> RenderFrame {
        let frame = RenderFrame {
            prev_scope: self.current_scope,
            prev_context: self.current_context,
        };
        self.scopes.begin_render(scope);
        self.current_scope = scope.0 as i32;
        self.current_context = scope.0 as i32;
        frame
    }

    pub fn end_scope_render(&mut self, frame: RenderFrame) {
        self.current_scope = frame.prev_scope;
        self.current_context = frame.prev_context;
    }

    /// Read a signal, subscribing the current context if one is installed.
    /// Reading with no context is legal and subscribes no one.
    pub fn read_signal<T: Copy + Default>(&mut self, key: u32) -> T {
        if self.current_context >= 0 {
            self.signals.subscribe(key, self.current_context as u32);
        }
        self.signals.read(key)
    }

    /// Read without tracking.
    pub fn peek_signal<T: Copy + Default>(&self, key: u32) -> T {
        self.signals.read(key)
    }

    /// Write a signal and propagate dirtiness to its subscribers.
    ///
    /// Subscribers that are memo contexts mark the memo dirty and forward to
    /// the memo's output subscribers; effect contexts flag the effect
    /// pending; everything else is a scope and lands in the dirty queue in
    /// insertion order, deduplicated.
    pub fn write_signal<T: Copy>(&mut self, key: u32, value: T) {
        if !self.signals.write(key, value) {
            return;
        }
        self.notify(key);
    }

    fn notify(&mut self, key: u32) {
        for ctx in self.signals.subscribers(key) {
            if let Some(&memo_id) = self.memo_by_context.get(&ctx) {
                let output = match self.memos.get_mut(memo_id) {
                    Some(memo) => {
                        memo.dirty = true;
                        memo.output
                    }
                    None => continue,
                };
                // Two-level propagation: the memo's output subscribers are
                // woken now, not when the memo recomputes.
                for sub in self.signals.subscribers(output) {
                    if let Some(&effect_id) = self.effect_by_context.get(&sub) {
                        if let Some(effect) = self.effects.get_mut(effect_id) {
                            effect.pending = true;
                        }
                    } else {
                        self.queue_dirty(sub);
                    }
                }
            } else if let Some(&effect_id) = self.effect_by_context.get(&ctx) {
                if let Some(effect) = self.effects.get_mut(effect_id) {
                    effect.pending = true;
                }
            } else {
                self.queue_dirty(ctx);
            }
        }
    }

    fn queue_dirty(&mut self, scope: u32) {
        self.dirty.insert(scope);
        self.scopes.set_dirty(ScopeId(scope));
    }

    pub fn mark_scope_dirty(&mut self, scope: ScopeId) {
        self.queue_dirty(scope.0);
    }

    /// Swap the dirty queue out, preserving insertion order.
    pub fn drain_dirty(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Read a string signal: the companion version signal carries the
    /// subscription, the string store holds the bytes.
    pub fn read_string(&mut self, string_key: u32, version_key: u32) -> String {
        let _version: i32 = self.read_signal(version_key);
        self.strings.read(string_key)
    }

    /// Write a string signal and bump its companion, cascading dirtiness
    /// through the companion's subscribers.
    pub fn write_string_signal(&mut self, string_key: u32, version_key: u32, value: &str) {
        if !self.strings.write(string_key, value) {
            return;
        }
        let version: i32 = self.signals.read(version_key);
        self.write_signal(version_key, version.wrapping_add(1));
    }

    // -- hooks ------------------------------------------------------------

    /// First render creates the signal and appends it to the scope's hook
    /// list; re-renders replay the list in order and ignore `initial`.
    pub fn use_signal_i32(&mut self, initial: i32) -> u32 {
        self.use_value_hook(HookTag::Signal, |rt| rt.signals.create(initial))
    }

    pub fn use_signal_bool(&mut self, initial: bool) -> u32 {
        self.use_value_hook(HookTag::Signal, |rt| rt.signals.create(initial))
    }

    /// Returns `(string_key, version_key)`.
    pub fn use_signal_string(&mut self, initial: &str) -> (u32, u32) {
        let Some(scope) = self.hook_scope() else {
            return (self.strings.create(initial), self.signals.create(0i32));
        };
        if self.scopes.is_first_render(scope) {
            let string_key = self.strings.create(initial);
            let version_key = self.signals.create(0i32);
            self.scopes.push_hook(scope, HookTag::StringSignal, string_key);
            self.scopes.push_hook(scope, HookTag::Signal, version_key);
            (string_key, version_key)
        } else {
            let string_key = self.replay_hook(scope, HookTag::StringSignal);
            let version_key = self.replay_hook(scope, HookTag::Signal);
            match (string_key, version_key) {
                (Some(string_key), Some(version_key)) => (string_key, version_key),
                _ => {
                    let string_key = self.strings.create(initial);
                    let version_key = self.signals.create(0i32);
                    self.scopes.push_hook(scope, HookTag::StringSignal, string_key);
                    self.scopes.push_hook(scope, HookTag::Signal, version_key);
                    (string_key, version_key)
                }
            }
        }
    }

    pub fn use_memo_i32(&mut self, initial: i32) -> u32 {
        let Some(scope) = self.hook_scope() else {
            return self.create_memo(ScopeId(0), initial);
        };
        if self.scopes.is_first_render(scope) {
            let memo = self.create_memo(scope, initial);
            self.scopes.push_hook(scope, HookTag::Memo, memo);
            memo
        } else {
            match self.replay_hook(scope, HookTag::Memo) {
                Some(memo) => memo,
                None => {
                    let memo = self.create_memo(scope, initial);
                    self.scopes.push_hook(scope, HookTag::Memo, memo);
                    memo
                }
            }
        }
    }

    pub fn use_effect(&mut self) -> u32 {
        let Some(scope) = self.hook_scope() else {
            return self.create_effect(ScopeId(0));
        };
        if self.scopes.is_first_render(scope) {
            let effect = self.create_effect(scope);
            self.scopes.push_hook(scope, HookTag::Effect, effect);
            effect
        } else {
            match self.replay_hook(scope, HookTag::Effect) {
                Some(effect) => effect,
                None => {
                    let effect = self.create_effect(scope);
                    self.scopes.push_hook(scope, HookTag::Effect, effect);
                    effect
                }
            }
        }
    }

    fn use_value_hook(&mut self, tag: HookTag, create: impl FnOnce(&mut Self) -> u32) -> u32 {
        let Some(scope) = self.hook_scope() else {
            return create(self);
        };
        if self.scopes.is_first_render(scope) {
            let value = create(self);
            self.scopes.push_hook(scope, tag, value);
            value
        } else {
            match self.replay_hook(scope, tag) {
                Some(value) => value,
                // A hook the first render never saw; append so later
                // renders replay it instead of re-creating.
                None => {
                    let value = create(self);
                    self.scopes.push_hook(scope, tag, value);
                    value
                }
            }
        }
    }

    fn hook_scope(&self) -> Option<ScopeId> {
        (self.current_scope >= 0).then(|| ScopeId(self.current_scope as u32))
    }

    /// Advance the hook cursor, expecting `tag`. A mismatch is a
    /// rules-of-hooks violation: we log and hand back whatever was stored,
    /// which mis-routes but cannot corrupt any store.
    fn replay_hook(&mut self, scope: ScopeId, tag: HookTag) -> Option<u32> {
        match self.scopes.next_hook(scope) {
            Some((stored_tag, value)) => {
                if stored_tag != tag {
                    log::error!(
                        "hook order mismatch in scope {}: expected {:?}, found {:?}. \
                         Hooks must run in the same order on every render.",
                        scope.0,
                        tag,
                        stored_tag
                    );
                }
                Some(value)
            }
            None => {
                log::error!(
                    "scope {} used more hooks than its first render registered",
                    scope.0
                );
                None
            }
        }
    }

    // -- lifecycle --------------------------------------------------------

    /// Destroy a scope and release everything its hooks own: signals,
    /// strings, memos, effects, and its registered handlers.
    pub fn destroy_scope(&mut self, id: ScopeId) {
        let Some(record) = self.scopes.destroy(id) else {
            return;
        };
        for &(tag, value) in record.hooks() {
            match tag {
                HookTag::Signal => {
                    self.signals.destroy(value);
                }
                HookTag::StringSignal => {
                    self.strings.destroy(value);
                }
                HookTag::Memo => {
                    if let Some(memo) = self.memos.remove(value) {
                        self.signals.clear_context(memo.ctx);
                        self.memo_by_context.remove(&memo.ctx);
                        self.signals.destroy(memo.ctx);
                        self.signals.destroy(memo.output);
                    }
                }
                HookTag::Effect => {
                    if let Some(effect) = self.effects.remove(value) {
                        self.signals.clear_context(effect.ctx);
                        self.effect_by_context.remove(&effect.ctx);
                        self.signals.destroy(effect.ctx);
                    }
                }
            }
        }
        self.handlers.remove_scope(id);
        self.dirty.shift_remove(&id.0);
        log::debug!("destroyed scope {}", id.0);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
