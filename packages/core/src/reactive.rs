//! Memos and effects: derived computations and side effects, each owning a
//! reactive context.
//!
//! The context id of a memo or effect is the key of a throwaway i32 signal
//! allocated alongside it. That signal's value slot doubles as the saved
//! previous context while a computation runs, which keeps the compute
//! bracket re-entrant without a separate stack.

use slab::Slab;

use crate::runtime::Runtime;
use crate::scopes::ScopeId;

#[derive(Clone, Copy, Debug)]
pub struct Memo {
    /// The context signal whose key is this memo's reactive context id.
    pub ctx: u32,
    /// Cache for the computed value.
    pub output: u32,
    pub scope: u32,
    pub dirty: bool,
    pub computing: bool,
}

pub struct MemoStore {
    memos: Slab<Memo>,
}

impl MemoStore {
    pub fn new() -> Self {
        Self { memos: Slab::new() }
    }

    pub fn insert(&mut self, memo: Memo) -> u32 {
        self.memos.insert(memo) as u32
    }

    pub fn get(&self, id: u32) -> Option<&Memo> {
        self.memos.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Memo> {
        self.memos.get_mut(id as usize)
    }

    pub fn remove(&mut self, id: u32) -> Option<Memo> {
        self.memos.try_remove(id as usize)
    }

    pub fn len(&self) -> usize {
        self.memos.len()
    }
}

impl Default for MemoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Effect {
    pub ctx: u32,
    pub scope: u32,
    pub pending: bool,
    pub running: bool,
}

pub struct EffectStore {
    effects: Slab<Effect>,
}

impl EffectStore {
    pub fn new() -> Self {
        Self { effects: Slab::new() }
    }

    pub fn insert(&mut self, effect: Effect) -> u32 {
        self.effects.insert(effect) as u32
    }

    pub fn get(&self, id: u32) -> Option<&Effect> {
        self.effects.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Effect> {
        self.effects.get_mut(id as usize)
    }

    pub fn remove(&mut self, id: u32) -> Option<Effect> {
        self.effects.try_remove(id as usize)
    }

    /// Ids of every effect currently flagged pending, in slab order.
    pub fn pending(&self) -> Vec<u32> {
        self.effects
            .iter()
            .filter(|(_, e)| e.pending)
            .map(|(id, _)| id as u32)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }
}

impl Default for EffectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Allocate a memo owned by `scope`, with its context signal, its output
    /// cache primed to `initial`, and the context -> memo routing entry.
    pub fn create_memo(&mut self, scope: ScopeId, initial: i32) -> u32 {
        let ctx = self.signals.create(-1i32);
        let output = self.signals.create(initial);
        let memo = self.memos.insert(Memo {
            ctx,
            output,
            scope: scope.0,
            dirty: false,
            computing: false,
        });
        self.register_memo_context(ctx, memo);
        memo
    }

    /// Enter a memo's compute bracket: stash the current context in the
    /// context signal's value slot, drop the memo's old subscriptions, and
    /// install the memo as the tracking context.
    pub fn begin_compute(&mut self, memo: u32) {
        let Some(&Memo { ctx, .. }) = self.memos.get(memo) else {
            log::warn!("begin_compute on dead memo {memo}");
            return;
        };
        self.signals.write(ctx, self.current_context());
        self.signals.clear_context(ctx);
        if let Some(memo) = self.memos.get_mut(memo) {
            memo.computing = true;
        }
        self.install_context(ctx as i32);
    }

    /// Leave the compute bracket: cache the value directly (no subscriber
    /// notification - dependents were already queued when the dependency
    /// was written), clear dirty, restore the saved context.
    pub fn end_compute(&mut self, memo: u32, value: i32) {
        let Some(&Memo { ctx, output, .. }) = self.memos.get(memo) else {
            return;
        };
        self.signals.write(output, value);
        if let Some(memo) = self.memos.get_mut(memo) {
            memo.dirty = false;
            memo.computing = false;
        }
        let saved: i32 = self.signals.read(ctx);
        self.install_context(saved);
    }

    /// Read the cached value and subscribe the caller's context to the
    /// output signal. Never recomputes - callers check [`memo_is_dirty`]
    /// and drive the compute bracket themselves.
    ///
    /// [`memo_is_dirty`]: Runtime::memo_is_dirty
    pub fn read_memo(&mut self, memo: u32) -> i32 {
        let Some(&Memo { output, .. }) = self.memos.get(memo) else {
            return 0;
        };
        let ctx = self.current_context();
        if ctx >= 0 {
            self.signals.subscribe(output, ctx as u32);
        }
        self.signals.read(output)
    }

    pub fn memo_is_dirty(&self, memo: u32) -> bool {
        self.memos.get(memo).map(|m| m.dirty).unwrap_or(false)
    }

    pub fn create_effect(&mut self, scope: ScopeId) -> u32 {
        let ctx = self.signals.create(-1i32);
        let effect = self.effects.insert(Effect {
            ctx,
            scope: scope.0,
            pending: false,
            running: false,
        });
        self.register_effect_context(ctx, effect);
        effect
    }

    /// Enter an effect's run bracket. Same context discipline as memos, but
    /// there is no output cache.
    pub fn begin_effect(&mut self, effect: u32) {
        let Some(&Effect { ctx, .. }) = self.effects.get(effect) else {
            log::warn!("begin_effect on dead effect {effect}");
            return;
        };
        self.signals.write(ctx, self.current_context());
        self.signals.clear_context(ctx);
        if let Some(effect) = self.effects.get_mut(effect) {
            effect.running = true;
        }
        self.install_context(ctx as i32);
    }

    pub fn end_effect(&mut self, effect: u32) {
        let Some(&Effect { ctx, .. }) = self.effects.get(effect) else {
            return;
        };
        if let Some(effect) = self.effects.get_mut(effect) {
            effect.pending = false;
            effect.running = false;
        }
        let saved: i32 = self.signals.read(ctx);
        self.install_context(saved);
    }

    pub fn effect_is_pending(&self, effect: u32) -> bool {
        self.effects.get(effect).map(|e| e.pending).unwrap_or(false)
    }

    /// The effects the host should run now that a flush has completed.
    /// Pending flags clear when each effect's run bracket closes.
    pub fn take_pending_effects(&self) -> Vec<u32> {
        self.effects.pending()
    }
}
