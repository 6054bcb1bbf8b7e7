//! An event system without closures: handlers are finite intents.
//!
//! Each registered handler is an action tag plus the signal key and operand
//! the action applies to. Dispatch is a switch on the tag - no v-tables, and
//! nothing to capture or drop when a scope goes away. Open-ended behavior
//! goes through `Custom`, which just marks the owning scope dirty and lets
//! the application route on the handler id it already knows.

use slab::Slab;

use crate::runtime::Runtime;
use crate::scopes::ScopeId;

pub use weft_protocol::{Action, EventKind};

#[derive(Clone, Debug, PartialEq)]
pub struct HandlerEntry {
    pub scope: u32,
    pub action: Action,
    /// For `SetString`, the string-store key; otherwise a signal key.
    pub signal: u32,
    /// For `SetString`, the companion version signal key.
    pub operand: i32,
    pub event: String,
}

pub struct HandlerRegistry {
    handlers: Slab<HandlerEntry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { handlers: Slab::with_capacity(capacity) }
    }

    pub fn register(&mut self, entry: HandlerEntry) -> u32 {
        self.handlers.insert(entry) as u32
    }

    pub fn remove(&mut self, id: u32) -> bool {
        self.handlers.try_remove(id as usize).is_some()
    }

    pub fn get(&self, id: u32) -> Option<&HandlerEntry> {
        self.handlers.get(id as usize)
    }

    /// Drop every handler owned by a scope.
    pub fn remove_scope(&mut self, scope: ScopeId) {
        self.handlers.retain(|_, entry| entry.scope != scope.0);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Dispatch an event against a handler.
    ///
    /// Returns `true` iff a signal action fired. Tags that only mark the
    /// owning scope dirty (`None`, `Custom`, and value-carrying tags invoked
    /// without their value) return `false` so the application knows to route
    /// the event itself.
    pub fn dispatch(&mut self, handler: u32, event: EventKind) -> bool {
        let Some(entry) = self.handlers.get(handler).cloned() else {
            log::warn!("dispatch of unknown handler {handler}");
            return false;
        };
        log::debug!("dispatch handler {handler} action {:?} event {:?}", entry.action, event);

        match entry.action {
            Action::None => {
                self.mark_scope_dirty(ScopeId(entry.scope));
                false
            }
            Action::SetI32 => {
                self.write_signal(entry.signal, entry.operand);
                true
            }
            Action::AddI32 => {
                let value: i32 = self.peek_signal(entry.signal);
                self.write_signal(entry.signal, value.wrapping_add(entry.operand));
                true
            }
            Action::SubI32 => {
                let value: i32 = self.peek_signal(entry.signal);
                self.write_signal(entry.signal, value.wrapping_sub(entry.operand));
                true
            }
            Action::Toggle => {
                let value: bool = self.peek_signal(entry.signal);
                self.write_signal(entry.signal, !value);
                true
            }
            // These carry a payload; without one the best we can do is wake
            // the scope.
            Action::SetInput | Action::SetString | Action::KeyEnterCustom | Action::Custom => {
                self.mark_scope_dirty(ScopeId(entry.scope));
                false
            }
        }
    }

    /// Dispatch with an i32 payload, for `SetInput`. Other tags fall back to
    /// the plain dispatch.
    pub fn dispatch_with_i32(&mut self, handler: u32, event: EventKind, value: i32) -> bool {
        let Some(entry) = self.handlers.get(handler) else {
            log::warn!("dispatch of unknown handler {handler}");
            return false;
        };
        match entry.action {
            Action::SetInput => {
                let signal = entry.signal;
                self.write_signal(signal, value);
                true
            }
            _ => self.dispatch(handler, event),
        }
    }

    /// Dispatch with a string payload, for `SetString` and the Enter-gated
    /// custom action. Other tags fall back to the plain dispatch.
    pub fn dispatch_with_string(&mut self, handler: u32, event: EventKind, value: &str) -> bool {
        let Some(entry) = self.handlers.get(handler).cloned() else {
            log::warn!("dispatch of unknown handler {handler}");
            return false;
        };
        match entry.action {
            Action::SetString => {
                self.write_string_signal(entry.signal, entry.operand as u32, value);
                true
            }
            Action::KeyEnterCustom => {
                if value == "Enter" {
                    self.mark_scope_dirty(ScopeId(entry.scope));
                    true
                } else {
                    false
                }
            }
            _ => self.dispatch(handler, event),
        }
    }
}
