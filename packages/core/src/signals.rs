//! Value storage for the reactive graph.
//!
//! The signal store is a memcpy-only byte store: each entry holds a fixed
//! number of value bytes, a subscriber set of reactive-context ids, and a
//! monotonic version counter. No type tag is stored - callers must read and
//! write with a consistent `T`, and `T: Copy` keeps heap-owning types out at
//! the type level. Heap strings live in the companion [`StringStore`] and
//! carry their subscriptions through a paired version signal.

use slab::Slab;
use smallvec::SmallVec;
use std::mem::{size_of, MaybeUninit};

pub struct SignalStore {
    entries: Slab<SignalEntry>,
}

struct SignalEntry {
    bytes: SmallVec<[u8; 16]>,
    subscribers: Vec<u32>,
    version: u32,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::with_capacity(32)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Slab::with_capacity(capacity) }
    }

    pub fn create<T: Copy>(&mut self, initial: T) -> u32 {
        let mut bytes = SmallVec::new();
        bytes.resize(size_of::<T>(), 0);
        write_bytes(&mut bytes, initial);
        self.entries.insert(SignalEntry {
            bytes,
            subscribers: Vec::new(),
            version: 0,
        }) as u32
    }

    pub fn try_read<T: Copy>(&self, key: u32) -> Option<T> {
        let entry = self.entries.get(key as usize)?;
        debug_assert_eq!(entry.bytes.len(), size_of::<T>(), "signal read with wrong type");
        if entry.bytes.len() != size_of::<T>() {
            return None;
        }
        let mut out = MaybeUninit::<T>::uninit();
        unsafe {
            std::ptr::copy_nonoverlapping(
                entry.bytes.as_ptr(),
                out.as_mut_ptr() as *mut u8,
                size_of::<T>(),
            );
            Some(out.assume_init())
        }
    }

    /// Read a signal's value. A dead or unknown key reads as the default.
    pub fn read<T: Copy + Default>(&self, key: u32) -> T {
        self.try_read(key).unwrap_or_default()
    }

    /// Overwrite the value bytes and bump the version. Writing to a dead
    /// signal is a no-op; returns whether the write landed.
    pub fn write<T: Copy>(&mut self, key: u32, value: T) -> bool {
        let Some(entry) = self.entries.get_mut(key as usize) else {
            log::warn!("write to dead signal {key}");
            return false;
        };
        debug_assert_eq!(entry.bytes.len(), size_of::<T>(), "signal write with wrong type");
        if entry.bytes.len() != size_of::<T>() {
            return false;
        }
        write_bytes(&mut entry.bytes, value);
        entry.version = entry.version.wrapping_add(1);
        true
    }

    pub fn version(&self, key: u32) -> u32 {
        self.entries.get(key as usize).map(|e| e.version).unwrap_or(0)
    }

    /// Subscribe a reactive context to this signal. Idempotent.
    pub fn subscribe(&mut self, key: u32, ctx: u32) {
        if let Some(entry) = self.entries.get_mut(key as usize) {
            if !entry.subscribers.contains(&ctx) {
                entry.subscribers.push(ctx);
            }
        }
    }

    pub fn unsubscribe(&mut self, key: u32, ctx: u32) {
        if let Some(entry) = self.entries.get_mut(key as usize) {
            if let Some(at) = entry.subscribers.iter().position(|&s| s == ctx) {
                entry.subscribers.swap_remove(at);
            }
        }
    }

    /// Snapshot the subscriber set. The runtime iterates the copy so that
    /// subscription churn during notification cannot alias the store.
    pub fn subscribers(&self, key: u32) -> Vec<u32> {
        self.entries
            .get(key as usize)
            .map(|e| e.subscribers.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, key: u32) -> usize {
        self.entries.get(key as usize).map(|e| e.subscribers.len()).unwrap_or(0)
    }

    /// Drop a context's subscription from every signal.
    ///
    /// Full scan; memo and effect dependency sets are re-established on each
    /// recompute so this is the clearing half of that cycle.
    pub fn clear_context(&mut self, ctx: u32) {
        for (_, entry) in self.entries.iter_mut() {
            if let Some(at) = entry.subscribers.iter().position(|&s| s == ctx) {
                entry.subscribers.swap_remove(at);
            }
        }
    }

    pub fn destroy(&mut self, key: u32) -> bool {
        self.entries.try_remove(key as usize).is_some()
    }

    pub fn is_alive(&self, key: u32) -> bool {
        self.entries.contains(key as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new()
    }
}

fn write_bytes<T: Copy>(bytes: &mut SmallVec<[u8; 16]>, value: T) {
    debug_assert_eq!(bytes.len(), size_of::<T>());
    unsafe {
        std::ptr::copy_nonoverlapping(
            &value as *const T as *const u8,
            bytes.as_mut_ptr(),
            size_of::<T>(),
        );
    }
}

/// Slab-allocated owned strings.
///
/// Signals cannot hold heap types, so string state lives here. Reads are
/// never tracked - the paired version signal in the [`SignalStore`] carries
/// the subscriptions and is bumped on every string write.
pub struct StringStore {
    entries: Slab<String>,
}

impl StringStore {
    pub fn new() -> Self {
        Self { entries: Slab::new() }
    }

    pub fn create(&mut self, initial: impl Into<String>) -> u32 {
        self.entries.insert(initial.into()) as u32
    }

    /// Read a copy of the string. A dead key reads as empty.
    pub fn read(&self, key: u32) -> String {
        self.entries.get(key as usize).cloned().unwrap_or_default()
    }

    pub fn write(&mut self, key: u32, value: impl Into<String>) -> bool {
        match self.entries.get_mut(key as usize) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => {
                log::warn!("write to dead string {key}");
                false
            }
        }
    }

    pub fn destroy(&mut self, key: u32) -> bool {
        self.entries.try_remove(key as usize).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for StringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bump_the_version_and_land() {
        let mut signals = SignalStore::new();
        let key = signals.create(7i32);
        assert_eq!(signals.read::<i32>(key), 7);
        assert_eq!(signals.version(key), 0);

        assert!(signals.write(key, 12i32));
        assert_eq!(signals.read::<i32>(key), 12);
        assert_eq!(signals.version(key), 1);

        assert!(signals.write(key, -3i32));
        assert_eq!(signals.read::<i32>(key), -3);
        assert_eq!(signals.version(key), 2);
    }

    #[test]
    fn subscribe_is_idempotent_and_unsubscribe_swap_removes() {
        let mut signals = SignalStore::new();
        let key = signals.create(0i32);

        signals.subscribe(key, 4);
        signals.subscribe(key, 9);
        signals.subscribe(key, 4);
        signals.subscribe(key, 4);
        assert_eq!(signals.subscriber_count(key), 2);
        assert_eq!(signals.subscribers(key), vec![4, 9]);

        signals.unsubscribe(key, 4);
        assert_eq!(signals.subscribers(key), vec![9]);
        signals.unsubscribe(key, 4);
        assert_eq!(signals.subscribers(key), vec![9]);
    }

    #[test]
    fn dead_signals_recover_silently() {
        let mut signals = SignalStore::new();
        let key = signals.create(1i32);
        assert!(signals.destroy(key));

        assert!(!signals.write(key, 2i32));
        assert_eq!(signals.read::<i32>(key), 0);
        assert_eq!(signals.try_read::<i32>(key), None);
        assert_eq!(signals.subscriber_count(key), 0);
        assert!(!signals.destroy(key));
    }

    #[test]
    fn bool_signals_share_the_store() {
        let mut signals = SignalStore::new();
        let flag = signals.create(false);
        assert!(!signals.read::<bool>(flag));
        signals.write(flag, true);
        assert!(signals.read::<bool>(flag));
    }

    #[test]
    fn clear_context_scrubs_every_signal() {
        let mut signals = SignalStore::new();
        let a = signals.create(0i32);
        let b = signals.create(0i32);
        signals.subscribe(a, 7);
        signals.subscribe(b, 7);
        signals.subscribe(b, 8);

        signals.clear_context(7);
        assert_eq!(signals.subscriber_count(a), 0);
        assert_eq!(signals.subscribers(b), vec![8]);
    }

    #[test]
    fn string_store_replaces_in_place() {
        let mut strings = StringStore::new();
        let key = strings.create("hello");
        assert_eq!(strings.read(key), "hello");

        assert!(strings.write(key, "world"));
        assert_eq!(strings.read(key), "world");

        assert!(strings.destroy(key));
        assert_eq!(strings.read(key), "");
        assert!(!strings.write(key, "gone"));
    }
}
