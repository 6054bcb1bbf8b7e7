use slab::Slab;

pub use weft_protocol::ElementId;

/// Issues the dense element ids the host observes.
///
/// Ids are slab keys: stable until freed, then recycled for later nodes. An
/// id is never alive for two nodes at once. Slot 0 is allocated at
/// construction for the root container and can never be freed.
pub struct ElementArena {
    slots: Slab<ElementSlot>,
}

struct ElementSlot {
    permanent: bool,
}

impl ElementArena {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Slab::with_capacity(capacity);
        let root = slots.insert(ElementSlot { permanent: true });
        debug_assert_eq!(root, 0);
        Self { slots }
    }

    pub fn alloc(&mut self) -> ElementId {
        ElementId(self.slots.insert(ElementSlot { permanent: false }) as u32)
    }

    /// Release an id back to the free list. Freeing the root or an already
    /// dead id is a no-op.
    pub fn free(&mut self, id: ElementId) {
        if id.0 == 0 {
            return;
        }
        let permanent = match self.slots.get(id.0 as usize) {
            Some(slot) => slot.permanent,
            None => return,
        };
        if !permanent {
            self.slots.remove(id.0 as usize);
        }
    }

    pub fn is_alive(&self, id: ElementId) -> bool {
        self.slots.contains(id.0 as usize)
    }

    /// Live slot count, including the root.
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Live slot count, excluding the root.
    pub fn user_count(&self) -> usize {
        self.slots.len() - 1
    }
}

impl Default for ElementArena {
    fn default() -> Self {
        Self::new()
    }
}
