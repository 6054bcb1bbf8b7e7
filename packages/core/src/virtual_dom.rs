//! The app shell: one value owning the runtime, the vnode store, the
//! element arena, and the scheduler.
//!
//! Everything is explicit state threaded through operations - there are no
//! globals and no pointers between subsystems, so a `VirtualDom` can be
//! boxed, moved, and handed across the WASM boundary as a single opaque
//! pointer.

use weft_protocol::{MutationWriter, ROOT_ID};

use crate::arena::ElementArena;
use crate::nodes::{VNodeId, VNodeStore};
use crate::runtime::Runtime;
use crate::scheduler::Scheduler;

/// Initial capacities for the slab arenas. The defaults fit a small app
/// without reallocation; heavy list UIs should raise `elements`.
#[derive(Clone, Copy, Debug)]
pub struct Capacities {
    pub scopes: usize,
    pub elements: usize,
    pub signals: usize,
    pub vnodes: usize,
    pub handlers: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            scopes: 100,
            elements: 2000,
            signals: 64,
            vnodes: 256,
            handlers: 32,
        }
    }
}

pub struct VirtualDom {
    pub runtime: Runtime,
    pub vnodes: VNodeStore,
    pub elements: ElementArena,
    pub scheduler: Scheduler,
}

impl VirtualDom {
    pub fn new() -> Self {
        Self::with_capacities(Capacities::default())
    }

    pub fn with_capacities(caps: Capacities) -> Self {
        Self {
            runtime: Runtime::with_capacities(&caps),
            vnodes: VNodeStore::with_capacity(caps.vnodes),
            elements: ElementArena::with_capacity(caps.elements),
            scheduler: Scheduler::new(),
        }
    }

    /// Create a vnode's DOM and append its roots to the host's root
    /// container. Returns the number of roots appended.
    pub fn mount(&mut self, to: &mut MutationWriter, vnode: VNodeId) -> u32 {
        let created = self.create_node(to, vnode);
        to.append_children(ROOT_ID, created);
        created
    }

    /// Diff `old` against `new`, emitting the patch stream. A thin bracket
    /// over the diff engine, named for symmetry with [`mount`].
    ///
    /// [`mount`]: VirtualDom::mount
    pub fn diff(&mut self, to: &mut MutationWriter, old: VNodeId, new: VNodeId) {
        self.diff_node(to, old, new);
    }
}

impl Default for VirtualDom {
    fn default() -> Self {
        Self::new()
    }
}
