#![doc = include_str!("../README.md")]

pub mod abi;
pub(crate) mod app;
pub(crate) mod arena;
pub(crate) mod create;
pub(crate) mod diff;
pub mod dsl;
pub(crate) mod events;
pub(crate) mod nodes;
pub(crate) mod reactive;
pub(crate) mod runtime;
pub(crate) mod scheduler;
pub(crate) mod scopes;
pub(crate) mod signals;
pub(crate) mod templates;
pub(crate) mod virtual_dom;

pub(crate) mod innerlude {
    pub use crate::app::*;
    pub use crate::arena::*;
    pub use crate::events::*;
    pub use crate::nodes::*;
    pub use crate::reactive::*;
    pub use crate::runtime::*;
    pub use crate::scheduler::*;
    pub use crate::scopes::*;
    pub use crate::signals::*;
    pub use crate::templates::*;
    pub use crate::virtual_dom::*;
}

pub use crate::innerlude::{
    slots_match, Action, AppContext, AttrValue, AutoBinding, Capacities, Component, DirtyScope, DynSlotKind,
    DynamicAttr, DynamicNode, Effect, EffectStore, ElementArena, ElementId, EventKind,
    HandlerEntry, HandlerRegistry, HookTag, Memo, MemoStore, RenderBuilder, RenderFrame, Runtime,
    Scheduler, ScopeArena, ScopeId, ScopeRecord, SignalStore, SlotPath, StringStore, Template,
    TemplateAttr, TemplateId, TemplateNode, TemplateRegistry, VNode, VNodeBuilder, VNodeId,
    VNodeKind, VNodeStore, VirtualDom,
};

pub mod prelude {
    pub use crate::app::{AppContext, Component, RenderBuilder};
    pub use crate::arena::ElementId;
    pub use crate::dsl::{self, Node, AUTO_SLOT};
    pub use crate::events::{Action, EventKind, HandlerEntry};
    pub use crate::nodes::{AttrValue, DynamicAttr, DynamicNode, VNodeBuilder, VNodeId};
    pub use crate::runtime::Runtime;
    pub use crate::scopes::ScopeId;
    pub use crate::templates::TemplateId;
    pub use crate::virtual_dom::{Capacities, VirtualDom};
    pub use weft_protocol::{read_mutations, Mutation, MutationWriter};
}
