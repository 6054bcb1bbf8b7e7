//! Virtual nodes: templates parameterized with dynamic content, plus the
//! mount state the create engine assigns and the diff engine transfers.

use slab::Slab;

use crate::arena::ElementId;
use crate::signals::StringStore;
use crate::templates::{TemplateId, TemplateRegistry};

pub type VNodeId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VNodeKind {
    TemplateRef,
    Text,
    Placeholder,
    Fragment,
}

/// Payload for a dynamic node slot.
#[derive(Clone, Debug, PartialEq)]
pub enum DynamicNode {
    Text(String),
    Placeholder,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Text(String),
    Int(i32),
    Bool(bool),
    /// A registered handler id; the attr name is the event name.
    Event(u32),
    /// Attribute removal.
    None,
}

impl AttrValue {
    /// The string the host receives in a SetAttribute payload. `None`
    /// encodes as empty, which the host interprets as removal.
    pub fn encode(&self) -> String {
        match self {
            AttrValue::Text(text) => text.clone(),
            AttrValue::Int(value) => value.to_string(),
            AttrValue::Bool(value) => if *value { "true" } else { "false" }.to_string(),
            AttrValue::Event(_) | AttrValue::None => String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DynamicAttr {
    pub name: String,
    pub value: AttrValue,
}

pub struct VNode {
    pub kind: VNodeKind,
    pub template: TemplateId,
    pub key: Option<String>,
    /// Payload for `Text` vnodes.
    pub text: String,

    /// One entry per dynamic node slot, in declared order.
    pub dynamic_nodes: Vec<DynamicNode>,
    /// One entry per dynamic attr slot, in declared order.
    pub dynamic_attrs: Vec<DynamicAttr>,
    /// Fragment children.
    pub children: Vec<VNodeId>,

    // Mount state, populated by the create engine and transferred by diff.
    pub root_ids: Vec<ElementId>,
    pub dyn_node_ids: Vec<ElementId>,
    pub dyn_attr_ids: Vec<ElementId>,
    pub mounted: bool,
}

impl VNode {
    fn bare(kind: VNodeKind) -> Self {
        Self {
            kind,
            template: 0,
            key: None,
            text: String::new(),
            dynamic_nodes: Vec::new(),
            dynamic_attrs: Vec::new(),
            children: Vec::new(),
            root_ids: Vec::new(),
            dyn_node_ids: Vec::new(),
            dyn_attr_ids: Vec::new(),
            mounted: false,
        }
    }

    pub fn first_root(&self) -> Option<ElementId> {
        self.root_ids.first().copied()
    }

    pub fn last_root(&self) -> Option<ElementId> {
        self.root_ids.last().copied()
    }
}

pub struct VNodeStore {
    nodes: Slab<VNode>,
}

impl VNodeStore {
    pub fn new() -> Self {
        Self::with_capacity(32)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { nodes: Slab::with_capacity(capacity) }
    }

    pub fn push_template_ref(&mut self, template: TemplateId) -> VNodeId {
        let mut node = VNode::bare(VNodeKind::TemplateRef);
        node.template = template;
        self.nodes.insert(node) as VNodeId
    }

    pub fn push_template_ref_keyed(&mut self, template: TemplateId, key: impl Into<String>) -> VNodeId {
        let mut node = VNode::bare(VNodeKind::TemplateRef);
        node.template = template;
        node.key = Some(key.into());
        self.nodes.insert(node) as VNodeId
    }

    pub fn push_text(&mut self, text: impl Into<String>) -> VNodeId {
        let mut node = VNode::bare(VNodeKind::Text);
        node.text = text.into();
        self.nodes.insert(node) as VNodeId
    }

    /// A standalone placeholder vnode. A nonzero `eid` wraps an element the
    /// host already knows about; zero lets the create engine allocate one.
    pub fn push_placeholder(&mut self, eid: ElementId) -> VNodeId {
        let mut node = VNode::bare(VNodeKind::Placeholder);
        if eid.0 != 0 {
            node.root_ids.push(eid);
            node.mounted = true;
        }
        self.nodes.insert(node) as VNodeId
    }

    pub fn push_fragment(&mut self) -> VNodeId {
        self.nodes.insert(VNode::bare(VNodeKind::Fragment)) as VNodeId
    }

    pub fn push_dynamic_node(&mut self, vnode: VNodeId, payload: DynamicNode) {
        if let Some(node) = self.get_mut(vnode) {
            node.dynamic_nodes.push(payload);
        }
    }

    pub fn push_dynamic_attr(&mut self, vnode: VNodeId, attr: DynamicAttr) {
        if let Some(node) = self.get_mut(vnode) {
            node.dynamic_attrs.push(attr);
        }
    }

    pub fn push_fragment_child(&mut self, vnode: VNodeId, child: VNodeId) {
        if let Some(node) = self.get_mut(vnode) {
            debug_assert_eq!(node.kind, VNodeKind::Fragment);
            node.children.push(child);
        }
    }

    pub fn get(&self, vnode: VNodeId) -> Option<&VNode> {
        self.nodes.get(vnode as usize)
    }

    pub fn get_mut(&mut self, vnode: VNodeId) -> Option<&mut VNode> {
        self.nodes.get_mut(vnode as usize)
    }

    pub fn kind(&self, vnode: VNodeId) -> Option<VNodeKind> {
        self.get(vnode).map(|n| n.kind)
    }

    pub fn template_id(&self, vnode: VNodeId) -> Option<TemplateId> {
        self.get(vnode).map(|n| n.template)
    }

    pub fn key(&self, vnode: VNodeId) -> Option<&str> {
        self.get(vnode)?.key.as_deref()
    }

    pub fn has_key(&self, vnode: VNodeId) -> bool {
        self.key(vnode).is_some()
    }

    pub fn is_mounted(&self, vnode: VNodeId) -> bool {
        self.get(vnode).map(|n| n.mounted).unwrap_or(false)
    }

    pub fn child_count(&self, vnode: VNodeId) -> usize {
        self.get(vnode).map(|n| n.children.len()).unwrap_or(0)
    }

    pub fn child(&self, vnode: VNodeId, index: usize) -> Option<VNodeId> {
        self.get(vnode)?.children.get(index).copied()
    }

    /// Drop a vnode record and, for fragments, its children. Element ids are
    /// not touched - those are recycled by the diff engine when nodes leave
    /// the DOM.
    pub fn recycle(&mut self, vnode: VNodeId) {
        if let Some(node) = self.nodes.try_remove(vnode as usize) {
            for child in node.children {
                self.recycle(child);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for VNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot helper that fills a TEMPLATE_REF vnode's slots in the
/// template's declared order.
///
/// The builder does not check slot arity - the create engine tolerates
/// missing payloads by treating them as placeholders - but filling slots
/// out of declared order will render the wrong content.
pub struct VNodeBuilder<'a> {
    store: &'a mut VNodeStore,
    vnode: VNodeId,
}

impl<'a> VNodeBuilder<'a> {
    pub fn new(store: &'a mut VNodeStore, vnode: VNodeId) -> Self {
        debug_assert_eq!(store.kind(vnode), Some(VNodeKind::TemplateRef));
        Self { store, vnode }
    }

    pub fn add_dyn_text(&mut self, value: impl Into<String>) -> &mut Self {
        self.store.push_dynamic_node(self.vnode, DynamicNode::Text(value.into()));
        self
    }

    pub fn add_dyn_placeholder(&mut self) -> &mut Self {
        self.store.push_dynamic_node(self.vnode, DynamicNode::Placeholder);
        self
    }

    /// Fill a text slot from a string signal's current value.
    pub fn add_dyn_text_signal(&mut self, strings: &StringStore, string_key: u32) -> &mut Self {
        let value = strings.read(string_key);
        self.store.push_dynamic_node(self.vnode, DynamicNode::Text(value));
        self
    }

    pub fn add_dyn_event(&mut self, event: impl Into<String>, handler: u32) -> &mut Self {
        self.store.push_dynamic_attr(
            self.vnode,
            DynamicAttr { name: event.into(), value: AttrValue::Event(handler) },
        );
        self
    }

    pub fn add_dyn_text_attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.store.push_dynamic_attr(
            self.vnode,
            DynamicAttr { name: name.into(), value: AttrValue::Text(value.into()) },
        );
        self
    }

    pub fn add_dyn_int_attr(&mut self, name: impl Into<String>, value: i32) -> &mut Self {
        self.store.push_dynamic_attr(
            self.vnode,
            DynamicAttr { name: name.into(), value: AttrValue::Int(value) },
        );
        self
    }

    pub fn add_dyn_bool_attr(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
        self.store.push_dynamic_attr(
            self.vnode,
            DynamicAttr { name: name.into(), value: AttrValue::Bool(value) },
        );
        self
    }

    pub fn add_dyn_none_attr(&mut self, name: impl Into<String>) -> &mut Self {
        self.store.push_dynamic_attr(
            self.vnode,
            DynamicAttr { name: name.into(), value: AttrValue::None },
        );
        self
    }

    pub fn finish(self) -> VNodeId {
        self.vnode
    }
}

/// Check a vnode's slot arity against its template's declared counts.
pub fn slots_match(store: &VNodeStore, templates: &TemplateRegistry, vnode: VNodeId) -> bool {
    let Some(node) = store.get(vnode) else { return false };
    let Some(template) = templates.get(node.template) else { return false };
    node.dynamic_nodes.len() == template.dynamic_slot_count() as usize
        && node.dynamic_attrs.len() == template.dynamic_attr_count as usize
}
