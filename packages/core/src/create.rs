//! The create engine: walk a vnode, allocate element ids, and emit the
//! opcode sequence that constructs it in the DOM.
//!
//! Allocation order is deterministic and part of the contract - hosts and
//! tests rely on the ids a given tree produces. Slot mutations are emitted
//! grouped under the root that contains the slot, so a path always
//! addresses the topmost node on the host's stack; slots are numbered in
//! tree-walk order, which keeps the grouped emission in declared slot
//! order as well.

use fxhash::FxHashMap;
use weft_protocol::MutationWriter;

use crate::arena::ElementId;
use crate::nodes::{DynamicNode, VNodeId, VNodeKind};
use crate::templates::{DynSlotKind, Path, Template, TemplateNode};
use crate::virtual_dom::VirtualDom;

impl VirtualDom {
    /// Create a vnode's DOM, leaving the constructed roots on the host's
    /// stack. Returns the number of roots produced; the vnode's mount state
    /// is fully populated before return.
    pub fn create_node(&mut self, to: &mut MutationWriter, vnode: VNodeId) -> u32 {
        let Some(kind) = self.vnodes.kind(vnode) else {
            log::warn!("create of unknown vnode {vnode}");
            return 0;
        };

        match kind {
            VNodeKind::Text => {
                let id = self.elements.alloc();
                let node = self.vnodes.get_mut(vnode).unwrap();
                to.create_text_node(id, &node.text);
                node.root_ids = vec![id];
                node.mounted = true;
                1
            }
            VNodeKind::Placeholder => {
                let id = self.elements.alloc();
                to.create_placeholder(id);
                let node = self.vnodes.get_mut(vnode).unwrap();
                node.root_ids = vec![id];
                node.mounted = true;
                1
            }
            VNodeKind::Fragment => self.create_fragment(to, vnode),
            VNodeKind::TemplateRef => self.create_template_ref(to, vnode),
        }
    }

    /// Fragments flatten one level: the fragment's roots are the
    /// concatenation of its children's roots. An empty fragment renders a
    /// lone placeholder so it always has an anchor to grow from.
    fn create_fragment(&mut self, to: &mut MutationWriter, vnode: VNodeId) -> u32 {
        let children = self
            .vnodes
            .get(vnode)
            .map(|n| n.children.clone())
            .unwrap_or_default();

        if children.is_empty() {
            let id = self.elements.alloc();
            to.create_placeholder(id);
            let node = self.vnodes.get_mut(vnode).unwrap();
            node.root_ids = vec![id];
            node.mounted = true;
            return 1;
        }

        let mut created = 0;
        let mut roots = Vec::new();
        for child in children {
            created += self.create_node(to, child);
            if let Some(child_node) = self.vnodes.get(child) {
                roots.extend_from_slice(&child_node.root_ids);
            }
        }

        let node = self.vnodes.get_mut(vnode).unwrap();
        node.root_ids = roots;
        node.mounted = true;
        created
    }

    fn create_template_ref(&mut self, to: &mut MutationWriter, vnode: VNodeId) -> u32 {
        let template_id = self.vnodes.template_id(vnode).unwrap_or(0);
        let Some(template) = self.runtime.templates.get(template_id).cloned() else {
            log::error!("vnode {vnode} references unregistered template {template_id}");
            let id = self.elements.alloc();
            to.create_placeholder(id);
            let node = self.vnodes.get_mut(vnode).unwrap();
            node.root_ids = vec![id];
            node.mounted = true;
            return 1;
        };

        let (dynamic_nodes, dynamic_attrs) = {
            let node = self.vnodes.get(vnode).unwrap();
            (node.dynamic_nodes.clone(), node.dynamic_attrs.clone())
        };

        let total_slots = template.dynamic_slot_count() as usize;
        let mut root_ids = vec![ElementId(0); template.roots.len()];
        let mut dyn_node_ids = vec![ElementId(0); total_slots];
        let mut dyn_attr_ids = vec![ElementId(0); template.attr_paths.len()];

        // Attr targets sharing a path within this vnode reuse one AssignId.
        let mut assigned: FxHashMap<Path, ElementId> = FxHashMap::default();

        for (root_pos, &root_index) in template.roots.iter().enumerate() {
            match &template.nodes[root_index as usize] {
                TemplateNode::Element { .. } | TemplateNode::Text { .. } => {
                    let id = self.elements.alloc();
                    to.load_template(template_id, root_pos as u32, id);
                    root_ids[root_pos] = id;

                    self.hydrate_node_slots(
                        to,
                        &template,
                        root_pos,
                        &dynamic_nodes,
                        &mut dyn_node_ids,
                    );
                    self.hydrate_attr_slots(
                        to,
                        &template,
                        root_pos,
                        id,
                        &dynamic_attrs,
                        &mut dyn_attr_ids,
                        &mut assigned,
                    );
                }
                // A bare dynamic slot as a template root: the payload is
                // created directly, no LoadTemplate.
                TemplateNode::Dynamic { slot } => {
                    let slot = *slot as usize;
                    let payload = dynamic_nodes
                        .get(slot)
                        .cloned()
                        .unwrap_or(DynamicNode::Placeholder);
                    let id = self.elements.alloc();
                    match payload {
                        DynamicNode::Text(value) => to.create_text_node(id, &value),
                        DynamicNode::Placeholder => to.create_placeholder(id),
                    }
                    root_ids[root_pos] = id;
                    dyn_node_ids[slot] = id;
                }
                TemplateNode::DynamicText { slot } => {
                    let slot = *slot as usize;
                    let value = match dynamic_nodes.get(slot) {
                        Some(DynamicNode::Text(value)) => value.clone(),
                        _ => String::new(),
                    };
                    let id = self.elements.alloc();
                    to.create_text_node(id, &value);
                    root_ids[root_pos] = id;
                    dyn_node_ids[slot] = id;
                }
            }
        }

        log::trace!(
            "created template ref {vnode} (template {template_id}, {} roots)",
            template.roots.len()
        );

        let node = self.vnodes.get_mut(vnode).unwrap();
        node.root_ids = root_ids;
        node.dyn_node_ids = dyn_node_ids;
        node.dyn_attr_ids = dyn_attr_ids;
        node.mounted = true;
        template.roots.len() as u32
    }

    fn hydrate_node_slots(
        &mut self,
        to: &mut MutationWriter,
        template: &Template,
        root_pos: usize,
        dynamic_nodes: &[DynamicNode],
        dyn_node_ids: &mut [ElementId],
    ) {
        for slot in 0..template.node_paths.len() {
            if template.node_paths[slot].root as usize != root_pos {
                continue;
            }
            let path = &template.node_paths[slot].path;
            match template.node_slot_kinds[slot] {
                // The template already has a text node here; give it an id
                // and patch its content.
                DynSlotKind::Text => {
                    let id = self.elements.alloc();
                    to.assign_id(path, id);
                    dyn_node_ids[slot] = id;
                    if let Some(DynamicNode::Text(value)) = dynamic_nodes.get(slot) {
                        if !value.is_empty() {
                            to.set_text(id, value);
                        }
                    }
                }
                // The template has a placeholder here; build the payload
                // and splice it in.
                DynSlotKind::Node => {
                    let payload = dynamic_nodes
                        .get(slot)
                        .cloned()
                        .unwrap_or(DynamicNode::Placeholder);
                    let id = self.elements.alloc();
                    match payload {
                        DynamicNode::Text(value) => to.create_text_node(id, &value),
                        DynamicNode::Placeholder => to.create_placeholder(id),
                    }
                    to.replace_placeholder(path, 1);
                    dyn_node_ids[slot] = id;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn hydrate_attr_slots(
        &mut self,
        to: &mut MutationWriter,
        template: &Template,
        root_pos: usize,
        root_id: ElementId,
        dynamic_attrs: &[crate::nodes::DynamicAttr],
        dyn_attr_ids: &mut [ElementId],
        assigned: &mut FxHashMap<Path, ElementId>,
    ) {
        use crate::nodes::AttrValue;

        for slot in 0..template.attr_paths.len() {
            if template.attr_paths[slot].root as usize != root_pos {
                continue;
            }
            let path = &template.attr_paths[slot].path;

            // An empty path is the root element itself, which already has
            // an id from LoadTemplate.
            let id = if path.is_empty() {
                root_id
            } else if let Some(&id) = assigned.get(path) {
                id
            } else {
                let id = self.elements.alloc();
                to.assign_id(path, id);
                assigned.insert(path.clone(), id);
                id
            };
            dyn_attr_ids[slot] = id;

            let Some(attr) = dynamic_attrs.get(slot) else {
                continue;
            };
            match &attr.value {
                AttrValue::Event(_) => to.new_event_listener(id, &attr.name),
                AttrValue::None => {}
                value => to.set_attribute(id, 0, &attr.name, &value.encode()),
            }
        }
    }
}
