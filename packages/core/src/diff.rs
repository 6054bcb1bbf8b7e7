//! The diff engine: compare an old and a new vnode, transfer the old
//! mount state onto the new tree, and emit the minimal patch stream.
//!
//! "Minimal" is scoped: matching structure produces targeted SetText /
//! SetAttribute patches and keyed fragments reorder with InsertBefore /
//! InsertAfter against a moving anchor, but the engine does not compute an
//! edit-distance-minimal move sequence - correctness over cleverness.
//!
//! After a diff the new vnode carries a mount state sufficient for a
//! subsequent diff against it; the old vnode's recycled element ids are
//! back on the allocator's free list.

use fxhash::FxHashMap;
use weft_protocol::MutationWriter;

use crate::arena::ElementId;
use crate::nodes::{AttrValue, DynamicNode, VNodeId, VNodeKind};
use crate::templates::DynSlotKind;
use crate::virtual_dom::VirtualDom;

impl VirtualDom {
    /// Diff `old` against `new` in place. `new` must be unmounted; on a
    /// structural match it inherits `old`'s element ids.
    pub fn diff_node(&mut self, to: &mut MutationWriter, old: VNodeId, new: VNodeId) {
        let (Some(old_kind), Some(new_kind)) = (self.vnodes.kind(old), self.vnodes.kind(new))
        else {
            log::warn!("diff of unknown vnode pair ({old}, {new})");
            return;
        };

        match (old_kind, new_kind) {
            (VNodeKind::Text, VNodeKind::Text) => self.diff_text(to, old, new),
            (VNodeKind::Placeholder, VNodeKind::Placeholder) => self.transfer_roots(old, new),
            (VNodeKind::TemplateRef, VNodeKind::TemplateRef)
                if self.vnodes.template_id(old) == self.vnodes.template_id(new) =>
            {
                self.diff_template_ref(to, old, new)
            }
            (VNodeKind::Fragment, VNodeKind::Fragment) => self.diff_fragments(to, old, new),
            // Kind or template mismatch: full replacement.
            _ => self.replace_node(to, old, new),
        }
    }

    fn diff_text(&mut self, to: &mut MutationWriter, old: VNodeId, new: VNodeId) {
        let (root, old_text) = {
            let old_node = self.vnodes.get(old).unwrap();
            (old_node.first_root(), old_node.text.clone())
        };
        let Some(root) = root else {
            log::warn!("diff against unmounted text vnode {old}");
            return;
        };

        let new_node = self.vnodes.get_mut(new).unwrap();
        new_node.root_ids = vec![root];
        new_node.mounted = true;
        if new_node.text != old_text {
            let text = new_node.text.clone();
            to.set_text(root, &text);
        }
    }

    fn transfer_roots(&mut self, old: VNodeId, new: VNodeId) {
        let roots = self.vnodes.get(old).map(|n| n.root_ids.clone()).unwrap_or_default();
        if let Some(new_node) = self.vnodes.get_mut(new) {
            new_node.root_ids = roots;
            new_node.mounted = true;
        }
    }

    /// Create the new tree, splice it in over the old one's first root, and
    /// drop the rest of the old roots.
    fn replace_node(&mut self, to: &mut MutationWriter, old: VNodeId, new: VNodeId) {
        let created = self.create_node(to, new);
        let old_roots = self.vnodes.get(old).map(|n| n.root_ids.clone()).unwrap_or_default();
        match old_roots.split_first() {
            Some((&first, rest)) => {
                to.replace_with(first, created);
                for &extra in rest {
                    to.remove(extra);
                }
            }
            None => log::warn!("replacing unmounted vnode {old}"),
        }
        self.recycle_elements(old);
    }

    /// Return every element id in a vnode's mount state (and, for
    /// fragments, its children's) to the allocator.
    pub(crate) fn recycle_elements(&mut self, vnode: VNodeId) {
        let Some(node) = self.vnodes.get(vnode) else {
            return;
        };
        let roots = node.root_ids.clone();
        let dyn_ids = node.dyn_node_ids.clone();
        let attr_ids = node.dyn_attr_ids.clone();
        let children = node.children.clone();

        for id in roots.into_iter().chain(dyn_ids).chain(attr_ids) {
            if id.0 != 0 {
                self.elements.free(id);
            }
        }
        for child in children {
            self.recycle_elements(child);
        }
        if let Some(node) = self.vnodes.get_mut(vnode) {
            node.mounted = false;
        }
    }

    fn diff_template_ref(&mut self, to: &mut MutationWriter, old: VNodeId, new: VNodeId) {
        let template_id = self.vnodes.template_id(old).unwrap_or(0);
        let Some(template) = self.runtime.templates.get(template_id).cloned() else {
            return;
        };

        let (old_roots, old_dyn_ids, old_attr_ids, old_nodes, old_attrs) = {
            let old_node = self.vnodes.get(old).unwrap();
            (
                old_node.root_ids.clone(),
                old_node.dyn_node_ids.clone(),
                old_node.dyn_attr_ids.clone(),
                old_node.dynamic_nodes.clone(),
                old_node.dynamic_attrs.clone(),
            )
        };
        let (new_nodes, new_attrs) = {
            let new_node = self.vnodes.get(new).unwrap();
            (new_node.dynamic_nodes.clone(), new_node.dynamic_attrs.clone())
        };

        let total_slots = template.dynamic_slot_count() as usize;
        let mut dyn_node_ids = old_dyn_ids.clone();
        dyn_node_ids.resize(total_slots, ElementId(0));

        for slot in 0..total_slots {
            let id = old_dyn_ids.get(slot).copied().unwrap_or(ElementId(0));
            match template.node_slot_kinds[slot] {
                DynSlotKind::Text => {
                    // The text node itself survives; only its content moves.
                    let old_text = match old_nodes.get(slot) {
                        Some(DynamicNode::Text(value)) => value.as_str(),
                        _ => "",
                    };
                    let new_text = match new_nodes.get(slot) {
                        Some(DynamicNode::Text(value)) => value.as_str(),
                        _ => "",
                    };
                    if old_text != new_text {
                        to.set_text(id, new_text);
                    }
                }
                DynSlotKind::Node => {
                    let old_payload = old_nodes.get(slot);
                    let new_payload = new_nodes.get(slot);
                    if old_payload == new_payload {
                        continue;
                    }
                    // Variant or payload changed: rebuild the slot.
                    let payload =
                        new_payload.cloned().unwrap_or(DynamicNode::Placeholder);
                    let fresh = self.elements.alloc();
                    match payload {
                        DynamicNode::Text(value) => to.create_text_node(fresh, &value),
                        DynamicNode::Placeholder => to.create_placeholder(fresh),
                    }
                    to.replace_with(id, 1);
                    self.elements.free(id);
                    dyn_node_ids[slot] = fresh;
                }
            }
        }

        for slot in 0..template.attr_paths.len() {
            let id = old_attr_ids.get(slot).copied().unwrap_or(ElementId(0));
            self.diff_attr(to, id, old_attrs.get(slot), new_attrs.get(slot));
        }

        let new_node = self.vnodes.get_mut(new).unwrap();
        new_node.root_ids = old_roots;
        new_node.dyn_node_ids = dyn_node_ids;
        new_node.dyn_attr_ids = old_attr_ids;
        new_node.mounted = true;
    }

    fn diff_attr(
        &mut self,
        to: &mut MutationWriter,
        id: ElementId,
        old: Option<&crate::nodes::DynamicAttr>,
        new: Option<&crate::nodes::DynamicAttr>,
    ) {
        match (old, new) {
            (Some(old), Some(new)) => {
                if old.name == new.name && old.value == new.value {
                    return;
                }
                match (&old.value, &new.value) {
                    (AttrValue::Event(old_handler), AttrValue::Event(new_handler)) => {
                        if old_handler != new_handler || old.name != new.name {
                            to.remove_event_listener(id, &old.name);
                            to.new_event_listener(id, &new.name);
                        }
                    }
                    (AttrValue::Event(_), AttrValue::None) => {
                        to.remove_event_listener(id, &old.name);
                    }
                    (AttrValue::Event(_), _) => {
                        to.remove_event_listener(id, &old.name);
                        to.set_attribute(id, 0, &new.name, &new.value.encode());
                    }
                    (_, AttrValue::Event(_)) => {
                        to.set_attribute(id, 0, &old.name, "");
                        to.new_event_listener(id, &new.name);
                    }
                    (_, AttrValue::None) => {
                        // Empty value reads as removal on the host side.
                        to.set_attribute(id, 0, &new.name, "");
                    }
                    // Covers plain value changes and variant changes whose
                    // encodings coincide - the variant change still patches.
                    _ => to.set_attribute(id, 0, &new.name, &new.value.encode()),
                }
            }
            (None, Some(new)) => match &new.value {
                AttrValue::Event(_) => to.new_event_listener(id, &new.name),
                AttrValue::None => {}
                value => to.set_attribute(id, 0, &new.name, &value.encode()),
            },
            (Some(old), None) => match &old.value {
                AttrValue::Event(_) => to.remove_event_listener(id, &old.name),
                _ => to.set_attribute(id, 0, &old.name, ""),
            },
            (None, None) => {}
        }
    }

    fn diff_fragments(&mut self, to: &mut MutationWriter, old: VNodeId, new: VNodeId) {
        let old_children = self.vnodes.get(old).map(|n| n.children.clone()).unwrap_or_default();
        let new_children = self.vnodes.get(new).map(|n| n.children.clone()).unwrap_or_default();

        match (old_children.is_empty(), new_children.is_empty()) {
            // Still empty: the anchor placeholder carries over.
            (true, true) => self.transfer_roots(old, new),

            // Growing from empty: build the children, replace the anchor.
            (true, false) => {
                let anchor = self.vnodes.get(old).and_then(|n| n.first_root());
                let mut created = 0;
                for &child in &new_children {
                    created += self.create_node(to, child);
                }
                if let Some(anchor) = anchor {
                    to.replace_with(anchor, created);
                    self.elements.free(anchor);
                }
                self.finish_fragment(new);
            }

            // Shrinking to empty: a fresh placeholder takes the first
            // root's place, the rest are removed.
            (false, true) => {
                let anchor = self.elements.alloc();
                to.create_placeholder(anchor);
                let old_roots =
                    self.vnodes.get(old).map(|n| n.root_ids.clone()).unwrap_or_default();
                if let Some((&first, rest)) = old_roots.split_first() {
                    to.replace_with(first, 1);
                    for &extra in rest {
                        to.remove(extra);
                    }
                }
                for &child in &old_children {
                    self.recycle_elements(child);
                }
                let new_node = self.vnodes.get_mut(new).unwrap();
                new_node.root_ids = vec![anchor];
                new_node.mounted = true;
            }

            (false, false) => {
                let keyed = old_children.iter().all(|&c| self.vnodes.has_key(c))
                    && new_children.iter().all(|&c| self.vnodes.has_key(c));
                if keyed {
                    self.diff_keyed_children(to, &old_children, &new_children);
                } else {
                    self.diff_positional_children(to, &old_children, &new_children);
                }
                self.finish_fragment(new);
            }
        }
    }

    /// Keyed reconciliation: pair children by key, diff matches in place,
    /// move out-of-order matches with PushRoot + InsertAfter against the
    /// previous new child's last root, create unmatched new children, and
    /// remove unmatched old ones.
    fn diff_keyed_children(
        &mut self,
        to: &mut MutationWriter,
        old_children: &[VNodeId],
        new_children: &[VNodeId],
    ) {
        let mut old_by_key: FxHashMap<String, (usize, VNodeId)> = old_children
            .iter()
            .enumerate()
            .map(|(position, &child)| {
                (self.vnodes.key(child).unwrap_or_default().to_string(), (position, child))
            })
            .collect();

        let front = self.vnodes.get(old_children[0]).and_then(|n| n.first_root());
        let mut matched = vec![false; old_children.len()];
        let mut last_matched: i32 = -1;
        let mut anchor: Option<ElementId> = None;

        for &new_child in new_children {
            let key = self.vnodes.key(new_child).unwrap_or_default().to_string();

            if let Some((old_position, old_child)) = old_by_key.remove(&key) {
                matched[old_position] = true;
                self.diff_node(to, old_child, new_child);
                let roots = self
                    .vnodes
                    .get(new_child)
                    .map(|n| n.root_ids.clone())
                    .unwrap_or_default();

                if (old_position as i32) > last_matched {
                    // Monotonically advancing through the old order: the
                    // child is already where it belongs.
                    last_matched = old_position as i32;
                } else {
                    for &root in &roots {
                        to.push_root(root);
                    }
                    let moved = roots.len() as u32;
                    match anchor {
                        Some(anchor) => to.insert_after(anchor, moved),
                        // Only reachable for position 0, where the target
                        // is the front of the still-untouched old list.
                        None => {
                            if let Some(front) = front {
                                to.insert_before(front, moved);
                            }
                        }
                    }
                }
                anchor = roots.last().copied().or(anchor);
            } else {
                let created = self.create_node(to, new_child);
                match anchor {
                    Some(anchor) => to.insert_after(anchor, created),
                    None => {
                        if let Some(front) = front {
                            to.insert_before(front, created);
                        }
                    }
                }
                anchor = self
                    .vnodes
                    .get(new_child)
                    .and_then(|n| n.last_root())
                    .or(anchor);
            }
        }

        for (position, &old_child) in old_children.iter().enumerate() {
            if matched[position] {
                continue;
            }
            let roots = self
                .vnodes
                .get(old_child)
                .map(|n| n.root_ids.clone())
                .unwrap_or_default();
            for root in roots {
                to.remove(root);
            }
            self.recycle_elements(old_child);
        }
    }

    /// Position-wise diff with trailing add/remove, for unkeyed fragments.
    fn diff_positional_children(
        &mut self,
        to: &mut MutationWriter,
        old_children: &[VNodeId],
        new_children: &[VNodeId],
    ) {
        let common = old_children.len().min(new_children.len());
        for index in 0..common {
            self.diff_node(to, old_children[index], new_children[index]);
        }

        if new_children.len() > old_children.len() {
            let mut anchor = self
                .vnodes
                .get(new_children[common - 1])
                .and_then(|n| n.last_root());
            for &new_child in &new_children[common..] {
                let created = self.create_node(to, new_child);
                if let Some(at) = anchor {
                    to.insert_after(at, created);
                }
                anchor = self.vnodes.get(new_child).and_then(|n| n.last_root()).or(anchor);
            }
        } else {
            for &old_child in &old_children[common..] {
                let roots = self
                    .vnodes
                    .get(old_child)
                    .map(|n| n.root_ids.clone())
                    .unwrap_or_default();
                for root in roots {
                    to.remove(root);
                }
                self.recycle_elements(old_child);
            }
        }
    }

    /// Rebuild a fragment's flattened root list from its children.
    fn finish_fragment(&mut self, fragment: VNodeId) {
        let children = self
            .vnodes
            .get(fragment)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        let mut roots = Vec::new();
        for child in children {
            if let Some(child_node) = self.vnodes.get(child) {
                roots.extend_from_slice(&child_node.root_ids);
            }
        }
        let node = self.vnodes.get_mut(fragment).unwrap();
        node.root_ids = roots;
        node.mounted = true;
    }
}
