//! Immutable template trees with indexed dynamic slots.
//!
//! Templates are registered once and never unregistered. Nodes live in a
//! flat arena inside each template with child lists as indices, and every
//! dynamic slot's path from its nearest root is precomputed at registration
//! so the create engine can emit path-addressed opcodes without re-walking
//! the tree.

use smallvec::SmallVec;

pub type TemplateId = u32;

/// A child-index walk from a template root down to a slot. One byte per
/// step; template elements cannot have more than 255 children.
pub type Path = SmallVec<[u8; 8]>;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Element {
        tag: String,
        attrs: Vec<TemplateAttr>,
        children: Vec<u32>,
    },
    Text {
        text: String,
    },
    /// A slot filled per-vnode with an arbitrary subtree.
    Dynamic {
        slot: u32,
    },
    /// A text node whose content is filled per-vnode.
    DynamicText {
        slot: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateAttr {
    Static { name: String, value: String },
    Dynamic { slot: u32 },
}

/// Which flavor of dynamic node a slot holds. Node slots get their subtree
/// spliced in over a placeholder; text slots keep the template's text node
/// and only patch its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynSlotKind {
    Node,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotPath {
    /// Index into `roots` of the root this slot lives under.
    pub root: u8,
    pub path: Path,
}

#[derive(Debug, Clone, Default)]
pub struct Template {
    pub name: String,
    pub nodes: Vec<TemplateNode>,
    /// Top-level node indices.
    pub roots: Vec<u32>,

    /// Indexed by dynamic slot, shared between node and text slots.
    pub node_paths: Vec<SlotPath>,
    pub node_slot_kinds: Vec<DynSlotKind>,
    /// Indexed by dynamic attr slot; the path addresses the owning element.
    pub attr_paths: Vec<SlotPath>,

    pub dynamic_node_count: u32,
    pub dynamic_text_count: u32,
    pub dynamic_attr_count: u32,
    pub static_attr_count: u32,
}

impl Template {
    /// Assemble a template from its flat node arena, computing slot paths
    /// and the dynamic counters.
    pub fn assemble(name: impl Into<String>, nodes: Vec<TemplateNode>, roots: Vec<u32>) -> Self {
        let mut template = Template {
            name: name.into(),
            nodes,
            roots,
            ..Default::default()
        };

        let mut node_slots: Vec<(u32, SlotPath, DynSlotKind)> = Vec::new();
        let mut attr_slots: Vec<(u32, SlotPath)> = Vec::new();
        let mut static_attrs = 0;

        for (root_pos, &root) in template.roots.iter().enumerate() {
            let mut path = Path::new();
            index_slots(
                &template.nodes,
                root,
                root_pos as u8,
                &mut path,
                &mut node_slots,
                &mut attr_slots,
                &mut static_attrs,
            );
        }
        template.static_attr_count = static_attrs;

        node_slots.sort_by_key(|(slot, _, _)| *slot);
        attr_slots.sort_by_key(|(slot, _)| *slot);

        for (slot, path, kind) in node_slots {
            debug_assert_eq!(slot as usize, template.node_paths.len(), "slot numbering has a gap");
            template.node_paths.push(path);
            template.node_slot_kinds.push(kind);
            match kind {
                DynSlotKind::Node => template.dynamic_node_count += 1,
                DynSlotKind::Text => template.dynamic_text_count += 1,
            }
        }
        for (slot, path) in attr_slots {
            debug_assert_eq!(slot as usize, template.attr_paths.len(), "attr numbering has a gap");
            template.attr_paths.push(path);
            template.dynamic_attr_count += 1;
        }

        template
    }

    /// Total dynamic node slots, both kinds.
    pub fn dynamic_slot_count(&self) -> u32 {
        self.dynamic_node_count + self.dynamic_text_count
    }
}

#[allow(clippy::too_many_arguments)]
fn index_slots(
    nodes: &[TemplateNode],
    node: u32,
    root: u8,
    path: &mut Path,
    node_slots: &mut Vec<(u32, SlotPath, DynSlotKind)>,
    attr_slots: &mut Vec<(u32, SlotPath)>,
    static_attrs: &mut u32,
) {
    match &nodes[node as usize] {
        TemplateNode::Text { .. } => {}
        TemplateNode::Dynamic { slot } => {
            node_slots.push((*slot, SlotPath { root, path: path.clone() }, DynSlotKind::Node));
        }
        TemplateNode::DynamicText { slot } => {
            node_slots.push((*slot, SlotPath { root, path: path.clone() }, DynSlotKind::Text));
        }
        TemplateNode::Element { attrs, children, .. } => {
            for attr in attrs {
                match attr {
                    TemplateAttr::Static { .. } => *static_attrs += 1,
                    TemplateAttr::Dynamic { slot } => {
                        attr_slots.push((*slot, SlotPath { root, path: path.clone() }));
                    }
                }
            }
            for (index, &child) in children.iter().enumerate() {
                path.push(index as u8);
                index_slots(nodes, child, root, path, node_slots, attr_slots, static_attrs);
                path.pop();
            }
        }
    }
}

/// Append-only registry of templates, identified by dense u32.
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self { templates: Vec::new() }
    }

    pub fn register(&mut self, template: Template) -> TemplateId {
        let id = self.templates.len() as TemplateId;
        log::debug!("registered template {} ({:?})", id, template.name);
        self.templates.push(template);
        id
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id as usize)
    }

    pub fn find_by_name(&self, name: &str) -> Option<TemplateId> {
        self.templates
            .iter()
            .position(|t| t.name == name)
            .map(|at| at as TemplateId)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // div > span > dyn_text, with one dynamic attr on the span
    fn sample() -> Template {
        Template::assemble(
            "sample",
            vec![
                TemplateNode::Element {
                    tag: "div".into(),
                    attrs: vec![],
                    children: vec![1],
                },
                TemplateNode::Element {
                    tag: "span".into(),
                    attrs: vec![
                        TemplateAttr::Static { name: "class".into(), value: "label".into() },
                        TemplateAttr::Dynamic { slot: 0 },
                    ],
                    children: vec![2],
                },
                TemplateNode::DynamicText { slot: 0 },
            ],
            vec![0],
        )
    }

    #[test]
    fn slot_paths_walk_from_the_root() {
        let template = sample();
        assert_eq!(template.node_paths.len(), 1);
        assert_eq!(template.node_paths[0].root, 0);
        assert_eq!(&template.node_paths[0].path[..], &[0, 0]);
        assert_eq!(template.node_slot_kinds[0], DynSlotKind::Text);

        // The attr path addresses the span element itself.
        assert_eq!(&template.attr_paths[0].path[..], &[0]);
    }

    #[test]
    fn counts_are_precomputed() {
        let template = sample();
        assert_eq!(template.dynamic_node_count, 0);
        assert_eq!(template.dynamic_text_count, 1);
        assert_eq!(template.dynamic_attr_count, 1);
        assert_eq!(template.static_attr_count, 1);
        assert_eq!(template.dynamic_slot_count(), 1);
    }

    #[test]
    fn registry_is_append_only_with_linear_name_lookup() {
        let mut registry = TemplateRegistry::new();
        let a = registry.register(sample());
        let mut other = sample();
        other.name = "other".into();
        let b = registry.register(other);

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(registry.find_by_name("other"), Some(b));
        assert_eq!(registry.find_by_name("sample"), Some(a));
        assert_eq!(registry.find_by_name("missing"), None);
        assert!(registry.get(2).is_none());
    }
}
