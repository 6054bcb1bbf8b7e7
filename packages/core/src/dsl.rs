//! A value-builder DSL for declaring view trees, and the compiler that
//! linearises them into registered templates.
//!
//! There is no macro layer: a view is an ordinary [`Node`] value. Dynamic
//! slots are declared with the auto-index sentinel and numbered in tree-walk
//! order at compile time. Inline event and value-binding nodes are rewritten
//! into dynamic attribute slots, and their payloads surface in a side
//! channel the component context turns into registered handlers and
//! render-time bindings.

use crate::templates::{Template, TemplateAttr, TemplateNode};

pub use weft_protocol::Action;

/// Slot index sentinel: assign this slot the next index in tree-walk order.
pub const AUTO_SLOT: i32 = -1;

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Text(String),
    Element { tag: String, items: Vec<Node> },
    DynText { slot: i32 },
    DynNode { slot: i32 },
    StaticAttr { name: String, value: String },
    DynAttr { slot: i32 },
    Event { event: String, action: Action, signal: u32, operand: i32 },
    BindValue { attr: String, string_key: u32, version_key: u32 },
}

impl Node {
    /// How many of an element's items are attribute-kinded.
    pub fn attr_count(&self) -> usize {
        match self {
            Node::Element { items, .. } => items.iter().filter(|item| item.is_attr()).count(),
            _ => 0,
        }
    }

    fn is_attr(&self) -> bool {
        matches!(
            self,
            Node::StaticAttr { .. } | Node::DynAttr { .. } | Node::Event { .. } | Node::BindValue { .. }
        )
    }
}

pub fn el(tag: impl Into<String>, items: Vec<Node>) -> Node {
    Node::Element { tag: tag.into(), items }
}

pub fn text(value: impl Into<String>) -> Node {
    Node::Text(value.into())
}

pub fn dyn_text() -> Node {
    Node::DynText { slot: AUTO_SLOT }
}

pub fn dyn_node() -> Node {
    Node::DynNode { slot: AUTO_SLOT }
}

pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Node {
    Node::StaticAttr { name: name.into(), value: value.into() }
}

pub fn dyn_attr() -> Node {
    Node::DynAttr { slot: AUTO_SLOT }
}

/// An inline event handler: rewritten into a dynamic attr slot at compile
/// time and registered by the component context.
pub fn on(event: impl Into<String>, action: Action, signal: u32, operand: i32) -> Node {
    Node::Event { event: event.into(), action, signal, operand }
}

pub fn on_click(action: Action, signal: u32, operand: i32) -> Node {
    on("click", action, signal, operand)
}

pub fn on_input(action: Action, signal: u32, operand: i32) -> Node {
    on("input", action, signal, operand)
}

pub fn on_keydown(action: Action, signal: u32, operand: i32) -> Node {
    on("keydown", action, signal, operand)
}

/// Bind an attribute to a string signal, re-read on every render.
pub fn bind_value(attr: impl Into<String>, string_key: u32, version_key: u32) -> Node {
    Node::BindValue { attr: attr.into(), string_key, version_key }
}

macro_rules! tag_helpers {
    ($($name:ident)*) => {
        $(
            pub fn $name(items: Vec<Node>) -> Node {
                el(stringify!($name), items)
            }
        )*
    };
}

tag_helpers! { div span button input ul li h1 p }

/// An inline event or binding extracted during compilation, tagged with the
/// dynamic attr slot it was rewritten into.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractedBinding {
    Event { slot: u32, event: String, action: Action, signal: u32, operand: i32 },
    Value { slot: u32, attr: String, string_key: u32, version_key: u32 },
}

/// Compile a single-root view tree. See [`compile_roots`].
pub fn compile(root: &Node, name: &str) -> (Template, Vec<ExtractedBinding>) {
    compile_roots(std::slice::from_ref(root), name)
}

/// Compile a view tree into a registrable template plus the extracted
/// event/value bindings.
///
/// Two passes: the first walks the tree assigning auto slot indices (one
/// counter for node slots, one for attr slots) and rewriting EVENT and
/// BIND_VALUE items into dynamic attr slots; the second linearises the tree
/// into the flat node arena, after which [`Template::assemble`] computes
/// paths and counters.
pub fn compile_roots(roots: &[Node], name: &str) -> (Template, Vec<ExtractedBinding>) {
    let mut roots: Vec<Node> = roots.to_vec();

    let mut numbering = Numbering::default();
    for root in &mut roots {
        number_slots(root, &mut numbering);
    }

    let mut nodes = Vec::new();
    let mut root_indices = Vec::new();
    for root in &roots {
        root_indices.push(emit(root, &mut nodes));
    }

    (Template::assemble(name, nodes, root_indices), numbering.bindings)
}

#[derive(Default)]
struct Numbering {
    node_slots: u32,
    attr_slots: u32,
    bindings: Vec<ExtractedBinding>,
}

impl Numbering {
    fn next_node_slot(&mut self) -> i32 {
        let slot = self.node_slots;
        self.node_slots += 1;
        slot as i32
    }

    fn next_attr_slot(&mut self) -> u32 {
        let slot = self.attr_slots;
        self.attr_slots += 1;
        slot
    }
}

fn number_slots(node: &mut Node, numbering: &mut Numbering) {
    match node {
        Node::Text(_) | Node::StaticAttr { .. } => {}
        Node::DynText { slot } | Node::DynNode { slot } => {
            if *slot == AUTO_SLOT {
                *slot = numbering.next_node_slot();
            }
        }
        Node::DynAttr { slot } => {
            if *slot == AUTO_SLOT {
                *slot = numbering.next_attr_slot() as i32;
            }
        }
        Node::Event { event, action, signal, operand } => {
            let slot = numbering.next_attr_slot();
            numbering.bindings.push(ExtractedBinding::Event {
                slot,
                event: event.clone(),
                action: *action,
                signal: *signal,
                operand: *operand,
            });
            *node = Node::DynAttr { slot: slot as i32 };
        }
        Node::BindValue { attr, string_key, version_key } => {
            let slot = numbering.next_attr_slot();
            numbering.bindings.push(ExtractedBinding::Value {
                slot,
                attr: attr.clone(),
                string_key: *string_key,
                version_key: *version_key,
            });
            *node = Node::DynAttr { slot: slot as i32 };
        }
        Node::Element { items, .. } => {
            for item in items {
                number_slots(item, numbering);
            }
        }
    }
}

fn emit(node: &Node, nodes: &mut Vec<TemplateNode>) -> u32 {
    match node {
        Node::Element { tag, items } => {
            let index = nodes.len() as u32;
            nodes.push(TemplateNode::Element {
                tag: tag.clone(),
                attrs: Vec::new(),
                children: Vec::new(),
            });

            let mut attrs = Vec::new();
            let mut children = Vec::new();
            for item in items {
                match item {
                    Node::StaticAttr { name, value } => attrs.push(TemplateAttr::Static {
                        name: name.clone(),
                        value: value.clone(),
                    }),
                    Node::DynAttr { slot } => {
                        attrs.push(TemplateAttr::Dynamic { slot: *slot as u32 })
                    }
                    Node::Event { .. } | Node::BindValue { .. } => {
                        debug_assert!(false, "events are rewritten before emission");
                    }
                    child => children.push(emit(child, nodes)),
                }
            }

            if let TemplateNode::Element { attrs: slot_attrs, children: slot_children, .. } =
                &mut nodes[index as usize]
            {
                *slot_attrs = attrs;
                *slot_children = children;
            }
            index
        }
        Node::Text(value) => {
            let index = nodes.len() as u32;
            nodes.push(TemplateNode::Text { text: value.clone() });
            index
        }
        Node::DynText { slot } => {
            let index = nodes.len() as u32;
            nodes.push(TemplateNode::DynamicText { slot: *slot as u32 });
            index
        }
        Node::DynNode { slot } => {
            let index = nodes.len() as u32;
            nodes.push(TemplateNode::Dynamic { slot: *slot as u32 });
            index
        }
        // Attribute-kinded nodes cannot stand alone; emit an empty text
        // node so the template stays well-formed.
        _ => {
            let index = nodes.len() as u32;
            nodes.push(TemplateNode::Text { text: String::new() });
            index
        }
    }
}
