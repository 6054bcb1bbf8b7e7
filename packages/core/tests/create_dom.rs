//! Prove that mounting produces the exact construction streams the host
//! contract promises, including the deterministic element-id allocation
//! order.

use weft_core::dsl::{self, div, dyn_node, dyn_text, span};
use weft_core::{ElementId, VNodeBuilder, VNodeId, VirtualDom};
use weft_protocol::Mutation::*;
use weft_protocol::{read_mutations, Mutation, MutationWriter};

fn mount(dom: &mut VirtualDom, vnode: VNodeId) -> Vec<Mutation> {
    let mut buf = [0u8; 4096];
    let mut writer = MutationWriter::new(&mut buf);
    dom.mount(&mut writer, vnode);
    let len = writer.finalize();
    read_mutations(&buf[..len]).unwrap()
}

fn register(dom: &mut VirtualDom, view: &dsl::Node, name: &str) -> u32 {
    let (template, _) = dsl::compile(view, name);
    dom.runtime.templates.register(template)
}

#[test]
fn counter_mount_emits_the_contract_sequence() {
    let mut dom = VirtualDom::new();
    let template = register(&mut dom, &div(vec![span(vec![dyn_text()])]), "counter");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode).add_dyn_text("0");

    assert_eq!(
        mount(&mut dom, vnode),
        [
            LoadTemplate { template, index: 0, id: ElementId(1) },
            AssignId { path: vec![0, 0], id: ElementId(2) },
            SetText { id: ElementId(2), text: "0".into() },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn empty_dynamic_text_skips_the_set_text() {
    let mut dom = VirtualDom::new();
    let template = register(&mut dom, &div(vec![span(vec![dyn_text()])]), "empty-text");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode).add_dyn_text("");

    assert_eq!(
        mount(&mut dom, vnode),
        [
            LoadTemplate { template, index: 0, id: ElementId(1) },
            AssignId { path: vec![0, 0], id: ElementId(2) },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn dynamic_node_slots_splice_over_placeholders() {
    let mut dom = VirtualDom::new();
    let template = register(&mut dom, &div(vec![span(vec![dyn_text()]), dyn_node()]), "mixed");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode)
        .add_dyn_text("a")
        .add_dyn_placeholder();

    assert_eq!(
        mount(&mut dom, vnode),
        [
            LoadTemplate { template, index: 0, id: ElementId(1) },
            AssignId { path: vec![0, 0], id: ElementId(2) },
            SetText { id: ElementId(2), text: "a".into() },
            CreatePlaceholder { id: ElementId(3) },
            ReplacePlaceholder { path: vec![1], m: 1 },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn text_payloads_in_node_slots_create_text_nodes() {
    let mut dom = VirtualDom::new();
    let template = register(&mut dom, &div(vec![dyn_node()]), "node-slot");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode).add_dyn_text("hello");

    assert_eq!(
        mount(&mut dom, vnode),
        [
            LoadTemplate { template, index: 0, id: ElementId(1) },
            CreateTextNode { id: ElementId(2), text: "hello".into() },
            ReplacePlaceholder { path: vec![0], m: 1 },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn event_attrs_on_the_root_reuse_its_id() {
    let mut dom = VirtualDom::new();
    let view = dsl::el("button", vec![dsl::dyn_attr(), dsl::text("go")]);
    let template = register(&mut dom, &view, "button");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode).add_dyn_event("click", 7);

    // The attr path is empty - the root already has an id, so no AssignId.
    assert_eq!(
        mount(&mut dom, vnode),
        [
            LoadTemplate { template, index: 0, id: ElementId(1) },
            NewEventListener { id: ElementId(1), name: "click".into() },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn nested_dynamic_attrs_assign_a_target_id() {
    let mut dom = VirtualDom::new();
    let view = div(vec![span(vec![dsl::dyn_attr()])]);
    let template = register(&mut dom, &view, "attr");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode).add_dyn_text_attr("class", "active");

    assert_eq!(
        mount(&mut dom, vnode),
        [
            LoadTemplate { template, index: 0, id: ElementId(1) },
            AssignId { path: vec![0], id: ElementId(2) },
            SetAttribute { id: ElementId(2), ns: 0, name: "class".into(), value: "active".into() },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn sibling_attrs_share_one_assigned_id() {
    let mut dom = VirtualDom::new();
    let view = div(vec![span(vec![dsl::dyn_attr(), dsl::dyn_attr()])]);
    let template = register(&mut dom, &view, "two-attrs");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode)
        .add_dyn_text_attr("class", "a")
        .add_dyn_int_attr("tabindex", 3);

    assert_eq!(
        mount(&mut dom, vnode),
        [
            LoadTemplate { template, index: 0, id: ElementId(1) },
            AssignId { path: vec![0], id: ElementId(2) },
            SetAttribute { id: ElementId(2), ns: 0, name: "class".into(), value: "a".into() },
            SetAttribute { id: ElementId(2), ns: 0, name: "tabindex".into(), value: "3".into() },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn fragments_flatten_their_children() {
    let mut dom = VirtualDom::new();
    let fragment = dom.vnodes.push_fragment();
    for text in ["one", "two", "three"] {
        let child = dom.vnodes.push_text(text);
        dom.vnodes.push_fragment_child(fragment, child);
    }

    assert_eq!(
        mount(&mut dom, fragment),
        [
            CreateTextNode { id: ElementId(1), text: "one".into() },
            CreateTextNode { id: ElementId(2), text: "two".into() },
            CreateTextNode { id: ElementId(3), text: "three".into() },
            AppendChildren { id: ElementId(0), m: 3 },
        ]
    );

    let node = dom.vnodes.get(fragment).unwrap();
    assert_eq!(node.root_ids, vec![ElementId(1), ElementId(2), ElementId(3)]);
}

#[test]
fn empty_fragments_render_an_anchor_placeholder() {
    let mut dom = VirtualDom::new();
    let fragment = dom.vnodes.push_fragment();

    assert_eq!(
        mount(&mut dom, fragment),
        [
            CreatePlaceholder { id: ElementId(1) },
            AppendChildren { id: ElementId(0), m: 1 },
        ]
    );
}

#[test]
fn mount_state_records_every_allocated_id() {
    let mut dom = VirtualDom::new();
    let template = register(&mut dom, &div(vec![span(vec![dyn_text()]), dyn_node()]), "state");

    let vnode = dom.vnodes.push_template_ref(template);
    VNodeBuilder::new(&mut dom.vnodes, vnode)
        .add_dyn_text("x")
        .add_dyn_placeholder();
    mount(&mut dom, vnode);

    let node = dom.vnodes.get(vnode).unwrap();
    assert!(node.mounted);
    assert_eq!(node.root_ids, vec![ElementId(1)]);
    assert_eq!(node.dyn_node_ids, vec![ElementId(2), ElementId(3)]);
    assert_eq!(dom.elements.user_count(), 3);
}
