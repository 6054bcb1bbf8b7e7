//! Keyed fragment reconciliation: permutations move, removals remove, and
//! nothing in a pure permutation is ever rebuilt.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use weft_core::dsl::{self, dyn_text, li};
use weft_core::{ElementId, VNodeBuilder, VNodeId, VirtualDom};
use weft_protocol::Mutation::*;
use weft_protocol::{read_mutations, Mutation, MutationWriter};

fn mount(dom: &mut VirtualDom, vnode: VNodeId) -> Vec<Mutation> {
    let mut buf = [0u8; 8192];
    let mut writer = MutationWriter::new(&mut buf);
    dom.mount(&mut writer, vnode);
    let len = writer.finalize();
    read_mutations(&buf[..len]).unwrap()
}

fn diff(dom: &mut VirtualDom, old: VNodeId, new: VNodeId) -> Vec<Mutation> {
    let mut buf = [0u8; 8192];
    let mut writer = MutationWriter::new(&mut buf);
    dom.diff(&mut writer, old, new);
    let len = writer.finalize();
    read_mutations(&buf[..len]).unwrap()
}

fn item_template(dom: &mut VirtualDom) -> u32 {
    let (template, _) = dsl::compile(&li(vec![dyn_text()]), "item");
    dom.runtime.templates.register(template)
}

fn keyed_list(dom: &mut VirtualDom, template: u32, keys: &[&str]) -> VNodeId {
    let fragment = dom.vnodes.push_fragment();
    for &key in keys {
        let child = dom.vnodes.push_template_ref_keyed(template, key);
        VNodeBuilder::new(&mut dom.vnodes, child).add_dyn_text(key);
        dom.vnodes.push_fragment_child(fragment, child);
    }
    fragment
}

fn creates_nothing(edits: &[Mutation]) -> bool {
    edits.iter().all(|edit| {
        !matches!(
            edit,
            CreateTextNode { .. } | CreatePlaceholder { .. } | LoadTemplate { .. }
        )
    })
}

#[test]
fn permutation_moves_without_rebuilding() {
    let mut dom = VirtualDom::new();
    let template = item_template(&mut dom);

    let old = keyed_list(&mut dom, template, &["a", "b", "c"]);
    mount(&mut dom, old);
    // Roots: a=1, b=3, c=5 (text nodes take 2, 4, 6).

    let new = keyed_list(&mut dom, template, &["c", "a", "b"]);
    let edits = diff(&mut dom, old, new);

    assert!(creates_nothing(&edits), "permutation must not create: {edits:?}");
    assert!(!edits.iter().any(|e| matches!(e, Remove { .. })));
    assert_eq!(
        edits,
        [
            PushRoot { id: ElementId(1) },
            InsertAfter { id: ElementId(5), m: 1 },
            PushRoot { id: ElementId(3) },
            InsertAfter { id: ElementId(1), m: 1 },
        ]
    );
}

#[test]
fn removal_emits_exactly_one_remove() {
    let mut dom = VirtualDom::new();
    let template = item_template(&mut dom);

    let old = keyed_list(&mut dom, template, &["a", "b", "c"]);
    mount(&mut dom, old);

    let new = keyed_list(&mut dom, template, &["a", "c"]);
    let edits = diff(&mut dom, old, new);

    // b's root was element 3.
    assert_eq!(edits, [Remove { id: ElementId(3) }]);
    assert!(!dom.elements.is_alive(ElementId(3)));
    assert!(!dom.elements.is_alive(ElementId(4)));
}

#[test]
fn insertion_creates_only_the_new_child() {
    let mut dom = VirtualDom::new();
    let template = item_template(&mut dom);

    let old = keyed_list(&mut dom, template, &["a", "b"]);
    mount(&mut dom, old);
    // a=1/2, b=3/4; the next two allocations are 5 and 6.

    let new = keyed_list(&mut dom, template, &["a", "x", "b"]);
    let edits = diff(&mut dom, old, new);

    assert_eq!(
        edits,
        [
            LoadTemplate { template, index: 0, id: ElementId(5) },
            AssignId { path: vec![0], id: ElementId(6) },
            SetText { id: ElementId(6), text: "x".into() },
            InsertAfter { id: ElementId(1), m: 1 },
        ]
    );
}

#[test]
fn new_front_child_inserts_before_the_old_front() {
    let mut dom = VirtualDom::new();
    let template = item_template(&mut dom);

    let old = keyed_list(&mut dom, template, &["a", "b"]);
    mount(&mut dom, old);

    let new = keyed_list(&mut dom, template, &["x", "a", "b"]);
    let edits = diff(&mut dom, old, new);

    assert_eq!(
        edits,
        [
            LoadTemplate { template, index: 0, id: ElementId(5) },
            AssignId { path: vec![0], id: ElementId(6) },
            SetText { id: ElementId(6), text: "x".into() },
            InsertBefore { id: ElementId(1), m: 1 },
        ]
    );
}

#[test]
fn keyed_children_also_patch_their_content() {
    let mut dom = VirtualDom::new();
    let template = item_template(&mut dom);

    let old = keyed_list(&mut dom, template, &["a", "b"]);
    mount(&mut dom, old);

    // Same keys, same order, but b renders different text now.
    let new = dom.vnodes.push_fragment();
    for (key, text) in [("a", "a"), ("b", "b2")] {
        let child = dom.vnodes.push_template_ref_keyed(template, key);
        VNodeBuilder::new(&mut dom.vnodes, child).add_dyn_text(text);
        dom.vnodes.push_fragment_child(new, child);
    }

    assert_eq!(
        diff(&mut dom, old, new),
        [SetText { id: ElementId(4), text: "b2".into() }]
    );
}

#[test]
fn shrinking_to_empty_leaves_an_anchor() {
    let mut dom = VirtualDom::new();
    let template = item_template(&mut dom);

    let old = keyed_list(&mut dom, template, &["a", "b"]);
    mount(&mut dom, old);

    let new = dom.vnodes.push_fragment();
    let edits = diff(&mut dom, old, new);

    assert_eq!(
        edits,
        [
            CreatePlaceholder { id: ElementId(5) },
            ReplaceWith { id: ElementId(1), m: 1 },
            Remove { id: ElementId(3) },
        ]
    );

    // And it can grow back from the anchor.
    let regrown = keyed_list(&mut dom, template, &["z"]);
    let edits = diff(&mut dom, new, regrown);
    assert!(matches!(edits.last(), Some(ReplaceWith { m: 1, .. })));
}

#[test]
fn random_permutations_never_rebuild() {
    let mut rng = SmallRng::seed_from_u64(0xBEEF);
    let keys = ["a", "b", "c", "d", "e", "f", "g", "h"];

    for _ in 0..16 {
        let mut dom = VirtualDom::new();
        let template = item_template(&mut dom);

        let old = keyed_list(&mut dom, template, &keys);
        mount(&mut dom, old);

        let mut shuffled = keys;
        shuffled.shuffle(&mut rng);
        let new = keyed_list(&mut dom, template, &shuffled);

        let edits = diff(&mut dom, old, new);
        assert!(creates_nothing(&edits), "shuffle {shuffled:?} created nodes: {edits:?}");
        assert!(!edits.iter().any(|e| matches!(e, Remove { .. })));
    }
}

#[test]
fn unkeyed_fragments_diff_by_position() {
    let mut dom = VirtualDom::new();

    let old = dom.vnodes.push_fragment();
    for text in ["one", "two", "three"] {
        let child = dom.vnodes.push_text(text);
        dom.vnodes.push_fragment_child(old, child);
    }
    mount(&mut dom, old);

    // Shorter: position-wise patch plus a trailing remove.
    let new = dom.vnodes.push_fragment();
    for text in ["one", "2"] {
        let child = dom.vnodes.push_text(text);
        dom.vnodes.push_fragment_child(new, child);
    }

    assert_eq!(
        diff(&mut dom, old, new),
        [
            SetText { id: ElementId(2), text: "2".into() },
            Remove { id: ElementId(3) },
        ]
    );

    // Longer again: trailing create + insert after the last root.
    let longer = dom.vnodes.push_fragment();
    for text in ["one", "2", "tail"] {
        let child = dom.vnodes.push_text(text);
        dom.vnodes.push_fragment_child(longer, child);
    }

    assert_eq!(
        diff(&mut dom, new, longer),
        [
            CreateTextNode { id: ElementId(3), text: "tail".into() },
            InsertAfter { id: ElementId(2), m: 1 },
        ]
    );
}
