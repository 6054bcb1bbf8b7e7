//! Dispatch semantics of the handler registry: which tags fire, which only
//! wake their scope, and how the payload-carrying dispatches route.

use weft_core::{Action, EventKind, HandlerEntry, Runtime, ScopeId};

fn runtime_with_scope() -> (Runtime, ScopeId) {
    let mut rt = Runtime::new();
    let scope = rt.scopes.create(0, -1);
    (rt, scope)
}

fn handler(rt: &mut Runtime, scope: ScopeId, action: Action, signal: u32, operand: i32) -> u32 {
    rt.handlers.register(HandlerEntry {
        scope: scope.0,
        action,
        signal,
        operand,
        event: "click".into(),
    })
}

#[test]
fn unknown_handlers_are_ignored() {
    let (mut rt, _) = runtime_with_scope();
    assert!(!rt.dispatch(99, EventKind::Click));
    assert!(!rt.dispatch_with_i32(99, EventKind::Input, 5));
    assert!(!rt.dispatch_with_string(99, EventKind::KeyDown, "Enter"));
}

#[test]
fn arithmetic_actions_fire_and_cascade() {
    let (mut rt, scope) = runtime_with_scope();
    let signal = rt.signals.create(10i32);
    rt.signals.subscribe(signal, scope.0);

    let add = handler(&mut rt, scope, Action::AddI32, signal, 5);
    let sub = handler(&mut rt, scope, Action::SubI32, signal, 3);
    let set = handler(&mut rt, scope, Action::SetI32, signal, 100);

    assert!(rt.dispatch(add, EventKind::Click));
    assert_eq!(rt.peek_signal::<i32>(signal), 15);

    assert!(rt.dispatch(sub, EventKind::Click));
    assert_eq!(rt.peek_signal::<i32>(signal), 12);

    assert!(rt.dispatch(set, EventKind::Click));
    assert_eq!(rt.peek_signal::<i32>(signal), 100);

    // Each write queued the subscribed scope, deduplicated.
    assert_eq!(rt.drain_dirty(), vec![scope.0]);
}

#[test]
fn toggle_flips_a_bool_signal() {
    let (mut rt, scope) = runtime_with_scope();
    let flag = rt.signals.create(false);
    let toggle = handler(&mut rt, scope, Action::Toggle, flag, 0);

    assert!(rt.dispatch(toggle, EventKind::Click));
    assert!(rt.peek_signal::<bool>(flag));
    assert!(rt.dispatch(toggle, EventKind::Click));
    assert!(!rt.peek_signal::<bool>(flag));
}

#[test]
fn none_and_custom_only_wake_the_scope() {
    let (mut rt, scope) = runtime_with_scope();
    let none = handler(&mut rt, scope, Action::None, 0, 0);
    let custom = handler(&mut rt, scope, Action::Custom, 0, 0);

    assert!(!rt.dispatch(none, EventKind::Click));
    assert!(!rt.dispatch(custom, EventKind::Custom));
    assert_eq!(rt.drain_dirty(), vec![scope.0]);
}

#[test]
fn set_input_requires_the_i32_dispatch() {
    let (mut rt, scope) = runtime_with_scope();
    let signal = rt.signals.create(0i32);
    let input = handler(&mut rt, scope, Action::SetInput, signal, 0);

    // The plain dispatch has no payload: it can only wake the scope.
    assert!(!rt.dispatch(input, EventKind::Input));
    assert_eq!(rt.peek_signal::<i32>(signal), 0);
    assert_eq!(rt.drain_dirty(), vec![scope.0]);

    assert!(rt.dispatch_with_i32(input, EventKind::Input, 42));
    assert_eq!(rt.peek_signal::<i32>(signal), 42);
}

#[test]
fn i32_dispatch_falls_back_for_other_tags() {
    let (mut rt, scope) = runtime_with_scope();
    let signal = rt.signals.create(0i32);
    let add = handler(&mut rt, scope, Action::AddI32, signal, 1);

    // The value is ignored; the add fires with its registered operand.
    assert!(rt.dispatch_with_i32(add, EventKind::Input, 999));
    assert_eq!(rt.peek_signal::<i32>(signal), 1);
}

#[test]
fn set_string_writes_and_bumps_the_companion() {
    let (mut rt, scope) = runtime_with_scope();
    let string_key = rt.strings.create("old");
    let version_key = rt.signals.create(0i32);
    rt.signals.subscribe(version_key, scope.0);

    let entry = rt.handlers.register(HandlerEntry {
        scope: scope.0,
        action: Action::SetString,
        signal: string_key,
        operand: version_key as i32,
        event: "input".into(),
    });

    assert!(rt.dispatch_with_string(entry, EventKind::Input, "new"));
    assert_eq!(rt.strings.read(string_key), "new");
    assert_eq!(rt.peek_signal::<i32>(version_key), 1);
    assert_eq!(rt.drain_dirty(), vec![scope.0]);
}

#[test]
fn key_enter_custom_gates_on_the_key() {
    let (mut rt, scope) = runtime_with_scope();
    let enter = handler(&mut rt, scope, Action::KeyEnterCustom, 0, 0);

    assert!(!rt.dispatch_with_string(enter, EventKind::KeyDown, "a"));
    assert!(!rt.dispatch_with_string(enter, EventKind::KeyDown, "Escape"));
    assert!(rt.drain_dirty().is_empty());

    assert!(rt.dispatch_with_string(enter, EventKind::KeyDown, "Enter"));
    assert_eq!(rt.drain_dirty(), vec![scope.0]);
}

#[test]
fn string_dispatch_falls_back_for_other_tags() {
    let (mut rt, scope) = runtime_with_scope();
    let flag = rt.signals.create(false);
    let toggle = handler(&mut rt, scope, Action::Toggle, flag, 0);

    assert!(rt.dispatch_with_string(toggle, EventKind::Change, "whatever"));
    assert!(rt.peek_signal::<bool>(flag));
}

#[test]
fn removed_handlers_stop_dispatching() {
    let (mut rt, scope) = runtime_with_scope();
    let signal = rt.signals.create(0i32);
    let add = handler(&mut rt, scope, Action::AddI32, signal, 1);

    assert!(rt.dispatch(add, EventKind::Click));
    assert!(rt.handlers.remove(add));
    assert!(!rt.dispatch(add, EventKind::Click));
    assert_eq!(rt.peek_signal::<i32>(signal), 1);
}
