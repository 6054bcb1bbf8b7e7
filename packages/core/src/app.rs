//! The component context: the ergonomic layer an application talks to.
//!
//! An [`AppContext`] opens a root scope on creation and installs it as the
//! current reactive context, so top-level `use_signal` calls work before
//! any component runs. Components are plain function pointers from context
//! to vnode; the context drives their render brackets, keeps the current
//! view per scope, and brackets the create/diff engines behind the
//! `rebuild` / `handle_event` / `flush` surface the host calls.

use fxhash::FxHashMap;
use weft_protocol::{EventKind, MutationWriter};

use crate::dsl::{self, ExtractedBinding, Node};
use crate::events::HandlerEntry;
use crate::nodes::{AttrValue, DynamicAttr, DynamicNode, VNodeId};
use crate::runtime::RenderFrame;
use crate::scopes::ScopeId;
use crate::templates::TemplateId;
use crate::virtual_dom::{Capacities, VirtualDom};

/// A component renders a vnode from the context. Function pointers keep
/// the registry `Copy` and the whole system closure-free.
pub type Component = fn(&mut AppContext) -> VNodeId;

/// An inline event or value binding collected by [`AppContext::setup_view`],
/// replayed by the render builder on every render.
#[derive(Clone, Debug)]
pub enum AutoBinding {
    Event { slot: u32, handler: u32, event: String },
    Value { slot: u32, attr: String, string_key: u32, version_key: u32 },
}

pub struct AppContext {
    pub dom: VirtualDom,
    root_scope: ScopeId,
    components: FxHashMap<u32, Component>,
    views: FxHashMap<u32, VNodeId>,
    bindings: FxHashMap<TemplateId, Vec<AutoBinding>>,
    // The bracket opened at construction so setup code can use hooks; the
    // first `setup_view` or `rebuild` closes it.
    setup_frame: Option<RenderFrame>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::with_capacities(Capacities::default())
    }

    pub fn with_capacities(caps: Capacities) -> Self {
        let mut dom = VirtualDom::with_capacities(caps);
        let root_scope = dom.runtime.scopes.create(0, -1);
        let setup_frame = Some(dom.runtime.begin_scope_render(root_scope));
        Self {
            dom,
            root_scope,
            components: FxHashMap::default(),
            views: FxHashMap::default(),
            bindings: FxHashMap::default(),
            setup_frame,
        }
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root_scope
    }

    // -- hooks, forwarded to the runtime ---------------------------------

    pub fn use_signal(&mut self, initial: i32) -> u32 {
        self.dom.runtime.use_signal_i32(initial)
    }

    pub fn use_signal_bool(&mut self, initial: bool) -> u32 {
        self.dom.runtime.use_signal_bool(initial)
    }

    pub fn use_signal_string(&mut self, initial: &str) -> (u32, u32) {
        self.dom.runtime.use_signal_string(initial)
    }

    pub fn use_memo(&mut self, initial: i32) -> u32 {
        self.dom.runtime.use_memo_i32(initial)
    }

    pub fn use_effect(&mut self) -> u32 {
        self.dom.runtime.use_effect()
    }

    pub fn read_signal(&mut self, key: u32) -> i32 {
        self.dom.runtime.read_signal(key)
    }

    pub fn read_signal_bool(&mut self, key: u32) -> bool {
        self.dom.runtime.read_signal(key)
    }

    pub fn read_string(&mut self, string_key: u32, version_key: u32) -> String {
        self.dom.runtime.read_string(string_key, version_key)
    }

    pub fn read_memo(&mut self, memo: u32) -> i32 {
        self.dom.runtime.read_memo(memo)
    }

    // -- components and views --------------------------------------------

    /// Register the component rendered for the root scope.
    pub fn set_root_component(&mut self, component: Component) {
        self.components.insert(self.root_scope.0, component);
    }

    /// Create a child scope rendered by its own component.
    pub fn create_component_scope(&mut self, parent: ScopeId, component: Component) -> ScopeId {
        let scope = self.dom.runtime.scopes.create_child(parent);
        self.components.insert(scope.0, component);
        scope
    }

    /// Destroy a scope: its hooks, handlers, current view, and queue entry.
    pub fn destroy_scope(&mut self, scope: ScopeId) {
        if let Some(view) = self.views.remove(&scope.0) {
            self.dom.recycle_elements(view);
            self.dom.vnodes.recycle(view);
        }
        self.components.remove(&scope.0);
        self.dom.runtime.destroy_scope(scope);
        self.dom.scheduler.remove_scope(scope.0);
    }

    /// Compile a view tree and register its template.
    ///
    /// Inline EVENT nodes become registered handlers owned by the root
    /// scope; BIND_VALUE nodes record their string/version keys. Both are
    /// kept as auto bindings the render builder replays in slot order.
    pub fn setup_view(&mut self, root: Node, name: &str) -> TemplateId {
        if let Some(frame) = self.setup_frame.take() {
            self.dom.runtime.end_scope_render(frame);
        }

        let (template, extracted) = dsl::compile(&root, name);
        let template_id = self.dom.runtime.templates.register(template);

        let mut autos = Vec::with_capacity(extracted.len());
        for binding in extracted {
            match binding {
                ExtractedBinding::Event { slot, event, action, signal, operand } => {
                    let handler = self.dom.runtime.handlers.register(HandlerEntry {
                        scope: self.root_scope.0,
                        action,
                        signal,
                        operand,
                        event: event.clone(),
                    });
                    autos.push(AutoBinding::Event { slot, handler, event });
                }
                ExtractedBinding::Value { slot, attr, string_key, version_key } => {
                    autos.push(AutoBinding::Value { slot, attr, string_key, version_key });
                }
            }
        }
        self.bindings.insert(template_id, autos);
        template_id
    }

    /// Start building this render's vnode for a registered view. The
    /// caller supplies only the dynamic text/node contents; `build`
    /// emits the auto-bound attr entries in slot order.
    pub fn render_builder(&mut self, template: TemplateId) -> RenderBuilder<'_> {
        let vnode = self.dom.vnodes.push_template_ref(template);
        RenderBuilder { ctx: self, template, vnode }
    }

    pub fn render_builder_keyed(&mut self, template: TemplateId, key: &str) -> RenderBuilder<'_> {
        let vnode = self.dom.vnodes.push_template_ref_keyed(template, key);
        RenderBuilder { ctx: self, template, vnode }
    }

    // -- host surface ----------------------------------------------------

    /// First render: run the root component and emit the full construction
    /// stream. Returns the number of bytes written.
    pub fn rebuild(&mut self, buf: &mut [u8]) -> usize {
        if let Some(frame) = self.setup_frame.take() {
            self.dom.runtime.end_scope_render(frame);
        }
        let Some(&component) = self.components.get(&self.root_scope.0) else {
            log::warn!("rebuild without a root component");
            return 0;
        };

        let vnode = self.render_scope(self.root_scope, component);
        self.views.insert(self.root_scope.0, vnode);

        let mut writer = MutationWriter::new(buf);
        self.dom.mount(&mut writer, vnode);
        writer.finalize()
    }

    /// Forward an event to a handler. True iff a signal action fired.
    pub fn handle_event(&mut self, handler: u32, event: EventKind) -> bool {
        self.dom.runtime.dispatch(handler, event)
    }

    pub fn handle_event_with_i32(&mut self, handler: u32, event: EventKind, value: i32) -> bool {
        self.dom.runtime.dispatch_with_i32(handler, event, value)
    }

    pub fn dispatch_string(&mut self, handler: u32, event: EventKind, value: &str) -> bool {
        self.dom.runtime.dispatch_with_string(handler, event, value)
    }

    /// Re-render every dirty scope in height order, diffing each against
    /// its previous view. Returns bytes written, or 0 if nothing was dirty.
    pub fn flush(&mut self, buf: &mut [u8]) -> usize {
        self.dom.scheduler.collect(&mut self.dom.runtime);
        if self.dom.scheduler.is_empty() {
            return 0;
        }

        let mut writer = MutationWriter::new(buf);
        while let Some(scope_id) = self.dom.scheduler.next() {
            let scope = ScopeId(scope_id);
            if !self.dom.runtime.scopes.contains(scope) {
                continue;
            }
            let Some(&component) = self.components.get(&scope_id) else {
                log::debug!("dirty scope {scope_id} has no component; skipping");
                continue;
            };

            let new = self.render_scope(scope, component);
            match self.views.insert(scope_id, new) {
                Some(old) => {
                    self.dom.diff(&mut writer, old, new);
                    self.dom.vnodes.recycle(old);
                }
                None => {
                    self.dom.mount(&mut writer, new);
                }
            }

            // Renders may dirty further scopes; fold them in before the
            // next pop so ordering stays height-first.
            self.dom.scheduler.collect(&mut self.dom.runtime);
        }
        writer.finalize()
    }

    /// The auto bindings a view registered, in the order they were
    /// extracted. Host shims use this to learn handler ids.
    pub fn view_bindings(&self, template: TemplateId) -> &[AutoBinding] {
        self.bindings.get(&template).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Effects the host should run now; see [`Runtime::begin_effect`].
    ///
    /// [`Runtime::begin_effect`]: crate::runtime::Runtime::begin_effect
    pub fn take_pending_effects(&self) -> Vec<u32> {
        self.dom.runtime.take_pending_effects()
    }

    fn render_scope(&mut self, scope: ScopeId, component: Component) -> VNodeId {
        let frame = self.dom.runtime.begin_scope_render(scope);
        let vnode = component(self);
        self.dom.runtime.end_scope_render(frame);
        vnode
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fills a view's dynamic node slots, then stamps the auto-bound attr
/// entries on `build`.
pub struct RenderBuilder<'a> {
    ctx: &'a mut AppContext,
    template: TemplateId,
    vnode: VNodeId,
}

impl<'a> RenderBuilder<'a> {
    pub fn add_dyn_text(&mut self, value: impl Into<String>) -> &mut Self {
        self.ctx.dom.vnodes.push_dynamic_node(self.vnode, DynamicNode::Text(value.into()));
        self
    }

    pub fn add_dyn_placeholder(&mut self) -> &mut Self {
        self.ctx.dom.vnodes.push_dynamic_node(self.vnode, DynamicNode::Placeholder);
        self
    }

    /// Emit the auto-bound dynamic attrs in slot order and return the
    /// finished vnode. Event bindings become EVENT attr values; value
    /// bindings re-read their string signal, tracking the current scope
    /// through the companion version signal.
    pub fn build(self) -> VNodeId {
        let mut bindings = self
            .ctx
            .bindings
            .get(&self.template)
            .cloned()
            .unwrap_or_default();
        bindings.sort_by_key(|binding| match binding {
            AutoBinding::Event { slot, .. } | AutoBinding::Value { slot, .. } => *slot,
        });

        for binding in bindings {
            match binding {
                AutoBinding::Event { handler, event, .. } => {
                    self.ctx.dom.vnodes.push_dynamic_attr(
                        self.vnode,
                        DynamicAttr { name: event, value: AttrValue::Event(handler) },
                    );
                }
                AutoBinding::Value { attr, string_key, version_key, .. } => {
                    let value = self.ctx.dom.runtime.read_string(string_key, version_key);
                    self.ctx.dom.vnodes.push_dynamic_attr(
                        self.vnode,
                        DynamicAttr { name: attr, value: AttrValue::Text(value) },
                    );
                }
            }
        }
        self.vnode
    }
}
