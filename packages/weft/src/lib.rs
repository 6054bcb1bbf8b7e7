//! weft: a reactive UI runtime for WebAssembly.
//!
//! This is the umbrella crate: it re-exports the runtime core and the wire
//! protocol so an application depends on one crate. The typical shape of an
//! app is a build function that declares hooks and views, handed to
//! [`export_app!`] to generate the `extern "C"` surface the host's boot
//! loader discovers by name prefix.
//!
//! ```ignore
//! use weft::prelude::*;
//! use weft::dsl::{button, div, dyn_text, on_click, span, Action};
//!
//! fn build(app: &mut AppContext) {
//!     let count = app.use_signal(0);
//!     let view = div(vec![
//!         span(vec![dyn_text()]),
//!         button(vec![on_click(Action::AddI32, count, 1)]),
//!     ]);
//!     app.setup_view(view, "counter");
//!     app.set_root_component(render);
//! }
//! # fn render(app: &mut AppContext) -> VNodeId { unimplemented!() }
//!
//! weft::export_app! {
//!     build: build,
//!     init: counter_init,
//!     rebuild: counter_rebuild,
//!     handle_event: counter_handle_event,
//!     dispatch_string: counter_dispatch_string,
//!     flush: counter_flush,
//!     destroy: counter_destroy,
//! }
//! ```

pub use weft_core::*;

pub use weft_core::dsl;
pub use weft_core::export_app;

pub mod protocol {
    pub use weft_protocol::*;
}

pub mod prelude {
    pub use weft_core::prelude::*;
}
