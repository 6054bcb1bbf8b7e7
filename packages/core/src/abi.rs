//! The raw WASM export surface.
//!
//! The host's boot loader discovers an application by export-name prefix:
//! `{app}_init`, `{app}_rebuild`, `{app}_handle_event`,
//! `{app}_dispatch_string`, `{app}_flush`, `{app}_destroy`. The
//! [`export_app!`] macro generates those six `extern "C"` functions around
//! an [`AppContext`] constructor; everything behind the pointer boundary is
//! the safe shell API.
//!
//! [`AppContext`]: crate::app::AppContext

use crate::app::AppContext;

/// A borrowed string passed in from the host, as (pointer, length) into
/// WASM linear memory.
#[repr(C)]
pub struct HostString {
    pub ptr: *const u8,
    pub len: u32,
}

impl HostString {
    /// View the host bytes as a str.
    ///
    /// # Safety
    /// `ptr` must point at `len` bytes of initialized memory that outlive
    /// the call.
    pub unsafe fn as_str<'a>(&self) -> Option<&'a str> {
        if self.ptr.is_null() {
            return None;
        }
        let bytes = std::slice::from_raw_parts(self.ptr, self.len as usize);
        std::str::from_utf8(bytes).ok()
    }
}

/// Box an app context and leak it to the host as an opaque pointer.
pub fn into_host_ptr(app: AppContext) -> *mut AppContext {
    Box::into_raw(Box::new(app))
}

/// Reclaim and drop a context previously leaked with [`into_host_ptr`].
///
/// # Safety
/// `ptr` must have come from [`into_host_ptr`] and must not be used again.
pub unsafe fn destroy_host_ptr(ptr: *mut AppContext) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

/// Generate the `extern "C"` export sextet for one application.
///
/// ```ignore
/// fn build(app: &mut AppContext) {
///     // hooks, setup_view, set_root_component...
/// }
///
/// weft_core::export_app! {
///     build: build,
///     init: counter_init,
///     rebuild: counter_rebuild,
///     handle_event: counter_handle_event,
///     dispatch_string: counter_dispatch_string,
///     flush: counter_flush,
///     destroy: counter_destroy,
/// }
/// ```
#[macro_export]
macro_rules! export_app {
    (
        build: $build:expr,
        init: $init:ident,
        rebuild: $rebuild:ident,
        handle_event: $handle_event:ident,
        dispatch_string: $dispatch_string:ident,
        flush: $flush:ident,
        destroy: $destroy:ident $(,)?
    ) => {
        #[no_mangle]
        pub extern "C" fn $init() -> *mut $crate::AppContext {
            let mut app = $crate::AppContext::new();
            ($build)(&mut app);
            $crate::abi::into_host_ptr(app)
        }

        /// # Safety
        /// `app` must be a live pointer from the matching init export, and
        /// `buf`/`cap` must describe writable memory.
        #[no_mangle]
        pub unsafe extern "C" fn $rebuild(
            app: *mut $crate::AppContext,
            buf: *mut u8,
            cap: u32,
        ) -> u32 {
            let app = &mut *app;
            let buf = ::std::slice::from_raw_parts_mut(buf, cap as usize);
            app.rebuild(buf) as u32
        }

        /// # Safety
        /// `app` must be a live pointer from the matching init export.
        #[no_mangle]
        pub unsafe extern "C" fn $handle_event(
            app: *mut $crate::AppContext,
            handler: u32,
            event: u8,
        ) -> bool {
            let app = &mut *app;
            let event = $crate::EventKind::from_u8(event).unwrap_or($crate::EventKind::Custom);
            app.handle_event(handler, event)
        }

        /// # Safety
        /// `app` must be a live pointer from the matching init export;
        /// `value` must point at a valid [`weft_core::abi::HostString`].
        #[no_mangle]
        pub unsafe extern "C" fn $dispatch_string(
            app: *mut $crate::AppContext,
            handler: u32,
            event: u8,
            value: *const $crate::abi::HostString,
        ) -> bool {
            let app = &mut *app;
            let event = $crate::EventKind::from_u8(event).unwrap_or($crate::EventKind::Custom);
            if value.is_null() {
                return false;
            }
            let value = match (*value).as_str() {
                Some(value) => value,
                None => return false,
            };
            app.dispatch_string(handler, event, value)
        }

        /// # Safety
        /// `app` must be a live pointer from the matching init export, and
        /// `buf`/`cap` must describe writable memory.
        #[no_mangle]
        pub unsafe extern "C" fn $flush(
            app: *mut $crate::AppContext,
            buf: *mut u8,
            cap: u32,
        ) -> u32 {
            let app = &mut *app;
            let buf = ::std::slice::from_raw_parts_mut(buf, cap as usize);
            app.flush(buf) as u32
        }

        /// # Safety
        /// `app` must be a live pointer from the matching init export; it
        /// is dropped and must not be used again.
        #[no_mangle]
        pub unsafe extern "C" fn $destroy(app: *mut $crate::AppContext) {
            $crate::abi::destroy_host_ptr(app);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_strings_view_utf8() {
        let text = "Enter";
        let host = HostString { ptr: text.as_ptr(), len: text.len() as u32 };
        assert_eq!(unsafe { host.as_str() }, Some("Enter"));

        let null = HostString { ptr: std::ptr::null(), len: 0 };
        assert_eq!(unsafe { null.as_str() }, None);
    }

    #[test]
    fn host_ptr_roundtrip() {
        let app = AppContext::new();
        let ptr = into_host_ptr(app);
        assert!(!ptr.is_null());
        unsafe {
            (*ptr).use_signal(3);
            destroy_host_ptr(ptr);
        }
    }
}
