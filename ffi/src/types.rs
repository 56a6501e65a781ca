//! `#[repr(C)]` types for the FFI boundary, and ownership of what we hand out.
//!
//! # Design
//! Field order and widths match `include/httpc.h` exactly:
//! `HttpResponse { char* body; uint16_t status; char* content_type; HttpHeaders* headers; }`.
//! Everything reachable from a returned `FfiHttpResponse` is a fresh
//! allocation owned by that response (no pointer aliases engine state), and
//! [`FfiHttpResponse::free`] is the only code that releases it:
//! `CString::into_raw` pairs with `CString::from_raw`, and the header item
//! array is a `Box<[FfiHeaderItem]>` so its length is also its capacity.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::ptr;

/// A single header as a key/value pair of C strings.
#[repr(C)]
pub struct FfiHeaderItem {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An ordered header list. `headers` is null iff `count` is 0.
#[repr(C)]
pub struct FfiHeaders {
    pub headers: *mut FfiHeaderItem,
    pub count: usize,
}

/// A completed HTTP transaction as seen from C.
#[repr(C)]
pub struct FfiHttpResponse {
    pub body: *mut c_char,
    pub status: u16,
    pub content_type: *mut c_char,
    pub headers: *mut FfiHeaders,
}

/// Completion callback for `httpc_async`. Receives the response (or null)
/// and the caller's context pointer unchanged.
pub type FfiHttpCallback = Option<unsafe extern "C" fn(*mut FfiHttpResponse, *mut c_void)>;

impl FfiHttpResponse {
    /// Copy a core response into a heap-allocated `FfiHttpResponse`.
    pub fn from_core(resp: httpc_core::HttpResponse) -> *mut Self {
        let items: Vec<FfiHeaderItem> = resp
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeaderItem {
                key: c_string(k).into_raw(),
                value: c_string(v).into_raw(),
            })
            .collect();

        let count = items.len();
        let headers = if items.is_empty() {
            ptr::null_mut()
        } else {
            Box::into_raw(items.into_boxed_slice()) as *mut FfiHeaderItem
        };

        let response = Box::new(FfiHttpResponse {
            body: c_string(resp.body).into_raw(),
            status: resp.status,
            content_type: resp
                .content_type
                .map_or(ptr::null_mut(), |ct| c_string(ct).into_raw()),
            headers: Box::into_raw(Box::new(FfiHeaders { headers, count })),
        });
        Box::into_raw(response)
    }

    /// Release a response produced by [`FfiHttpResponse::from_core`] and
    /// everything it owns. Null fields are skipped; a null `ptr` is a no-op.
    ///
    /// # Safety
    /// `ptr` must be null or a pointer obtained from `from_core` that has not
    /// been freed yet. Nothing it owns may be used afterwards.
    pub unsafe fn free(ptr: *mut Self) {
        if ptr.is_null() {
            return;
        }
        let response = unsafe { Box::from_raw(ptr) };
        unsafe {
            free_c_string(response.body);
            free_c_string(response.content_type);
            if !response.headers.is_null() {
                free_headers(Box::from_raw(response.headers));
            }
        }
    }
}

/// # Safety
/// The item array, if non-null, must be a `Box<[FfiHeaderItem]>` of exactly
/// `count` elements whose strings came from `CString::into_raw`.
unsafe fn free_headers(list: Box<FfiHeaders>) {
    if list.headers.is_null() || list.count == 0 {
        return;
    }
    let items = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(list.headers, list.count)) };
    for item in items.iter() {
        unsafe {
            free_c_string(item.key);
            free_c_string(item.value);
        }
    }
}

/// # Safety
/// `s` must be null or come from `CString::into_raw` and not be freed yet.
unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Convert to a C string, cutting at the first interior NUL since a C reader
/// would stop there anyway.
pub(crate) fn c_string(s: String) -> CString {
    match CString::new(s) {
        Ok(c) => c,
        Err(e) => {
            let nul = e.nul_position();
            let mut bytes = e.into_vec();
            bytes.truncate(nul);
            CString::new(bytes).unwrap_or_default()
        }
    }
}
