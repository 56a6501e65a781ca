//! Copy caller-owned C arguments into an owned `HttpRequest`.
//!
//! Nothing here keeps a pointer past return: strings and header items are
//! copied, so the caller may free its buffers as soon as `httpc` or
//! `httpc_async` returns. Inconsistent input is rejected with a
//! [`MarshalError`] instead of being dereferenced.

use std::ffi::CStr;
use std::os::raw::c_char;

use httpc_core::{HttpMethod, HttpRequest, HttpcError};
use thiserror::Error;

use crate::types::{FfiHeaderItem, FfiHeaders};

/// Boundary contract violations detected while reading arguments.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("null argument: {0}")]
    NullArgument(&'static str),

    #[error("header list has {count} entries but a null item array")]
    NullHeaderItems { count: usize },

    #[error("header {index} has a null {field}")]
    NullHeaderField { index: usize, field: &'static str },

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("panic while reading arguments")]
    Panicked,
}

impl From<MarshalError> for HttpcError {
    fn from(err: MarshalError) -> Self {
        match err {
            MarshalError::UnsupportedMethod(m) => HttpcError::UnsupportedMethod(m),
            other => HttpcError::InvalidArgument(other.to_string()),
        }
    }
}

/// Build an owned request from the raw `httpc` / `httpc_async` arguments.
///
/// # Safety
/// Every non-null pointer must reference a NUL-terminated string, and a
/// non-null `headers` must point to a valid `FfiHeaders` whose non-null
/// item array holds `count` initialised items.
pub unsafe fn read_request(
    method: *const c_char,
    url: *const c_char,
    headers: *const FfiHeaders,
    body: *const c_char,
) -> Result<HttpRequest, MarshalError> {
    let method = unsafe { read_str(method, "method") }?;
    let method: HttpMethod = method
        .parse()
        .map_err(|_| MarshalError::UnsupportedMethod(method))?;
    let url = unsafe { read_str(url, "url") }?;
    let headers = unsafe { read_headers(headers) }?;
    let body = if body.is_null() {
        None
    } else {
        Some(unsafe { read_str(body, "body") }?)
    };

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}

/// Copy the header list in order. Null list or zero count yields no headers.
///
/// # Safety
/// See [`read_request`].
pub unsafe fn read_headers(list: *const FfiHeaders) -> Result<Vec<(String, String)>, MarshalError> {
    if list.is_null() {
        return Ok(Vec::new());
    }
    let list = unsafe { &*list };
    if list.count == 0 {
        return Ok(Vec::new());
    }
    if list.headers.is_null() {
        return Err(MarshalError::NullHeaderItems { count: list.count });
    }

    let items: &[FfiHeaderItem] = unsafe { std::slice::from_raw_parts(list.headers, list.count) };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if item.key.is_null() {
                return Err(MarshalError::NullHeaderField { index, field: "key" });
            }
            if item.value.is_null() {
                return Err(MarshalError::NullHeaderField { index, field: "value" });
            }
            let key = unsafe { read_str(item.key, "header key") }?;
            let value = unsafe { read_str(item.value, "header value") }?;
            Ok((key, value))
        })
        .collect()
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn read_str(ptr: *const c_char, what: &'static str) -> Result<String, MarshalError> {
    if ptr.is_null() {
        return Err(MarshalError::NullArgument(what));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(str::to_owned)
        .map_err(|_| MarshalError::InvalidUtf8(what.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    fn cs(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn reads_minimal_request() {
        let (m, u) = (cs("GET"), cs("https://example.com"));
        let req = unsafe { read_request(m.as_ptr(), u.as_ptr(), ptr::null(), ptr::null()) }.unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://example.com");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn reads_headers_in_order_with_duplicates() {
        let keys = [cs("Accept"), cs("X-Dup"), cs("X-Dup")];
        let values = [cs("application/json"), cs("1"), cs("2")];
        let mut items: Vec<FfiHeaderItem> = keys
            .iter()
            .zip(values.iter())
            .map(|(k, v)| FfiHeaderItem {
                key: k.as_ptr() as *mut c_char,
                value: v.as_ptr() as *mut c_char,
            })
            .collect();
        let list = FfiHeaders {
            headers: items.as_mut_ptr(),
            count: items.len(),
        };
        let (m, u, b) = (cs("post"), cs("http://h/post"), cs(r#"{"我是谁": 5429}"#));
        let req = unsafe { read_request(m.as_ptr(), u.as_ptr(), &list, b.as_ptr()) }.unwrap();

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Dup".to_string(), "1".to_string()),
                ("X-Dup".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(req.body.as_deref(), Some(r#"{"我是谁": 5429}"#));
    }

    #[test]
    fn zero_count_list_is_empty_even_with_null_items() {
        let list = FfiHeaders {
            headers: ptr::null_mut(),
            count: 0,
        };
        assert!(unsafe { read_headers(&list) }.unwrap().is_empty());
    }

    #[test]
    fn null_items_with_count_is_rejected() {
        let list = FfiHeaders {
            headers: ptr::null_mut(),
            count: 2,
        };
        let err = unsafe { read_headers(&list) }.unwrap_err();
        assert!(matches!(err, MarshalError::NullHeaderItems { count: 2 }));
    }

    #[test]
    fn null_key_or_value_is_rejected() {
        let k = cs("Accept");
        let mut items = [FfiHeaderItem {
            key: k.as_ptr() as *mut c_char,
            value: ptr::null_mut(),
        }];
        let list = FfiHeaders {
            headers: items.as_mut_ptr(),
            count: 1,
        };
        let err = unsafe { read_headers(&list) }.unwrap_err();
        assert!(matches!(err, MarshalError::NullHeaderField { index: 0, field: "value" }));

        items[0] = FfiHeaderItem {
            key: ptr::null_mut(),
            value: k.as_ptr() as *mut c_char,
        };
        let err = unsafe { read_headers(&list) }.unwrap_err();
        assert!(matches!(err, MarshalError::NullHeaderField { index: 0, field: "key" }));
    }

    #[test]
    fn null_method_or_url_is_rejected() {
        let u = cs("http://h/");
        let err = unsafe { read_request(ptr::null(), u.as_ptr(), ptr::null(), ptr::null()) }.unwrap_err();
        assert!(matches!(err, MarshalError::NullArgument("method")));

        let m = cs("GET");
        let err = unsafe { read_request(m.as_ptr(), ptr::null(), ptr::null(), ptr::null()) }.unwrap_err();
        assert!(matches!(err, MarshalError::NullArgument("url")));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let (m, u) = (cs("BREW"), cs("http://h/"));
        let err = unsafe { read_request(m.as_ptr(), u.as_ptr(), ptr::null(), ptr::null()) }.unwrap_err();
        assert!(matches!(err, MarshalError::UnsupportedMethod(ref t) if t == "BREW"));
        assert!(matches!(HttpcError::from(err), HttpcError::UnsupportedMethod(_)));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let m = cs("GET");
        let bad = CString::new(vec![0x68, 0xff, 0x69]).unwrap();
        let err = unsafe { read_request(m.as_ptr(), bad.as_ptr(), ptr::null(), ptr::null()) }.unwrap_err();
        assert!(matches!(err, MarshalError::InvalidUtf8(ref w) if w == "url"));
        assert!(HttpcError::from(err).is_invalid_input());
    }
}
