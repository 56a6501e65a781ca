//! Every allocation reachable from a returned response is released by
//! `httpc_free`, and by nothing else.
//!
//! A counting allocator tracks live blocks per thread, so other test
//! threads do not disturb the balance.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use httpc::httpc_free;
use httpc::types::FfiHttpResponse;
use httpc_core::HttpResponse;

struct Counting;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let p = unsafe { System.alloc(layout) };
        if !p.is_null() {
            let _ = LIVE.try_with(|n| n.set(n.get() + 1));
        }
        p
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = LIVE.try_with(|n| n.set(n.get() - 1));
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOC: Counting = Counting;

fn live() -> isize {
    LIVE.with(Cell::get)
}

fn response(i: usize) -> HttpResponse {
    let headers = (0..i % 5)
        .map(|h| (format!("x-header-{h}"), format!("value {i}/{h}")))
        .collect();
    HttpResponse {
        status: 200 + (i % 300) as u16,
        content_type: (i % 2 == 0).then(|| "application/json".to_string()),
        headers,
        body: "动态".repeat(i),
    }
}

#[test]
fn free_releases_everything_from_core() {
    let before = live();
    for i in 0..500 {
        let raw = FfiHttpResponse::from_core(response(i));
        assert!(!raw.is_null());
        httpc_free(raw);
    }
    assert_eq!(live(), before);
}

#[test]
fn responses_outstanding_until_freed() {
    let before = live();
    let held: Vec<*mut FfiHttpResponse> = (0..20).map(|i| FfiHttpResponse::from_core(response(i))).collect();
    assert!(live() > before);
    for raw in held {
        httpc_free(raw);
    }
    assert_eq!(live(), before);
}

#[test]
fn free_null_allocates_nothing() {
    let before = live();
    httpc_free(std::ptr::null_mut());
    assert_eq!(live(), before);
}
