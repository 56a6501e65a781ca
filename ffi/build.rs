//! Generate the C header for the `extern "C"` surface.
//!
//! The header always goes to `OUT_DIR`. The checked-in `include/httpc.h` is
//! only rewritten when `HTTPC_REGENERATE_HEADER` is set, so a normal build
//! never modifies the source tree.

use std::env;
use std::fs;
use std::path::PathBuf;

const REGENERATE_ENV: &str = "HTTPC_REGENERATE_HEADER";

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
    println!("cargo:rerun-if-env-changed={REGENERATE_ENV}");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };
    let crate_dir = PathBuf::from(crate_dir);
    let generated_path = PathBuf::from(out_dir).join("httpc.h");

    let generated = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("HTTPC_H")
        .with_no_includes()
        .with_sys_include("stdint.h")
        .with_sys_include("stddef.h")
        .rename_item("FfiHeaderItem", "HttpHeaderItem")
        .rename_item("FfiHeaders", "HttpHeaders")
        .rename_item("FfiHttpResponse", "HttpResponse")
        .rename_item("FfiHttpCallback", "HttpCallback")
        .generate();

    let bindings = match generated {
        Ok(bindings) => bindings,
        // The header is a convenience for C callers; never fail the build over it.
        Err(e) => {
            println!("cargo:warning=cbindgen could not generate httpc.h: {e}");
            return;
        }
    };

    bindings.write_to_file(&generated_path);
    println!("cargo:rustc-env=HTTPC_GENERATED_HEADER={}", generated_path.display());

    if env::var_os(REGENERATE_ENV).is_some() {
        let checked_in = crate_dir.join("include").join("httpc.h");
        if let Err(e) = fs::copy(&generated_path, &checked_in) {
            println!("cargo:warning=could not update {}: {e}", checked_in.display());
        }
    }
}
