//! Build script for kinetics-bindings
//!
//! When the `native` feature is enabled, this script emits the link
//! directives for the native kinetics solver's C API library. The library
//! location can be overridden with the `KINETICS_NATIVE_DIR` environment
//! variable; otherwise the system linker search path is used.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=KINETICS_NATIVE_DIR");

    // Nothing to link without the native feature; the logging bridge and
    // collection types are pure Rust.
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    if let Ok(dir) = env::var("KINETICS_NATIVE_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
        println!("cargo:rustc-link-search=native={dir}/lib");
    }

    // The library itself is named by the #[link] attribute on the extern
    // block in src/ffi.rs.

    // The solver core is C++; pull in its runtime on platforms where the
    // shared library does not already carry it.
    #[cfg(target_os = "linux")]
    {
        println!("cargo:rustc-link-lib=dylib=stdc++");
    }
}
