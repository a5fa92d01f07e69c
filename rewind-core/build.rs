//! Build script recording the target the crate was compiled for.
//!
//! Replay logs use the native in-memory layout of the values they hold,
//! so a log is only guaranteed readable by a build for the same target.
//! The triple is baked into the crate so tools can report it.

use std::env;

fn main() {
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let target_endian = env::var("CARGO_CFG_TARGET_ENDIAN").unwrap_or_default();
    let pointer_width = env::var("CARGO_CFG_TARGET_POINTER_WIDTH").unwrap_or_default();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=TARGET");

    println!("cargo:rustc-env=REWIND_BUILD_TARGET={}", target);
    println!(
        "cargo:rustc-env=REWIND_LOG_LAYOUT={}-endian/{}-bit",
        target_endian, pointer_width
    );
}
