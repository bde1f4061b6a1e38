//! Build script for mnist-dpu.
//!
//! With the `vart` feature, this script builds the C++ XIR/VART bridge library
//! and links it to the Rust crate. Without the feature it does nothing, so the
//! crate builds on hosts that lack the Vitis AI runtime.
//!
//! # Environment Variables
//!
//! - `VART_SYSROOT`: Prefix holding the XIR/VART headers, libraries and CMake
//!   configs (default: `/usr`, as on a target board image)
//! - `VART_BRIDGE_SKIP_BUILD`: Set to "1" to skip building (for development)

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    if env::var_os("CARGO_FEATURE_VART").is_none() {
        return;
    }
    build_vart_bridge();
}

fn build_vart_bridge() {
    println!("cargo:rerun-if-changed=../vart_bridge/src/vart_bridge.cpp");
    println!("cargo:rerun-if-changed=../vart_bridge/include/vart_bridge.h");
    println!("cargo:rerun-if-changed=../vart_bridge/CMakeLists.txt");
    println!("cargo:rerun-if-env-changed=VART_SYSROOT");
    println!("cargo:rerun-if-env-changed=VART_BRIDGE_SKIP_BUILD");

    if env::var("VART_BRIDGE_SKIP_BUILD")
        .map(|v| v == "1")
        .unwrap_or(false)
    {
        println!("cargo:warning=Skipping vart-bridge build (VART_BRIDGE_SKIP_BUILD=1)");
        return;
    }

    let sysroot = PathBuf::from(env::var("VART_SYSROOT").unwrap_or_else(|_| "/usr".to_string()));
    if !sysroot.exists() {
        panic!(
            "VART sysroot does not exist: {}\n\
             Set VART_SYSROOT to the prefix of your Vitis AI installation.",
            sysroot.display()
        );
    }
    let lib_dir = sysroot.join("lib");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let bridge_dir = manifest_dir.join("../vart_bridge");

    let mut cmake_config = cmake::Config::new(&bridge_dir);
    cmake_config.define("CMAKE_PREFIX_PATH", &sysroot);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());
    let build_type = if profile == "release" {
        "Release"
    } else {
        "Debug"
    };
    cmake_config.define("CMAKE_BUILD_TYPE", build_type);
    cmake_config.always_configure(true);

    let dst = cmake_config.build();

    println!("cargo:rustc-link-search=native={}/lib", dst.display());
    println!("cargo:rustc-link-lib=dylib=vart_bridge");
    println!("cargo:rustc-link-search=native={}", lib_dir.display());

    // RPATH (not RUNPATH) so the bridge finds the runtime libraries.
    println!("cargo:rustc-link-arg=-Wl,--disable-new-dtags");
    println!("cargo:rustc-link-arg=-Wl,-rpath,{}/lib", dst.display());
    println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir.display());
}
