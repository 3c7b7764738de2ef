//! Build script for gpu-meminfo.
//!
//! The native backend links nothing at build time: `cudarc` loads the CUDA
//! driver dynamically. This script only wires up rebuild triggers and tells
//! the user which backend the build will carry.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(feature = "cuda")]
    {
        println!("cargo:rerun-if-env-changed=CUDA_PATH");
        println!("cargo:warning=CUDA feature enabled — the CUDA driver must be installed at runtime");
    }
}
