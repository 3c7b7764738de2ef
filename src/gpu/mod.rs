//! GPU memory reporting.
//!
//! - [`memory`]: memory report types, providers and the status-code contract
//! - [`runtime`]: the GPU runtime seam and its CUDA implementation

pub mod memory;
pub mod runtime;
