//! gpu-meminfo: free/total memory for a GPU device.
//!
//! Built with the `cuda` feature, queries go to the CUDA driver. Without it,
//! every query reports fixed placeholder values together with an
//! "unsupported" status so callers never mistake them for measurements.
//!
//! The query is available three ways:
//!   typed:       [`gpu::memory::query`]
//!   status code: [`gpu::memory::query_gpu_memory`]
//!   C ABI:       [`ffi::get_gpu_memory_info`]

pub mod config;
pub mod ffi;
pub mod gpu;

pub use gpu::memory::{
    default_provider, query, query_gpu_memory, DeviceId, MemoryInfoError, MemoryInfoProvider,
    MemoryReport,
};
