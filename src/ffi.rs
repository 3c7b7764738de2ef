//! C ABI export of the memory query.
//!
//! ```c
//! int get_gpu_memory_info(int device_id, size_t* free_memory, size_t* total_memory);
//! ```
//!
//! Returns `0` on success, `-1` if the device could not be selected, `-2` if
//! the memory query failed and `-3` if this build has no GPU runtime. On
//! `-1`/`-2` the out-parameters are left untouched. On `0`/`-3` both are
//! written; with `-3` they hold placeholder values. A panic inside the
//! provider is caught and reported as `-1`; it never unwinds into C.

use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::gpu::memory::{
    default_provider, MemoryInfoProvider, MemoryReport, STATUS_DEVICE_UNAVAILABLE,
};

/// Run `provider` for `device_id` and write the result through the
/// out-pointers following the C contract above. Null pointers are skipped.
///
/// # Safety
///
/// Non-null `free_memory` and `total_memory` must be valid for writes of one
/// `usize` each.
pub unsafe fn query_into<P: MemoryInfoProvider>(
    provider: &P,
    device_id: c_int,
    free_memory: *mut usize,
    total_memory: *mut usize,
) -> c_int {
    let result = match panic::catch_unwind(AssertUnwindSafe(|| provider.query(device_id))) {
        Ok(result) => result,
        Err(_) => {
            error!(device_id, "GPU memory query panicked");
            return STATUS_DEVICE_UNAVAILABLE;
        }
    };

    let (status, values) = match result {
        Ok(report) => (0, Some(report)),
        Err(e) => (e.status_code(), e.reported_values()),
    };

    if let Some(MemoryReport { free, total }) = values {
        // SAFETY: caller guarantees non-null pointers are writable.
        unsafe {
            if !free_memory.is_null() {
                *free_memory = saturating_usize(free);
            }
            if !total_memory.is_null() {
                *total_memory = saturating_usize(total);
            }
        }
    }

    status
}

/// C entry point using the provider compiled into this build.
///
/// # Safety
///
/// See [`query_into`].
#[no_mangle]
pub unsafe extern "C" fn get_gpu_memory_info(
    device_id: c_int,
    free_memory: *mut usize,
    total_memory: *mut usize,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { query_into(&default_provider(), device_id, free_memory, total_memory) }
}

fn saturating_usize(bytes: u64) -> usize {
    usize::try_from(bytes).unwrap_or(usize::MAX)
}
