//! Integration tests for the C ABI contract.

use gpu_meminfo::ffi::query_into;
use gpu_meminfo::gpu::memory::{NativeProvider, Platform, PlaceholderProvider};
use gpu_meminfo::gpu::runtime::{GpuRuntime, RuntimeError};
use gpu_meminfo::DeviceId;

struct FixedRuntime {
    select_ok: bool,
    info: Option<(u64, u64)>,
}

impl GpuRuntime for FixedRuntime {
    fn select_device(&self, device_id: DeviceId) -> Result<(), RuntimeError> {
        if self.select_ok {
            Ok(())
        } else {
            Err(RuntimeError::InvalidDevice(device_id))
        }
    }

    fn mem_get_info(&self) -> Result<(u64, u64), RuntimeError> {
        self.info
            .ok_or_else(|| RuntimeError::Driver("CUDA_ERROR_UNKNOWN".to_string()))
    }
}

fn run(runtime: FixedRuntime, device_id: DeviceId) -> (i32, usize, usize) {
    let provider = NativeProvider::new(runtime);
    let mut free = 11usize;
    let mut total = 22usize;
    let status = unsafe { query_into(&provider, device_id, &mut free, &mut total) };
    (status, free, total)
}

#[test]
fn test_success_writes_values() {
    let runtime = FixedRuntime {
        select_ok: true,
        info: Some((500, 2000)),
    };
    assert_eq!(run(runtime, 0), (0, 500, 2000));
}

#[test]
fn test_selection_failure_leaves_outputs() {
    let runtime = FixedRuntime {
        select_ok: false,
        info: Some((500, 2000)),
    };
    assert_eq!(run(runtime, -4), (-1, 11, 22));
}

#[test]
fn test_query_failure_leaves_outputs() {
    let runtime = FixedRuntime {
        select_ok: true,
        info: None,
    };
    assert_eq!(run(runtime, 0), (-2, 11, 22));
}

#[test]
fn test_placeholder_writes_values() {
    let provider = PlaceholderProvider::new(Platform::Windows);
    let mut free = 11usize;
    let mut total = 22usize;
    let status = unsafe { query_into(&provider, 0, &mut free, &mut total) };
    assert_eq!(status, -3);
    assert_eq!(free, 0);
    assert_eq!(total, 1024 * 1024 * 1024);
}
