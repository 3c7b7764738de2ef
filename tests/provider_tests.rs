//! Integration tests for memory providers over scripted GPU runtimes.

use std::cell::RefCell;

use gpu_meminfo::gpu::memory::{
    FallbackProvider, MemoryInfoError, MemoryInfoProvider, MemoryReport, NativeProvider,
    Platform, PlaceholderProvider, StatusReport,
};
use gpu_meminfo::gpu::runtime::{GpuRuntime, RuntimeError};
use gpu_meminfo::DeviceId;

/// Runtime whose two calls succeed or fail as scripted, recording each call.
struct ScriptedRuntime {
    select: Result<(), RuntimeError>,
    info: Result<(u64, u64), RuntimeError>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRuntime {
    fn new(select: Result<(), RuntimeError>, info: Result<(u64, u64), RuntimeError>) -> Self {
        Self {
            select,
            info,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn healthy(free: u64, total: u64) -> Self {
        Self::new(Ok(()), Ok((free, total)))
    }
}

impl GpuRuntime for ScriptedRuntime {
    fn select_device(&self, device_id: DeviceId) -> Result<(), RuntimeError> {
        self.calls.borrow_mut().push(format!("select({device_id})"));
        self.select.clone()
    }

    fn mem_get_info(&self) -> Result<(u64, u64), RuntimeError> {
        self.calls.borrow_mut().push("mem_get_info".to_string());
        self.info.clone()
    }
}

fn triple<P: MemoryInfoProvider>(provider: &P, device_id: DeviceId) -> (i32, u64, u64) {
    StatusReport::from_result(device_id, &provider.query(device_id)).triple()
}

#[test]
fn test_native_success_passes_values_through() {
    let provider = NativeProvider::new(ScriptedRuntime::healthy(500, 2000));

    assert_eq!(provider.query(0), Ok(MemoryReport::new(500, 2000)));
    assert_eq!(triple(&provider, 0), (0, 500, 2000));
    assert_eq!(
        *provider.runtime().calls.borrow(),
        vec!["select(0)", "mem_get_info", "select(0)", "mem_get_info"]
    );
}

#[test]
fn test_native_selection_failure() {
    let runtime = ScriptedRuntime::new(
        Err(RuntimeError::Driver("CUDA_ERROR_INVALID_DEVICE".to_string())),
        Ok((500, 2000)),
    );
    let provider = NativeProvider::new(runtime);

    let err = provider.query(9).unwrap_err();
    assert!(matches!(
        err,
        MemoryInfoError::DeviceUnavailable { device_id: 9, .. }
    ));
    assert_eq!(err.status_code(), -1);
    assert_eq!(err.reported_values(), None);

    // The memory query is never issued once selection fails.
    assert_eq!(*provider.runtime().calls.borrow(), vec!["select(9)"]);
}

#[test]
fn test_native_query_failure() {
    let runtime = ScriptedRuntime::new(
        Ok(()),
        Err(RuntimeError::Driver("CUDA_ERROR_NOT_INITIALIZED".to_string())),
    );
    let provider = NativeProvider::new(runtime);

    let err = provider.query(1).unwrap_err();
    assert!(matches!(err, MemoryInfoError::QueryFailed { device_id: 1, .. }));
    assert_eq!(triple(&provider, 1).0, -2);
}

#[test]
fn test_native_no_free_le_total_enforcement() {
    // Runtime values are never adjusted, even odd ones.
    let provider = NativeProvider::new(ScriptedRuntime::healthy(3000, 2000));
    assert_eq!(triple(&provider, 0), (0, 3000, 2000));
}

#[test]
fn test_native_idempotent_status() {
    let provider = NativeProvider::new(ScriptedRuntime::healthy(1 << 30, 8 << 30));
    let first = triple(&provider, 1);
    let second = triple(&provider, 1);
    assert_eq!(first, second);
}

#[test]
fn test_placeholder_for_all_devices() {
    for platform in [Platform::Windows, Platform::Linux] {
        let provider = PlaceholderProvider::new(platform);
        for device_id in [i32::MIN, -1, 0, 1, 64, i32::MAX] {
            assert_eq!(triple(&provider, device_id), (-3, 0, 1_073_741_824));
        }
    }
}

#[test]
fn test_fallback_for_all_devices() {
    for device_id in [i32::MIN, -1, 0, 1, 64, i32::MAX] {
        assert_eq!(triple(&FallbackProvider, device_id), (-3, 0, 0));
    }
}

#[test]
fn test_placeholder_flagged_in_json() {
    let provider = PlaceholderProvider::new(Platform::Linux);
    let report = StatusReport::from_result(0, &provider.query(0));
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], -3);
    assert_eq!(json["total"], 1_073_741_824u64);
    assert_eq!(json["placeholder"], true);
    assert!(json["error"].is_string());
}

#[test]
fn test_success_json_omits_error() {
    let provider = NativeProvider::new(ScriptedRuntime::healthy(500, 2000));
    let report = StatusReport::from_result(0, &provider.query(0));
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], 0);
    assert_eq!(json["placeholder"], false);
    assert!(json.get("error").is_none());
}

#[test]
fn test_provider_by_reference() {
    let provider = NativeProvider::new(ScriptedRuntime::healthy(1, 2));
    let by_ref: &dyn MemoryInfoProvider = &provider;
    assert_eq!(triple(&by_ref, 0), (0, 1, 2));
}
