//! Free/total memory queries for a single GPU device.
//!
//! A [`MemoryInfoProvider`] answers one question: how much memory does
//! device N have, and how much of it is free. Which provider backs
//! [`default_provider`] is fixed at build time:
//!
//! - `cuda` feature: [`NativeProvider`] over the CUDA driver
//! - Windows or Linux without `cuda`: [`PlaceholderProvider`] (0 free, 1 GiB total)
//! - any other platform without `cuda`: [`FallbackProvider`] (0 free, 0 total)
//!
//! Placeholder providers still return numbers, but always inside
//! [`MemoryInfoError::Unsupported`]. Callers must check the status before
//! trusting the values.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::runtime::{GpuRuntime, RuntimeError};

/// Device ordinal as understood by the GPU runtime. Not validated locally.
pub type DeviceId = i32;

/// Total memory reported by the placeholder provider (1 GiB).
pub const PLACEHOLDER_TOTAL_BYTES: u64 = 1024 * 1024 * 1024;

/// Wire status codes.
pub const STATUS_OK: i32 = 0;
pub const STATUS_DEVICE_UNAVAILABLE: i32 = -1;
pub const STATUS_QUERY_FAILED: i32 = -2;
pub const STATUS_UNSUPPORTED: i32 = -3;

/// Free and total memory of one device, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryReport {
    pub free: u64,
    pub total: u64,
}

impl MemoryReport {
    pub fn new(free: u64, total: u64) -> Self {
        Self { free, total }
    }

    /// Bytes in use (`total - free`, saturating).
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }
}

impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "free={} total={}", self.free, self.total)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryInfoError {
    #[error("GPU device {device_id} unavailable")]
    DeviceUnavailable {
        device_id: DeviceId,
        #[source]
        source: RuntimeError,
    },

    #[error("Memory query failed on GPU device {device_id}")]
    QueryFailed {
        device_id: DeviceId,
        #[source]
        source: RuntimeError,
    },

    #[error("GPU memory query unsupported in this build (placeholder {placeholder})")]
    Unsupported { placeholder: MemoryReport },
}

impl MemoryInfoError {
    /// Wire status code for this failure.
    pub fn status_code(&self) -> i32 {
        match self {
            MemoryInfoError::DeviceUnavailable { .. } => STATUS_DEVICE_UNAVAILABLE,
            MemoryInfoError::QueryFailed { .. } => STATUS_QUERY_FAILED,
            MemoryInfoError::Unsupported { .. } => STATUS_UNSUPPORTED,
        }
    }

    /// Values handed to the caller alongside the failure, if any.
    ///
    /// Only `Unsupported` carries values, and they are placeholders.
    pub fn reported_values(&self) -> Option<MemoryReport> {
        match self {
            MemoryInfoError::Unsupported { placeholder } => Some(*placeholder),
            _ => None,
        }
    }
}

/// Something that can report free/total memory for a GPU device.
pub trait MemoryInfoProvider {
    fn query(&self, device_id: DeviceId) -> Result<MemoryReport, MemoryInfoError>;
}

impl<P: MemoryInfoProvider + ?Sized> MemoryInfoProvider for &P {
    fn query(&self, device_id: DeviceId) -> Result<MemoryReport, MemoryInfoError> {
        (**self).query(device_id)
    }
}

/// Provider backed by a real GPU runtime.
///
/// Values are passed through exactly as the runtime reports them. Selecting
/// the device is a side effect on the runtime's current-device state.
#[derive(Debug, Clone)]
pub struct NativeProvider<R> {
    runtime: R,
}

impl<R: GpuRuntime> NativeProvider<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<R: GpuRuntime> MemoryInfoProvider for NativeProvider<R> {
    fn query(&self, device_id: DeviceId) -> Result<MemoryReport, MemoryInfoError> {
        if let Err(source) = self.runtime.select_device(device_id) {
            warn!(device_id, error = %source, "Failed to select GPU device");
            return Err(MemoryInfoError::DeviceUnavailable { device_id, source });
        }

        let (free, total) = self.runtime.mem_get_info().map_err(|source| {
            warn!(device_id, error = %source, "Failed to query GPU memory");
            MemoryInfoError::QueryFailed { device_id, source }
        })?;

        debug!(device_id, free, total, "GPU memory");
        Ok(MemoryReport::new(free, total))
    }
}

/// Platforms that get placeholder values when no native runtime is built in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
}

/// Provider for recognized platforms built without a native runtime.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderProvider {
    platform: Platform,
}

impl PlaceholderProvider {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl MemoryInfoProvider for PlaceholderProvider {
    fn query(&self, device_id: DeviceId) -> Result<MemoryReport, MemoryInfoError> {
        // Both platforms currently report the same guess.
        let placeholder = match self.platform {
            Platform::Windows => MemoryReport::new(0, PLACEHOLDER_TOTAL_BYTES),
            Platform::Linux => MemoryReport::new(0, PLACEHOLDER_TOTAL_BYTES),
        };
        debug!(device_id, platform = ?self.platform, %placeholder, "No GPU runtime, reporting placeholder");
        Err(MemoryInfoError::Unsupported { placeholder })
    }
}

/// Provider for unrecognized platforms built without a native runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

impl MemoryInfoProvider for FallbackProvider {
    fn query(&self, device_id: DeviceId) -> Result<MemoryReport, MemoryInfoError> {
        debug!(device_id, "No GPU runtime on this platform");
        Err(MemoryInfoError::Unsupported {
            placeholder: MemoryReport::default(),
        })
    }
}

#[cfg(feature = "cuda")]
pub type DefaultProvider = NativeProvider<&'static super::runtime::CudaRuntime>;

#[cfg(all(not(feature = "cuda"), any(windows, target_os = "linux")))]
pub type DefaultProvider = PlaceholderProvider;

#[cfg(all(not(feature = "cuda"), not(any(windows, target_os = "linux"))))]
pub type DefaultProvider = FallbackProvider;

/// The provider compiled into this build.
pub fn default_provider() -> DefaultProvider {
    #[cfg(feature = "cuda")]
    {
        NativeProvider::new(super::runtime::CudaRuntime::shared())
    }

    #[cfg(all(not(feature = "cuda"), windows))]
    {
        PlaceholderProvider::new(Platform::Windows)
    }

    #[cfg(all(not(feature = "cuda"), target_os = "linux"))]
    {
        PlaceholderProvider::new(Platform::Linux)
    }

    #[cfg(all(not(feature = "cuda"), not(any(windows, target_os = "linux"))))]
    {
        FallbackProvider
    }
}

/// Query `device_id` with the provider compiled into this build.
pub fn query(device_id: DeviceId) -> Result<MemoryReport, MemoryInfoError> {
    default_provider().query(device_id)
}

/// Flattened view of a query result: status code plus the values a caller
/// receives with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub device_id: DeviceId,
    pub status: i32,
    pub free: u64,
    pub total: u64,

    /// True when `free`/`total` are placeholders rather than measurements.
    pub placeholder: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn from_result(
        device_id: DeviceId,
        result: &Result<MemoryReport, MemoryInfoError>,
    ) -> Self {
        match result {
            Ok(report) => Self {
                device_id,
                status: STATUS_OK,
                free: report.free,
                total: report.total,
                placeholder: false,
                error: None,
            },
            Err(e) => {
                let values = e.reported_values();
                let error = match e {
                    MemoryInfoError::DeviceUnavailable { source, .. }
                    | MemoryInfoError::QueryFailed { source, .. } => format!("{e}: {source}"),
                    MemoryInfoError::Unsupported { .. } => e.to_string(),
                };
                Self {
                    device_id,
                    status: e.status_code(),
                    free: values.map_or(0, |v| v.free),
                    total: values.map_or(0, |v| v.total),
                    placeholder: values.is_some(),
                    error: Some(error),
                }
            }
        }
    }

    /// `(status, free, total)`.
    pub fn triple(&self) -> (i32, u64, u64) {
        (self.status, self.free, self.total)
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = MemoryReport::new(self.free, self.total);
        write!(
            f,
            "device {}: status {} free {} bytes, used {} bytes, total {} bytes",
            self.device_id,
            self.status,
            values.free,
            values.used(),
            values.total
        )?;
        if self.placeholder {
            write!(f, " (placeholder)")?;
        }
        if let Some(error) = &self.error {
            write!(f, " [{error}]")?;
        }
        Ok(())
    }
}

/// Status-code form of [`query`]: `(status, free_bytes, total_bytes)`.
///
/// On `-1`/`-2` the values are `0, 0`. On `-3` they are placeholders.
pub fn query_gpu_memory(device_id: DeviceId) -> (i32, u64, u64) {
    StatusReport::from_result(device_id, &query(device_id)).triple()
}
