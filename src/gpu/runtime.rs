//! GPU compute runtime seam.
//!
//! [`GpuRuntime`] is the two-call surface the native memory provider needs:
//! make a device current, then ask the current device for its free/total
//! memory. With the `cuda` feature, [`CudaRuntime`] implements it over the
//! CUDA driver API through `cudarc`.

use thiserror::Error;

use super::memory::DeviceId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Invalid device ordinal {0}")]
    InvalidDevice(DeviceId),

    #[error("CUDA driver error: {0}")]
    Driver(String),
}

/// A GPU runtime able to select a device and report its memory.
///
/// Selecting a device changes the runtime's notion of the "current device"
/// for the calling thread. Implementations do not serialize this; callers
/// sharing one runtime across threads must do so themselves if the
/// underlying driver requires it.
pub trait GpuRuntime {
    /// Make `device_id` the current device.
    fn select_device(&self, device_id: DeviceId) -> Result<(), RuntimeError>;

    /// Free and total memory of the current device, in bytes.
    fn mem_get_info(&self) -> Result<(u64, u64), RuntimeError>;
}

impl<R: GpuRuntime + ?Sized> GpuRuntime for &R {
    fn select_device(&self, device_id: DeviceId) -> Result<(), RuntimeError> {
        (**self).select_device(device_id)
    }

    fn mem_get_info(&self) -> Result<(u64, u64), RuntimeError> {
        (**self).mem_get_info()
    }
}

#[cfg(feature = "cuda")]
pub use cuda::CudaRuntime;

#[cfg(feature = "cuda")]
mod cuda {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, OnceLock};

    use cudarc::driver::{result, sys, CudaContext};
    use tracing::debug;

    use super::{DeviceId, GpuRuntime, RuntimeError};

    /// CUDA driver-backed runtime.
    ///
    /// Selecting a device retains that device's primary context and binds it
    /// to the calling thread, which is what `cudaSetDevice` does in the
    /// runtime API. Retained contexts are cached per ordinal and released
    /// when the runtime is dropped.
    #[derive(Default)]
    pub struct CudaRuntime {
        contexts: Mutex<HashMap<usize, Arc<CudaContext>>>,
    }

    impl CudaRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        /// Whether the CUDA driver library can be loaded on this host.
        ///
        /// `cudarc` panics on first use when it cannot load the driver, so
        /// every driver call is gated on this.
        #[allow(unused_unsafe)]
        pub fn driver_present() -> bool {
            // SAFETY: only checks that the shared library loads, no driver call is made.
            unsafe {
                sys::is_culib_present()
            }
        }

        fn ensure_driver() -> Result<(), RuntimeError> {
            if Self::driver_present() {
                Ok(())
            } else {
                Err(RuntimeError::Driver("CUDA driver library not found".to_string()))
            }
        }

        /// Process-wide runtime. Its contexts live until process exit.
        pub fn shared() -> &'static CudaRuntime {
            static SHARED: OnceLock<CudaRuntime> = OnceLock::new();
            SHARED.get_or_init(CudaRuntime::new)
        }

        fn context(&self, ordinal: usize) -> Result<Arc<CudaContext>, RuntimeError> {
            let mut contexts = self
                .contexts
                .lock()
                .map_err(|_| RuntimeError::Driver("context cache poisoned".to_string()))?;

            if let Some(ctx) = contexts.get(&ordinal) {
                return Ok(ctx.clone());
            }

            let ctx = CudaContext::new(ordinal).map_err(|e| RuntimeError::Driver(e.to_string()))?;
            debug!(device = ordinal, "Retained CUDA primary context");
            contexts.insert(ordinal, ctx.clone());
            Ok(ctx)
        }
    }

    impl GpuRuntime for CudaRuntime {
        fn select_device(&self, device_id: DeviceId) -> Result<(), RuntimeError> {
            let ordinal =
                usize::try_from(device_id).map_err(|_| RuntimeError::InvalidDevice(device_id))?;
            Self::ensure_driver()?;

            self.context(ordinal)?
                .bind_to_thread()
                .map_err(|e| RuntimeError::Driver(e.to_string()))
        }

        fn mem_get_info(&self) -> Result<(u64, u64), RuntimeError> {
            Self::ensure_driver()?;
            let (free, total) =
                result::mem_get_info().map_err(|e| RuntimeError::Driver(e.to_string()))?;
            Ok((free as u64, total as u64))
        }
    }

}
