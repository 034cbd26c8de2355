//! Process memory and compute device reporting.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use sysinfo::{ProcessesToUpdate, System};
use tracing::{error, warn};

use crate::dto::{HealthResponse, StatsResponse};
use crate::state::AppState;

/// Reported when memory usage cannot be determined.
pub const UNAVAILABLE: &str = "N/A";

/// Reported when the device probe fails.
pub const UNKNOWN_DEVICE: &str = "Unknown";

/// Coarse compute device label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Mps,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Device::Cuda => "CUDA (GPU)",
            Device::Mps => "MPS (Apple Silicon)",
            Device::Cpu => "CPU",
        };
        write!(f, "{}", s)
    }
}

/// Host telemetry source.
pub trait SystemProbe: Send + Sync {
    /// Resident set size of this process in bytes, if it can be read.
    fn resident_memory_bytes(&self) -> Option<u64>;

    /// Best available compute device.
    fn device(&self) -> Result<Device, String>;
}

/// Probes the real host via `sysinfo` and driver device nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

const NVIDIA_MARKERS: [&str; 2] = ["/proc/driver/nvidia/version", "/dev/nvidia0"];

impl SystemProbe for HostProbe {
    fn resident_memory_bytes(&self) -> Option<u64> {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                warn!("Error getting memory: {}", e);
                return None;
            }
        };

        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        sys.process(pid).map(|p| p.memory())
    }

    fn device(&self) -> Result<Device, String> {
        for marker in NVIDIA_MARKERS {
            if path_present(Path::new(marker))? {
                return Ok(Device::Cuda);
            }
        }

        if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
            return Ok(Device::Mps);
        }

        Ok(Device::Cpu)
    }
}

/// `Ok(false)` for a missing path, `Err` when the check itself fails.
fn path_present(path: &Path) -> Result<bool, String> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(format!("failed to probe {}: {}", path.display(), e)),
    }
}

/// Formats a byte count as megabytes, or the unavailable sentinel.
pub fn format_memory(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) => format!("{:.2} MB", b as f64 / 1024.0 / 1024.0),
        None => UNAVAILABLE.to_string(),
    }
}

/// Current memory usage string for responses.
pub fn memory_usage(state: &AppState) -> String {
    format_memory(state.probe.resident_memory_bytes())
}

/// Device label for responses; probe failures become [`UNKNOWN_DEVICE`].
pub fn device_label(state: &AppState) -> String {
    match state.probe.device() {
        Ok(device) => device.to_string(),
        Err(e) => {
            warn!("Error getting device: {}", e);
            UNKNOWN_DEVICE.to_string()
        }
    }
}

/// Builds the health report.
pub async fn health(state: &AppState) -> HealthResponse {
    let slot = state.slot.read().await;
    let loaded = slot.is_loaded();
    HealthResponse {
        status: if loaded { "ready" } else { "loading" },
        model_loaded: loaded,
        model_id: slot.model_id.clone(),
    }
}

/// Builds the stats report. `Err` carries the degraded payload sent with a 500.
pub async fn stats(state: &AppState) -> Result<StatsResponse, StatsResponse> {
    let (model_loaded, model_id) = {
        let slot = state.slot.read().await;
        (slot.is_loaded(), slot.loaded_id().unwrap_or("None").to_string())
    };

    match state.probe.device() {
        Ok(device) => Ok(StatsResponse {
            model_loaded,
            model_id,
            memory_usage: memory_usage(state),
            device: device.to_string(),
            success: true,
            error: None,
        }),
        Err(e) => {
            error!("Error in stats endpoint: {}", e);
            Err(StatsResponse {
                model_loaded,
                model_id,
                memory_usage: UNAVAILABLE.to_string(),
                device: UNKNOWN_DEVICE.to_string(),
                success: false,
                error: Some(e),
            })
        }
    }
}
