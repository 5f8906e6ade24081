//! Accelerator device identifiers and memory probing.

pub mod nvidia;

pub use nvidia::NvidiaSmiProbe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Device a model can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Device::Cuda(0)
    }
}

impl Device {
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Cuda(_))
    }

    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Device::Cpu => None,
            Device::Cuda(i) => Some(*i),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(i) => write!(f, "cuda:{i}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, ordinal) = s
            .trim()
            .split_once(':')
            .map_or_else(|| (s.trim(), None), |(kind, id)| (kind, Some(id)));

        match kind.to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => {
                let id = match ordinal {
                    Some(raw) => raw
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid device ordinal: {raw}"))?,
                    None => 0,
                };
                Ok(Device::Cuda(id))
            }
            _ => Err(format!("Unsupported device: {s}")),
        }
    }
}

/// Memory snapshot of one accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStats {
    pub name: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl DeviceStats {
    pub fn available_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }

    pub fn total_gb(&self) -> f64 {
        to_gb(self.total_bytes)
    }

    pub fn used_gb(&self) -> f64 {
        to_gb(self.used_bytes)
    }

    pub fn available_gb(&self) -> f64 {
        to_gb(self.available_bytes())
    }
}

/// Bytes to GB, rounded to two decimals.
pub fn to_gb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_GB * 100.0).round() / 100.0
}

pub fn gb_to_bytes(gb: f64) -> u64 {
    (gb.max(0.0) * BYTES_PER_GB) as u64
}

/// Reports presence and memory of accelerator devices.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// `None` when the device is not present (or cannot be queried).
    async fn stats(&self, device: &Device) -> Option<DeviceStats>;
}
