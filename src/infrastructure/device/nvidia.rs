use super::{Device, DeviceProbe, DeviceStats};
use async_trait::async_trait;
use tokio::process::Command;

const MIB: u64 = 1024 * 1024;

/// Queries NVIDIA devices through `nvidia-smi`.
pub struct NvidiaSmiProbe {
    binary: String,
}

impl NvidiaSmiProbe {
    pub fn new() -> Self {
        Self {
            binary: "nvidia-smi".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one line of `--query-gpu=name,memory.total,memory.used --format=csv,noheader,nounits`.
pub fn parse_query_line(line: &str) -> Option<DeviceStats> {
    let mut fields = line.rsplitn(3, ',').map(str::trim);
    let used_mib = fields.next()?.parse::<u64>().ok()?;
    let total_mib = fields.next()?.parse::<u64>().ok()?;
    let name = fields.next()?.to_string();

    if name.is_empty() {
        return None;
    }

    Some(DeviceStats {
        name,
        total_bytes: total_mib * MIB,
        used_bytes: used_mib * MIB,
    })
}

#[async_trait]
impl DeviceProbe for NvidiaSmiProbe {
    async fn stats(&self, device: &Device) -> Option<DeviceStats> {
        let ordinal = device.ordinal()?;

        let output = Command::new(&self.binary)
            .arg("--query-gpu=name,memory.total,memory.used")
            .arg("--format=csv,noheader,nounits")
            .arg(format!("--id={ordinal}"))
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, binary = %self.binary, "nvidia-smi not runnable");
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                device = %device,
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "nvidia-smi query failed"
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stats = stdout.lines().find_map(parse_query_line);
        if stats.is_none() {
            tracing::warn!(device = %device, output = %stdout.trim(), "Unparseable nvidia-smi output");
        }
        stats
    }
}
