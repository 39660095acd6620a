// [apps/guardian/src/probes/gpu.rs]
//! Shells out to `nvidia-smi` to confirm GPU availability, driver/CUDA
//! versions, and per-device utilization (`spec.md` §4.2, `gpu`).
//!
//! Defaults to configured (`spec.md` §4.2): a cluster that cannot run
//! `nvidia-smi` should show up as a failed probe, not disappear from the
//! dashboard.

use crate::config::GpuConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;

const QUERY_FIELDS: &str = "index,name,memory.total,memory.used,utilization.gpu,temperature.gpu,power.draw";

pub struct GpuProbe {
    config: GpuConfig,
}

impl GpuProbe {
    pub fn new(config: GpuConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for GpuProbe {
    fn id(&self) -> &'static str {
        "gpu"
    }

    fn display_name(&self) -> &'static str {
        "GPU Availability"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();

        let availability = tokio::time::timeout(ctx.timeout, Command::new("nvidia-smi").arg("-L").output()).await;
        match availability {
            Ok(Ok(output)) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout);
                let count = text.lines().filter(|l| !l.trim().is_empty()).count();
                ledger.push("availability", SubTestResult::ok(format!("{count} GPU(s) detected")).with_detail("raw", text.trim()));
            }
            Ok(Ok(output)) => {
                ledger.push(
                    "availability",
                    SubTestResult::fail(
                        format!("nvidia-smi exited with status {}", output.status),
                        "verify the NVIDIA driver is installed and /dev/nvidia* devices are mounted into this container",
                    )
                    .with_error_code("nvidia_smi_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Ok(Err(err)) => {
                ledger.push(
                    "availability",
                    SubTestResult::fail(format!("could not run nvidia-smi: {err}"), "verify nvidia-smi is on PATH and the NVIDIA runtime is enabled for this container")
                        .with_error_code("nvidia_smi_not_found"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Err(_) => {
                ledger.push(
                    "availability",
                    SubTestResult::fail("nvidia-smi did not respond within the deadline", "the GPU driver may be hung; check dmesg on the node")
                        .with_error_code("nvidia_smi_timeout"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        }

        match Command::new("nvidia-smi").args(["--query-gpu=driver_version", "--format=csv,noheader"]).output().await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).lines().next().unwrap_or_default().trim().to_string();
                ledger.push("driver", SubTestResult::ok(format!("driver version {version}")).with_detail("driver_version", version));
            }
            _ => ledger.push(
                "driver",
                SubTestResult::fail("could not read driver version", "re-install or update the NVIDIA driver").with_error_code("driver_version_unavailable"),
            ),
        };

        match Command::new("nvidia-smi").arg("--version").output().await {
            Ok(output) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout);
                let cuda_line = text.lines().find(|l| l.to_uppercase().contains("CUDA")).unwrap_or("").trim().to_string();
                ledger.push("cuda", SubTestResult::ok(if cuda_line.is_empty() { "CUDA runtime reported by driver".to_string() } else { cuda_line.clone() }).with_detail("cuda_version_line", cuda_line));
            }
            _ => ledger.push("cuda", SubTestResult::fail("could not read CUDA version", "verify the CUDA toolkit matches the installed driver").with_error_code("cuda_version_unavailable")),
        };

        match Command::new("nvidia-smi").args([format!("--query-gpu={QUERY_FIELDS}"), "--format=csv,noheader,nounits".to_string()]).output().await {
            Ok(output) if output.status.success() => {
                let devices: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(parse_device_line)
                    .collect();
                ledger.push("devices", SubTestResult::ok(format!("{} device(s) reporting telemetry", devices.len())).with_detail("devices", serde_json::json!(devices)));
            }
            Ok(output) => ledger.push(
                "devices",
                SubTestResult::fail(format!("device query exited with status {}", output.status), "re-run nvidia-smi --query-gpu manually to diagnose").with_error_code("device_query_failed"),
            ),
            Err(err) => ledger.push("devices", SubTestResult::fail(format!("device query failed: {err}"), "verify nvidia-smi is on PATH").with_error_code("device_query_failed")),
        };

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

fn parse_device_line(line: &str) -> serde_json::Value {
    let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
    serde_json::json!({
        "index": fields.first().copied().unwrap_or_default(),
        "model": fields.get(1).copied().unwrap_or_default(),
        "memory_total_mib": fields.get(2).copied().unwrap_or_default(),
        "memory_used_mib": fields.get(3).copied().unwrap_or_default(),
        "utilization_percent": fields.get(4).copied().unwrap_or_default(),
        "temperature_c": fields.get(5).copied().unwrap_or_default(),
        "power_draw_w": fields.get(6).copied().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_defaults_to_configured() {
        let probe = GpuProbe::new(GpuConfig { enabled: true });
        assert!(probe.is_configured());
    }

    #[test]
    fn parses_a_device_line() {
        let value = parse_device_line("0, NVIDIA A100, 81920, 1024, 12, 45, 72.50");
        assert_eq!(value["index"], "0");
        assert_eq!(value["model"], "NVIDIA A100");
        assert_eq!(value["utilization_percent"], "12");
    }
}
