// [apps/guardian/src/probes/pvc.rs]
//! Creates a small PersistentVolumeClaim in-cluster via `guardian-k8s-client`
//! and waits for it to bind, then deletes it (`spec.md` §4.2, `pvc`).
//!
//! Unlike the API-key probes, `pvc` is active by default: a cluster without
//! working dynamic provisioning is exactly the kind of failure this service
//! exists to surface before a real workload hits it.

use crate::config::PvcConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use chrono::Utc;
use guardian_k8s_client::ClusterClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLLS: u32 = 30;

pub struct PvcProbe {
    config: PvcConfig,
    client: Option<Arc<ClusterClient>>,
}

impl PvcProbe {
    pub fn new(config: PvcConfig, client: Option<Arc<ClusterClient>>) -> Self {
        Self { config, client }
    }

    fn namespace(&self) -> String {
        self.config.namespace.clone().unwrap_or_else(|| "default".to_string())
    }

    fn claim_name() -> String {
        format!("guardian-preflight-{}", uuid::Uuid::new_v4())
    }
}

#[async_trait]
impl Probe for PvcProbe {
    fn id(&self) -> &'static str {
        "pvc"
    }

    fn display_name(&self) -> &'static str {
        "Persistent Volume Provisioning"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured() && self.client.is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let Some(client) = &self.client else {
            return ProbeResult::skipped(self.id(), self.display_name(), &["in-cluster kubernetes client"]);
        };
        let namespace = self.namespace();
        let claim_name = Self::claim_name();

        match client.list_storage_class_names().await {
            Ok(classes) => ledger.push(
                "list_storage_classes",
                SubTestResult::ok(format!("{} storage class(es) visible", classes.len())).with_detail("storage_classes", serde_json::json!(classes)),
            ),
            Err(err) => {
                ledger.push(
                    "list_storage_classes",
                    SubTestResult::fail(format!("could not list storage classes: {err}"), "verify the service account can list storageclasses.storage.k8s.io")
                        .with_error_code("list_storage_classes_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        match client.namespace_accessible(&namespace).await {
            Ok(true) => ledger.push("namespace_access", SubTestResult::ok(format!("namespace '{namespace}' is accessible"))),
            Ok(false) => {
                ledger.push(
                    "namespace_access",
                    SubTestResult::fail(format!("namespace '{namespace}' not found"), "verify PVC_NAMESPACE exists").with_error_code("namespace_missing"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Err(err) => {
                ledger.push(
                    "namespace_access",
                    SubTestResult::fail(format!("could not reach the cluster: {err}"), "verify the service account has access to this namespace")
                        .with_error_code("cluster_unreachable"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        match client.create_pvc(&namespace, &claim_name, &self.config.storage_class, &self.config.size).await {
            Ok(_) => ledger.push("pvc_creation", SubTestResult::ok(format!("created a {}-sized claim '{claim_name}'", self.config.size))),
            Err(err) => {
                ledger.push(
                    "pvc_creation",
                    SubTestResult::fail(format!("could not create claim: {err}"), "verify KUBERNETES_STORAGE_CLASS names a class that exists")
                        .with_error_code("create_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        let mut bound = false;
        for _ in 0..MAX_POLLS {
            if ctx.is_cancelled() {
                break;
            }
            match client.pvc_phase(&namespace, &claim_name).await {
                Ok(Some(phase)) if phase == "Bound" => {
                    bound = true;
                    break;
                }
                Ok(_) => sleep(POLL_INTERVAL).await,
                Err(err) => {
                    ledger.push(
                        "pvc_status",
                        SubTestResult::fail(format!("could not check claim status: {err}"), "re-run the probe; this may be transient")
                            .with_error_code("status_check_failed"),
                    );
                    break;
                }
            }
        }

        if bound {
            ledger.push("pvc_status", SubTestResult::ok("claim reached Bound phase"));
        } else if ledger.all_succeeded() {
            ledger.push(
                "pvc_status",
                SubTestResult::fail(
                    format!("claim did not bind within {} seconds", POLL_INTERVAL.as_secs() * MAX_POLLS as u64),
                    "check the storage class's provisioner and cluster capacity",
                )
                .with_error_code("bind_timed_out"),
            );
        }

        if let Err(err) = client.delete_pvc(&namespace, &claim_name).await {
            ledger.push(
                "pvc_cleanup",
                SubTestResult::fail(format!("could not delete claim: {err}"), "manually remove the leftover claim").with_error_code("cleanup_failed"),
            );
        } else {
            ledger.push("pvc_cleanup", SubTestResult::ok("removed probe claim"));
        }

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_client() {
        let probe = PvcProbe::new(PvcConfig { enabled: true, namespace: None, storage_class: "standard".into(), size: "1Gi".into() }, None);
        assert!(!probe.is_configured());
    }

    #[test]
    fn defaults_to_default_namespace() {
        let probe = PvcProbe::new(PvcConfig { enabled: true, namespace: None, storage_class: "standard".into(), size: "1Gi".into() }, None);
        assert_eq!(probe.namespace(), "default");
    }
}
