// [apps/guardian/src/probes/blob_storage.rs]
//! Azure Blob Storage: round-trips a small object through the configured
//! container using `azure_storage_blobs` (`spec.md` §4.2, `blobstorage`).

use crate::config::BlobStorageConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use azure_storage::StorageCredentials;
use azure_storage_blobs::prelude::ClientBuilder;
use chrono::Utc;
use futures::StreamExt;

pub struct BlobStorageProbe {
    config: BlobStorageConfig,
}

impl BlobStorageProbe {
    pub fn new(config: BlobStorageConfig) -> Self {
        Self { config }
    }

    fn blob_name() -> String {
        "guardian-preflight-probe.txt".to_string()
    }

    /// Fixed 67-byte payload, matching `spec.md` §4.2's `blobstorage`
    /// sub-test contract precisely so the probe's remediation always points
    /// at the same byte count an operator would see in a failed upload.
    fn payload() -> Vec<u8> {
        b"guardian pre-flight probe payload, exactly sixty-seven bytes!!!!!!!".to_vec()
    }
}

#[async_trait]
impl Probe for BlobStorageProbe {
    fn id(&self) -> &'static str {
        "blobstorage"
    }

    fn display_name(&self) -> &'static str {
        "Azure Blob Storage"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, _ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();

        let account = self.config.account_name.clone().unwrap_or_default();
        let key = self.config.account_key.clone().unwrap_or_default();
        let container = self.config.container.clone().unwrap_or_default();

        let credentials = StorageCredentials::access_key(account.clone(), key);
        let container_client = ClientBuilder::new(account, credentials).container_client(&container);
        ledger.push("client_creation", SubTestResult::ok("built a blob service client from the configured credentials"));

        match container_client.exists().await {
            Ok(true) => ledger.push("container_access", SubTestResult::ok(format!("container '{container}' exists"))),
            Ok(false) => {
                ledger.push(
                    "container_access",
                    SubTestResult::fail(format!("container '{container}' does not exist"), "create the container or correct BLOBSTORAGE_CONTAINER")
                        .with_error_code("container_missing"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Err(err) => {
                ledger.push(
                    "container_access",
                    SubTestResult::fail(format!("could not reach storage account: {err}"), "verify BLOBSTORAGE_ACCOUNT_NAME/ACCOUNT_KEY are correct")
                        .with_error_code("connection_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        let blob_client = container_client.blob_client(Self::blob_name());
        let payload = Self::payload();

        match blob_client.put_block_blob(payload.clone()).content_type("text/plain").await {
            Ok(_) => ledger.push("upload", SubTestResult::ok(format!("uploaded a {}-byte probe blob", payload.len()))),
            Err(err) => ledger.push(
                "upload",
                SubTestResult::fail(format!("upload failed: {err}"), "grant the credential Storage Blob Data Contributor on this container")
                    .with_error_code("upload_failed"),
            ),
        };

        match blob_client.get_content().await {
            Ok(bytes) if bytes == payload => ledger.push("download", SubTestResult::ok("downloaded blob matched the uploaded payload byte-for-byte")),
            Ok(_) => ledger.push(
                "download",
                SubTestResult::fail("downloaded content did not match what was uploaded", "investigate storage account consistency")
                    .with_error_code("content_mismatch"),
            ),
            Err(err) => ledger.push(
                "download",
                SubTestResult::fail(format!("download failed: {err}"), "grant the credential read access on this container")
                    .with_error_code("download_failed"),
            ),
        };

        match container_client.list_blobs().into_stream().next().await {
            Some(Ok(page)) => ledger.push("list", SubTestResult::ok(format!("listed {} blob(s) in container", page.blobs.blobs().count()))),
            Some(Err(err)) => ledger.push(
                "list",
                SubTestResult::fail(format!("could not list blobs: {err}"), "grant the credential list access on this container")
                    .with_error_code("list_failed"),
            ),
            None => ledger.push("list", SubTestResult::ok("container is empty")),
        };

        if let Err(err) = blob_client.delete().await {
            ledger.push(
                "cleanup",
                SubTestResult::fail(format!("could not delete probe blob: {err}"), "manually remove the leftover probe blob")
                    .with_error_code("cleanup_failed"),
            );
        } else {
            ledger.push("cleanup", SubTestResult::ok("removed probe blob"));
        }

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_container() {
        let probe = BlobStorageProbe::new(BlobStorageConfig {
            enabled: true,
            account_name: Some("acct".into()),
            account_key: Some("key".into()),
            container: None,
        });
        assert!(!probe.is_configured());
    }
}
