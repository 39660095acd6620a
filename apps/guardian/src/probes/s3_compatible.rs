// [apps/guardian/src/probes/s3_compatible.rs]
//! Generic S3-compatible endpoint (MinIO, Ceph RGW, R2, ...): same
//! round-trip as [`crate::probes::s3`] but against a custom endpoint with
//! path-style addressing (`spec.md` §4.2, `s3compatible`).

use crate::config::S3CompatibleConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;

pub struct S3CompatibleProbe {
    config: S3CompatibleConfig,
}

impl S3CompatibleProbe {
    pub fn new(config: S3CompatibleConfig) -> Self {
        Self { config }
    }

    fn object_key() -> &'static str {
        "guardian-preflight-probe.txt"
    }

    fn client(&self) -> aws_sdk_s3::Client {
        let credentials = Credentials::new(
            self.config.access_key_id.clone().unwrap_or_default(),
            self.config.secret_access_key.clone().unwrap_or_default(),
            None,
            None,
            "guardian-config",
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .endpoint_url(self.config.endpoint.clone().unwrap_or_default())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        aws_sdk_s3::Client::from_conf(sdk_config)
    }
}

#[async_trait]
impl Probe for S3CompatibleProbe {
    fn id(&self) -> &'static str {
        "s3compatible"
    }

    fn display_name(&self) -> &'static str {
        "S3-Compatible Storage"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, _ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let bucket = self.config.bucket.clone().unwrap_or_default();
        let client = self.client();

        match client.list_buckets().send().await {
            Ok(_) => ledger.push("connect", SubTestResult::ok("authenticated against the configured endpoint")),
            Err(err) => {
                ledger.push(
                    "connect",
                    SubTestResult::fail(format!("could not authenticate: {err}"), "verify S3COMPATIBLE_ENDPOINT and its credentials are correct")
                        .with_error_code("connection_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        match client.list_buckets().send().await {
            Ok(output) => {
                let names: Vec<String> = output.buckets().iter().filter_map(|b| b.name().map(str::to_string)).collect();
                ledger.push(
                    "list_buckets",
                    SubTestResult::ok(format!("{} bucket(s) visible", names.len())).with_detail("buckets", serde_json::json!(names)),
                )
            }
            Err(err) => ledger.push(
                "list_buckets",
                SubTestResult::fail(format!("could not list buckets: {err}"), "grant the credential bucket-listing access")
                    .with_error_code("list_buckets_failed"),
            ),
        };

        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => ledger.push("bucket_access", SubTestResult::ok(format!("bucket '{bucket}' is accessible"))),
            Err(err) => {
                ledger.push(
                    "bucket_access",
                    SubTestResult::fail(format!("could not access bucket: {err}"), "verify S3COMPATIBLE_ENDPOINT and S3COMPATIBLE_BUCKET are correct")
                        .with_error_code("bucket_unreachable"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        let payload = b"guardian pre-flight probe".to_vec();
        let put_ok = match client
            .put_object()
            .bucket(&bucket)
            .key(Self::object_key())
            .body(ByteStream::from(payload.clone()))
            .send()
            .await
        {
            Ok(_) => true,
            Err(err) => {
                ledger.push(
                    "file_operations",
                    SubTestResult::fail(format!("put failed: {err}"), "grant the credential write access on this bucket").with_error_code("put_failed"),
                );
                false
            }
        };

        if put_ok {
            let get_result = match client.get_object().bucket(&bucket).key(Self::object_key()).send().await {
                Ok(output) => match output.body.collect().await {
                    Ok(bytes) if bytes.into_bytes().as_ref() == payload.as_slice() => Ok(()),
                    Ok(_) => Err("downloaded content did not match what was uploaded".to_string()),
                    Err(err) => Err(format!("could not read object body: {err}")),
                },
                Err(err) => Err(format!("get failed: {err}")),
            };

            if let Err(reason) = &get_result {
                ledger.push(
                    "file_operations",
                    SubTestResult::fail(reason.clone(), "grant the credential read access on this bucket").with_error_code("get_failed"),
                );
            }

            let delete_result = client.delete_object().bucket(&bucket).key(Self::object_key()).send().await;
            match (&get_result, &delete_result) {
                (Ok(()), Ok(_)) => ledger.push("file_operations", SubTestResult::ok("put/get/delete round-trip succeeded")),
                (Ok(()), Err(err)) => ledger.push(
                    "file_operations",
                    SubTestResult::fail(format!("delete failed: {err}"), "grant the credential delete access on this bucket")
                        .with_error_code("delete_failed"),
                ),
                _ => {}
            }
        }

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_endpoint() {
        let probe = S3CompatibleProbe::new(S3CompatibleConfig {
            enabled: true,
            endpoint: None,
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
            bucket: Some("bucket".into()),
        });
        assert!(!probe.is_configured());
    }
}
