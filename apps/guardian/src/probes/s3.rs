// [apps/guardian/src/probes/s3.rs]
//! AWS S3: round-trips a small object in the configured bucket using the
//! official `aws-sdk-s3` (`spec.md` §4.2).

use crate::config::S3Config;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;

pub struct S3Probe {
    config: S3Config,
}

impl S3Probe {
    pub fn new(config: S3Config) -> Self {
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
        let region = Region::new(self.config.region.clone().unwrap_or_else(|| "us-east-1".to_string()));
        let sdk_config = aws_sdk_s3::Config::builder().region(region).credentials_provider(credentials).build();
        aws_sdk_s3::Client::from_conf(sdk_config)
    }
}

#[async_trait]
impl Probe for S3Probe {
    fn id(&self) -> &'static str {
        "s3"
    }

    fn display_name(&self) -> &'static str {
        "AWS S3"
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
            Ok(_) => ledger.push("connect", SubTestResult::ok("authenticated and listed the account's buckets")),
            Err(err) => {
                ledger.push(
                    "connect",
                    SubTestResult::fail(format!("could not authenticate: {err}"), "verify S3_ACCESS_KEY_ID/SECRET_ACCESS_KEY are correct")
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
                SubTestResult::fail(format!("could not list buckets: {err}"), "grant the credential s3:ListAllMyBuckets")
                    .with_error_code("list_buckets_failed"),
            ),
        };

        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => ledger.push("bucket_access", SubTestResult::ok(format!("bucket '{bucket}' is accessible"))),
            Err(err) => {
                ledger.push(
                    "bucket_access",
                    SubTestResult::fail(format!("could not access bucket: {err}"), "verify S3_BUCKET exists and the credential has s3:ListBucket")
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
                    SubTestResult::fail(format!("put failed: {err}"), "grant the credential s3:PutObject on this bucket")
                        .with_error_code("put_failed"),
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

            match &get_result {
                Ok(()) => {}
                Err(reason) => ledger.push(
                    "file_operations",
                    SubTestResult::fail(reason.clone(), "grant the credential s3:GetObject on this bucket").with_error_code("get_failed"),
                ),
            }

            let delete_result = client.delete_object().bucket(&bucket).key(Self::object_key()).send().await;
            match (&get_result, &delete_result) {
                (Ok(()), Ok(_)) => ledger.push("file_operations", SubTestResult::ok("put/get/delete round-trip succeeded")),
                (Ok(()), Err(err)) => ledger.push(
                    "file_operations",
                    SubTestResult::fail(format!("delete failed: {err}"), "grant the credential s3:DeleteObject on this bucket")
                        .with_error_code("delete_failed"),
                ),
                _ => {}
            }
        }

        match client.get_bucket_versioning().bucket(&bucket).send().await {
            Ok(output) => {
                let status = output.status().map(|s| s.as_str().to_string()).unwrap_or_else(|| "Disabled".to_string());
                ledger.push("versioning_check", SubTestResult::ok(format!("bucket versioning status: {status}")).with_detail("status", status))
            }
            Err(err) => ledger.push(
                "versioning_check",
                SubTestResult::fail(format!("could not read versioning configuration: {err}"), "grant the credential s3:GetBucketVersioning")
                    .with_error_code("versioning_check_failed"),
            ),
        };

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_region_is_still_valid_since_region_is_optional() {
        let probe = S3Probe::new(S3Config {
            enabled: true,
            access_key_id: Some("AKIA".into()),
            secret_access_key: Some("secret".into()),
            bucket: Some("my-bucket".into()),
            region: None,
        });
        assert!(probe.is_configured());
    }

    #[test]
    fn unconfigured_without_bucket() {
        let probe = S3Probe::new(S3Config {
            enabled: true,
            access_key_id: Some("AKIA".into()),
            secret_access_key: Some("secret".into()),
            bucket: None,
            region: None,
        });
        assert!(!probe.is_configured());
    }
}
