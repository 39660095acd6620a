// [apps/guardian/src/probe/mod.rs]
//! The probe contract every collaborator check satisfies, and the result
//! shapes the runner, HTTP surface, and dashboard all consume.
//!
//! See `spec.md` §4.1 for the full execution contract this module encodes:
//! a probe that is not configured must return `Skipped` without touching
//! the network; a probe that runs must never panic out of `execute`; every
//! `Failed`/`Error` result must carry a non-boilerplate `remediation`.

pub mod registry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of a probe run or a single sub-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Passed,
    Failed,
    Skipped,
    Timeout,
    Error,
    Running,
}

/// A single named step within a probe, in the order the probe declared it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTestResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl SubTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: BTreeMap::new(),
            remediation: None,
            error_code: None,
        }
    }

    pub fn fail(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: BTreeMap::new(),
            remediation: Some(remediation.into()),
            error_code: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

/// A single structured log line captured during a probe's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeLogEntry {
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Immutable result of running (or skipping) one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe_id: String,
    pub display_name: String,
    pub status: ProbeStatus,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Ordered the way the probe declared its sub-tests; a `BTreeMap` would
    /// re-sort lexically, so this stays an ordered `Vec` of pairs on the
    /// wire (serialized as a JSON object preserving insertion order via
    /// `serde_json`'s `preserve_order` feature is avoided here on purpose —
    /// we serialize as an array of `{name, result}` so order is unambiguous
    /// in any JSON consumer, not just ones that happen to preserve map order).
    pub sub_tests: Vec<(String, SubTestResult)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default)]
    pub logs: Vec<ProbeLogEntry>,
}

impl ProbeResult {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn skipped(probe_id: &str, display_name: &str, missing_keys: &[&str]) -> Self {
        let now = Utc::now();
        let message = if missing_keys.is_empty() {
            "not configured".to_string()
        } else {
            format!("missing configuration: {}", missing_keys.join(", "))
        };
        Self {
            probe_id: probe_id.to_string(),
            display_name: display_name.to_string(),
            status: ProbeStatus::Skipped,
            message,
            started_at: now,
            finished_at: now,
            sub_tests: Vec::new(),
            remediation: Some("configure and re-run".to_string()),
            logs: Vec::new(),
        }
    }

    pub fn timeout(probe_id: &str, display_name: &str, started_at: DateTime<Utc>, deadline: Duration) -> Self {
        Self {
            probe_id: probe_id.to_string(),
            display_name: display_name.to_string(),
            status: ProbeStatus::Timeout,
            message: format!("did not complete within {:.1}s", deadline.as_secs_f64()),
            started_at,
            finished_at: Utc::now(),
            sub_tests: Vec::new(),
            remediation: Some("the collaborator may be unreachable or under load; re-run with a longer timeout".to_string()),
            logs: Vec::new(),
        }
    }

    /// Builds the terminal `Passed`/`Failed` result from a completed ledger.
    /// Every probe implementation ends its `execute` with this call.
    pub fn from_ledger(probe_id: &str, display_name: &str, started_at: DateTime<Utc>, ledger: SubTestLedger) -> Self {
        let all_ok = ledger.all_succeeded();
        let remediation = ledger.first_failure_remediation();
        Self {
            probe_id: probe_id.to_string(),
            display_name: display_name.to_string(),
            status: if all_ok { ProbeStatus::Passed } else { ProbeStatus::Failed },
            message: if all_ok { "all checks passed".to_string() } else { "one or more checks failed".to_string() },
            started_at,
            finished_at: Utc::now(),
            sub_tests: ledger.into_inner(),
            remediation,
            logs: Vec::new(),
        }
    }

    pub fn internal_error(probe_id: &str, display_name: &str, detail: &str) -> Self {
        let now = Utc::now();
        Self {
            probe_id: probe_id.to_string(),
            display_name: display_name.to_string(),
            status: ProbeStatus::Error,
            message: format!("internal runner failure: {detail}"),
            started_at: now,
            finished_at: now,
            sub_tests: Vec::new(),
            remediation: Some("restart the service".to_string()),
            logs: Vec::new(),
        }
    }
}

/// Deadline and cancellation signal handed to a probe's `execute`.
#[derive(Clone)]
pub struct ProbeContext {
    pub timeout: Duration,
    pub cancellation: CancellationToken,
}

impl ProbeContext {
    pub fn new(timeout: Duration, cancellation: CancellationToken) -> Self {
        Self { timeout, cancellation }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Builds sub-test ledgers in declaration order without requiring callers
/// to hand-write `Vec::push` chains in every probe body.
#[derive(Default)]
pub struct SubTestLedger {
    entries: Vec<(String, SubTestResult)>,
}

impl SubTestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, result: SubTestResult) -> &mut Self {
        self.entries.push((name.into(), result));
        self
    }

    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|(_, r)| r.success)
    }

    pub fn into_inner(self) -> Vec<(String, SubTestResult)> {
        self.entries
    }

    pub fn first_failure_remediation(&self) -> Option<String> {
        self.entries.iter().find(|(_, r)| !r.success).and_then(|(_, r)| r.remediation.clone())
    }
}

/// The contract every probe satisfies. Object-safe via `async-trait` so the
/// registry can hold `Arc<dyn Probe>` uniformly.
///
/// `is_configured` must be side-effect-free, cheap, and must never touch
/// the network or disk — the runner and the registry call it on every
/// `run_all` to decide which probes are active.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable key, never renamed across versions: it appears in URLs and is
    /// the identity the dashboard persists against.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_result_has_remediation_and_zero_duration() {
        let result = ProbeResult::skipped("dns", "DNS Resolution", &["DNS_TEST_HOSTNAMES"]);
        assert_eq!(result.status, ProbeStatus::Skipped);
        assert!(result.remediation.is_some());
        assert_eq!(result.duration(), chrono::Duration::zero());
        assert!(result.message.contains("DNS_TEST_HOSTNAMES"));
    }

    #[test]
    fn ledger_preserves_declaration_order() {
        let mut ledger = SubTestLedger::new();
        ledger.push("connect", SubTestResult::ok("ok"));
        ledger.push("list_databases", SubTestResult::ok("ok"));
        let names: Vec<_> = ledger.into_inner().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["connect", "list_databases"]);
    }

    #[test]
    fn ledger_surfaces_first_failure_remediation() {
        let mut ledger = SubTestLedger::new();
        ledger.push("connect", SubTestResult::ok("ok"));
        ledger.push("query", SubTestResult::fail("bad creds", "check the password"));
        assert!(!ledger.all_succeeded());
        assert_eq!(ledger.first_failure_remediation().as_deref(), Some("check the password"));
    }
}
