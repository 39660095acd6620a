// [apps/guardian/tests/runner_invariants.rs]
//! Property-style invariants from `spec.md` §8, exercised against
//! `TestRunner` directly with fake probes rather than live network calls.

use async_trait::async_trait;
use chrono::Utc;
use guardian::probe::registry::ProbeRegistry;
use guardian::probe::{Probe, ProbeContext, ProbeResult, ProbeStatus, SubTestLedger, SubTestResult};
use guardian::runner::TestRunner;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A probe that refuses to run when unconfigured, and touches a flag
/// (standing in for "network I/O") only inside `execute`.
struct FlaggingProbe {
    id: &'static str,
    configured: bool,
    touched_io: Arc<AtomicBool>,
    fail: bool,
}

#[async_trait]
impl Probe for FlaggingProbe {
    fn id(&self) -> &'static str {
        self.id
    }
    fn display_name(&self) -> &'static str {
        "Flagging"
    }
    fn is_configured(&self) -> bool {
        self.configured
    }
    async fn execute(&self, _ctx: &ProbeContext) -> ProbeResult {
        self.touched_io.store(true, Ordering::SeqCst);
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        if self.fail {
            ledger.push("check", SubTestResult::fail("deliberate failure", "this is a test probe, nothing to remediate"));
        } else {
            ledger.push("check", SubTestResult::ok("fine"));
        }
        ProbeResult::from_ledger(self.id, self.display_name(), started_at, ledger)
    }
}

#[tokio::test]
async fn unconfigured_probe_never_touches_io() {
    let touched = Arc::new(AtomicBool::new(false));
    let probe = Arc::new(FlaggingProbe { id: "p", configured: false, touched_io: touched.clone(), fail: false });
    let registry = Arc::new(ProbeRegistry::new(vec![probe]));
    let runner = TestRunner::new(registry, 4);

    let result = runner.run("p", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result.status, ProbeStatus::Skipped);
    assert!(!touched.load(Ordering::SeqCst), "a skipped probe must not perform any I/O");
}

#[tokio::test]
async fn failed_and_error_results_always_carry_remediation() {
    let touched = Arc::new(AtomicBool::new(false));
    let probe = Arc::new(FlaggingProbe { id: "p", configured: true, touched_io: touched, fail: true });
    let registry = Arc::new(ProbeRegistry::new(vec![probe]));
    let runner = TestRunner::new(registry, 4);

    let result = runner.run("p", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result.status, ProbeStatus::Failed);
    assert!(result.remediation.as_deref().is_some_and(|r| !r.is_empty()));
}

#[tokio::test]
async fn zero_deadline_yields_an_immediate_timeout() {
    let touched = Arc::new(AtomicBool::new(false));
    let probe = Arc::new(FlaggingProbe { id: "p", configured: true, touched_io: touched, fail: false });
    let registry = Arc::new(ProbeRegistry::new(vec![probe]));
    let runner = TestRunner::new(registry, 4);

    let result = runner.run("p", Duration::ZERO).await.unwrap();
    assert_eq!(result.status, ProbeStatus::Timeout);
}

#[tokio::test]
async fn run_all_latest_matches_the_returned_summary_for_every_configured_probe() {
    let touched_a = Arc::new(AtomicBool::new(false));
    let touched_b = Arc::new(AtomicBool::new(false));
    let registry = Arc::new(ProbeRegistry::new(vec![
        Arc::new(FlaggingProbe { id: "a", configured: true, touched_io: touched_a, fail: false }),
        Arc::new(FlaggingProbe { id: "b", configured: true, touched_io: touched_b, fail: true }),
        Arc::new(FlaggingProbe { id: "c", configured: false, touched_io: Arc::new(AtomicBool::new(false)), fail: false }),
    ]));
    let runner = TestRunner::new(registry, 4);

    let summary = runner.run_all(Duration::from_secs(5)).await;
    assert_eq!(summary.passed_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert!(!summary.results.contains_key("c"));

    for (id, result) in &summary.results {
        assert_eq!(runner.last_result(id).unwrap().status, result.status);
    }
}

proptest! {
    /// For any terminal result built from a ledger, `finished_at >= started_at`.
    #[test]
    fn finished_at_never_precedes_started_at(delay_ms in 0u64..50) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let started_at = Utc::now();
            let mut ledger = SubTestLedger::new();
            ledger.push("check", SubTestResult::ok("fine"));
            let result = ProbeResult::from_ledger("p", "P", started_at, ledger);
            prop_assert!(result.finished_at >= result.started_at);
            Ok(())
        })?;
    }
}
