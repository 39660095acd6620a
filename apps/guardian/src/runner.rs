// [apps/guardian/src/runner.rs]
//! Concurrent probe executor: runs probes in parallel under a bounded
//! scheduler, holds the latest result per probe, and exposes single-flight
//! `run`/`run_all` semantics (`spec.md` §4.4).
//!
//! `RunnerState` is the guarded map the spec describes: reads take the
//! lock, clone, and release; writes are short critical sections; no result
//! is ever mutated after insertion. Overlapping callers for the *same*
//! probe (or the same `run_all`) join the in-flight attempt via a
//! broadcast channel rather than starting a second execution — the
//! structured-cancellation-friendly alternative to a thread-pool
//! wait-and-abandon pattern (`spec.md` §9).

use crate::probe::registry::ProbeRegistry;
use crate::probe::{ProbeContext, ProbeResult, ProbeStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex as AsyncMutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Snapshot entry returned by [`TestRunner::status`] — a read-only copy,
/// never a reference into the guarded map.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub status: ProbeStatus,
    /// When this probe last finished running (`spec.md` §6: `{status,
    /// last_run, message}`).
    pub last_run: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Summary counters returned alongside a `run_all` result map.
#[derive(Debug, Clone, Serialize)]
pub struct RunAllSummary {
    pub results: HashMap<String, ProbeResult>,
    pub passed_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub overall_status: &'static str,
}

#[derive(Default)]
struct RunnerState {
    latest: HashMap<String, ProbeResult>,
    in_flight: HashMap<String, broadcast::Sender<ProbeResult>>,
}

pub struct TestRunner {
    registry: Arc<ProbeRegistry>,
    concurrency_limit: usize,
    state: std::sync::Mutex<RunnerState>,
    run_all_lock: AsyncMutex<()>,
    run_all_in_flight: std::sync::Mutex<Option<broadcast::Sender<Arc<RunAllSummary>>>>,
}

impl TestRunner {
    pub fn new(registry: Arc<ProbeRegistry>, concurrency_limit: usize) -> Self {
        Self {
            registry,
            concurrency_limit: concurrency_limit.max(1),
            state: std::sync::Mutex::new(RunnerState::default()),
            run_all_lock: AsyncMutex::new(()),
            run_all_in_flight: std::sync::Mutex::new(None),
        }
    }

    /// Runs one probe, joining an already-in-flight invocation if present.
    pub async fn run(&self, probe_id: &str, timeout: Duration) -> Option<ProbeResult> {
        let probe = self.registry.get(probe_id)?;

        // Join an in-flight execution of the same probe, if one exists.
        let maybe_receiver = {
            let state = self.state.lock().unwrap();
            state.in_flight.get(probe_id).map(|tx| tx.subscribe())
        };
        if let Some(mut rx) = maybe_receiver {
            return match rx.recv().await {
                Ok(result) => Some(result),
                Err(_) => self.last_result(probe_id),
            };
        }

        // Claim the in-flight slot for this probe.
        let (tx, _rx) = broadcast::channel(1);
        {
            let mut state = self.state.lock().unwrap();
            if state.in_flight.contains_key(probe_id) {
                // Lost a race with another caller between the check above
                // and this insert; fall back to joining theirs.
                let mut rx = state.in_flight.get(probe_id).unwrap().subscribe();
                drop(state);
                return match rx.recv().await {
                    Ok(result) => Some(result),
                    Err(_) => self.last_result(probe_id),
                };
            }
            state.in_flight.insert(probe_id.to_string(), tx.clone());
        }

        let result = self.execute_one(probe, timeout).await;

        {
            let mut state = self.state.lock().unwrap();
            state.in_flight.remove(probe_id);
            state.latest.insert(probe_id.to_string(), result.clone());
        }
        let _ = tx.send(result.clone());

        Some(result)
    }

    /// Schedules every configured probe concurrently, bounded by the
    /// configured worker concurrency limit, each under its own deadline.
    /// A second concurrent call joins the first rather than starting a
    /// duplicate sweep.
    pub async fn run_all(&self, timeout_per_probe: Duration) -> Arc<RunAllSummary> {
        let maybe_receiver = { self.run_all_in_flight.lock().unwrap().as_ref().map(|tx| tx.subscribe()) };
        if let Some(mut rx) = maybe_receiver {
            if let Ok(summary) = rx.recv().await {
                return summary;
            }
        }

        let _guard = self.run_all_lock.lock().await;

        // Re-check: another caller may have finished the sweep while we
        // waited for the async lock.
        let maybe_receiver = { self.run_all_in_flight.lock().unwrap().as_ref().map(|tx| tx.subscribe()) };
        if let Some(mut rx) = maybe_receiver {
            if let Ok(summary) = rx.recv().await {
                return summary;
            }
        }

        let (tx, _rx) = broadcast::channel(1);
        *self.run_all_in_flight.lock().unwrap() = Some(tx.clone());

        let configured: Vec<_> = self.registry.configured().cloned().collect();
        let configured_count = configured.len();
        let unconfigured_count = self.registry.all().count() - configured_count;
        info!(count = configured_count, "starting run-all sweep");

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut handles = Vec::with_capacity(configured.len());
        for probe in configured {
            let permit_source = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await.expect("semaphore never closed");
                (probe.id().to_string(), run_with_timeout(probe, timeout_per_probe).await)
            }));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((id, result)) => {
                    results.insert(id, result);
                }
                Err(err) => warn!(error = %err, "a probe task panicked; its slot is dropped from this run-all"),
            }
        }

        {
            let mut state = self.state.lock().unwrap();
            for (id, result) in &results {
                state.latest.insert(id.clone(), result.clone());
            }
        }

        let (passed, failed, skipped_among_configured) = results.values().fold((0, 0, 0), |(p, f, s), r| match r.status {
            ProbeStatus::Passed => (p + 1, f, s),
            ProbeStatus::Skipped => (p, f, s + 1),
            _ => (p, f + 1, s),
        });
        // `results` holds only configured probes (run_with_timeout never
        // yields Skipped for one), so the registered-but-unconfigured
        // probes have to be folded in separately to match spec.md §6/§8's
        // `skipped_count=<remaining>`.
        let skipped = skipped_among_configured + unconfigured_count;
        let overall_status = if failed > 0 { "failed" } else if passed > 0 { "passed" } else { "skipped" };

        let summary = Arc::new(RunAllSummary { results, passed_count: passed, failed_count: failed, skipped_count: skipped, overall_status });

        *self.run_all_in_flight.lock().unwrap() = None;
        let _ = tx.send(summary.clone());

        summary
    }

    /// Read-only snapshot of every probe's last-known status. Takes the
    /// lock only long enough to clone.
    pub fn status(&self) -> HashMap<String, StatusEntry> {
        let state = self.state.lock().unwrap();
        self.registry
            .all()
            .map(|probe| {
                let id = probe.id().to_string();
                let entry = match state.latest.get(probe.id()) {
                    Some(result) => StatusEntry { status: result.status, last_run: Some(result.finished_at), message: Some(result.message.clone()) },
                    None if state.in_flight.contains_key(probe.id()) => StatusEntry { status: ProbeStatus::Running, last_run: None, message: None },
                    None => StatusEntry { status: ProbeStatus::Skipped, last_run: None, message: Some("never run".to_string()) },
                };
                (id, entry)
            })
            .collect()
    }

    pub fn last_result(&self, probe_id: &str) -> Option<ProbeResult> {
        self.state.lock().unwrap().latest.get(probe_id).cloned()
    }

    async fn execute_one(&self, probe: Arc<dyn crate::probe::Probe>, timeout: Duration) -> ProbeResult {
        run_with_timeout(probe, timeout).await
    }
}

/// Runs a single probe, racing its `execute` against `timeout`. A probe
/// that cannot honor cancellation is allowed to keep running in the
/// background; its eventual result is simply discarded (`spec.md` §4.4).
async fn run_with_timeout(probe: Arc<dyn crate::probe::Probe>, timeout: Duration) -> ProbeResult {
    let started_at = Utc::now();

    if !probe.is_configured() {
        return ProbeResult::skipped(probe.id(), probe.display_name(), &[]);
    }

    let cancellation = CancellationToken::new();
    let ctx = ProbeContext::new(timeout, cancellation.clone());

    let execution = probe.execute(&ctx);
    match tokio::time::timeout(timeout, execution).await {
        Ok(result) => result,
        Err(_) => {
            cancellation.cancel();
            ProbeResult::timeout(probe.id(), probe.display_name(), started_at, timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Probe, SubTestLedger};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        id: &'static str,
        calls: Arc<AtomicUsize>,
        delay: Duration,
        configured: bool,
    }

    #[async_trait]
    impl Probe for CountingProbe {
        fn id(&self) -> &'static str {
            self.id
        }
        fn display_name(&self) -> &'static str {
            "Counting"
        }
        fn is_configured(&self) -> bool {
            self.configured
        }
        async fn execute(&self, _ctx: &ProbeContext) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let started = Utc::now();
            let mut ledger = SubTestLedger::new();
            ledger.push("ok", crate::probe::SubTestResult::ok("fine"));
            ProbeResult::from_ledger(self.id, self.display_name(), started, ledger)
        }
    }

    #[tokio::test]
    async fn concurrent_run_of_same_probe_executes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = Arc::new(CountingProbe { id: "p", calls: calls.clone(), delay: Duration::from_millis(50), configured: true });
        let registry = Arc::new(ProbeRegistry::new(vec![probe]));
        let runner = Arc::new(TestRunner::new(registry, 4));

        let r1 = runner.clone();
        let r2 = runner.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { r1.run("p", Duration::from_secs(5)).await }),
            tokio::spawn(async move { r2.run("p", Duration::from_secs(5)).await }),
        );

        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_probe_id_returns_none() {
        let registry = Arc::new(ProbeRegistry::new(vec![]));
        let runner = TestRunner::new(registry, 4);
        assert!(runner.run("does-not-exist", Duration::from_secs(1)).await.is_none());
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = Arc::new(CountingProbe { id: "slow", calls, delay: Duration::from_millis(200), configured: true });
        let registry = Arc::new(ProbeRegistry::new(vec![probe]));
        let runner = TestRunner::new(registry, 4);

        let result = runner.run("slow", Duration::from_millis(10)).await.unwrap();
        assert_eq!(result.status, ProbeStatus::Timeout);
    }

    #[tokio::test]
    async fn run_all_preserves_unconfigured_latest_entries() {
        let registry = Arc::new(ProbeRegistry::new(vec![
            Arc::new(CountingProbe { id: "on", calls: Arc::new(AtomicUsize::new(0)), delay: Duration::from_millis(1), configured: true }),
            Arc::new(CountingProbe { id: "off", calls: Arc::new(AtomicUsize::new(0)), delay: Duration::from_millis(1), configured: false }),
        ]));
        let runner = TestRunner::new(registry, 4);

        let summary = runner.run_all(Duration::from_secs(5)).await;
        assert!(summary.results.contains_key("on"));
        assert!(!summary.results.contains_key("off"));
        assert_eq!(runner.last_result("on").unwrap().status, ProbeStatus::Passed);
    }

    #[tokio::test]
    async fn concurrent_run_all_joins_single_sweep() {
        let registry = Arc::new(ProbeRegistry::new(vec![Arc::new(CountingProbe {
            id: "p",
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::from_millis(50),
            configured: true,
        })]));
        let runner = Arc::new(TestRunner::new(registry, 4));

        let r1 = runner.clone();
        let r2 = runner.clone();
        let (s1, s2) = tokio::join!(
            tokio::spawn(async move { r1.run_all(Duration::from_secs(5)).await }),
            tokio::spawn(async move { r2.run_all(Duration::from_secs(5)).await }),
        );
        assert_eq!(s1.unwrap().passed_count, s2.unwrap().passed_count);
    }
}
