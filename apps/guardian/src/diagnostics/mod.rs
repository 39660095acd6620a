// [apps/guardian/src/diagnostics/mod.rs]
//! Long-running background job that harvests pod-level data from a
//! Kubernetes namespace, streams structured progress, and produces a
//! downloadable archive (`spec.md` §4.5).
//!
//! State transitions (idle → collecting → ready|error → collecting on a
//! new request) are guarded by a mutex held only across the transition
//! itself; the actual scrape work runs outside the lock in a spawned task
//! that reports progress back over an mpsc channel using the
//! `PROGRESS:<step>:<detail>` protocol the spec assigns to the
//! collector-worker boundary.

mod archive;
mod worker;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use guardian_k8s_client::ClusterClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Collecting,
    Ready,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsStatus {
    pub state: JobState,
    pub namespace: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub current_step: Option<String>,
    pub current_detail: Option<String>,
    pub completed_steps: Vec<String>,
    pub pod_count: usize,
    pub total_pods: usize,
    pub error_count: usize,
    pub error: Option<String>,
}

struct DiagnosticsJob {
    state: JobState,
    namespace: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    current_step: Option<String>,
    current_detail: Option<String>,
    completed_steps: Vec<String>,
    pod_count: usize,
    total_pods: usize,
    error_count: usize,
    artifact_path: Option<PathBuf>,
    error: Option<String>,
}

impl Default for DiagnosticsJob {
    fn default() -> Self {
        Self {
            state: JobState::Idle,
            namespace: None,
            started_at: None,
            finished_at: None,
            current_step: None,
            current_detail: None,
            completed_steps: Vec::new(),
            pod_count: 0,
            total_pods: 0,
            error_count: 0,
            artifact_path: None,
            error: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("a diagnostics collection is already in progress")]
    Busy,
    #[error("no kubernetes client is available")]
    NoClient,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no diagnostics artifact is ready")]
    NotReady,
}

/// A single `PROGRESS:<step>:<detail>` line, as emitted by the background
/// worker and consumed by [`DiagnosticsCollector::drain_progress`].
#[derive(Debug, Clone)]
pub(crate) enum ProgressEvent {
    Step { step: String, detail: String },
    PodDiscovered { total: usize },
    PodDone { index: usize },
    Failed(String),
    Completed { artifact_path: PathBuf },
}

pub struct DiagnosticsCollector {
    k8s: Option<Arc<ClusterClient>>,
    output_dir: PathBuf,
    job: Mutex<DiagnosticsJob>,
}

impl DiagnosticsCollector {
    pub fn new(k8s: Option<Arc<ClusterClient>>, output_dir: PathBuf) -> Self {
        Self { k8s, output_dir, job: Mutex::new(DiagnosticsJob::default()) }
    }

    /// `idle|ready|error → collecting`. Rejects with [`CollectError::Busy`]
    /// if a collection is already running (`spec.md` §4.5: "a second
    /// request while collecting returns 409").
    pub async fn collect(self: &Arc<Self>, namespace: String, since: Option<DateTime<Utc>>) -> Result<(), CollectError> {
        let Some(k8s) = self.k8s.clone() else {
            return Err(CollectError::NoClient);
        };

        let mut job = self.job.lock().await;
        if job.state == JobState::Collecting {
            return Err(CollectError::Busy);
        }

        if let Some(old_artifact) = job.artifact_path.take() {
            if let Err(err) = std::fs::remove_file(&old_artifact) {
                warn!(path = %old_artifact.display(), error = %err, "could not remove prior diagnostics artifact");
            }
        }

        *job = DiagnosticsJob {
            state: JobState::Collecting,
            namespace: Some(namespace.clone()),
            started_at: Some(Utc::now()),
            ..DiagnosticsJob::default()
        };
        drop(job);

        let (tx, rx) = mpsc::channel(64);
        let output_dir = self.output_dir.clone();
        let collector = self.clone();

        tokio::spawn(async move {
            collector.drain_progress(rx).await;
        });

        tokio::spawn(async move {
            worker::run_collection(k8s, namespace, since, output_dir, tx).await;
        });

        Ok(())
    }

    pub async fn status(&self) -> DiagnosticsStatus {
        let job = self.job.lock().await;
        DiagnosticsStatus {
            state: job.state,
            namespace: job.namespace.clone(),
            started_at: job.started_at,
            finished_at: job.finished_at,
            current_step: job.current_step.clone(),
            current_detail: job.current_detail.clone(),
            completed_steps: job.completed_steps.clone(),
            pod_count: job.pod_count,
            total_pods: job.total_pods,
            error_count: job.error_count,
            error: job.error.clone(),
        }
    }

    pub async fn artifact_path(&self) -> Result<PathBuf, DownloadError> {
        let job = self.job.lock().await;
        if job.state != JobState::Ready {
            return Err(DownloadError::NotReady);
        }
        job.artifact_path.clone().ok_or(DownloadError::NotReady)
    }

    /// Applies the worker's progress stream to job state until the channel
    /// closes (the worker always sends a terminal `Completed`/`Failed`
    /// event before dropping its sender).
    async fn drain_progress(&self, mut rx: mpsc::Receiver<ProgressEvent>) {
        while let Some(event) = rx.recv().await {
            let mut job = self.job.lock().await;
            match event {
                ProgressEvent::Step { step, detail } => {
                    info!(step = %step, detail = %detail, "diagnostics progress");
                    job.current_step = Some(step);
                    job.current_detail = Some(detail);
                }
                ProgressEvent::PodDiscovered { total } => {
                    job.total_pods = total;
                }
                ProgressEvent::PodDone { index } => {
                    job.pod_count = index;
                    job.completed_steps.push(format!("pod-done:{index}"));
                }
                ProgressEvent::Failed(reason) => {
                    error!(reason = %reason, "diagnostics collection failed");
                    job.state = JobState::Error;
                    job.error = Some(reason);
                    job.error_count += 1;
                    job.finished_at = Some(Utc::now());
                }
                ProgressEvent::Completed { artifact_path } => {
                    job.state = JobState::Ready;
                    job.artifact_path = Some(artifact_path);
                    job.finished_at = Some(Utc::now());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_without_a_cluster_client_fails_fast() {
        let collector = Arc::new(DiagnosticsCollector::new(None, std::env::temp_dir()));
        let result = collector.collect("default".to_string(), None).await;
        assert!(matches!(result, Err(CollectError::NoClient)));
    }

    #[tokio::test]
    async fn download_before_any_collection_is_not_ready() {
        let collector = Arc::new(DiagnosticsCollector::new(None, std::env::temp_dir()));
        assert!(matches!(collector.artifact_path().await, Err(DownloadError::NotReady)));
    }

    #[tokio::test]
    async fn idle_status_defaults() {
        let collector = Arc::new(DiagnosticsCollector::new(None, std::env::temp_dir()));
        let status = collector.status().await;
        assert_eq!(status.state, JobState::Idle);
        assert_eq!(status.pod_count, 0);
    }
}
