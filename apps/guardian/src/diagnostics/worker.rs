// [apps/guardian/src/diagnostics/worker.rs]
//! The actual scrape workflow: phases run sequentially, emitting one
//! `ProgressEvent` per phase boundary and per pod, and write one text file
//! per pod plus the namespace-level files into the output directory
//! (`spec.md` §4.5). Per-pod errors are recorded inline in that pod's file
//! and do not stop the sweep; only a catastrophic failure (unwritable
//! output directory, cluster unreachable at `discover`) moves the job to
//! `error`.

use super::archive;
use super::ProgressEvent;
use chrono::{DateTime, Utc};
use guardian_k8s_client::ClusterClient;
use k8s_openapi::api::core::v1::Pod;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

async fn emit(tx: &Sender<ProgressEvent>, step: &str, detail: impl Into<String>) {
    let _ = tx.send(ProgressEvent::Step { step: step.to_string(), detail: detail.into() }).await;
}

pub async fn run_collection(
    k8s: Arc<ClusterClient>,
    namespace: String,
    since: Option<DateTime<Utc>>,
    output_base_dir: PathBuf,
    tx: Sender<ProgressEvent>,
) {
    let run_dir = output_base_dir.join(format!("{namespace}-{}", uuid::Uuid::new_v4()));

    emit(&tx, "init", format!("preparing {}", run_dir.display())).await;
    if let Err(err) = std::fs::create_dir_all(&run_dir) {
        let _ = tx.send(ProgressEvent::Failed(format!("could not create output directory: {err}"))).await;
        return;
    }

    if let Err(err) = collect_namespace_files(&k8s, &namespace, &run_dir, &tx).await {
        let _ = tx.send(ProgressEvent::Failed(err)).await;
        return;
    }

    emit(&tx, "discover", "enumerating pods").await;
    let pods = match k8s.list_pods(&namespace).await {
        Ok(pods) => pods,
        Err(err) => {
            let _ = tx.send(ProgressEvent::Failed(format!("could not list pods: {err}"))).await;
            return;
        }
    };
    let total = pods.len();
    let _ = tx.send(ProgressEvent::PodDiscovered { total }).await;

    let since_seconds = since.map(|s| (Utc::now() - s).num_seconds().max(0));

    for (i, pod) in pods.iter().enumerate() {
        let index = i + 1;
        let name = pod.metadata.name.clone().unwrap_or_else(|| format!("pod-{index}"));
        collect_one_pod(&k8s, &namespace, pod, &name, index, total, since_seconds, &run_dir, &tx).await;
        let _ = tx.send(ProgressEvent::PodDone { index }).await;
    }

    emit(&tx, "archive", "packaging output directory").await;
    let artifact_path = output_base_dir.join(format!("{namespace}-diagnostics-{}.tar.gz", Utc::now().format("%Y%m%dT%H%M%SZ")));
    if let Err(err) = archive::pack_directory(&run_dir, &artifact_path) {
        let _ = tx.send(ProgressEvent::Failed(format!("could not package archive: {err}"))).await;
        return;
    }
    let _ = std::fs::remove_dir_all(&run_dir);

    emit(&tx, "complete", "collection finished").await;
    let _ = tx.send(ProgressEvent::Completed { artifact_path }).await;
}

async fn collect_namespace_files(k8s: &ClusterClient, namespace: &str, run_dir: &std::path::Path, tx: &Sender<ProgressEvent>) -> Result<(), String> {
    emit(tx, "events", "capturing namespace events").await;
    let events = k8s.list_events(namespace).await.map_err(|err| format!("could not list events: {err}"))?;
    write_json_like(run_dir, "namespace-events.txt", &events)?;

    emit(tx, "services", "capturing services").await;
    let services = k8s.list_services(namespace).await.map_err(|err| format!("could not list services: {err}"))?;
    write_json_like(run_dir, "services.txt", &services)?;

    emit(tx, "configmaps", "listing configmaps").await;
    let configmaps = k8s.list_configmaps(namespace).await.map_err(|err| format!("could not list configmaps: {err}"))?;
    let names: Vec<String> = configmaps.into_iter().filter_map(|cm| cm.metadata.name).collect();
    write_json_like(run_dir, "configmaps.txt", &names)?;

    emit(tx, "secrets", "listing secret names").await;
    let secret_names = k8s.list_secret_names(namespace).await.map_err(|err| format!("could not list secret names: {err}"))?;
    write_json_like(run_dir, "secret-names.txt", &secret_names)?;

    Ok(())
}

fn write_json_like<T: serde::Serialize>(dir: &std::path::Path, filename: &str, value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "<could not serialize>".to_string());
    std::fs::write(dir.join(filename), text).map_err(|err| format!("could not write {filename}: {err}"))
}

#[allow(clippy::too_many_arguments)]
async fn collect_one_pod(
    k8s: &ClusterClient,
    namespace: &str,
    pod: &Pod,
    name: &str,
    index: usize,
    total: usize,
    since_seconds: Option<i64>,
    run_dir: &std::path::Path,
    tx: &Sender<ProgressEvent>,
) {
    let mut sections = Vec::new();

    emit(tx, &format!("pod:{index}/{total}"), format!("{name} - status")).await;
    sections.push(("STATUS", render_result(k8s.pod_status_json(namespace, name).await.map(|v| serde_json::to_string_pretty(&v).unwrap_or_default()))));

    emit(tx, &format!("pod:{index}/{total}"), format!("{name} - describe")).await;
    sections.push(("DESCRIBE", render_result(k8s.pod_describe_text(namespace, name).await)));

    let container = ClusterClient::first_container_name(pod);
    emit(tx, &format!("pod:{index}/{total}"), format!("{name} - env vars")).await;
    sections.push((
        "ENV VARS",
        match &container {
            Some(container) => render_result(k8s.pod_env_vars(namespace, name, container).await),
            None => "Could not retrieve env vars: pod has no containers".to_string(),
        },
    ));

    emit(tx, &format!("pod:{index}/{total}"), format!("{name} - secrets")).await;
    sections.push(("SECRETS", render_mounted_secrets(k8s, namespace, pod).await));

    emit(tx, &format!("pod:{index}/{total}"), format!("{name} - configmaps")).await;
    sections.push(("CONFIGMAPS", render_mounted_configmaps(k8s, namespace, pod).await));

    emit(tx, &format!("pod:{index}/{total}"), format!("{name} - logs")).await;
    sections.push(("LOGS", render_logs(k8s, namespace, name, container.as_deref(), since_seconds).await));

    let mut body = String::new();
    for (title, content) in sections {
        body.push_str(&format!("=== {title} ===\n{content}\n\n"));
    }
    let _ = std::fs::write(run_dir.join(format!("{name}.txt")), body);
}

async fn render_mounted_secrets(k8s: &ClusterClient, namespace: &str, pod: &Pod) -> String {
    let volumes = ClusterClient::secret_volumes(pod);
    if volumes.is_empty() {
        return "Could not retrieve secrets: no secret volumes mounted".to_string();
    }
    let mut out = String::new();
    for (volume_name, secret_name) in volumes {
        out.push_str(&format!("-- volume {volume_name} (secret {secret_name}) --\n"));
        match k8s.get_secret(namespace, &secret_name).await {
            Ok(secret) => out.push_str(&format!("{}\n", serde_json::to_string_pretty(&secret.data).unwrap_or_default())),
            Err(err) => out.push_str(&format!("Could not retrieve secret {secret_name}: {err}\n")),
        }
    }
    out
}

async fn render_mounted_configmaps(k8s: &ClusterClient, namespace: &str, pod: &Pod) -> String {
    let volumes = ClusterClient::configmap_volumes(pod);
    if volumes.is_empty() {
        return "Could not retrieve configmaps: no configmap volumes mounted".to_string();
    }
    let mut out = String::new();
    for (volume_name, cm_name) in volumes {
        out.push_str(&format!("-- volume {volume_name} (configmap {cm_name}) --\n"));
        match k8s.get_configmap(namespace, &cm_name).await {
            Ok(cm) => out.push_str(&format!("{}\n", serde_json::to_string_pretty(&cm.data).unwrap_or_default())),
            Err(err) => out.push_str(&format!("Could not retrieve configmap {cm_name}: {err}\n")),
        }
    }
    out
}

async fn render_logs(k8s: &ClusterClient, namespace: &str, pod_name: &str, container: Option<&str>, since_seconds: Option<i64>) -> String {
    let Some(container) = container else {
        return "Could not retrieve logs: pod has no containers".to_string();
    };

    let mut out = render_result(k8s.pod_logs(namespace, pod_name, container, since_seconds, false).await);

    let restart_count = k8s.first_container_restart_count(namespace, pod_name).await.unwrap_or(0);
    if restart_count > 0 {
        out.push_str("\n-- previous container logs (restart detected) --\n");
        out.push_str(&render_result(k8s.pod_logs(namespace, pod_name, container, since_seconds, true).await));
    }
    out
}

fn render_result<T: std::fmt::Display, E: std::fmt::Display>(result: Result<T, E>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(err) => format!("Could not retrieve: {err}"),
    }
}
