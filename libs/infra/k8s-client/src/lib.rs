// [libs/infra/k8s-client/src/lib.rs]
//! Thin wrapper around [`kube::Client`] shared by the `pvc` probe and the
//! diagnostics collector. Neither consumer needs more than list/get/create/
//! delete against a handful of resource kinds, so this crate exposes a small
//! namespace-scoped facade instead of re-exporting the full `kube` surface.

use futures::TryStreamExt;
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, Pod, ResourceRequirements, Secret, Service, Volume,
};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, AttachParams, DeleteParams, ListParams, LogParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum K8sClientError {
    #[error("could not establish a Kubernetes client: {0}")]
    ClientInit(#[source] kube::Error),
    #[error("Kubernetes API call failed: {0}")]
    Api(#[source] kube::Error),
    #[error("pod {0} has no containers to exec into")]
    NoContainers(String),
    #[error("exec into pod {0} produced no output")]
    ExecNoOutput(String),
}

/// Namespace-scoped facade over the Kubernetes API.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
}

impl ClusterClient {
    /// Connects using in-cluster config when running inside a pod, falling
    /// back to the local kubeconfig otherwise (`kube::Client::try_default`
    /// already implements that fallback order).
    pub async fn connect() -> Result<Self, K8sClientError> {
        let client = Client::try_default().await.map_err(K8sClientError::ClientInit)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Cluster-wide list of storage class names.
    pub async fn list_storage_class_names(&self) -> Result<Vec<String>, K8sClientError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(K8sClientError::Api)?;
        Ok(list.items.into_iter().filter_map(|sc| sc.metadata.name).collect())
    }

    /// Confirms the service account can at least list pods in `namespace`.
    pub async fn namespace_accessible(&self, namespace: &str) -> Result<bool, K8sClientError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get(namespace).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(false),
            Err(err) => Err(K8sClientError::Api(err)),
        }
    }

    /// Creates a PVC named `name` requesting `size` (e.g. `"1Gi"`) against
    /// `storage_class`, in ReadWriteOnce mode, returning once the API server
    /// accepts the object (not once it is Bound).
    pub async fn create_pvc(
        &self,
        namespace: &str,
        name: &str,
        storage_class: &str,
        size: &str,
    ) -> Result<(), K8sClientError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);

        let mut requests = BTreeMap::new();
        requests.insert("storage".to_string(), Quantity(size.to_string()));

        let pvc = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                storage_class_name: Some(storage_class.to_string()),
                resources: Some(ResourceRequirements {
                    requests: Some(requests),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        api.create(&PostParams::default(), &pvc).await.map_err(K8sClientError::Api)?;
        Ok(())
    }

    /// Returns the PVC's `status.phase` (e.g. `"Bound"`, `"Pending"`).
    pub async fn pvc_phase(&self, namespace: &str, name: &str) -> Result<Option<String>, K8sClientError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let pvc = api.get(name).await.map_err(K8sClientError::Api)?;
        Ok(pvc.status.and_then(|s| s.phase))
    }

    pub async fn delete_pvc(&self, namespace: &str, name: &str) -> Result<(), K8sClientError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(err) => Err(K8sClientError::Api(err)),
        }
    }

    // --- namespace-scoped snapshot helpers used by the diagnostics collector ---

    pub async fn list_events(&self, namespace: &str) -> Result<Vec<Event>, K8sClientError> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await.map_err(K8sClientError::Api)?.items)
    }

    pub async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, K8sClientError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await.map_err(K8sClientError::Api)?.items)
    }

    pub async fn list_configmaps(&self, namespace: &str) -> Result<Vec<ConfigMap>, K8sClientError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await.map_err(K8sClientError::Api)?.items)
    }

    pub async fn list_secret_names(&self, namespace: &str) -> Result<Vec<String>, K8sClientError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await.map_err(K8sClientError::Api)?;
        Ok(list.items.into_iter().filter_map(|s| s.metadata.name).collect())
    }

    pub async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, K8sClientError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(K8sClientError::Api)
    }

    pub async fn get_configmap(&self, namespace: &str, name: &str) -> Result<ConfigMap, K8sClientError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(K8sClientError::Api)
    }

    pub async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await.map_err(K8sClientError::Api)?.items)
    }

    pub async fn pod_status_json(&self, namespace: &str, pod_name: &str) -> Result<serde_json::Value, K8sClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = api.get(pod_name).await.map_err(K8sClientError::Api)?;
        Ok(serde_json::to_value(pod.status).unwrap_or(serde_json::Value::Null))
    }

    /// A `kubectl describe`-like text rendering, built from the pod object
    /// itself — sufficient for an operator diagnostic archive, though not a
    /// byte-for-byte match of kubectl's own formatter.
    pub async fn pod_describe_text(&self, namespace: &str, pod_name: &str) -> Result<String, K8sClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = api.get(pod_name).await.map_err(K8sClientError::Api)?;

        let mut out = String::new();
        out.push_str(&format!("Name:         {}\n", pod_name));
        out.push_str(&format!("Namespace:    {}\n", namespace));
        if let Some(spec) = &pod.spec {
            out.push_str(&format!("Node:         {}\n", spec.node_name.clone().unwrap_or_default()));
            out.push_str("Containers:\n");
            for container in &spec.containers {
                out.push_str(&format!("  - {}: image={}\n", container.name, container.image.clone().unwrap_or_default()));
            }
        }
        if let Some(status) = &pod.status {
            out.push_str(&format!("Phase:        {}\n", status.phase.clone().unwrap_or_default()));
            if let Some(conditions) = &status.conditions {
                out.push_str("Conditions:\n");
                for condition in conditions {
                    out.push_str(&format!("  {}: {}\n", condition.type_, condition.status));
                }
            }
            if let Some(statuses) = &status.container_statuses {
                out.push_str("Container Statuses:\n");
                for cs in statuses {
                    out.push_str(&format!("  {}: ready={} restart_count={}\n", cs.name, cs.ready, cs.restart_count));
                }
            }
        }
        Ok(out)
    }

    /// Returns the first container restart count, used to decide whether to
    /// also fetch previous-container logs.
    pub async fn first_container_restart_count(&self, namespace: &str, pod_name: &str) -> Result<i32, K8sClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = api.get(pod_name).await.map_err(K8sClientError::Api)?;
        Ok(pod
            .status
            .and_then(|s| s.container_statuses)
            .and_then(|statuses| statuses.into_iter().next())
            .map(|cs| cs.restart_count)
            .unwrap_or(0))
    }

    pub fn first_container_name(pod: &Pod) -> Option<String> {
        pod.spec.as_ref()?.containers.first().map(|c| c.name.clone())
    }

    /// Names of secret/configmap-backed volumes mounted by the pod, paired
    /// with the backing object name, for the collector's mounted-secrets
    /// and mounted-configmaps phases.
    pub fn secret_volumes(pod: &Pod) -> Vec<(String, String)> {
        volumes_of_kind(pod, |v| v.secret.as_ref().and_then(|s| s.secret_name.clone()))
    }

    pub fn configmap_volumes(pod: &Pod) -> Vec<(String, String)> {
        volumes_of_kind(pod, |v| v.config_map.as_ref().and_then(|c| c.name.clone()))
    }

    pub async fn pod_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        since_seconds: Option<i64>,
        previous: bool,
    ) -> Result<String, K8sClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = LogParams {
            container: Some(container.to_string()),
            previous,
            ..Default::default()
        };
        if since_seconds.is_some() {
            params.since_seconds = since_seconds;
        } else {
            params.tail_lines = Some(1000);
        }
        api.logs(pod_name, &params).await.map_err(K8sClientError::Api)
    }

    /// Execs into the first container and dumps its environment via `env`.
    /// Returns an error, not a panic, if the runtime disallows exec (common
    /// under restrictive PodSecurityPolicies / gVisor sandboxes).
    pub async fn pod_env_vars(&self, namespace: &str, pod_name: &str, container: &str) -> Result<String, K8sClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let attach_params = AttachParams::default()
            .container(container)
            .stdout(true)
            .stderr(false);

        let mut attached = api
            .exec(pod_name, vec!["env"], &attach_params)
            .await
            .map_err(K8sClientError::Api)?;

        let mut stdout = attached
            .stdout()
            .ok_or_else(|| K8sClientError::ExecNoOutput(pod_name.to_string()))?;

        let mut buf = Vec::new();
        use tokio::io::AsyncReadExt;
        stdout
            .read_to_end(&mut buf)
            .await
            .map_err(|err| {
                warn!(pod = pod_name, error = %err, "failed reading exec stdout");
                K8sClientError::ExecNoOutput(pod_name.to_string())
            })?;

        if let Some(status) = attached.take_status() {
            if let Some(status) = status.await {
                debug!(pod = pod_name, ?status, "exec finished");
            }
        }

        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

fn volumes_of_kind(pod: &Pod, extract: impl Fn(&Volume) -> Option<String>) -> Vec<(String, String)> {
    pod.spec
        .as_ref()
        .map(|spec| {
            spec.volumes
                .clone()
                .unwrap_or_default()
                .iter()
                .filter_map(|v| extract(v).map(|backing_name| (v.name.clone(), backing_name)))
                .collect()
        })
        .unwrap_or_default()
}

/// Drains a stream of `PodSpec`-adjacent list pages; kept for API symmetry
/// with callers that prefer `TryStreamExt` piping over collecting a `Vec`.
pub async fn collect_all<T, E>(mut stream: impl futures::Stream<Item = Result<T, E>> + Unpin) -> Result<Vec<T>, E> {
    let mut out = Vec::new();
    while let Some(item) = stream.try_next().await? {
        out.push(item);
    }
    Ok(out)
}
