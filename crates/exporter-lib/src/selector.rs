//! Pod selection
//!
//! Derives a probe target from each pod whose first container declares an
//! HTTP liveness probe. Everything else is skipped without error.

use crate::models::{ProbeTarget, Scheme};
use k8s_openapi::api::core::v1::{Container, HTTPGetAction, Pod};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use tracing::debug;

/// Label holding the logical container name
pub const CONTAINER_NAME_LABEL: &str = "app";

/// Derive probe targets for every eligible pod in the list
pub fn select_targets(pods: &[Pod]) -> Vec<ProbeTarget> {
    pods.iter().filter_map(select_target).collect()
}

/// Derive the probe target for a single pod, if it has one
///
/// Only the first container's liveness probe is considered.
pub fn select_target(pod: &Pod) -> Option<ProbeTarget> {
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let pod_name = pod.metadata.name.clone().unwrap_or_default();

    let Some(container) = pod.spec.as_ref().and_then(|spec| spec.containers.first()) else {
        debug!(namespace = %namespace, pod_name = %pod_name, "Skipping pod without containers");
        return None;
    };

    let Some(http_get) = container
        .liveness_probe
        .as_ref()
        .and_then(|probe| probe.http_get.as_ref())
    else {
        debug!(namespace = %namespace, pod_name = %pod_name, "Skipping pod without HTTP liveness probe");
        return None;
    };

    let Some(ip) = pod
        .status
        .as_ref()
        .and_then(|status| status.pod_ip.clone())
        .filter(|ip| !ip.is_empty())
    else {
        debug!(namespace = %namespace, pod_name = %pod_name, "Skipping pod without IP");
        return None;
    };

    let Some(port) = resolve_port(&http_get.port, container) else {
        debug!(
            namespace = %namespace,
            pod_name = %pod_name,
            port = ?http_get.port,
            "Skipping pod with unresolvable probe port"
        );
        return None;
    };

    Some(ProbeTarget {
        container_name: container_name(pod.metadata.labels.as_ref()),
        namespace,
        pod_name,
        scheme: scheme(http_get),
        ip,
        port,
        path: normalize_path(http_get.path.as_deref()),
    })
}

/// Container name label value: the pod's `app` label, or "" when absent
pub fn container_name(labels: Option<&BTreeMap<String, String>>) -> String {
    labels
        .and_then(|labels| labels.get(CONTAINER_NAME_LABEL))
        .cloned()
        .unwrap_or_default()
}

fn scheme(http_get: &HTTPGetAction) -> Scheme {
    match http_get.scheme.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("https") => Scheme::Https,
        _ => Scheme::Http,
    }
}

/// Numeric ports pass through; named ports resolve against the container's ports
fn resolve_port(port: &IntOrString, container: &Container) -> Option<i32> {
    match port {
        IntOrString::Int(number) => Some(*number),
        IntOrString::String(name) => {
            if let Ok(number) = name.parse::<i32>() {
                return Some(number);
            }

            container
                .ports
                .as_ref()?
                .iter()
                .find(|p| p.name.as_deref() == Some(name.as_str()))
                .map(|p| p.container_port)
        }
    }
}

fn normalize_path(path: Option<&str>) -> String {
    match path {
        None | Some("") => "/".to_string(),
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("/{}", p),
    }
}
