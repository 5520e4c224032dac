//! Identity and placement metadata shared by every recipe kind

use super::{CertificateProperties, MetricTagValue, Network};
use crate::model::Workload;
use std::collections::BTreeMap;
use tracing::warn;

pub const STAGING_CPU_WEIGHT: u32 = 50;
const MIN_CPU_PROXY: u64 = 128;
const MAX_CPU_PROXY: u64 = 8192;

/// Scheduler network workload classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerWorkload {
    Staging,
    Task,
    App,
}

impl ContainerWorkload {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerWorkload::Staging => "staging",
            ContainerWorkload::Task => "task",
            ContainerWorkload::App => "app",
        }
    }
}

pub fn certificate_properties(workload: &Workload) -> CertificateProperties {
    CertificateProperties {
        organizational_unit: vec![
            format!("organization:{}", workload.organization.guid),
            format!("space:{}", workload.space.guid),
            format!("app:{}", workload.guid),
        ],
    }
}

pub fn metric_tags(workload: &Workload) -> BTreeMap<String, MetricTagValue> {
    [
        ("source_id", workload.guid.as_str()),
        ("organization_id", workload.organization.guid.as_str()),
        ("space_id", workload.space.guid.as_str()),
        ("app_id", workload.guid.as_str()),
        ("organization_name", workload.organization.name.as_str()),
        ("space_name", workload.space.name.as_str()),
        ("app_name", workload.name.as_str()),
    ]
    .into_iter()
    .map(|(key, value)| {
        (
            key.to_string(),
            MetricTagValue {
                static_value: value.to_string(),
            },
        )
    })
    .collect()
}

pub fn network(workload: &Workload, ports: &[u32], kind: ContainerWorkload) -> Network {
    let ports: Vec<String> = ports.iter().map(u32::to_string).collect();
    let properties = BTreeMap::from([
        ("policy_group_id".to_string(), workload.guid.clone()),
        ("app_id".to_string(), workload.guid.clone()),
        ("space_id".to_string(), workload.space.guid.clone()),
        ("org_id".to_string(), workload.organization.guid.clone()),
        ("ports".to_string(), ports.join(",")),
        ("container_workload".to_string(), kind.as_str().to_string()),
    ]);
    Network { properties }
}

pub fn placement_tags(isolation_segment: Option<&str>) -> Vec<String> {
    match isolation_segment {
        Some("") => {
            warn!("ignoring empty isolation segment name");
            Vec::new()
        }
        Some(segment) => vec![segment.to_string()],
        None => Vec::new(),
    }
}

pub fn cpu_weight(memory_mb: u64) -> u32 {
    let proxy = memory_mb.clamp(MIN_CPU_PROXY, MAX_CPU_PROXY);
    (100 * proxy / MAX_CPU_PROXY) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Organization, Space, WorkloadFeatures};

    fn workload() -> Workload {
        Workload {
            guid: "app-guid".to_string(),
            name: "my-app".to_string(),
            space: Space {
                guid: "space-guid".to_string(),
                name: "dev".to_string(),
            },
            organization: Organization {
                guid: "org-guid".to_string(),
                name: "acme".to_string(),
            },
            service_bindings: vec![],
            features: WorkloadFeatures::default(),
            revisions_enabled: false,
        }
    }

    #[test]
    fn test_certificate_properties_order() {
        let props = certificate_properties(&workload());
        assert_eq!(
            props.organizational_unit,
            vec!["organization:org-guid", "space:space-guid", "app:app-guid"]
        );
    }

    #[test]
    fn test_metric_tags_are_complete() {
        let tags = metric_tags(&workload());
        assert_eq!(tags.len(), 7);
        assert_eq!(tags["source_id"].static_value, "app-guid");
        assert_eq!(tags["organization_name"].static_value, "acme");
        assert_eq!(tags["space_name"].static_value, "dev");
        assert_eq!(tags["app_name"].static_value, "my-app");
    }

    #[test]
    fn test_network_properties() {
        let network = network(&workload(), &[8080, 9090], ContainerWorkload::App);
        assert_eq!(network.properties["ports"], "8080,9090");
        assert_eq!(network.properties["container_workload"], "app");
        assert_eq!(network.properties["policy_group_id"], "app-guid");
    }

    #[test]
    fn test_placement_tags() {
        assert_eq!(placement_tags(Some("isolated")), vec!["isolated"]);
        assert!(placement_tags(Some("")).is_empty());
        assert!(placement_tags(None).is_empty());
    }

    #[test]
    fn test_cpu_weight_is_clamped() {
        assert_eq!(cpu_weight(2048), 25);
        assert_eq!(cpu_weight(64), 1);
        assert_eq!(cpu_weight(16384), 100);
    }
}
