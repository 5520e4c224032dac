//! Service binding presentation shared by the file and blob forms

use crate::model::ServiceBinding;
use serde_json::{json, Map, Value};

/// Presented attributes in their canonical order, `credentials` included
pub fn present_binding(binding: &ServiceBinding) -> Vec<(&'static str, Value)> {
    let instance = &binding.service_instance;
    let volume_mounts: Vec<Value> = binding
        .volume_mounts
        .iter()
        .map(|mount| {
            json!({
                "container_dir": mount.container_dir,
                "mode": mount.mode,
                "device_type": mount.device_type,
            })
        })
        .collect();

    vec![
        ("label", json!(instance.label)),
        ("plan", json!(instance.plan)),
        ("name", json!(binding.display_name())),
        ("tags", json!(instance.tags)),
        ("instance_guid", json!(instance.guid)),
        ("instance_name", json!(instance.name)),
        ("binding_guid", json!(binding.guid)),
        ("binding_name", json!(binding.name)),
        ("credentials", Value::Object(binding.credentials.clone())),
        ("syslog_drain_url", json!(binding.syslog_drain_url)),
        ("volume_mounts", Value::Array(volume_mounts)),
    ]
}

/// `VCAP_SERVICES` content: successfully created bindings grouped by label
pub fn vcap_services(bindings: &[ServiceBinding]) -> Value {
    let mut by_label: Map<String, Value> = Map::new();
    for binding in bindings.iter().filter(|b| b.create_succeeded()) {
        let presented: Map<String, Value> = present_binding(binding)
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        let entry = by_label
            .entry(binding.service_instance.label.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            list.push(Value::Object(presented));
        }
    }
    Value::Object(by_label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LastOperation, OperationState, OperationType, ServiceInstance};

    fn binding(guid: &str, label: &str, name: Option<&str>) -> ServiceBinding {
        ServiceBinding {
            guid: guid.to_string(),
            name: name.map(String::from),
            service_instance: ServiceInstance {
                guid: format!("{}-instance", guid),
                name: format!("{}-db", guid),
                label: label.to_string(),
                plan: Some("small".to_string()),
                tags: vec!["sql".to_string()],
            },
            credentials: Map::new(),
            syslog_drain_url: None,
            volume_mounts: vec![],
            last_operation: None,
        }
    }

    #[test]
    fn test_name_falls_back_to_instance_name() {
        let presented = present_binding(&binding("b1", "postgres", None));
        let name = presented.iter().find(|(k, _)| *k == "name").unwrap();
        assert_eq!(name.1, json!("b1-db"));
        let binding_name = presented.iter().find(|(k, _)| *k == "binding_name").unwrap();
        assert_eq!(binding_name.1, Value::Null);
    }

    #[test]
    fn test_vcap_services_groups_by_label() {
        let mut pending = binding("b3", "postgres", None);
        pending.last_operation = Some(LastOperation {
            operation: OperationType::Create,
            state: OperationState::InProgress,
        });
        let bindings = vec![
            binding("b1", "postgres", Some("primary")),
            binding("b2", "redis", None),
            binding("b4", "postgres", None),
            pending,
        ];

        let services = vcap_services(&bindings);
        assert_eq!(services["postgres"].as_array().unwrap().len(), 2);
        assert_eq!(services["redis"].as_array().unwrap().len(), 1);
        assert_eq!(services["postgres"][0]["name"], "primary");
    }
}
