use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Initial,
    InProgress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub operation: OperationType,
    pub state: OperationState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub guid: String,
    pub name: String,
    /// Offering label, `user-provided` for user-provided instances
    pub label: String,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeDevice {
    pub volume_id: String,
    #[serde(default)]
    pub mount_config: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMountDescriptor {
    pub container_dir: String,
    pub mode: String,
    pub device_type: String,
    pub driver: String,
    pub device: VolumeDevice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub service_instance: ServiceInstance,
    #[serde(default)]
    pub credentials: Map<String, Value>,
    #[serde(default)]
    pub syslog_drain_url: Option<String>,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMountDescriptor>,
    #[serde(default)]
    pub last_operation: Option<LastOperation>,
}

impl ServiceBinding {
    /// True once the binding exists on the broker side.
    ///
    /// A binding without a recorded operation predates asynchronous bindings; any
    /// update or delete implies the create already finished.
    pub fn create_succeeded(&self) -> bool {
        match self.last_operation {
            None => true,
            Some(LastOperation {
                operation: OperationType::Create,
                state,
            }) => state == OperationState::Succeeded,
            Some(_) => true,
        }
    }

    /// Binding name, falling back to the service instance name
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or(self.service_instance.name.as_str())
    }
}
