//! Volume mounts contributed by service bindings

use super::{SharedDevice, VolumeMount};
use crate::model::ServiceBinding;
use serde_json::Value;

/// One mount per descriptor, bindings and descriptors in input order
///
/// An empty or missing mount config renders as `""`, never `"{}"`.
pub fn volume_mounts(bindings: &[ServiceBinding]) -> Vec<VolumeMount> {
    bindings
        .iter()
        .flat_map(|binding| binding.volume_mounts.iter())
        .map(|descriptor| {
            let mount_config = match &descriptor.device.mount_config {
                Some(config) if !config.is_empty() => Value::Object(config.clone()).to_string(),
                _ => String::new(),
            };
            VolumeMount {
                driver: descriptor.driver.clone(),
                container_dir: descriptor.container_dir.clone(),
                mode: descriptor.mode.clone(),
                shared: SharedDevice {
                    volume_id: descriptor.device.volume_id.clone(),
                    mount_config,
                },
            }
        })
        .collect()
}
