use serde::{Deserialize, Serialize};

/// A stored security group rule, before translation into an egress rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub protocol: String,
    /// Single CIDR, IP, range or comma-separated list of those
    pub destination: String,
    /// `"80"`, `"80,443"` or `"8000-9000"`
    #[serde(default)]
    pub ports: Option<String>,
    #[serde(default, rename = "type")]
    pub icmp_type: Option<i32>,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub guid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<SecurityGroupRule>,
}

/// Groups applicable to one workload scope, in enumeration order
///
/// `defaults` holds the platform-wide groups (staging or running default) in
/// creation order; `space` holds groups associated with the workload's space in
/// association order. Defaults always precede space groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroups {
    #[serde(default)]
    pub defaults: Vec<SecurityGroup>,
    #[serde(default)]
    pub space: Vec<SecurityGroup>,
}

impl SecurityGroups {
    pub fn iter(&self) -> impl Iterator<Item = &SecurityGroup> {
        self.defaults.iter().chain(self.space.iter())
    }
}
