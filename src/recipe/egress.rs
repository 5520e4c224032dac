//! Security group rules to scheduler egress rules

use super::{EgressRule, IcmpInfo, PortRange};
use crate::error::{RecipeError, Result};
use crate::model::{SecurityGroup, SecurityGroupRule, SecurityGroups};

/// Translates every rule of every group, defaults first
///
/// Order follows group enumeration then rule order; identical rules from
/// different groups are all kept.
pub fn egress_rules(groups: &SecurityGroups) -> Result<Vec<EgressRule>> {
    let mut rules = Vec::new();
    for group in groups.iter() {
        for rule in &group.rules {
            rules.push(translate_rule(group, rule)?);
        }
    }
    Ok(rules)
}

fn translate_rule(group: &SecurityGroup, rule: &SecurityGroupRule) -> Result<EgressRule> {
    let protocol = rule.protocol.to_lowercase();
    let mut translated = EgressRule {
        protocol: protocol.clone(),
        destinations: rule
            .destination
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from)
            .collect(),
        ports: Vec::new(),
        port_range: None,
        icmp_info: None,
        log: rule.log,
        annotations: vec![format!("security_group_id:{}", group.guid)],
    };

    match protocol.as_str() {
        "tcp" | "udp" => {
            if let Some(ports) = rule.ports.as_deref() {
                apply_ports(&mut translated, ports).map_err(|reason| {
                    RecipeError::InvalidSecurityGroupRule {
                        guid: group.guid.clone(),
                        reason,
                    }
                })?;
            }
        }
        "icmp" => {
            let (Some(icmp_type), Some(code)) = (rule.icmp_type, rule.code) else {
                return Err(RecipeError::InvalidSecurityGroupRule {
                    guid: group.guid.clone(),
                    reason: "icmp rules require type and code".to_string(),
                });
            };
            translated.icmp_info = Some(IcmpInfo { icmp_type, code });
        }
        _ => {}
    }

    Ok(translated)
}

fn apply_ports(rule: &mut EgressRule, ports: &str) -> std::result::Result<(), String> {
    let ports = ports.trim();
    if let Some((start, end)) = ports.split_once('-') {
        let start = parse_port(start)?;
        let end = parse_port(end)?;
        if start > end {
            return Err(format!("port range {} is reversed", ports));
        }
        rule.port_range = Some(PortRange { start, end });
        return Ok(());
    }

    rule.ports = ports
        .split(',')
        .map(parse_port)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(())
}

fn parse_port(raw: &str) -> std::result::Result<u32, String> {
    let raw = raw.trim();
    match raw.parse::<u32>() {
        Ok(port) if (1..=65535).contains(&port) => Ok(port),
        _ => Err(format!("invalid port: {}", raw)),
    }
}
