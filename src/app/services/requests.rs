// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Pure translation of declarative settings into immutable provider request
//! structures. No I/O, deterministic given inputs.

use crate::app::errors::{AppError, AppResult};
use crate::app::types::{
    ClusterCreationSpec, InstanceGroupSpec, InstanceRole, InstancesSpec, Market, ProviderConfig,
    StepSpec,
};

/// Build the instance groups for a cluster: one master, plus a core group
/// only when more than one instance was requested.
pub fn build_instance_groups(
    instance_count: i32,
    instance_type: &str,
    bid_price: Option<f64>,
) -> AppResult<Vec<InstanceGroupSpec>> {
    if instance_count < 1 {
        return Err(AppError::invalid_argument(format!(
            "instance count must be at least 1, got {instance_count}"
        )));
    }
    let market = match bid_price {
        Some(bid) => Market::Spot {
            bid_price: format_bid_price(bid),
        },
        None => Market::OnDemand,
    };

    let mut groups = vec![InstanceGroupSpec {
        role: InstanceRole::Master,
        instance_type: instance_type.to_string(),
        instance_count: 1,
        market: market.clone(),
    }];
    let core_count = instance_count - 1;
    if core_count > 0 {
        groups.push(InstanceGroupSpec {
            role: InstanceRole::Core,
            instance_type: instance_type.to_string(),
            instance_count: core_count,
            market,
        });
    }
    Ok(groups)
}

pub fn build_instances_spec(
    subnet_id: Option<String>,
    key_name: Option<String>,
    additional_security_group_ids: Vec<String>,
    instance_groups: Vec<InstanceGroupSpec>,
    keep_alive_when_idle: bool,
) -> InstancesSpec {
    InstancesSpec {
        subnet_id: non_empty(subnet_id),
        key_name: non_empty(key_name),
        additional_security_group_ids,
        instance_groups,
        keep_alive_when_idle,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn build_creation_spec(
    name: &str,
    release_label: &str,
    applications: &[String],
    service_role: &str,
    instance_role: &str,
    log_uri: Option<String>,
    configurations: Vec<ProviderConfig>,
    instances: InstancesSpec,
    steps: Vec<StepSpec>,
) -> ClusterCreationSpec {
    ClusterCreationSpec {
        name: name.to_string(),
        release_label: release_label.to_string(),
        applications: applications.to_vec(),
        service_role: service_role.to_string(),
        instance_role: instance_role.to_string(),
        log_uri: non_empty(log_uri),
        configurations,
        instances,
        steps,
    }
}

/// Decimal string form the provider expects, e.g. `0.5`.
fn format_bid_price(bid: f64) -> String {
    format!("{bid}")
}

// An empty optional must stay absent from the request; the provider treats
// empty strings as values.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
