// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Provider-reported lifecycle state of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterStatus {
    Starting,
    Bootstrapping,
    Running,
    Waiting,
    Terminating,
    Terminated,
    TerminatedWithErrors,
    Other(String),
}

/// Statuses in which a cluster counts as "still running/starting". Used both
/// for name-based lookup eligibility and for the monitor's timeout decision.
pub const ACTIVATED_STATUSES: [ClusterStatus; 4] = [
    ClusterStatus::Starting,
    ClusterStatus::Bootstrapping,
    ClusterStatus::Running,
    ClusterStatus::Waiting,
];

impl ClusterStatus {
    pub fn is_active(&self) -> bool {
        ACTIVATED_STATUSES.contains(self)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "STARTING",
            Self::Bootstrapping => "BOOTSTRAPPING",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
            Self::TerminatedWithErrors => "TERMINATED_WITH_ERRORS",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "STARTING" => Self::Starting,
            "BOOTSTRAPPING" => Self::Bootstrapping,
            "RUNNING" => Self::Running,
            "WAITING" => Self::Waiting,
            "TERMINATING" => Self::Terminating,
            "TERMINATED" => Self::Terminated,
            "TERMINATED_WITH_ERRORS" => Self::TerminatedWithErrors,
            other => Self::Other(other.to_string()),
        })
    }
}

/// Provider-reported state of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
    Interrupted,
    Other(String),
}

impl StepStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Interrupted => "INTERRUPTED",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cluster as reported by the provider. Ephemeral: re-fetched on every
/// query, never cached beyond a single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    pub id: String,
    pub name: String,
    pub status: ClusterStatus,
}

/// One step's state as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepState {
    pub name: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRole {
    Master,
    Core,
}

/// Pricing/availability mode for an instance group. Spot carries the bid
/// price as the provider expects it: a plain decimal string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Market {
    OnDemand,
    Spot { bid_price: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceGroupSpec {
    pub role: InstanceRole,
    pub instance_type: String,
    pub instance_count: i32,
    pub market: Market,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancesSpec {
    pub subnet_id: Option<String>,
    pub key_name: Option<String>,
    pub additional_security_group_ids: Vec<String>,
    pub instance_groups: Vec<InstanceGroupSpec>,
    /// True for long-lived clusters; false makes the provider auto-terminate
    /// the cluster once all steps finish.
    pub keep_alive_when_idle: bool,
}

/// A provider-side configuration entry (classification plus properties).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    pub classification: String,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOnFailure {
    /// Sibling steps keep running after one fails; the cluster itself is not
    /// torn down by a failing step.
    Continue,
}

/// A unit of work submitted to a cluster: a shell command run through the
/// provider's command runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub name: String,
    pub action_on_failure: ActionOnFailure,
    pub command: Vec<String>,
}

/// Immutable request payload for cluster creation, built once per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCreationSpec {
    pub name: String,
    pub release_label: String,
    pub applications: Vec<String>,
    pub service_role: String,
    pub instance_role: String,
    pub log_uri: Option<String>,
    pub configurations: Vec<ProviderConfig>,
    pub instances: InstancesSpec,
    pub steps: Vec<StepSpec>,
}

/// Declarative cluster settings, as loaded from the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSettings {
    /// Name given to created clusters and used for attach-vs-create lookup.
    pub name: String,
    pub release_label: String,
    #[serde(default = "default_applications")]
    pub applications: Vec<String>,
    pub service_role: String,
    pub instance_role: String,
    pub log_uri: Option<String>,
    pub subnet_id: Option<String>,
    pub key_name: Option<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    pub instance_type: String,
    #[serde(default = "default_instance_count")]
    pub instance_count: i32,
    /// Present means spot instances with this bid; absent means on-demand.
    pub bid_price: Option<f64>,
    #[serde(default)]
    pub configurations: Vec<ProviderConfig>,
}

fn default_applications() -> Vec<String> {
    vec!["Spark".to_string()]
}

fn default_instance_count() -> i32 {
    1
}

/// Declarative job-deployment settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySettings {
    pub artifact_bucket: String,
    pub artifact_key: String,
    pub main_class: String,
    #[serde(default)]
    pub conf: BTreeMap<String, String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl DeploySettings {
    pub fn artifact_location(&self) -> String {
        format!("s3://{}/{}", self.artifact_bucket, self.artifact_key)
    }
}

/// Where a submitted job ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Cluster that now owns the step.
    pub cluster_id: String,
    /// True if the step was attached to an existing cluster, false if a fresh
    /// ephemeral cluster was created for it.
    pub attached: bool,
}
