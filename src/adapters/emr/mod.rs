// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! EMR adapter for the cluster provider boundary.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_emr::config::Region;
use aws_sdk_emr::operation::describe_cluster::DescribeClusterError;
use aws_sdk_emr::types::{
    Application, ClusterState, Configuration, HadoopJarStepConfig, InstanceGroupConfig,
    InstanceRoleType, JobFlowInstancesConfig, MarketType, StepConfig,
};
use aws_sdk_emr::Client;
use tokio::sync::OnceCell;

use crate::app::errors::{AppError, AppResult};
use crate::app::ports::ClusterProviderPort;
use crate::app::types::{
    ActionOnFailure, ClusterCreationSpec, ClusterHandle, ClusterStatus, InstanceGroupSpec,
    InstanceRole, Market, ProviderConfig, StepSpec, StepState, StepStatus,
};

/// Steps run through the provider's command runner.
const COMMAND_RUNNER_JAR: &str = "command-runner.jar";

#[derive(Debug, Clone, Default)]
pub struct EmrConfig {
    /// AWS region; falls back to the credential chain default when unset.
    pub region: Option<String>,
    /// Custom endpoint URL, useful for local stacks.
    pub endpoint_url: Option<String>,
}

pub struct EmrAdapter {
    config: EmrConfig,
    client: OnceCell<Client>,
}

impl EmrAdapter {
    pub fn new(config: EmrConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn get_client(&self) -> AppResult<&Client> {
        self.client
            .get_or_try_init(|| async {
                let mut config_loader = aws_config::defaults(BehaviorVersion::latest());
                if let Some(region) = &self.config.region {
                    config_loader = config_loader.region(Region::new(region.clone()));
                }
                if let Some(endpoint) = &self.config.endpoint_url {
                    config_loader = config_loader.endpoint_url(endpoint);
                }
                let sdk_config = config_loader.load().await;
                Ok(Client::new(&sdk_config))
            })
            .await
    }
}

#[async_trait]
impl ClusterProviderPort for EmrAdapter {
    async fn list_clusters(&self, states: &[ClusterStatus]) -> AppResult<Vec<ClusterHandle>> {
        let client = self.get_client().await?;
        let response = client
            .list_clusters()
            .set_cluster_states(Some(states.iter().map(cluster_state).collect()))
            .send()
            .await
            .map_err(remote_error)?;

        Ok(response
            .clusters()
            .iter()
            .filter_map(|summary| {
                Some(ClusterHandle {
                    id: summary.id()?.to_string(),
                    name: summary.name()?.to_string(),
                    status: summary
                        .status()
                        .and_then(|status| status.state())
                        .map(cluster_status)
                        .unwrap_or_else(|| ClusterStatus::Other("UNKNOWN".to_string())),
                })
            })
            .collect())
    }

    async fn describe_cluster(&self, cluster_id: &str) -> AppResult<ClusterHandle> {
        let client = self.get_client().await?;
        let response = client
            .describe_cluster()
            .cluster_id(cluster_id)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if is_unknown_cluster(service_err) => {
                    AppError::not_found(format!("cluster {cluster_id} not found"))
                }
                _ => remote_error(err),
            })?;
        let cluster = response
            .cluster()
            .ok_or_else(|| AppError::not_found(format!("cluster {cluster_id} not found")))?;
        Ok(ClusterHandle {
            id: cluster.id().unwrap_or(cluster_id).to_string(),
            name: cluster.name().unwrap_or_default().to_string(),
            status: cluster
                .status()
                .and_then(|status| status.state())
                .map(cluster_status)
                .unwrap_or_else(|| ClusterStatus::Other("UNKNOWN".to_string())),
        })
    }

    async fn create_cluster(&self, spec: &ClusterCreationSpec) -> AppResult<String> {
        let client = self.get_client().await?;
        let mut request = client
            .run_job_flow()
            .name(&spec.name)
            .release_label(&spec.release_label)
            .service_role(&spec.service_role)
            .job_flow_role(&spec.instance_role)
            .set_log_uri(spec.log_uri.clone())
            .instances(instances_config(&spec.instances)?);
        for application in &spec.applications {
            request = request.applications(Application::builder().name(application).build());
        }
        for configuration in &spec.configurations {
            request = request.configurations(provider_configuration(configuration));
        }
        for step in &spec.steps {
            request = request.steps(step_config(step)?);
        }
        let response = request.send().await.map_err(remote_error)?;
        response
            .job_flow_id()
            .map(str::to_string)
            .ok_or_else(|| AppError::remote("provider returned no cluster id"))
    }

    async fn add_steps(&self, cluster_id: &str, steps: &[StepSpec]) -> AppResult<()> {
        let client = self.get_client().await?;
        let mut request = client.add_job_flow_steps().job_flow_id(cluster_id);
        for step in steps {
            request = request.steps(step_config(step)?);
        }
        request.send().await.map_err(remote_error)?;
        Ok(())
    }

    async fn list_steps(&self, cluster_id: &str) -> AppResult<Vec<StepState>> {
        let client = self.get_client().await?;
        let response = client
            .list_steps()
            .cluster_id(cluster_id)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(response
            .steps()
            .iter()
            .map(|summary| StepState {
                name: summary.name().unwrap_or_default().to_string(),
                status: summary
                    .status()
                    .and_then(|status| status.state())
                    .map(step_status)
                    .unwrap_or_else(|| StepStatus::Other("UNKNOWN".to_string())),
            })
            .collect())
    }

    async fn terminate_cluster(&self, cluster_id: &str) -> AppResult<()> {
        let client = self.get_client().await?;
        client
            .terminate_job_flows()
            .job_flow_ids(cluster_id)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }
}

fn instances_config(
    instances: &crate::app::types::InstancesSpec,
) -> AppResult<JobFlowInstancesConfig> {
    let mut builder = JobFlowInstancesConfig::builder()
        .set_ec2_subnet_id(instances.subnet_id.clone())
        .set_ec2_key_name(instances.key_name.clone())
        .keep_job_flow_alive_when_no_steps(instances.keep_alive_when_idle);
    if !instances.additional_security_group_ids.is_empty() {
        // The ids apply cluster-wide, so master and worker nodes both get
        // them; otherwise executors on multi-node clusters lose the access
        // the groups grant.
        builder = builder
            .set_additional_master_security_groups(Some(
                instances.additional_security_group_ids.clone(),
            ))
            .set_additional_slave_security_groups(Some(
                instances.additional_security_group_ids.clone(),
            ));
    }
    for group in &instances.instance_groups {
        builder = builder.instance_groups(instance_group_config(group)?);
    }
    Ok(builder.build())
}

fn instance_group_config(group: &InstanceGroupSpec) -> AppResult<InstanceGroupConfig> {
    let mut builder = InstanceGroupConfig::builder()
        .instance_role(match group.role {
            InstanceRole::Master => InstanceRoleType::Master,
            InstanceRole::Core => InstanceRoleType::Core,
        })
        .instance_type(&group.instance_type)
        .instance_count(group.instance_count);
    builder = match &group.market {
        Market::OnDemand => builder.market(MarketType::OnDemand),
        Market::Spot { bid_price } => builder.market(MarketType::Spot).bid_price(bid_price),
    };
    Ok(builder.build())
}

fn step_config(step: &StepSpec) -> AppResult<StepConfig> {
    let hadoop_step = HadoopJarStepConfig::builder()
        .jar(COMMAND_RUNNER_JAR)
        .set_args(Some(step.command.clone()))
        .build();
    Ok(StepConfig::builder()
        .name(&step.name)
        .action_on_failure(match step.action_on_failure {
            ActionOnFailure::Continue => aws_sdk_emr::types::ActionOnFailure::Continue,
        })
        .hadoop_jar_step(hadoop_step)
        .build())
}

fn provider_configuration(config: &ProviderConfig) -> Configuration {
    let mut builder = Configuration::builder().classification(&config.classification);
    for (key, value) in &config.properties {
        builder = builder.properties(key.clone(), value.clone());
    }
    builder.build()
}

fn cluster_state(status: &ClusterStatus) -> ClusterState {
    match status {
        ClusterStatus::Starting => ClusterState::Starting,
        ClusterStatus::Bootstrapping => ClusterState::Bootstrapping,
        ClusterStatus::Running => ClusterState::Running,
        ClusterStatus::Waiting => ClusterState::Waiting,
        ClusterStatus::Terminating => ClusterState::Terminating,
        ClusterStatus::Terminated => ClusterState::Terminated,
        ClusterStatus::TerminatedWithErrors => ClusterState::TerminatedWithErrors,
        ClusterStatus::Other(value) => ClusterState::from(value.as_str()),
    }
}

fn cluster_status(state: &ClusterState) -> ClusterStatus {
    match state {
        ClusterState::Starting => ClusterStatus::Starting,
        ClusterState::Bootstrapping => ClusterStatus::Bootstrapping,
        ClusterState::Running => ClusterStatus::Running,
        ClusterState::Waiting => ClusterStatus::Waiting,
        ClusterState::Terminating => ClusterStatus::Terminating,
        ClusterState::Terminated => ClusterStatus::Terminated,
        ClusterState::TerminatedWithErrors => ClusterStatus::TerminatedWithErrors,
        other => ClusterStatus::Other(other.as_str().to_string()),
    }
}

fn step_status(state: &aws_sdk_emr::types::StepState) -> StepStatus {
    use aws_sdk_emr::types::StepState as SdkStepState;
    match state {
        SdkStepState::Pending => StepStatus::Pending,
        SdkStepState::Running => StepStatus::Running,
        SdkStepState::Completed => StepStatus::Completed,
        SdkStepState::Cancelled => StepStatus::Cancelled,
        SdkStepState::Failed => StepStatus::Failed,
        SdkStepState::Interrupted => StepStatus::Interrupted,
        other => StepStatus::Other(other.as_str().to_string()),
    }
}

// DescribeCluster signals an unknown or malformed id as an invalid-request
// service error rather than an empty body.
fn is_unknown_cluster(err: &DescribeClusterError) -> bool {
    err.is_invalid_request_exception()
}

fn remote_error<E>(err: E) -> AppError
where
    E: std::error::Error,
{
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message = format!("{message}: {inner}");
        source = inner.source();
    }
    AppError::remote(message)
}
