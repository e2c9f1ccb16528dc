// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::AppResult;
use crate::app::types::{ClusterCreationSpec, ClusterHandle, ClusterStatus, StepSpec, StepState};

/// Boundary to the cloud cluster-orchestration service. Transport failures
/// surface as `Remote` errors; this layer never retries.
#[async_trait]
pub trait ClusterProviderPort: Send + Sync {
    /// List clusters currently in one of the given states, in provider order.
    async fn list_clusters(&self, states: &[ClusterStatus]) -> AppResult<Vec<ClusterHandle>>;
    async fn describe_cluster(&self, cluster_id: &str) -> AppResult<ClusterHandle>;
    /// Returns the id of the created cluster.
    async fn create_cluster(&self, spec: &ClusterCreationSpec) -> AppResult<String>;
    async fn add_steps(&self, cluster_id: &str, steps: &[StepSpec]) -> AppResult<()>;
    async fn list_steps(&self, cluster_id: &str) -> AppResult<Vec<StepState>>;
    async fn terminate_cluster(&self, cluster_id: &str) -> AppResult<()>;
}
