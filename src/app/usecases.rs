// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::app::errors::{AppError, AppResult};
use crate::app::ports::{ArtifactStorePort, ClockPort, ClusterProviderPort};
use crate::app::services::{requests, submit};
use crate::app::types::{
    ClusterHandle, ClusterSettings, DeploySettings, SubmitOutcome, ACTIVATED_STATUSES,
};

/// Fixed interval between monitor polls.
pub const MONITOR_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct UseCases {
    pub(crate) provider: Arc<dyn ClusterProviderPort>,
    pub(crate) artifacts: Arc<dyn ArtifactStorePort>,
    pub(crate) clock: Arc<dyn ClockPort>,
}

impl UseCases {
    pub fn new(
        provider: Arc<dyn ClusterProviderPort>,
        artifacts: Arc<dyn ArtifactStorePort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            provider,
            artifacts,
            clock,
        }
    }

    /// Clusters currently in the activated set, in provider listing order.
    pub async fn list_active_clusters(&self) -> AppResult<Vec<ClusterHandle>> {
        let clusters = self.provider.list_clusters(&ACTIVATED_STATUSES).await?;
        Ok(clusters
            .into_iter()
            .filter(|cluster| cluster.status.is_active())
            .collect())
    }

    /// First active cluster with an exactly equal name, in provider listing
    /// order. Clusters outside the activated set never match, even on an
    /// exact name hit. Provider order is not guaranteed stable, so ties on
    /// name are not deterministic either.
    pub async fn find_active_by_name(&self, name: &str) -> AppResult<Option<ClusterHandle>> {
        let clusters = self.list_active_clusters().await?;
        Ok(clusters.into_iter().find(|cluster| cluster.name == name))
    }

    /// Create a long-lived cluster: keep-alive stays on, no steps attached.
    pub async fn create_cluster(&self, settings: &ClusterSettings) -> AppResult<String> {
        let spec = creation_spec(settings, true, Vec::new())?;
        let cluster_id = self.provider.create_cluster(&spec).await?;
        tracing::info!("cluster created id={} name={}", cluster_id, settings.name);
        Ok(cluster_id)
    }

    /// Validate that an id refers to an active cluster. The bound id itself
    /// is session state owned by the caller; this only reads it.
    pub async fn bind_cluster(&self, cluster_id: &str) -> AppResult<ClusterHandle> {
        let cluster = self.provider.describe_cluster(cluster_id).await?;
        if !cluster.status.is_active() {
            return Err(AppError::not_found(format!(
                "cluster {} is not active (status {})",
                cluster_id, cluster.status
            )));
        }
        Ok(cluster)
    }

    pub async fn cluster_status(&self, cluster_id: &str) -> AppResult<ClusterHandle> {
        self.provider.describe_cluster(cluster_id).await
    }

    pub async fn terminate_cluster(&self, cluster_id: &str) -> AppResult<()> {
        self.provider.terminate_cluster(cluster_id).await?;
        tracing::info!("cluster termination requested id={}", cluster_id);
        Ok(())
    }

    /// Upload the job artifact and return its addressable location.
    pub async fn upload_artifact(
        &self,
        deploy: &DeploySettings,
        local_path: &Path,
    ) -> AppResult<String> {
        self.artifacts
            .put_object(&deploy.artifact_bucket, &deploy.artifact_key, local_path)
            .await?;
        let location = deploy.artifact_location();
        tracing::info!("artifact uploaded to {}", location);
        Ok(location)
    }

    /// Submit one job step. Attaches to the named active cluster when one
    /// exists; otherwise creates a fresh ephemeral cluster carrying the step,
    /// with keep-alive off so the provider tears it down once all steps
    /// finish. Exactly one provider mutation either way.
    pub async fn submit_job(
        &self,
        settings: &ClusterSettings,
        deploy: &DeploySettings,
        target_name: &str,
        args: &[String],
    ) -> AppResult<SubmitOutcome> {
        let step = submit::build_submit_step(
            &deploy.main_class,
            &deploy.artifact_location(),
            &deploy.conf,
            args,
        );

        if let Some(cluster) = self.find_active_by_name(target_name).await? {
            // The existing cluster's keep-alive setting stays untouched; a
            // failing step does not tear the cluster down.
            self.provider.add_steps(&cluster.id, &[step]).await?;
            tracing::info!(
                "step added to running cluster id={} name={}",
                cluster.id,
                cluster.name
            );
            return Ok(SubmitOutcome {
                cluster_id: cluster.id,
                attached: true,
            });
        }

        let spec = creation_spec_named(settings, target_name, false, vec![step])?;
        let cluster_id = self.provider.create_cluster(&spec).await?;
        tracing::info!(
            "ephemeral cluster created for job id={} name={}",
            cluster_id,
            target_name
        );
        Ok(SubmitOutcome {
            cluster_id,
            attached: false,
        })
    }

    /// Poll the cluster until it reaches a terminal condition, the deadline
    /// passes, or the caller cancels. The timeout is a safety net against
    /// runaway clusters: a cluster that already finished on its own is never
    /// terminated here, which avoids racing "finished cleanly" against
    /// "timed out".
    pub async fn monitor(
        &self,
        cluster_id: &str,
        timeout: Duration,
        cancel: watch::Receiver<bool>,
    ) -> AppResult<()> {
        let deadline = self.clock.now_utc() + timeout;
        loop {
            if *cancel.borrow() {
                return Err(AppError::cancelled(format!(
                    "monitoring of cluster {cluster_id} was canceled; the cluster keeps running"
                )));
            }
            let cluster = self.provider.describe_cluster(cluster_id).await?;
            let now = self.clock.now_utc();
            if now >= deadline && cluster.status.is_active() {
                self.provider.terminate_cluster(cluster_id).await?;
                return Err(AppError::timeout(format!(
                    "cluster {cluster_id} was still {} after {}s and has been terminated",
                    cluster.status,
                    timeout.as_secs()
                )));
            }
            if !cluster.status.is_active() {
                let steps = self.provider.list_steps(cluster_id).await?;
                if let Some(step) = steps.iter().find(|step| !step.status.is_completed()) {
                    return Err(AppError::abnormal_termination(format!(
                        "cluster {cluster_id} terminated with step '{}' in state {}",
                        step.name, step.status
                    )));
                }
                tracing::info!(
                    "cluster {} reached {} with all steps completed",
                    cluster_id,
                    cluster.status
                );
                return Ok(());
            }
            tracing::debug!("cluster {} still {}", cluster_id, cluster.status);
            self.clock.sleep(MONITOR_POLL_INTERVAL).await;
        }
    }
}

fn creation_spec(
    settings: &ClusterSettings,
    keep_alive: bool,
    steps: Vec<crate::app::types::StepSpec>,
) -> AppResult<crate::app::types::ClusterCreationSpec> {
    creation_spec_named(settings, &settings.name, keep_alive, steps)
}

fn creation_spec_named(
    settings: &ClusterSettings,
    name: &str,
    keep_alive: bool,
    steps: Vec<crate::app::types::StepSpec>,
) -> AppResult<crate::app::types::ClusterCreationSpec> {
    let groups = requests::build_instance_groups(
        settings.instance_count,
        &settings.instance_type,
        settings.bid_price,
    )?;
    let instances = requests::build_instances_spec(
        settings.subnet_id.clone(),
        settings.key_name.clone(),
        settings.security_group_ids.clone(),
        groups,
        keep_alive,
    );
    Ok(requests::build_creation_spec(
        name,
        &settings.release_label,
        &settings.applications,
        &settings.service_role,
        &settings.instance_role,
        settings.log_uri.clone(),
        settings.configurations.clone(),
        instances,
        steps,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use crate::app::errors::AppErrorKind;
    use crate::app::types::{
        ClusterCreationSpec, ClusterStatus, StepSpec, StepState, StepStatus,
    };

    struct ScriptedProvider {
        active_clusters: Vec<ClusterHandle>,
        describe_results: Mutex<VecDeque<ClusterHandle>>,
        steps: Vec<StepState>,
        create_calls: Mutex<Vec<ClusterCreationSpec>>,
        add_steps_calls: Mutex<Vec<(String, Vec<StepSpec>)>>,
        terminate_calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(active_clusters: Vec<ClusterHandle>) -> Self {
            Self {
                active_clusters,
                describe_results: Mutex::new(VecDeque::new()),
                steps: Vec::new(),
                create_calls: Mutex::new(Vec::new()),
                add_steps_calls: Mutex::new(Vec::new()),
                terminate_calls: Mutex::new(Vec::new()),
            }
        }

        fn with_describe(mut self, statuses: Vec<ClusterStatus>) -> Self {
            let handles = statuses
                .into_iter()
                .map(|status| ClusterHandle {
                    id: "j-MONITORED".to_string(),
                    name: "analytics".to_string(),
                    status,
                })
                .collect();
            self.describe_results = Mutex::new(handles);
            self
        }

        fn with_steps(mut self, steps: Vec<StepState>) -> Self {
            self.steps = steps;
            self
        }

        fn create_calls(&self) -> Vec<ClusterCreationSpec> {
            self.create_calls.lock().expect("create_calls lock").clone()
        }

        fn add_steps_calls(&self) -> Vec<(String, Vec<StepSpec>)> {
            self.add_steps_calls
                .lock()
                .expect("add_steps_calls lock")
                .clone()
        }

        fn terminate_calls(&self) -> Vec<String> {
            self.terminate_calls
                .lock()
                .expect("terminate_calls lock")
                .clone()
        }
    }

    #[async_trait]
    impl ClusterProviderPort for ScriptedProvider {
        async fn list_clusters(
            &self,
            _states: &[ClusterStatus],
        ) -> AppResult<Vec<ClusterHandle>> {
            Ok(self.active_clusters.clone())
        }

        async fn describe_cluster(&self, _cluster_id: &str) -> AppResult<ClusterHandle> {
            self.describe_results
                .lock()
                .expect("describe_results lock")
                .pop_front()
                .ok_or_else(|| AppError::internal("unexpected describe_cluster call"))
        }

        async fn create_cluster(&self, spec: &ClusterCreationSpec) -> AppResult<String> {
            self.create_calls
                .lock()
                .expect("create_calls lock")
                .push(spec.clone());
            Ok("j-CREATED".to_string())
        }

        async fn add_steps(&self, cluster_id: &str, steps: &[StepSpec]) -> AppResult<()> {
            self.add_steps_calls
                .lock()
                .expect("add_steps_calls lock")
                .push((cluster_id.to_string(), steps.to_vec()));
            Ok(())
        }

        async fn list_steps(&self, _cluster_id: &str) -> AppResult<Vec<StepState>> {
            Ok(self.steps.clone())
        }

        async fn terminate_cluster(&self, cluster_id: &str) -> AppResult<()> {
            self.terminate_calls
                .lock()
                .expect("terminate_calls lock")
                .push(cluster_id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct NoopArtifactStore;

    #[async_trait]
    impl ArtifactStorePort for NoopArtifactStore {
        async fn put_object(&self, _bucket: &str, _key: &str, _local_path: &Path) -> AppResult<()> {
            panic!("put_object should not be called in these tests");
        }
    }

    struct RecordingArtifactStore {
        puts: Mutex<Vec<(String, String, PathBuf)>>,
    }

    impl RecordingArtifactStore {
        fn new() -> Self {
            Self {
                puts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ArtifactStorePort for RecordingArtifactStore {
        async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> AppResult<()> {
            self.puts.lock().expect("puts lock").push((
                bucket.to_string(),
                key.to_string(),
                local_path.to_path_buf(),
            ));
            Ok(())
        }
    }

    /// Clock that only moves when the monitor sleeps.
    struct ManualClock {
        now: Mutex<OffsetDateTime>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(OffsetDateTime::UNIX_EPOCH),
            }
        }
    }

    #[async_trait]
    impl ClockPort for ManualClock {
        fn now_utc(&self) -> OffsetDateTime {
            *self.now.lock().expect("now lock")
        }

        async fn sleep(&self, duration: Duration) {
            *self.now.lock().expect("now lock") += duration;
        }
    }

    fn handle(id: &str, name: &str, status: ClusterStatus) -> ClusterHandle {
        ClusterHandle {
            id: id.to_string(),
            name: name.to_string(),
            status,
        }
    }

    fn usecases(provider: Arc<ScriptedProvider>) -> UseCases {
        UseCases::new(
            provider,
            Arc::new(NoopArtifactStore),
            Arc::new(ManualClock::new()),
        )
    }

    fn settings() -> ClusterSettings {
        ClusterSettings {
            name: "analytics".to_string(),
            release_label: "emr-7.1.0".to_string(),
            applications: vec!["Spark".to_string()],
            service_role: "EMR_DefaultRole".to_string(),
            instance_role: "EMR_EC2_DefaultRole".to_string(),
            log_uri: None,
            subnet_id: Some("subnet-0abc".to_string()),
            key_name: None,
            security_group_ids: Vec::new(),
            instance_type: "m5.xlarge".to_string(),
            instance_count: 3,
            bid_price: None,
            configurations: Vec::new(),
        }
    }

    fn deploy() -> DeploySettings {
        DeploySettings {
            artifact_bucket: "builds".to_string(),
            artifact_key: "jobs/app.jar".to_string(),
            main_class: "com.example.Main".to_string(),
            conf: Default::default(),
            args: Vec::new(),
        }
    }

    #[tokio::test]
    async fn find_by_name_skips_clusters_outside_the_activated_set() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            handle("j-1", "analytics", ClusterStatus::Terminated),
            handle("j-2", "analytics", ClusterStatus::Waiting),
            handle("j-3", "analytics", ClusterStatus::Running),
        ]));
        let found = usecases(provider)
            .find_active_by_name("analytics")
            .await
            .unwrap()
            .expect("an active cluster should match");
        // First active entry in listing order wins.
        assert_eq!(found.id, "j-2");
    }

    #[tokio::test]
    async fn find_by_name_misses_when_only_inactive_clusters_share_the_name() {
        let provider = Arc::new(ScriptedProvider::new(vec![handle(
            "j-1",
            "analytics",
            ClusterStatus::TerminatedWithErrors,
        )]));
        let found = usecases(provider)
            .find_active_by_name("analytics")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn submit_attaches_to_an_existing_active_cluster() {
        let provider = Arc::new(ScriptedProvider::new(vec![handle(
            "j-LIVE",
            "analytics",
            ClusterStatus::Waiting,
        )]));
        let outcome = usecases(provider.clone())
            .submit_job(&settings(), &deploy(), "analytics", &[])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome {
                cluster_id: "j-LIVE".to_string(),
                attached: true,
            }
        );
        let add_calls = provider.add_steps_calls();
        assert_eq!(add_calls.len(), 1);
        assert_eq!(add_calls[0].0, "j-LIVE");
        assert_eq!(add_calls[0].1.len(), 1);
        assert!(provider.create_calls().is_empty());
    }

    #[tokio::test]
    async fn submit_creates_an_ephemeral_cluster_when_none_matches() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let outcome = usecases(provider.clone())
            .submit_job(&settings(), &deploy(), "analytics", &["run".to_string()])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome {
                cluster_id: "j-CREATED".to_string(),
                attached: false,
            }
        );
        assert!(provider.add_steps_calls().is_empty());
        let creates = provider.create_calls();
        assert_eq!(creates.len(), 1);
        let spec = &creates[0];
        assert_eq!(spec.name, "analytics");
        assert!(!spec.instances.keep_alive_when_idle);
        assert_eq!(spec.steps.len(), 1);
        assert!(spec.steps[0].command.contains(&"run".to_string()));
    }

    #[tokio::test]
    async fn create_cluster_keeps_a_long_lived_cluster_alive() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let id = usecases(provider.clone())
            .create_cluster(&settings())
            .await
            .unwrap();
        assert_eq!(id, "j-CREATED");
        let creates = provider.create_calls();
        assert_eq!(creates.len(), 1);
        assert!(creates[0].instances.keep_alive_when_idle);
        assert!(creates[0].steps.is_empty());
    }

    #[tokio::test]
    async fn monitor_terminates_and_reports_timeout_when_deadline_passes() {
        let provider = Arc::new(
            ScriptedProvider::new(Vec::new())
                .with_describe(vec![ClusterStatus::Running, ClusterStatus::Running]),
        );
        let (_tx, cancel) = watch::channel(false);
        let err = usecases(provider.clone())
            .monitor("j-MONITORED", Duration::from_secs(4), cancel)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), AppErrorKind::Timeout);
        assert_eq!(provider.terminate_calls(), vec!["j-MONITORED".to_string()]);
    }

    #[tokio::test]
    async fn monitor_reports_abnormal_termination_on_a_failed_step() {
        let provider = Arc::new(
            ScriptedProvider::new(Vec::new())
                .with_describe(vec![ClusterStatus::Terminated])
                .with_steps(vec![
                    StepState {
                        name: "com.example.Main".to_string(),
                        status: StepStatus::Completed,
                    },
                    StepState {
                        name: "com.example.Other".to_string(),
                        status: StepStatus::Failed,
                    },
                ]),
        );
        let (_tx, cancel) = watch::channel(false);
        let err = usecases(provider.clone())
            .monitor("j-MONITORED", Duration::from_secs(60), cancel)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), AppErrorKind::AbnormalTermination);
        assert!(provider.terminate_calls().is_empty());
    }

    #[tokio::test]
    async fn monitor_succeeds_when_the_cluster_finished_all_steps() {
        let provider = Arc::new(
            ScriptedProvider::new(Vec::new())
                .with_describe(vec![ClusterStatus::Terminated])
                .with_steps(vec![StepState {
                    name: "com.example.Main".to_string(),
                    status: StepStatus::Completed,
                }]),
        );
        let (_tx, cancel) = watch::channel(false);
        usecases(provider.clone())
            .monitor("j-MONITORED", Duration::from_secs(60), cancel)
            .await
            .unwrap();
        assert!(provider.terminate_calls().is_empty());
    }

    #[tokio::test]
    async fn monitor_stops_without_terminating_when_canceled() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let (tx, cancel) = watch::channel(false);
        tx.send(true).expect("cancel send");
        let err = usecases(provider.clone())
            .monitor("j-MONITORED", Duration::from_secs(60), cancel)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), AppErrorKind::Cancelled);
        assert!(provider.terminate_calls().is_empty());
    }

    #[tokio::test]
    async fn bind_rejects_clusters_that_are_no_longer_active() {
        let provider = Arc::new(
            ScriptedProvider::new(Vec::new()).with_describe(vec![ClusterStatus::Terminated]),
        );
        let err = usecases(provider)
            .bind_cluster("j-MONITORED")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::NotFound);
    }

    #[tokio::test]
    async fn bind_accepts_an_active_cluster() {
        let provider = Arc::new(
            ScriptedProvider::new(Vec::new()).with_describe(vec![ClusterStatus::Waiting]),
        );
        let cluster = usecases(provider).bind_cluster("j-MONITORED").await.unwrap();
        assert_eq!(cluster.id, "j-MONITORED");
    }

    #[tokio::test]
    async fn upload_artifact_returns_the_blob_location() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let store = Arc::new(RecordingArtifactStore::new());
        let usecases = UseCases::new(provider, store.clone(), Arc::new(ManualClock::new()));
        let location = usecases
            .upload_artifact(&deploy(), Path::new("target/app.jar"))
            .await
            .unwrap();

        assert_eq!(location, "s3://builds/jobs/app.jar");
        let puts = store.puts.lock().expect("puts lock").clone();
        assert_eq!(
            puts,
            vec![(
                "builds".to_string(),
                "jobs/app.jar".to_string(),
                PathBuf::from("target/app.jar"),
            )]
        );
    }
}
