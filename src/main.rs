// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use serde_json::{json, Value};
use tokio::sync::watch;

use cumulus::adapters::emr::{EmrAdapter, EmrConfig};
use cumulus::adapters::s3::{S3Adapter, S3Config};
use cumulus::adapters::time::SystemClock;
use cumulus::app::errors::AppErrorKind;
use cumulus::app::types::ClusterHandle;
use cumulus::app::usecases::UseCases;
use cumulus::args::{Cli, ClusterCmd, Cmd, JobCmd};
use cumulus::{config, logging};

const CLUSTER_ID_ENV: &str = "CUMULUS_CLUSTER_ID";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = config::load(cli.config)?;
    tracing::debug!("config loaded from {}", config.config_path.display());

    let provider = Arc::new(EmrAdapter::new(EmrConfig {
        region: config.provider.region.clone(),
        endpoint_url: config.provider.endpoint_url.clone(),
    }));
    let artifacts = Arc::new(S3Adapter::new(S3Config {
        region: config.provider.region.clone(),
        endpoint_url: config.provider.endpoint_url.clone(),
    }));
    let usecases = UseCases::new(provider, artifacts, Arc::new(SystemClock::new()));

    match cli.cmd {
        Cmd::Cluster(cluster_args) => match cluster_args.cmd {
            ClusterCmd::Create => {
                let cluster_id = usecases.create_cluster(&config.cluster).await?;
                println!("Cluster '{}' is starting: {}", config.cluster.name, cluster_id);
                println!("Bind it with: export {CLUSTER_ID_ENV}={cluster_id}");
            }
            ClusterCmd::List(args) => {
                let clusters = usecases.list_active_clusters().await?;
                if args.json {
                    let data: Vec<Value> = clusters.iter().map(cluster_to_json).collect();
                    println!("{}", serde_json::to_string_pretty(&Value::Array(data))?);
                } else if clusters.is_empty() {
                    println!("No active clusters.");
                } else {
                    for cluster in &clusters {
                        println!(
                            "{}  {}  {}",
                            cluster.id, cluster.status, cluster.name
                        );
                    }
                }
            }
            ClusterCmd::Status(args) => {
                let cluster_id = resolve_cluster_id(args.cluster_id)?;
                match usecases.cluster_status(&cluster_id).await {
                    Ok(cluster) => {
                        if args.json {
                            println!(
                                "{}",
                                serde_json::to_string_pretty(&cluster_to_json(&cluster))?
                            );
                        } else {
                            println!("{}  {}  {}", cluster.id, cluster.status, cluster.name);
                        }
                    }
                    Err(err) if err.kind() == AppErrorKind::NotFound => {
                        println!("No active cluster with id {cluster_id}.");
                    }
                    Err(err) => bail!(err),
                }
            }
            ClusterCmd::Bind(args) => {
                let cluster = usecases.bind_cluster(&args.cluster_id).await?;
                println!(
                    "Cluster {} ('{}', {}) is active.",
                    cluster.id, cluster.name, cluster.status
                );
                println!("Bind it with: export {CLUSTER_ID_ENV}={}", cluster.id);
            }
            ClusterCmd::Terminate(args) => {
                let cluster_id = resolve_cluster_id(args.cluster_id)?;
                if !args.yes {
                    let confirmed = confirm_action(&format!(
                        "Terminate cluster {cluster_id}? (yes/no): "
                    ))?;
                    if !confirmed {
                        println!("Termination canceled.");
                        return Ok(());
                    }
                }
                usecases.terminate_cluster(&cluster_id).await?;
                println!("Termination of cluster {cluster_id} requested.");
            }
        },
        Cmd::Job(job_args) => match job_args.cmd {
            JobCmd::Submit(args) => {
                if let Some(artifact) = args.artifact.as_deref() {
                    let location = usecases.upload_artifact(&config.deploy, artifact).await?;
                    println!("Artifact uploaded to {location}");
                }
                let target_name = args
                    .cluster_name
                    .unwrap_or_else(|| config.cluster.name.clone());
                let mut job_args = config.deploy.args.clone();
                job_args.extend(args.args.iter().cloned());
                let outcome = usecases
                    .submit_job(&config.cluster, &config.deploy, &target_name, &job_args)
                    .await?;
                if outcome.attached {
                    println!(
                        "Step added to running cluster '{}': {}",
                        target_name, outcome.cluster_id
                    );
                } else {
                    println!(
                        "Ephemeral cluster created for '{}': {}",
                        target_name, outcome.cluster_id
                    );
                }
                if args.wait {
                    let timeout = args.timeout_secs.unwrap_or(config.monitor_timeout_secs);
                    run_monitor(&usecases, &outcome.cluster_id, timeout).await?;
                }
            }
        },
        Cmd::Monitor(args) => {
            let cluster_id = resolve_cluster_id(args.cluster_id)?;
            let timeout = args.timeout_secs.unwrap_or(config.monitor_timeout_secs);
            run_monitor(&usecases, &cluster_id, timeout).await?;
        }
    }
    Ok(())
}

async fn run_monitor(usecases: &UseCases, cluster_id: &str, timeout_secs: u64) -> anyhow::Result<()> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });
    usecases
        .monitor(cluster_id, Duration::from_secs(timeout_secs), cancel_rx)
        .await?;
    println!("Cluster {cluster_id} finished with all steps completed.");
    Ok(())
}

fn resolve_cluster_id(flag: Option<String>) -> anyhow::Result<String> {
    if let Some(id) = flag {
        return Ok(id);
    }
    match std::env::var(CLUSTER_ID_ENV) {
        Ok(id) if !id.trim().is_empty() => Ok(id),
        _ => bail!(
            "no cluster id given; pass --cluster-id or set {CLUSTER_ID_ENV} (see 'cluster bind')"
        ),
    }
}

fn confirm_action(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}

fn cluster_to_json(cluster: &ClusterHandle) -> Value {
    json!({
        "id": cluster.id,
        "name": cluster.name,
        "status": cluster.status.as_str(),
    })
}
