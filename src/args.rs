// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cumulus", version, about, long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Path to a TOML config file. When omitted, cumulus uses the default config file location."
    )]
    pub config: Option<PathBuf>,
    #[arg(short, long, help = "Enable debug logging.")]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Create, inspect, bind, and terminate clusters.
    Cluster(ClusterArgs),
    /// Submit jobs.
    Job(JobArgs),
    /// Watch a cluster until it finishes, enforcing a timeout.
    Monitor(MonitorArgs),
}

#[derive(Args, Debug)]
pub struct ClusterArgs {
    #[command(subcommand)]
    pub cmd: ClusterCmd,
}

#[derive(Subcommand, Debug)]
pub enum ClusterCmd {
    /// Create a long-lived cluster from the configured settings.
    Create,
    /// List active clusters.
    List(ListClustersArgs),
    /// Show the status of the bound cluster.
    Status(ClusterStatusArgs),
    /// Validate a cluster id for use as the session's bound cluster.
    Bind(BindClusterArgs),
    /// Terminate a cluster.
    Terminate(TerminateClusterArgs),
}

#[derive(Args, Debug)]
pub struct ListClustersArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ClusterStatusArgs {
    /// Cluster id; falls back to the CUMULUS_CLUSTER_ID environment variable.
    #[arg(long, value_name = "ID")]
    pub cluster_id: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BindClusterArgs {
    /// Cluster id to bind for this session.
    pub cluster_id: String,
}

#[derive(Args, Debug)]
pub struct TerminateClusterArgs {
    /// Cluster id; falls back to the CUMULUS_CLUSTER_ID environment variable.
    #[arg(long, value_name = "ID")]
    pub cluster_id: Option<String>,
    /// Skip the confirmation prompt.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct JobArgs {
    #[command(subcommand)]
    pub cmd: JobCmd,
}

#[derive(Subcommand, Debug)]
pub enum JobCmd {
    /// Submit the configured job, attaching to the named cluster when one is
    /// active and creating an ephemeral cluster otherwise.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Target cluster name; defaults to the configured cluster name.
    #[arg(long, value_name = "NAME")]
    pub cluster_name: Option<String>,
    /// Upload this local artifact to the configured location before
    /// submitting.
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<PathBuf>,
    /// Block until the cluster finishes, enforcing the monitor timeout.
    #[arg(long)]
    pub wait: bool,
    /// Monitor timeout in seconds; defaults to the configured value.
    #[arg(long, value_name = "SECS", requires = "wait")]
    pub timeout_secs: Option<u64>,
    /// Extra positional arguments appended to the configured job arguments.
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Cluster id; falls back to the CUMULUS_CLUSTER_ID environment variable.
    #[arg(long, value_name = "ID")]
    pub cluster_id: Option<String>,
    /// Timeout in seconds; defaults to the configured value.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}
