// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::PathBuf,
};

use crate::app::types::{ClusterSettings, DeploySettings};

const APP_DIR_NAME: &str = "cumulus";
const CONFIG_FILE_NAME: &str = "cumulus.toml";
const DEFAULT_MONITOR_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProviderSettings {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MonitorSettings {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    provider: ProviderSettings,
    cluster: ClusterSettings,
    deploy: DeploySettings,
    #[serde(default)]
    monitor: MonitorSettings,
}

#[derive(Debug)]
pub struct Config {
    pub provider: ProviderSettings,
    pub cluster: ClusterSettings,
    pub deploy: DeploySettings,
    pub monitor_timeout_secs: u64,
    pub config_path: PathBuf,
}

pub fn load(config_path_override: Option<PathBuf>) -> Result<Config> {
    let config_path = match config_path_override {
        Some(path) => expand_path(path),
        None => default_config_path()?,
    };
    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config file {}", config_path.display()))?;
    let file_config = parse(&contents)
        .with_context(|| format!("failed to parse config file {}", config_path.display()))?;

    Ok(Config {
        provider: file_config.provider,
        cluster: file_config.cluster,
        deploy: file_config.deploy,
        monitor_timeout_secs: file_config
            .monitor
            .timeout_secs
            .unwrap_or(DEFAULT_MONITOR_TIMEOUT_SECS),
        config_path,
    })
}

fn parse(contents: &str) -> Result<FileConfig> {
    let file_config: FileConfig = toml::from_str(contents)?;
    if file_config.cluster.instance_count < 1 {
        anyhow::bail!(
            "cluster.instance_count must be at least 1, got {}",
            file_config.cluster.instance_count
        );
    }
    if file_config.cluster.name.trim().is_empty() {
        anyhow::bail!("cluster.name must not be empty");
    }
    Ok(file_config)
}

fn expand_path(path: PathBuf) -> PathBuf {
    let path_string = path.to_string_lossy().to_string();
    let expanded = shellexpand::tilde(&path_string);
    PathBuf::from(expanded.as_ref())
}

fn default_config_path() -> Result<PathBuf> {
    Ok(default_config_dir()?.join(CONFIG_FILE_NAME))
}

fn default_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("failed to resolve config directory")?;
    Ok(base.join(APP_DIR_NAME))
}
