// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! S3 adapter for the artifact store boundary.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::sync::OnceCell;

use crate::app::errors::{AppError, AppResult};
use crate::app::ports::ArtifactStorePort;

#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

pub struct S3Adapter {
    config: S3Config,
    client: OnceCell<Client>,
}

impl S3Adapter {
    pub fn new(config: S3Config) -> Self {
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
impl ArtifactStorePort for S3Adapter {
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> AppResult<()> {
        let client = self.get_client().await?;
        let body = ByteStream::from_path(local_path).await.map_err(|err| {
            AppError::invalid_argument(format!(
                "failed to read artifact {}: {err}",
                local_path.display()
            ))
        })?;
        client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|err| AppError::remote(format!("artifact upload failed: {err}")))?;
        Ok(())
    }
}
