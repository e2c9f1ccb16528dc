// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::path::Path;

use async_trait::async_trait;

use crate::app::errors::AppResult;

/// Blob storage boundary for job artifacts. The core only needs the
/// resulting addressable location string, which the caller derives from
/// bucket and key.
#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> AppResult<()>;
}
