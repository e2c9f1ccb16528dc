// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

pub mod artifact_store;
pub mod clock;
pub mod provider;

pub use artifact_store::ArtifactStorePort;
pub use clock::ClockPort;
pub use provider::ClusterProviderPort;
