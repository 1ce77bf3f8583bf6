// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use super::config::get_config;
use super::resolve::resolve_stack_to_layers;
use crate::prelude::*;
use crate::{runtime, tracking, Error, Result};

static SPFS_RUNTIME: &str = "SPFS_RUNTIME";

/// Calculate the file manifest for the layers in the given runtime.
///
/// The returned manifest DOES NOT include any active changes to the runtime.
pub async fn compute_runtime_manifest(rt: &runtime::Runtime) -> Result<tracking::Manifest> {
    let config = get_config()?;
    let repo = config.get_repository().await?;

    let layers = resolve_stack_to_layers(rt.get_stack().iter(), None).await?;
    let mut manifest = tracking::Manifest::default();
    for layer in layers.iter().rev() {
        manifest.update(&repo.read_manifest(layer.manifest).await?.unlock())
    }
    Ok(manifest)
}

/// Return the currently active runtime.
///
/// The active runtime is identified by the `SPFS_RUNTIME` environment
/// variable, which is set by the external process that enters the
/// mounted environment.
pub async fn active_runtime() -> Result<runtime::Runtime> {
    let name = std::env::var(SPFS_RUNTIME).map_err(|_| Error::NoRuntime)?;
    let config = get_config()?;
    let storage = config.get_runtime_storage().await?;
    storage.read_runtime(name).await
}
