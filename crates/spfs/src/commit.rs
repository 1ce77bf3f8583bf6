// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use super::config::get_config;
use crate::prelude::*;
use crate::{encoding, graph, runtime, tracking, Error, Result};

#[cfg(test)]
#[path = "./commit_test.rs"]
mod commit_test;

/// Commit a local file system directory to this storage.
///
/// This collects all files to store as blobs and maintains a
/// render of the manifest for use immediately.
pub async fn commit_dir<P>(repo: Arc<storage::RepositoryHandle>, path: P) -> Result<tracking::Manifest>
where
    P: AsRef<Path>,
{
    let path = tokio::fs::canonicalize(path).await?;
    let manifest = {
        let hash_repo = Arc::clone(&repo);
        let mut builder = tracking::ManifestBuilder::new(
            move |reader: Pin<Box<dyn tokio::io::AsyncRead + Send + Sync + 'static>>| {
                let repo = Arc::clone(&hash_repo);
                async move { repo.commit_blob(reader).await }
            },
        );
        tracing::info!("committing files");
        builder.compute_manifest(path).await?
    };

    tracing::info!("writing manifest");
    let storable = graph::Manifest::from(&manifest);
    repo.write_object(&graph::Object::Manifest(storable))
        .await?;
    for node in manifest.walk() {
        if !node.entry.kind.is_blob() {
            continue;
        }
        let blob = graph::Blob {
            payload: node.entry.object,
            size: node.entry.size,
        };
        repo.write_object(&graph::Object::Blob(blob)).await?;
    }

    Ok(manifest)
}

/// Commit the working file changes of a runtime to a new layer.
pub async fn commit_layer(runtime: &mut runtime::Runtime) -> Result<graph::Layer> {
    let config = get_config()?;
    let repo: Arc<storage::RepositoryHandle> = Arc::new(config.get_repository().await?.into());
    let manifest = commit_dir(Arc::clone(&repo), runtime.config.upper_dir.as_path()).await?;
    if manifest.is_empty() {
        return Err(Error::NothingToCommit);
    }
    let storable = graph::Manifest::from(&manifest);
    let digest = storable.digest()?;
    repo.write_object(&graph::Object::Manifest(storable))
        .await?;
    let layer = graph::Layer { manifest: digest };
    repo.write_object(&graph::Object::Layer(layer.clone()))
        .await?;
    runtime.push_digest(&layer.digest()?).await?;
    runtime.set_editable(false).await?;
    // Reflecting this change in the live mount namespace is the
    // responsibility of the runtime's external mount collaborator.
    Ok(layer)
}

/// Commit the full layer stack and working files to a new platform.
pub async fn commit_platform(runtime: &mut runtime::Runtime) -> Result<graph::Platform> {
    let config = get_config()?;
    let repo: storage::RepositoryHandle = config.get_repository().await?.into();

    match commit_layer(runtime).await {
        Ok(_) | Err(Error::NothingToCommit) => (),
        Err(err) => return Err(err),
    }

    let stack = runtime.get_stack();
    if stack.is_empty() {
        return Err(Error::NothingToCommit);
    }
    let platform = graph::Platform::new(&mut stack.iter().copied())?;
    repo.write_object(&graph::Object::Platform(platform.clone()))
        .await?;
    Ok(platform)
}
