// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt, TryStreamExt};
use tokio::sync::Semaphore;

use crate::{encoding, graph, prelude::*, storage, Error, Result};

#[cfg(test)]
#[path = "./clean_test.rs"]
mod clean_test;

/// Clean all untagged objects from the given repo.
pub async fn clean_untagged_objects(repo: &storage::RepositoryHandle) -> Result<()> {
    let unattached = get_all_unattached_objects(repo).await?;
    if unattached.is_empty() {
        tracing::info!("nothing to clean!");
        return Ok(());
    }
    tracing::info!("removing orphaned data");
    let count = unattached.len();
    purge_objects(&unattached.iter().collect::<Vec<_>>(), repo).await?;
    tracing::info!("cleaned {count} objects");
    Ok(())
}

/// Remove the identified objects from the given repository.
///
/// For each digest, attempts to remove the corresponding object, payload,
/// and render, tolerating each one not existing. Work is spread across a
/// bounded pool of concurrent tasks.
pub async fn purge_objects(
    objects: &[&encoding::Digest],
    repo: &storage::RepositoryHandle,
) -> Result<()> {
    let pool_size = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1);
    let semaphore = Arc::new(Semaphore::new(pool_size));

    let style = indicatif::ProgressStyle::default_bar()
        .template("       {msg:<21} [{bar:40}] {pos:>7}/{len:7}")
        .progress_chars("=>-");
    let bar = indicatif::ProgressBar::new(objects.len() as u64).with_style(style);
    bar.set_message("cleaning objects");

    let mut errors = Vec::new();
    let mut futures: FuturesUnordered<_> = objects
        .iter()
        .map(|digest| {
            let digest = **digest;
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await;
                purge_one(repo, digest).await
            }
        })
        .collect();

    while let Some(result) = futures.next().await {
        bar.inc(1);
        if let Err(err) = result {
            errors.push(err);
        }
    }
    bar.finish();

    match errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn purge_one(repo: &storage::RepositoryHandle, digest: encoding::Digest) -> Result<()> {
    match repo.remove_object(digest).await {
        Ok(()) | Err(Error::UnknownObject(_)) => {}
        Err(err) => return Err(err),
    }
    match repo.remove_payload(digest).await {
        Ok(()) | Err(Error::UnknownObject(_)) => {}
        Err(err) => return Err(err),
    }
    if let Ok(renders) = repo.renders() {
        match renders.remove_rendered_manifest(digest).await {
            Ok(()) | Err(Error::UnknownObject(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Find all objects not attached to a tag in the given repo.
pub async fn get_all_unattached_objects(
    repo: &storage::RepositoryHandle,
) -> Result<HashSet<encoding::Digest>> {
    tracing::info!("evaluating repository digraph");
    let digests: HashSet<_> = repo
        .find_digests(graph::DigestSearchCriteria::All)
        .try_collect()
        .await?;
    let attached = get_all_attached_objects(repo).await?;
    Ok(digests.difference(&attached).copied().collect())
}

/// Find all payloads that are not attached to any blob in the given repo.
pub async fn get_all_unattached_payloads(
    repo: &storage::RepositoryHandle,
) -> Result<HashSet<encoding::Digest>> {
    tracing::info!("searching for orphaned payloads");
    let mut orphaned_payloads = HashSet::new();
    let mut digests = repo.iter_payload_digests();
    while let Some(digest) = digests.next().await {
        let digest = digest?;
        match repo.read_blob(&digest).await {
            Err(Error::UnknownObject(_)) => {
                orphaned_payloads.insert(digest);
            }
            Err(err) => return Err(err),
            Ok(_) => continue,
        }
    }
    Ok(orphaned_payloads)
}

/// Walk all tags in the given repo and return the set of every object
/// reachable from a tagged target.
pub async fn get_all_attached_objects(
    repo: &storage::RepositoryHandle,
) -> Result<HashSet<encoding::Digest>> {
    let mut to_process = Vec::new();
    let mut streams = repo.iter_tag_streams();
    while let Some(item) = streams.next().await {
        let (_, mut stream) = item?;
        while let Some(tag) = stream.next().await {
            to_process.push(tag?.target);
        }
    }

    let mut reachable_objects = HashSet::new();
    while let Some(digest) = to_process.pop() {
        if reachable_objects.contains(&digest) {
            continue;
        }
        tracing::debug!(?digest, "walking");
        let obj = match repo.read_object(digest).await {
            Ok(obj) => obj,
            Err(Error::UnknownObject(err)) => {
                tracing::warn!(?err, "child object missing in database");
                continue;
            }
            Err(err) => return Err(err),
        };
        to_process.extend(obj.child_objects());
        reachable_objects.insert(digest);
    }

    Ok(reachable_objects)
}
