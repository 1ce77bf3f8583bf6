// Copyright (c) Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::collections::HashSet;

use chrono::prelude::*;
use futures::stream::StreamExt;

use crate::{storage, tracking, Result};

#[cfg(test)]
#[path = "./prune_test.rs"]
mod prune_test;

/// Specifies a range of conditions for pruning tags out of a repository.
#[derive(Debug, Default)]
pub(crate) struct PruneParameters {
    pub prune_if_older_than: Option<DateTime<Utc>>,
    pub keep_if_newer_than: Option<DateTime<Utc>>,
    pub prune_if_version_more_than: Option<u64>,
    pub keep_if_version_less_than: Option<u64>,
}

impl PruneParameters {
    pub fn is_empty(&self) -> bool {
        let Self {
            // keep params are irrelevant unless prune options are specified
            keep_if_newer_than: _,
            keep_if_version_less_than: _,
            prune_if_older_than,
            prune_if_version_more_than,
        } = self;

        prune_if_older_than.is_none() && prune_if_version_more_than.is_none()
    }

    pub fn should_prune(&self, spec: &tracking::TagSpec, tag: &tracking::Tag) -> bool {
        if let Some(keep_if_version_less_than) = self.keep_if_version_less_than {
            if spec.version() < keep_if_version_less_than {
                return false;
            }
        }
        if let Some(keep_if_newer_than) = self.keep_if_newer_than {
            if tag.time > keep_if_newer_than {
                return false;
            }
        }

        if let Some(prune_if_version_more_than) = self.prune_if_version_more_than {
            if spec.version() > prune_if_version_more_than {
                return true;
            }
        }
        if let Some(prune_if_older_than) = self.prune_if_older_than {
            if tag.time < prune_if_older_than {
                return true;
            }
        }

        false
    }
}

/// Find all tags in the given repository that match the given prune parameters.
///
/// Tag streams are walked from the head, so the version index passed to
/// [`PruneParameters::should_prune`] counts back from the most recent entry.
pub(crate) async fn get_prunable_tags(
    repo: &storage::RepositoryHandle,
    params: &PruneParameters,
) -> Result<HashSet<tracking::Tag>> {
    let mut prunable = HashSet::new();
    if params.is_empty() {
        return Ok(prunable);
    }

    let mut streams = repo.iter_tag_streams();
    while let Some(item) = streams.next().await {
        let (spec, mut stream) = item?;
        let mut version = 0;
        while let Some(tag) = stream.next().await {
            let tag = tag?;
            if params.should_prune(&spec.with_version(version), &tag) {
                prunable.insert(tag);
            }
            version += 1;
        }
    }

    Ok(prunable)
}

/// Remove all tags in the given repository that match the given prune parameters.
pub(crate) async fn prune_tags(
    repo: &mut storage::RepositoryHandle,
    params: &PruneParameters,
) -> Result<()> {
    let prunable = get_prunable_tags(repo, params).await?;
    for tag in prunable.iter() {
        repo.remove_tag(tag).await?;
    }
    Ok(())
}
