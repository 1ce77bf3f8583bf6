// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::collections::HashSet;
use std::pin::Pin;

use futures::StreamExt;

use super::ManifestViewer;
use crate::{encoding, graph, tracking, Result};
use encoding::Encodable;
use graph::{Blob, Manifest};

#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub enum Ref {
    Digest(encoding::Digest),
    TagSpec(tracking::TagSpec),
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digest(d) => write!(f, "{d}"),
            Self::TagSpec(t) => write!(f, "{t}"),
        }
    }
}

/// Represents a storage location for spfs data.
#[async_trait::async_trait]
pub trait Repository:
    super::TagStorage
    + super::PayloadStorage
    + super::ManifestStorage
    + super::BlobStorage
    + super::LayerStorage
    + super::PlatformStorage
    + graph::Database
    + graph::DatabaseView
    + std::fmt::Debug
{
    /// Return the address of this repository.
    fn address(&self) -> url::Url;

    /// If supported, returns the type responsible for locally rendered manifests
    fn renders(&self) -> Result<Box<dyn ManifestViewer>> {
        Err(format!(
            "Repository does not support local renders: {:?}",
            self.address()
        )
        .into())
    }

    /// Return true if this repository contains the given reference.
    async fn has_ref(&self, reference: &str) -> bool {
        self.read_ref(reference).await.is_ok()
    }

    /// Resolve a tag or digest string into it's absolute digest.
    async fn resolve_ref(&self, reference: &str) -> Result<encoding::Digest> {
        if let Ok(tag_spec) = tracking::TagSpec::parse(reference) {
            if let Ok(tag) = self.resolve_tag(&tag_spec).await {
                return Ok(tag.target);
            }
        }
        self.resolve_full_digest(&encoding::PartialDigest::parse(reference)?)
            .await
    }

    /// Read an object of unknown type by tag or digest.
    async fn read_ref(&self, reference: &str) -> Result<graph::Object> {
        let digest = self.resolve_ref(reference).await?;
        self.read_object(digest).await
    }

    /// Return the other identifiers that can be used for 'reference'.
    async fn find_aliases(&self, reference: &str) -> Result<HashSet<Ref>> {
        let mut aliases = HashSet::new();
        let digest = self.read_ref(reference).await?.digest()?;
        let mut tags = self.find_tags(&digest);
        while let Some(spec) = tags.next().await {
            aliases.insert(Ref::TagSpec(spec?));
        }
        if reference != digest.to_string().as_str() {
            aliases.insert(Ref::Digest(digest));
        }
        aliases.retain(|alias| alias.to_string().as_str() != reference);
        Ok(aliases)
    }

    /// Commit the data from 'reader' as a blob in this repository
    async fn commit_blob(
        &self,
        reader: Pin<Box<dyn tokio::io::AsyncRead + Send + Sync + 'static>>,
    ) -> Result<encoding::Digest> {
        let (digest, size) = self.write_data(reader).await?;
        let blob = Blob::new(digest, size);
        self.write_object(&graph::Object::Blob(blob)).await?;
        Ok(digest)
    }

    /// Commit a local file system directory to this storage.
    ///
    /// This collects all files to store as blobs and maintains a
    /// render of the manifest for use immediately.
    async fn commit_dir(&self, path: &std::path::Path) -> Result<tracking::Manifest> {
        let path = tokio::fs::canonicalize(path).await?;
        let mut builder =
            tracking::ManifestBuilder::new(|reader| async move { self.commit_blob(reader).await });

        tracing::info!("committing files");
        let manifest = builder.compute_manifest(path).await?;
        drop(builder);

        tracing::info!("writing manifest");
        let storable = Manifest::from(&manifest);
        self.write_object(&graph::Object::Manifest(storable)).await?;
        for node in manifest.walk() {
            if !node.entry.kind.is_blob() {
                continue;
            }
            let blob = Blob::new(node.entry.object, node.entry.size);
            self.write_object(&graph::Object::Blob(blob)).await?;
        }

        Ok(manifest)
    }
}
