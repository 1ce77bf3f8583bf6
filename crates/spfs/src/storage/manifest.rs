// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::{encoding, graph, Result};

#[async_trait::async_trait]
pub trait ManifestStorage: graph::Database {
    /// Iterate the objects in this storage which are manifests.
    fn iter_manifests<'db>(
        &'db self,
    ) -> Pin<Box<dyn Stream<Item = Result<(encoding::Digest, graph::Manifest)>> + Send + 'db>>
    {
        use graph::Object;
        Box::pin(self.iter_objects().filter_map(|res| async move {
            match res {
                Ok((digest, Object::Manifest(manifest))) => Some(Ok((digest, manifest))),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        }))
    }

    /// Return true if the identified manifest exists in this storage.
    async fn has_manifest(&self, digest: &encoding::Digest) -> bool {
        self.read_manifest(digest).await.is_ok()
    }

    /// Return the manifest identified by the given digest.
    async fn read_manifest(&self, digest: &encoding::Digest) -> Result<graph::Manifest> {
        use graph::Object;
        match self.read_object(*digest).await? {
            Object::Manifest(manifest) => Ok(manifest),
            _ => Err(format!("Object is not a manifest: {:?}", digest).into()),
        }
    }
}

impl<T: ManifestStorage> ManifestStorage for &T {}

/// Allows a storage to render manifests to a local filesystem path for use.
#[async_trait::async_trait]
pub trait ManifestViewer: Sync + Send {
    /// Returns true if the identified manifest has been rendered already
    async fn has_rendered_manifest(&self, digest: encoding::Digest) -> bool;

    /// Create a rendered view of the given manifest on the local disk.
    ///
    /// Returns the local path to the root of the rendered manifest
    async fn render_manifest(&self, manifest: &graph::Manifest) -> Result<std::path::PathBuf>;

    /// Cleanup a previously rendered manifest from the local disk.
    async fn remove_rendered_manifest(&self, digest: encoding::Digest) -> Result<()>;
}
