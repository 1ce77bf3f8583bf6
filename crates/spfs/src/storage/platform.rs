// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::{encoding, graph, Result};

#[async_trait::async_trait]
pub trait PlatformStorage: graph::Database {
    /// Iterate the objects in this storage which are platforms.
    fn iter_platforms<'db>(
        &'db self,
    ) -> Pin<Box<dyn Stream<Item = Result<(encoding::Digest, graph::Platform)>> + Send + 'db>> {
        use graph::Object;
        Box::pin(self.iter_objects().filter_map(|res| async move {
            match res {
                Ok((digest, Object::Platform(platform))) => Some(Ok((digest, platform))),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        }))
    }

    /// Return true if the identified platform exists in this storage.
    async fn has_platform(&self, digest: &encoding::Digest) -> bool {
        self.read_platform(digest).await.is_ok()
    }

    /// Return the platform identified by the given digest.
    async fn read_platform(&self, digest: &encoding::Digest) -> Result<graph::Platform> {
        use graph::Object;
        match self.read_object(*digest).await? {
            Object::Platform(platform) => Ok(platform),
            _ => Err(format!("Object is not a platform: {:?}", digest).into()),
        }
    }

    /// Create and store a new platform from the given stack of layers.
    /// Layers are ordered bottom to top.
    async fn create_platform(&self, layers: Vec<encoding::Digest>) -> Result<graph::Platform> {
        let platform = graph::Platform::new(layers.into_iter())?;
        self.write_object(&graph::Object::Platform(platform.clone()))
            .await?;
        Ok(platform)
    }
}

impl<T: PlatformStorage> PlatformStorage for &T {}
