// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::encoding::Encodable;
use crate::{encoding, graph, Result};

#[async_trait::async_trait]
pub trait LayerStorage: graph::Database {
    /// Iterate the objects in this storage which are layers.
    fn iter_layers<'db>(
        &'db self,
    ) -> Pin<Box<dyn Stream<Item = Result<(encoding::Digest, graph::Layer)>> + Send + 'db>> {
        use graph::Object;
        Box::pin(self.iter_objects().filter_map(|res| async move {
            match res {
                Ok((digest, Object::Layer(layer))) => Some(Ok((digest, layer))),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        }))
    }

    /// Return true if the identified layer exists in this storage.
    async fn has_layer(&self, digest: &encoding::Digest) -> bool {
        self.read_layer(digest).await.is_ok()
    }

    /// Return the layer identified by the given digest.
    async fn read_layer(&self, digest: &encoding::Digest) -> Result<graph::Layer> {
        use graph::Object;
        match self.read_object(*digest).await? {
            Object::Layer(layer) => Ok(layer),
            _ => Err(format!("Object is not a layer: {:?}", digest).into()),
        }
    }

    /// Create and store a new layer for the given manifest.
    async fn create_layer(&self, manifest: &graph::Manifest) -> Result<graph::Layer> {
        let layer = graph::Layer::new(manifest.digest()?);
        self.write_object(&graph::Object::Layer(layer.clone()))
            .await?;
        Ok(layer)
    }
}

impl<T: LayerStorage> LayerStorage for &T {}
