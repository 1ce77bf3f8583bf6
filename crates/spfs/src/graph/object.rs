// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::io::BufRead;

use super::{Blob, Layer, Manifest, Platform};
use crate::storage::RepositoryHandle;
use crate::{encoding, Result};

/// The header bytes written at the start of every encoded object,
/// used to sanity check the stream before decoding the rest.
pub const OBJECT_HEADER: &[u8] = b"--SPFS--";

/// Identifies the kind of object encoded in an [`Object`] so that it
/// can be read back without any other context.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ObjectKind {
    Blob = 0,
    Manifest = 1,
    Layer = 2,
    Platform = 3,
}

impl ObjectKind {
    pub fn from_u64(kind: u64) -> Option<ObjectKind> {
        match kind {
            0 => Some(Self::Blob),
            1 => Some(Self::Manifest),
            2 => Some(Self::Layer),
            3 => Some(Self::Platform),
            _ => None,
        }
    }
}

/// The set of storable content-addressed graph nodes.
///
/// Every object is uniquely identified by the digest of its own
/// encoded content (see [`encoding::Encodable::digest`]); it is this
/// digest which other objects reference when pointing at children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Manifest(Manifest),
    Layer(Layer),
    Platform(Platform),
}

impl Object {
    /// Identifies which variant of object this is, for encoding purposes.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Manifest(_) => ObjectKind::Manifest,
            Self::Layer(_) => ObjectKind::Layer,
            Self::Platform(_) => ObjectKind::Platform,
        }
    }

    /// The digests of objects directly referenced by this one.
    pub fn child_objects(&self) -> Vec<encoding::Digest> {
        match self {
            Self::Blob(blob) => blob.child_objects(),
            Self::Manifest(manifest) => manifest.child_objects(),
            Self::Layer(layer) => layer.child_objects(),
            Self::Platform(platform) => platform.child_objects(),
        }
    }

    /// Return true if this object kind also has an associated payload.
    pub fn has_payload(&self) -> bool {
        matches!(self, Self::Blob(_))
    }

    pub fn digest(&self) -> Result<encoding::Digest> {
        use encoding::Encodable;
        match self {
            Self::Blob(obj) => Ok(obj.digest()),
            Self::Manifest(obj) => Ok(obj.digest()?),
            Self::Layer(obj) => Ok(obj.digest()?),
            Self::Platform(obj) => Ok(obj.digest()?),
        }
    }

    /// Calculate the total size of this object and all of its children, recursively.
    pub async fn calculate_object_size(&self, repo: &RepositoryHandle) -> Result<u64> {
        let mut total_size: u64 = 0;
        let mut items_to_process: Vec<Object> = vec![self.clone()];

        while !items_to_process.is_empty() {
            let mut next_iter_objects: Vec<Object> = Vec::new();
            for object in items_to_process.iter() {
                match object {
                    Object::Platform(platform) => {
                        for digest in platform.stack.iter() {
                            let item = repo.read_object(digest).await?;
                            next_iter_objects.push(item);
                        }
                    }
                    Object::Layer(layer) => {
                        let item = repo.read_object(&layer.manifest).await?;
                        next_iter_objects.push(item);
                    }
                    Object::Manifest(manifest) => {
                        for node in manifest.to_tracking_manifest().walk_abs("/spfs") {
                            total_size += node.entry.size
                        }
                    }
                    Object::Blob(blob) => total_size += blob.size,
                }
            }
            items_to_process = std::mem::take(&mut next_iter_objects);
        }
        Ok(total_size)
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}
impl From<Manifest> for Object {
    fn from(manifest: Manifest) -> Self {
        Self::Manifest(manifest)
    }
}
impl From<Layer> for Object {
    fn from(layer: Layer) -> Self {
        Self::Layer(layer)
    }
}
impl From<Platform> for Object {
    fn from(platform: Platform) -> Self {
        Self::Platform(platform)
    }
}

impl encoding::Encodable for Object {
    fn encode(&self, mut writer: &mut impl std::io::Write) -> encoding::Result<()> {
        encoding::write_header(&mut writer, OBJECT_HEADER)?;
        encoding::write_uint(&mut writer, self.kind() as u64)?;
        match self {
            Self::Blob(obj) => obj.encode(&mut writer),
            Self::Manifest(obj) => obj.encode(&mut writer),
            Self::Layer(obj) => obj.encode(&mut writer),
            Self::Platform(obj) => obj.encode(&mut writer),
        }
    }
}

impl encoding::Decodable for Object {
    fn decode(mut reader: &mut impl BufRead) -> encoding::Result<Self> {
        encoding::consume_header(&mut reader, OBJECT_HEADER)?;
        let type_id = encoding::read_uint(&mut reader)?;
        match ObjectKind::from_u64(type_id) {
            Some(ObjectKind::Blob) => Ok(Self::Blob(Blob::decode(&mut reader)?)),
            Some(ObjectKind::Manifest) => Ok(Self::Manifest(Manifest::decode(&mut reader)?)),
            Some(ObjectKind::Layer) => Ok(Self::Layer(Layer::decode(&mut reader)?)),
            Some(ObjectKind::Platform) => Ok(Self::Platform(Platform::decode(&mut reader)?)),
            None => Err(encoding::Error::EncodingReadError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown object kind tag: {type_id}"),
            ))),
        }
    }
}
