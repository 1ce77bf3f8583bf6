// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

pub use super::{
    BlobStorage, LayerStorage, ManifestStorage, ManifestViewer, PayloadStorage, PlatformStorage,
    Repository, RepositoryHandle, TagStorage,
};
pub use crate::graph::{Database, DatabaseView};
