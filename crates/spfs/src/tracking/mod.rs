// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

///! Object tracking and definitions
mod blob_reader;
pub use blob_reader::{BlobRead, BlobReadExt, WithPermissions};
mod diff;
pub use diff::{compute_diff, Diff, DiffMode};
mod entry;
pub use entry::{Entry, EntryKind};
mod env;
pub use env::{EnvSpec, EnvSpecItem};
pub mod manifest;
pub use manifest::{compute_manifest, Manifest, ManifestBuilder, ManifestNode};
mod object;
pub use object::Object;
mod tag;
pub use tag::{build_tag_spec, split_tag_spec, Tag, TagSpec};
