// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/spkenv/spk

//! Handles the setup and initialization of runtime environments

pub mod overlayfs;
mod storage;

pub use overlayfs::is_removed_entry;
pub use storage::{makedirs_with_perms, Author, Config, Data, OwnedRuntime, Runtime, Status, Storage};
