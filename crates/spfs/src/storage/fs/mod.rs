// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/spkenv/spk

//! Uses a local directory on disk to store the spfs repository.

mod database;
mod hash_store;
mod manifest_render_path;
mod payloads;
mod render_reporter;
mod render_summary;
mod renderer;
mod repository;
mod tag;

pub mod migrations;

pub use hash_store::{FSHashStore, FSHashStoreIter};
pub use manifest_render_path::ManifestRenderPath;
pub use render_reporter::{ConsoleRenderReporter, RenderReporter, SilentRenderReporter};
pub use render_summary::{RenderSummary, RenderSummaryReporter};
pub use renderer::RenderType;
pub use repository::{read_last_migration_version, set_last_migration, Config, FSRepository, Params};
