// Copyright (c) Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/spkenv/spk

pub use crate::encoding::prelude::*;
pub use crate::storage::prelude::*;
pub use crate::tracking::{BlobRead, BlobReadExt};
