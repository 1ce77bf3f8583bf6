// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::io::BufRead;

use crate::encoding;
use crate::encoding::{Decodable, Encodable};
use crate::tracking;

#[cfg(test)]
#[path = "./entry_test.rs"]
mod entry_test;

/// An entry in a manifest tree, naming either a blob or a sub-tree.
///
/// Entries are ordered by name so that a [`super::Tree`]'s set of
/// entries has one, deterministic iteration and encoding order.
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: tracking::EntryKind,
    pub object: encoding::Digest,
    pub mode: u32,
    pub size: u64,
    pub name: String,
}

impl Entry {
    pub fn new<S: Into<String>>(
        name: S,
        kind: tracking::EntryKind,
        object: encoding::Digest,
        mode: u32,
        size: u64,
    ) -> Self {
        Self {
            kind,
            object,
            mode,
            size,
            name: name.into(),
        }
    }

    pub fn is_tree(&self) -> bool {
        self.kind.is_tree()
    }

    pub fn is_blob(&self) -> bool {
        self.kind.is_blob()
    }

    pub fn is_mask(&self) -> bool {
        self.kind.is_mask()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.kind.cmp(&other.kind) {
            std::cmp::Ordering::Equal => self.name.cmp(&other.name),
            ord => ord,
        }
    }
}

impl encoding::Encodable for Entry {
    fn encode(&self, mut writer: &mut impl std::io::Write) -> encoding::Result<()> {
        encoding::write_digest(&mut writer, &self.object)?;
        self.kind.encode(&mut writer)?;
        encoding::write_uint(&mut writer, self.mode as u64)?;
        encoding::write_uint(&mut writer, self.size)?;
        encoding::write_string(writer, self.name.as_str())?;
        Ok(())
    }
}

impl encoding::Decodable for Entry {
    fn decode(mut reader: &mut impl BufRead) -> encoding::Result<Self> {
        Ok(Self {
            object: encoding::read_digest(&mut reader)?,
            kind: tracking::EntryKind::decode(&mut reader)?,
            mode: encoding::read_uint(&mut reader)? as u32,
            size: encoding::read_uint(&mut reader)?,
            name: encoding::read_string(reader)?,
        })
    }
}

impl From<&tracking::manifest::ManifestNode<'_>> for Entry {
    fn from(node: &tracking::manifest::ManifestNode<'_>) -> Self {
        Self {
            kind: node.entry.kind,
            object: node.entry.object,
            mode: node.entry.mode,
            size: node.entry.size,
            name: node.path.to_string(),
        }
    }
}
