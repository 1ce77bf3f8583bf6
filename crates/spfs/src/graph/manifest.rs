// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::collections::BTreeMap;
use std::io::BufRead;

use super::{Entry, Tree};
use crate::encoding::{Decodable, Encodable};
use crate::{encoding, tracking};

#[cfg(test)]
#[path = "./manifest_test.rs"]
mod manifest_test;

/// A manifest holds the state of a filesystem tree, as a root tree plus
/// the set of subtrees it (transitively) references.
///
/// This mirrors [`tracking::Manifest`]'s recursive, in-memory structure
/// but stores each directory level as a separately addressable [`Tree`]
/// so that unchanged subtrees can be shared and looked up by digest.
#[derive(Default, Clone)]
pub struct Manifest {
    root: Tree,
    trees: BTreeMap<encoding::Digest, Tree>,
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest")
            .field("root", &self.root)
            .field("trees", &self.trees.len())
            .finish()
    }
}

impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.digest().ok() == other.digest().ok()
    }
}
impl Eq for Manifest {}

impl Manifest {
    /// Return the root tree object of this manifest.
    pub fn root(&self) -> &Tree {
        &self.root
    }

    /// Iterate all of the trees in this manifest (excluding the root).
    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.values()
    }

    /// Iterate all of the trees in this manifest, starting with the root.
    pub fn iter_trees(&self) -> impl Iterator<Item = &Tree> {
        std::iter::once(&self.root).chain(self.trees())
    }

    /// Return the digests of the blobs that this manifest refers to.
    pub fn child_objects(&self) -> Vec<encoding::Digest> {
        let mut children = std::collections::BTreeSet::new();
        for tree in self.iter_trees() {
            for entry in tree.iter() {
                if entry.is_blob() {
                    children.insert(entry.object);
                }
            }
        }
        children.into_iter().collect()
    }

    /// Return the tree in this manifest with the given digest, if any.
    pub fn get_tree(&self, digest: &encoding::Digest) -> Option<&Tree> {
        if self.root.digest().ok().as_ref() == Some(digest) {
            return Some(&self.root);
        }
        self.trees.get(digest)
    }

    /// Iterate all of the entries in this manifest.
    pub fn iter_entries(&self) -> impl Iterator<Item = &Entry> {
        self.iter_trees().flat_map(Tree::iter)
    }

    /// Convert this manifest into a more workable, in-memory form for editing.
    pub fn to_tracking_manifest(&self) -> tracking::Manifest {
        fn iter_tree(manifest: &Manifest, tree: &Tree, parent: &mut tracking::Entry) {
            for entry in tree.iter() {
                let mut new_entry = tracking::Entry {
                    kind: entry.kind,
                    mode: entry.mode,
                    size: entry.size,
                    object: entry.object,
                    entries: Default::default(),
                };
                if entry.is_tree() {
                    let child_tree = manifest
                        .trees
                        .get(&entry.object)
                        .expect("manifest is internally inconsistent (missing child tree)");
                    iter_tree(manifest, child_tree, &mut new_entry);
                }
                parent.entries.insert(entry.name.clone(), new_entry);
            }
        }

        let mut root = tracking::Entry::default();
        iter_tree(self, &self.root, &mut root);
        tracking::Manifest::new(root)
    }
}

impl From<&tracking::Manifest> for Manifest {
    fn from(source: &tracking::Manifest) -> Self {
        let mut trees = BTreeMap::new();
        let root = convert_entry(source.root(), &mut trees);
        Self { root, trees }
    }
}

/// Recursively flatten a [`tracking::Entry`] tree into the set of
/// [`Tree`] objects that represent it, returning the root tree.
fn convert_entry(
    entry: &tracking::Entry,
    trees: &mut BTreeMap<encoding::Digest, Tree>,
) -> Tree {
    let mut tree = Tree::default();
    for (name, child) in entry.entries.iter() {
        let (object, size) = if child.kind.is_tree() {
            let child_tree = convert_entry(child, trees);
            let digest = child_tree
                .digest()
                .unwrap_or_else(|_| encoding::NULL_DIGEST.into());
            let size = child_tree.len() as u64;
            trees.insert(digest, child_tree);
            (digest, size)
        } else {
            (child.object, child.size)
        };
        let _ = tree.add(Entry::new(name.clone(), child.kind, object, child.mode, size));
    }
    tree
}

impl encoding::Encodable for Manifest {
    fn encode(&self, mut writer: &mut impl std::io::Write) -> encoding::Result<()> {
        self.root.encode(&mut writer)?;
        // the root tree is always encoded first and is not included in
        // this count, since a manifest always has exactly one root
        encoding::write_uint(&mut writer, self.trees.len() as u64)?;
        for tree in self.trees.values() {
            tree.encode(writer)?;
        }
        Ok(())
    }
}

impl encoding::Decodable for Manifest {
    fn decode(mut reader: &mut impl BufRead) -> encoding::Result<Self> {
        let root = Tree::decode(&mut reader)?;
        let num_trees = encoding::read_uint(&mut reader)?;
        let mut trees = BTreeMap::new();
        for _ in 0..num_trees {
            let tree = Tree::decode(reader)?;
            let digest = tree.digest().unwrap_or_else(|_| encoding::NULL_DIGEST.into());
            trees.insert(digest, tree);
        }
        Ok(Self { root, trees })
    }
}
