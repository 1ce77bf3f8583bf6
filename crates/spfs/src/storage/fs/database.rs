// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::os::unix::fs::PermissionsExt;
use std::pin::Pin;

use futures::Stream;

use super::FSRepository;
use crate::graph::{Database, DatabaseView, DigestSearchCriteria, Object};
use crate::{encoding, graph, Error, Result};
use encoding::{Decodable, Encodable};

#[async_trait::async_trait]
impl DatabaseView for FSRepository {
    async fn read_object(&self, digest: encoding::Digest) -> Result<Object> {
        let filepath = self.objects.build_digest_path(&digest);
        let file = std::fs::File::open(&filepath).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::UnknownObject(digest),
            _ => Error::from(err),
        })?;
        Ok(Object::decode(&mut std::io::BufReader::new(file))?)
    }

    fn find_digests(
        &self,
        search_criteria: DigestSearchCriteria,
    ) -> Pin<Box<dyn Stream<Item = Result<encoding::Digest>> + Send>> {
        Box::pin(self.objects.find(search_criteria))
    }

    fn iter_objects(&self) -> graph::DatabaseIterator<'_> {
        graph::DatabaseIterator::new(self)
    }

    fn walk_objects<'db>(&'db self, root: &encoding::Digest) -> graph::DatabaseWalker<'db> {
        graph::DatabaseWalker::new(self, *root)
    }
}

#[async_trait::async_trait]
impl Database for FSRepository {
    async fn write_object(&self, obj: &Object) -> Result<()> {
        let digest = obj.digest()?;
        let filepath = self.objects.build_digest_path(&digest);
        if filepath.exists() {
            tracing::trace!(?digest, "object already exists");
            return Ok(());
        }
        tracing::trace!(?digest, kind = ?obj.kind(), "writing object to db");

        // a temporary file is used so that other processes
        // don't try to read our incomplete object from the database
        let uuid = uuid::Uuid::new_v4().to_string();
        let working_file = self.objects.workdir().join(uuid);
        self.objects.ensure_base_dir(&working_file)?;
        let mut writer = std::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&working_file)?;
        if let Err(err) = obj.encode(&mut writer) {
            let _ = std::fs::remove_file(&working_file);
            return Err(err.into());
        }
        if let Err(err) = writer.sync_all() {
            let _ = std::fs::remove_file(&working_file);
            return Err(Error::wrap_io(err, "Failed to finalize object write"));
        }
        self.objects.ensure_base_dir(&filepath)?;
        match std::fs::rename(&working_file, &filepath) {
            Ok(_) => Ok(()),
            Err(err) => {
                let _ = std::fs::remove_file(&working_file);
                match err.kind() {
                    std::io::ErrorKind::AlreadyExists => Ok(()),
                    _ => Err(err.into()),
                }
            }
        }
    }

    async fn remove_object(&self, digest: encoding::Digest) -> Result<()> {
        let filepath = self.objects.build_digest_path(&digest);

        // this might fail but we don't consider that fatal just yet
        let _ = std::fs::set_permissions(&filepath, std::fs::Permissions::from_mode(0o777));

        if let Err(err) = std::fs::remove_file(&filepath) {
            return match err.kind() {
                std::io::ErrorKind::NotFound => Ok(()),
                _ => Err(err.into()),
            };
        }
        Ok(())
    }
}
