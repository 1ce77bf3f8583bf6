// Copyright (c) 2021 Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use rstest::rstest;
use tokio_stream::StreamExt;

use super::{makedirs_with_perms, Config, Storage};

fixtures!();

#[rstest]
fn test_config_serialization() {
    let expected = Config {
        upper_dir: std::path::PathBuf::from("/tmp/spfs-runtime/upper"),
    };
    let data = serde_json::to_string_pretty(&expected).expect("failed to serialize config");
    let actual: Config = serde_json::from_str(&data).expect("failed to deserialize config data");

    assert_eq!(actual, expected);
}

#[rstest]
#[tokio::test]
async fn test_storage_create_runtime(#[future] tmprepo: TempRepo) {
    let tmprepo = tmprepo.await;
    let storage = Storage::new(Arc::new((*tmprepo).clone()));

    let rt = storage
        .create_runtime()
        .await
        .expect("failed to create runtime in storage");
    assert_eq!(rt.get_stack().len(), 0);
    assert!(!rt.is_editable());

    assert!(storage.create_named_runtime(rt.name()).await.is_err());
}

#[rstest]
#[tokio::test]
async fn test_storage_remove_runtime(#[future] tmprepo: TempRepo) {
    let tmprepo = tmprepo.await;
    let storage = Storage::new(Arc::new((*tmprepo).clone()));

    assert!(
        storage.remove_runtime("non-existant").await.is_ok(),
        "removing a runtime that never existed should be a no-op"
    );

    let rt = storage
        .create_runtime()
        .await
        .expect("failed to create runtime");
    storage
        .remove_runtime(rt.name())
        .await
        .expect("should remove runtime properly");
    assert!(storage.read_runtime(rt.name()).await.is_err());
}

#[rstest]
#[tokio::test]
async fn test_storage_iter_runtimes(#[future] tmprepo: TempRepo) {
    let tmprepo = tmprepo.await;
    let storage = Storage::new(Arc::new((*tmprepo).clone()));

    let runtimes: Vec<_> = storage.iter_runtimes().await.collect().await;
    assert_eq!(runtimes.len(), 0);

    let _rt1 = storage
        .create_runtime()
        .await
        .expect("failed to create runtime");
    let _rt2 = storage
        .create_runtime()
        .await
        .expect("failed to create runtime");

    let runtimes: Vec<_> = storage.iter_runtimes().await.collect().await;
    assert_eq!(runtimes.len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_runtime_reset(#[future] tmprepo: TempRepo, tmpdir: tempdir::TempDir) {
    let tmprepo = tmprepo.await;
    let storage = Storage::new(Arc::new((*tmprepo).clone()));
    let mut rt = storage
        .create_runtime()
        .await
        .expect("failed to create runtime");

    let upper_dir = tmpdir.path().join("upper");
    rt.config.upper_dir = upper_dir.clone();

    ensure(upper_dir.join("file"), "file01");
    ensure(upper_dir.join("dir/file"), "file02");
    ensure(upper_dir.join("dir/dir/dir/file"), "file03");
    ensure(upper_dir.join("dir/dir/dir/file2"), "file04");
    ensure(upper_dir.join("dir/dir/dir1/file"), "file05");
    ensure(upper_dir.join("dir/dir2/dir/file.other"), "other");

    rt.reset(&["file.*"]).expect("failed to reset runtime paths");
    assert!(!upper_dir.join("dir/dir2/dir/file.other").exists());
    assert!(upper_dir.join("dir/dir/dir/file2").exists());

    rt.reset(&["dir1/"]).expect("failed to reset runtime paths");
    assert!(upper_dir.join("dir/dir/dir").exists());
    assert!(upper_dir.join("dir/dir2").exists());

    rt.reset(&["/file"]).expect("failed to reset runtime paths");
    assert!(upper_dir.join("dir/dir/dir/file").exists());
    assert!(!upper_dir.join("file").exists());

    rt.reset_all().expect("failed to reset runtime paths");
    assert_eq!(listdir(upper_dir), Vec::<String>::new());
}

#[rstest]
fn test_makedirs_dont_change_existing(tmpdir: tempdir::TempDir) {
    let chkdir = tmpdir.path().join("my_dir");
    ensure(chkdir.join("file"), "data");
    std::fs::set_permissions(&chkdir, std::fs::Permissions::from_mode(0o755)).unwrap();
    let original = std::fs::metadata(&chkdir).unwrap().permissions().mode();
    makedirs_with_perms(chkdir.join("new"), 0o777).expect("makedirs should not fail");
    let actual = std::fs::metadata(&chkdir).unwrap().permissions().mode();
    assert_eq!(actual, original, "existing dir should not change perms");
}

fn listdir(path: std::path::PathBuf) -> Vec<String> {
    std::fs::read_dir(path)
        .expect("failed to read dir")
        .map(|res| {
            res.expect("error while reading dir")
                .file_name()
                .to_string_lossy()
                .to_string()
        })
        .collect()
}
