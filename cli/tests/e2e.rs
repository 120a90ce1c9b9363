use std::path::{Path, PathBuf};

use fs_err as fs;
use pazuzu::{decrypt::decrypt_from_manifest, encrypt::encrypt_directory, rules::Rules, scanner};
use pazuzu_sdk::{
    crypto::FileKey,
    manifest::{Manifest, ManifestEntry},
    provider::Provider,
};
use tempfile::TempDir;

fn local_provider() -> Provider {
    Provider::from_name(
        "local",
        &"https://pixeldrain.com/api/file".parse().unwrap(),
        "https://pixeldrain.com/api/file/{id}",
    )
    .unwrap()
}

fn all_files(root: &Path) -> Rules {
    Rules::new(&["**/*".to_owned()], &[], root.to_path_buf()).unwrap()
}

fn identifier(path: &Path) -> String {
    path.display().to_string()
}

fn populate(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    fs::create_dir_all(root.join("sub")).unwrap();
    let files = vec![
        (root.join("a.txt"), b"alpha".to_vec()),
        (root.join("b.bin"), vec![0x5a; 4096]),
        (root.join("sub").join("c.txt"), b"gamma".to_vec()),
    ];
    for (path, content) in &files {
        fs::write(path, content).unwrap();
    }
    files
}

#[tokio::test]
async fn encrypt_then_decrypt_restores_the_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    let files = populate(&root);
    let manifest_path = dir.path().join("manifest.csv");
    let provider = local_provider();
    let rules = all_files(&root);

    let outcome = encrypt_directory(&provider, &rules, &root, &manifest_path, false, None)
        .await
        .unwrap();
    assert_eq!(outcome.stats.total, 3);
    assert_eq!(outcome.stats.encrypted, 3);
    assert_eq!(outcome.stats.skipped, 0);
    assert_eq!(outcome.stats.failed, 0);
    for (path, _) in &files {
        assert!(!path.exists(), "plaintext {} was left behind", path.display());
        let mut encrypted = path.as_os_str().to_owned();
        encrypted.push(".pazuzu");
        assert!(PathBuf::from(encrypted).exists());
    }
    let manifest = Manifest::read(&manifest_path).unwrap();
    assert_eq!(manifest.len(), 3);
    // every file got its own key
    for (index, entry) in manifest.entries().iter().enumerate() {
        for other in &manifest.entries()[index + 1..] {
            assert_ne!(entry.key, other.key);
        }
    }
    // the local provider reports the path and leaves the file in place
    let upload = outcome.upload.unwrap();
    assert_eq!(upload.destination, identifier(&manifest_path));
    assert!(manifest_path.exists());

    // ciphertext files are never selected by a second scan
    let rescan = scanner::scan(&root, &rules, Some(&manifest_path)).unwrap();
    assert!(rescan.files.is_empty());

    let stats = decrypt_from_manifest(&provider, &identifier(&manifest_path), false)
        .await
        .unwrap();
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.restored, 3);
    assert_eq!(stats.failed, 0);
    for (path, content) in &files {
        assert_eq!(&fs::read(path).unwrap(), content);
        let mut encrypted = path.as_os_str().to_owned();
        encrypted.push(".pazuzu");
        assert!(!PathBuf::from(encrypted).exists());
    }
}

#[tokio::test]
async fn dry_run_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    fs::create_dir_all(&root).unwrap();
    for index in 0..5 {
        fs::write(root.join(format!("file-{index}.txt")), b"content").unwrap();
    }
    let manifest_path = dir.path().join("manifest.csv");

    let outcome = encrypt_directory(
        &local_provider(),
        &all_files(&root),
        &root,
        &manifest_path,
        true,
        None,
    )
    .await
    .unwrap();
    assert_eq!(outcome.stats.encrypted, 5);
    assert_eq!(outcome.stats.failed, 0);
    assert!(outcome.upload.is_none());
    assert!(!manifest_path.exists(), "dry run wrote a manifest");
    for index in 0..5 {
        assert!(root.join(format!("file-{index}.txt")).exists());
        assert!(!root.join(format!("file-{index}.txt.pazuzu")).exists());
    }
}

#[tokio::test]
async fn missing_ciphertext_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut manifest = Manifest::default();
    manifest.add_entry(ManifestEntry {
        path: identifier(&dir.path().join("gone.txt.pazuzu")),
        key: FileKey::generate(),
    });
    let manifest_path = dir.path().join("manifest.csv");
    manifest.write(&manifest_path).unwrap();

    let stats = decrypt_from_manifest(&local_provider(), &identifier(&manifest_path), false)
        .await
        .unwrap();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.restored, 0);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn corrupt_ciphertext_fails_only_that_entry() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("ok.txt"), b"fine").unwrap();
    fs::write(root.join("bad.txt"), b"doomed").unwrap();
    let manifest_path = dir.path().join("manifest.csv");
    let provider = local_provider();

    encrypt_directory(
        &provider,
        &all_files(&root),
        &root,
        &manifest_path,
        false,
        None,
    )
    .await
    .unwrap();

    // flip one ciphertext byte
    let corrupt_target = root.join("bad.txt.pazuzu");
    let mut content = fs::read(&corrupt_target).unwrap();
    let last = content.len() - 1;
    content[last] ^= 0x01;
    fs::write(&corrupt_target, &content).unwrap();

    let stats = decrypt_from_manifest(&provider, &identifier(&manifest_path), false)
        .await
        .unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.restored, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(fs::read(root.join("ok.txt")).unwrap(), b"fine");
    // the corrupt entry restored nothing and kept its ciphertext
    assert!(!root.join("bad.txt").exists());
    assert!(corrupt_target.exists());
}

#[tokio::test]
async fn entry_without_marker_suffix_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("odd.txt");
    fs::write(&plain, b"not a container").unwrap();
    let mut manifest = Manifest::default();
    manifest.add_entry(ManifestEntry {
        path: identifier(&plain),
        key: FileKey::generate(),
    });
    let manifest_path = dir.path().join("manifest.csv");
    manifest.write(&manifest_path).unwrap();

    let stats = decrypt_from_manifest(&local_provider(), &identifier(&manifest_path), false)
        .await
        .unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.restored, 0);
    assert_eq!(fs::read(&plain).unwrap(), b"not a container");
}

#[tokio::test]
async fn empty_tree_encrypts_and_uploads_nothing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    fs::create_dir_all(&root).unwrap();
    let manifest_path = dir.path().join("manifest.csv");

    let outcome = encrypt_directory(
        &local_provider(),
        &all_files(&root),
        &root,
        &manifest_path,
        false,
        None,
    )
    .await
    .unwrap();
    assert_eq!(outcome.stats.encrypted, 0);
    assert!(outcome.upload.is_none());
    assert!(!manifest_path.exists());
}

#[tokio::test]
async fn invalid_targets_abort_before_any_mutation() {
    let dir = TempDir::new().unwrap();
    let manifest_path = dir.path().join("manifest.csv");
    let provider = local_provider();
    let missing = dir.path().join("missing");
    let rules = all_files(&missing);

    encrypt_directory(&provider, &rules, &missing, &manifest_path, false, None)
        .await
        .unwrap_err();

    let file = dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();
    encrypt_directory(&provider, &rules, &file, &manifest_path, false, None)
        .await
        .unwrap_err();
    assert!(!manifest_path.exists());
    assert_eq!(fs::read(&file).unwrap(), b"x");
}

#[tokio::test]
async fn exclude_patterns_keep_files_out_of_the_run() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("keep.txt"), b"keep").unwrap();
    fs::write(root.join("skip.log"), b"skip").unwrap();
    let manifest_path = dir.path().join("manifest.csv");

    let rules = Rules::new(
        &["**/*".to_owned()],
        &["**/*.log".to_owned()],
        root.clone(),
    )
    .unwrap();
    let outcome = encrypt_directory(
        &local_provider(),
        &rules,
        &root,
        &manifest_path,
        false,
        None,
    )
    .await
    .unwrap();
    assert_eq!(outcome.stats.encrypted, 1);
    assert!(root.join("skip.log").exists());
    assert!(!root.join("skip.log.pazuzu").exists());
    assert!(root.join("keep.txt.pazuzu").exists());
}
