//! Integration tests for the vault module: file round-trips, tamper
//! detection and the exclusive lock.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

use cask::crypto::Argon2Params;
use cask::errors::CaskError;
use cask::lock::marker_path;
use cask::vault::format::HEADER_LEN;
use cask::vault::Vault;
use tempfile::TempDir;

fn fast() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

/// Helper: a vault path inside a fresh temp dir.
fn vault_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.cask");
    (dir, path)
}

/// Helper: write a one-entry vault and close it.
fn write_bank_vault(path: &std::path::Path, passphrase: &[u8]) {
    let mut vault = Vault::create(path, passphrase, &fast()).unwrap();
    vault.add("bank", "s3cr3t", BTreeMap::new()).unwrap();
    vault.save(path).unwrap();
    vault.close().unwrap();
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn new_add_save_close_open_get() {
    let (_dir, path) = vault_path();

    let mut vault = Vault::new(b"pw1", &fast()).unwrap();
    vault.add("bank", "s3cr3t", BTreeMap::new()).unwrap();
    vault.save(&path).unwrap();
    vault.close().unwrap();

    let reopened = Vault::open(&path, b"pw1").unwrap();
    assert_eq!(reopened.get("bank").unwrap().secret, "s3cr3t");
    drop(reopened);

    assert!(matches!(
        Vault::open(&path, b"wrongpw"),
        Err(CaskError::UnableToOpen)
    ));
}

#[test]
fn metadata_tombstones_and_version_survive_save() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, b"pw", &fast()).unwrap();
    let meta = BTreeMap::from([("username".to_string(), "alice".to_string())]);
    vault.add("bank", "s3cr3t", meta).unwrap();
    vault.add("old", "gone", BTreeMap::new()).unwrap();
    vault.delete("old").unwrap();
    let version = vault.version();
    vault.save(&path).unwrap();
    vault.close().unwrap();

    let reopened = Vault::open(&path, b"pw").unwrap();
    assert_eq!(reopened.version(), version);
    assert_eq!(reopened.get("bank").unwrap().metadata["username"], "alice");
    assert!(reopened.get("old").is_err());
    assert!(reopened.entries().any(|e| e.location == "old" && e.tombstone));
    assert_eq!(reopened.locations(), vec!["bank".to_string()]);
}

#[test]
fn file_contains_no_plaintext() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"CASK"));
    let needle = b"s3cr3t";
    assert!(!bytes.windows(needle.len()).any(|w| w == needle));
    assert!(!bytes.windows(4).any(|w| w == b"bank"));
}

#[cfg(unix)]
#[test]
fn saved_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn any_ciphertext_or_tag_byte_flip_is_rejected() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");
    let original = fs::read(&path).unwrap();

    for i in HEADER_LEN..original.len() {
        let mut tampered = original.clone();
        tampered[i] ^= 0x80;
        fs::write(&path, &tampered).unwrap();
        assert!(
            matches!(Vault::open(&path, b"pw"), Err(CaskError::UnableToOpen)),
            "byte {i} accepted"
        );
    }

    fs::write(&path, &original).unwrap();
    assert!(Vault::open(&path, b"pw").is_ok());
}

#[test]
fn salt_and_nonce_are_authenticated() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");
    let original = fs::read(&path).unwrap();

    // Salt starts after magic, version and the three KDF fields.
    for i in [18, 30, 49, 50, 61] {
        let mut tampered = original.clone();
        tampered[i] ^= 0x01;
        fs::write(&path, &tampered).unwrap();
        assert!(matches!(
            Vault::open(&path, b"pw"),
            Err(CaskError::UnableToOpen)
        ));
    }
}

#[test]
fn wrong_passphrase_looks_like_corruption() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");

    let wrong = Vault::open(&path, b"nope").unwrap_err().to_string();

    let mut tampered = fs::read(&path).unwrap();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xFF;
    fs::write(&path, &tampered).unwrap();
    let corrupted = Vault::open(&path, b"pw").unwrap_err().to_string();

    assert_eq!(wrong, corrupted);
}

#[test]
fn structural_damage_is_corrupt_format() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");
    let original = fs::read(&path).unwrap();

    let mut bad_magic = original.clone();
    bad_magic[0] = b'X';
    fs::write(&path, &bad_magic).unwrap();
    assert!(matches!(
        Vault::open(&path, b"pw"),
        Err(CaskError::CorruptFormat(_))
    ));

    fs::write(&path, &original[..HEADER_LEN - 1]).unwrap();
    assert!(matches!(
        Vault::open(&path, b"pw"),
        Err(CaskError::CorruptFormat(_))
    ));

    // No marker is left behind by failed opens.
    assert!(!marker_path(&path).exists());
}

// ---------------------------------------------------------------------------
// Locking
// ---------------------------------------------------------------------------

#[test]
fn concurrent_opens_admit_exactly_one() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                barrier.wait();
                Vault::open(&path, b"pw")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let opened = results.iter().filter(|r| r.is_ok()).count();
    let locked = results
        .iter()
        .filter(|r| matches!(r, Err(CaskError::Locked(_))))
        .count();
    assert_eq!((opened, locked), (1, 1));

    drop(results);
    assert!(!marker_path(&path).exists());
}

#[test]
fn reopen_after_close_succeeds() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");

    let mut first = Vault::open(&path, b"pw").unwrap();
    assert!(matches!(
        Vault::open(&path, b"pw"),
        Err(CaskError::Locked(_))
    ));

    first.close().unwrap();
    let second = Vault::open(&path, b"pw").unwrap();
    assert_eq!(second.locked_path(), Some(path.as_path()));
}

#[test]
fn locked_error_names_the_marker() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");
    let _held = Vault::open(&path, b"pw").unwrap();

    let message = Vault::open(&path, b"pw").unwrap_err().to_string();
    assert!(message.contains(&marker_path(&path).display().to_string()));
}

#[test]
fn save_refuses_after_lock_is_lost() {
    let (_dir, path) = vault_path();
    write_bank_vault(&path, b"pw");

    let before = fs::read(&path).unwrap();

    let mut vault = Vault::open(&path, b"pw").unwrap();
    fs::remove_file(marker_path(&path)).unwrap();

    vault.add("mail", "x", BTreeMap::new()).unwrap();
    assert!(matches!(vault.save(&path), Err(CaskError::LockLost(_))));
    // The in-memory state is intact.
    assert_eq!(vault.get("mail").unwrap().secret, "x");

    // The previous file is untouched and no temp file is left behind.
    assert_eq!(fs::read(&path).unwrap(), before);
    let mut names: Vec<String> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["test.cask".to_string()]);
}

#[test]
fn search_hits_are_ordered_by_location() {
    let mut vault = Vault::new(b"pw", &fast()).unwrap();
    let work = BTreeMap::from([("email".to_string(), "me@Work.example".to_string())]);
    vault.add("zulu-work", "1", BTreeMap::new()).unwrap();
    vault.add("mail", "2", work).unwrap();
    vault.add("alpha-work", "3", BTreeMap::new()).unwrap();
    vault.add("bank", "4", BTreeMap::new()).unwrap();
    vault.add("old-work", "5", BTreeMap::new()).unwrap();
    vault.delete("old-work").unwrap();

    let hits: Vec<&str> = vault
        .search("WORK")
        .iter()
        .map(|e| e.location.as_str())
        .collect();
    assert_eq!(hits, vec!["alpha-work", "mail", "zulu-work"]);
}

#[test]
fn open_missing_and_create_existing() {
    let (_dir, path) = vault_path();
    assert!(matches!(
        Vault::open(&path, b"pw"),
        Err(CaskError::VaultNotFound(_))
    ));

    write_bank_vault(&path, b"pw");
    assert!(matches!(
        Vault::create(&path, b"pw", &fast()),
        Err(CaskError::VaultAlreadyExists(_))
    ));
}

#[test]
fn closed_vault_rejects_operations() {
    let mut vault = Vault::new(b"pw", &fast()).unwrap();
    vault.add("bank", "s3cr3t", BTreeMap::new()).unwrap();
    vault.close().unwrap();

    assert!(matches!(vault.get("bank"), Err(CaskError::VaultClosed)));
    assert!(vault.close().is_ok());
}
