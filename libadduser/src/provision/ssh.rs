// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    fs::{self, DirBuilder, OpenOptions, Permissions},
    io::{self, Write},
    os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt},
    path::Path,
};

use nix::unistd::{chown, Gid, Uid};
use tracing::instrument;

use crate::{error::Error, provision::Account, request::SshKey};

/// Outcome of installing a key into `authorized_keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Added,
    AlreadyPresent,
}

/// Turn the operator's value into public key lines.
///
/// If the value names a readable file its contents are used, otherwise the
/// value itself is the key. Blank lines and comments are dropped.
pub fn resolve_key(key: &SshKey) -> Result<Vec<String>, Error> {
    let path = Path::new(key.as_str());
    let material = if path.is_file() {
        match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) => {
                tracing::warn!(path = %path.display(), ?error, "Unable to read key file, using the value as the key itself");
                key.as_str().to_string()
            }
        }
    } else {
        key.as_str().to_string()
    };

    let keys: Vec<String> = material
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    if keys.is_empty() {
        return Err(Error::EmptySshKey);
    }

    Ok(keys)
}

/// Install the public key lines from [`resolve_key`] for `account`.
///
/// Creates `~/.ssh` if needed and appends each key line to
/// `~/.ssh/authorized_keys` unless an identical line is already there. The
/// directory is then owned by the account with mode 0700, the file with mode
/// 0600.
#[instrument(skip_all, fields(user = %account.name))]
pub fn provision_ssh(
    account: &Account,
    keys: &[String],
) -> Result<KeyStatus, Error> {
    if keys.is_empty() {
        return Err(Error::EmptySshKey);
    }

    let ssh_dir = account.home.join(".ssh");
    DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(&ssh_dir)?;

    let authorized_keys_path = ssh_dir.join("authorized_keys");
    let existing = match fs::read_to_string(&authorized_keys_path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
        Err(error) => return Err(error.into()),
    };

    let missing: Vec<&String> = keys
        .iter()
        .filter(|key| !existing.lines().any(|line| line == key.as_str()))
        .collect();

    let status = if missing.is_empty() {
        tracing::info!(path = %authorized_keys_path.display(), "SSH key already present");
        KeyStatus::AlreadyPresent
    } else {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(&authorized_keys_path)?;

        let mut buffer = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            buffer.push('\n');
        }
        for key in missing {
            buffer.push_str(key);
            buffer.push('\n');
        }
        file.write_all(buffer.as_bytes())?;

        tracing::info!(path = %authorized_keys_path.display(), "Added SSH key");
        KeyStatus::Added
    };

    chown_recursive(&ssh_dir, account.uid, account.gid)?;
    fs::set_permissions(&ssh_dir, Permissions::from_mode(0o700))?;
    fs::set_permissions(&authorized_keys_path, Permissions::from_mode(0o600))?;

    Ok(status)
}

fn chown_recursive(path: &Path, uid: Uid, gid: Gid) -> Result<(), Error> {
    chown(path, Some(uid), Some(gid))?;

    if fs::symlink_metadata(path)?.is_dir() {
        for entry in fs::read_dir(path)? {
            chown_recursive(&entry?.path(), uid, gid)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::Write,
        os::unix::fs::{MetadataExt, PermissionsExt},
    };

    use nix::unistd::{getgid, getuid};
    use tempfile::{NamedTempFile, TempDir};

    use super::{provision_ssh, resolve_key, KeyStatus};
    use crate::{error::Error, provision::Account, request::SshKey};

    const KEY: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFakeKeyMaterialForTests alice@laptop";

    fn account(home: &TempDir) -> Account {
        Account {
            name: "alice".to_string(),
            uid: getuid(),
            gid: getgid(),
            home: home.path().to_path_buf(),
        }
    }

    #[test]
    fn test_resolve_literal_key() {
        let keys = resolve_key(&SshKey::new(KEY)).unwrap();
        assert_eq!(keys, vec![KEY.to_string()]);
    }

    #[test]
    fn test_resolve_key_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# laptop key").unwrap();
        writeln!(file, "{KEY}").unwrap();
        writeln!(file).unwrap();

        let keys =
            resolve_key(&SshKey::new(file.path().to_string_lossy())).unwrap();
        assert_eq!(keys, vec![KEY.to_string()]);
    }

    #[test]
    fn test_resolve_missing_path_is_literal() {
        let keys = resolve_key(&SshKey::new("/nonexistent/alice.pub")).unwrap();
        assert_eq!(keys, vec!["/nonexistent/alice.pub".to_string()]);
    }

    #[test]
    fn test_resolve_empty_key() {
        assert!(matches!(
            resolve_key(&SshKey::new("  \n")),
            Err(Error::EmptySshKey)
        ));
    }

    #[test]
    fn test_provision_ssh_creates_files_with_modes() {
        let home = TempDir::new().unwrap();
        let account = account(&home);

        let status = provision_ssh(&account, &[KEY.to_string()]).unwrap();
        assert_eq!(status, KeyStatus::Added);

        let ssh_dir = home.path().join(".ssh");
        let authorized_keys = ssh_dir.join("authorized_keys");
        assert_eq!(
            fs::read_to_string(&authorized_keys).unwrap(),
            format!("{KEY}\n")
        );

        let dir_meta = fs::metadata(&ssh_dir).unwrap();
        assert_eq!(dir_meta.permissions().mode() & 0o777, 0o700);
        assert_eq!(dir_meta.uid(), account.uid.as_raw());
        let file_meta = fs::metadata(&authorized_keys).unwrap();
        assert_eq!(file_meta.permissions().mode() & 0o777, 0o600);
        assert_eq!(file_meta.gid(), account.gid.as_raw());
    }

    #[test]
    fn test_provision_ssh_is_idempotent() {
        let home = TempDir::new().unwrap();
        let account = account(&home);

        assert_eq!(
            provision_ssh(&account, &[KEY.to_string()]).unwrap(),
            KeyStatus::Added
        );
        assert_eq!(
            provision_ssh(&account, &[KEY.to_string()]).unwrap(),
            KeyStatus::AlreadyPresent
        );

        let contents =
            fs::read_to_string(home.path().join(".ssh/authorized_keys"))
                .unwrap();
        assert_eq!(contents.lines().filter(|line| *line == KEY).count(), 1);
    }

    #[test]
    fn test_provision_ssh_rejects_no_keys() {
        let home = TempDir::new().unwrap();
        let account = account(&home);

        assert!(matches!(
            provision_ssh(&account, &[]),
            Err(Error::EmptySshKey)
        ));
        assert!(!home.path().join(".ssh").exists());
    }

    #[test]
    fn test_provision_ssh_keeps_existing_keys() {
        let home = TempDir::new().unwrap();
        let account = account(&home);
        let ssh_dir = home.path().join(".ssh");
        fs::create_dir(&ssh_dir).unwrap();
        fs::write(ssh_dir.join("authorized_keys"), "ssh-rsa AAAAB3 old@host")
            .unwrap();

        provision_ssh(&account, &[KEY.to_string()]).unwrap();

        assert_eq!(
            fs::read_to_string(ssh_dir.join("authorized_keys")).unwrap(),
            format!("ssh-rsa AAAAB3 old@host\n{KEY}\n")
        );
    }
}
