// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Password handling for provisioned accounts.
//!
//! - A password is set with `chpasswd`, writing `"username:password"` to its
//!   stdin so the secret never shows up in argv or logs.
//! - Password login is disabled by locking the account with `passwd -l`,
//!   falling back to `usermod --lock`.
//! - A password is expired with `passwd -e`, falling back to `chage -d 0`,
//!   so the next login asks for a new one.

use std::{
    io::Write,
    process::{Command, Stdio},
};

use rand::{distributions::Alphanumeric, Rng};
use tracing::instrument;

use crate::error::Error;

/// Ways to set a password.
#[derive(strum::EnumIter, Debug, Clone)]
#[non_exhaustive]
pub enum Provisioner {
    Chpasswd,
    #[cfg(test)]
    FakePasswd,
}

impl Provisioner {
    pub(crate) fn set(
        &self,
        username: impl AsRef<str>,
        password: impl AsRef<str>,
    ) -> Result<(), Error> {
        match self {
            Self::Chpasswd => chpasswd(username.as_ref(), password.as_ref()),
            #[cfg(test)]
            Self::FakePasswd => Ok(()),
        }
    }
}

/// Ways to lock password authentication.
#[derive(strum::EnumIter, Debug, Clone)]
#[non_exhaustive]
pub enum Locker {
    Passwd,
    Usermod,
    #[cfg(test)]
    FakePasswd,
}

impl Locker {
    pub(crate) fn lock(&self, username: impl AsRef<str>) -> Result<(), Error> {
        match self {
            Self::Passwd => passwd(&["-l"], username.as_ref()),
            Self::Usermod => usermod_lock(username.as_ref()),
            #[cfg(test)]
            Self::FakePasswd => Ok(()),
        }
    }
}

/// Ways to expire a password.
#[derive(strum::EnumIter, Debug, Clone)]
#[non_exhaustive]
pub enum Expirer {
    Passwd,
    Chage,
    #[cfg(test)]
    FakeChage,
}

impl Expirer {
    pub(crate) fn expire(&self, username: impl AsRef<str>) -> Result<(), Error> {
        match self {
            Self::Passwd => passwd(&["-e"], username.as_ref()),
            Self::Chage => chage_expire(username.as_ref()),
            #[cfg(test)]
            Self::FakeChage => Ok(()),
        }
    }
}

#[instrument(skip_all)]
fn passwd(args: &[&str], username: &str) -> Result<(), Error> {
    let mut command = Command::new(env!("PATH_PASSWD"));
    command.args(args).arg(username);

    crate::run(command)
}

#[instrument(skip_all)]
fn usermod_lock(username: &str) -> Result<(), Error> {
    let mut command = Command::new(env!("PATH_USERMOD"));
    command.arg("--lock").arg(username);

    crate::run(command)
}

#[instrument(skip_all)]
fn chage_expire(username: &str) -> Result<(), Error> {
    let mut command = Command::new(env!("PATH_CHAGE"));
    command.args(["-d", "0"]).arg(username);

    crate::run(command)
}

#[instrument(skip_all)]
fn chpasswd(username: &str, password: &str) -> Result<(), Error> {
    let path_chpasswd = env!("PATH_CHPASSWD");
    let mut child = Command::new(path_chpasswd)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(format!("{username}:{password}\n").as_bytes())?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        tracing::error!(%username, status = ?output.status, "chpasswd failed to set password");
        return Err(Error::SubprocessFailed {
            command: path_chpasswd.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

/// Generate a random alphanumeric password of `length` characters.
///
/// Uses the thread-local generator, which is a CSPRNG seeded from the OS.
pub fn generate(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
