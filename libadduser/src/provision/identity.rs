// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, path::Path, path::PathBuf};

use nix::unistd::{geteuid, Gid, Group, Uid, User};
use strum::IntoEnumIterator;

use crate::{
    error::Error,
    provision::{group, password, user},
};

/// A resolved account on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
    pub home: PathBuf,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid,
            gid: user.gid,
            home: user.dir,
        }
    }
}

/// The user and group database the provisioning workflow acts on.
pub trait Identity {
    /// Whether the caller may modify users and groups.
    fn is_privileged(&self) -> bool;

    fn user_exists(&self, name: &str) -> Result<bool, Error>;

    /// Create an account with a home directory and login shell.
    fn create_user(
        &self,
        name: &str,
        home: &Path,
        shell: &Path,
    ) -> Result<(), Error>;

    fn lookup_user(&self, name: &str) -> Result<Account, Error>;

    fn set_password(&self, name: &str, password: &str) -> Result<(), Error>;

    /// Disable password authentication for the account.
    fn lock_password(&self, name: &str) -> Result<(), Error>;

    /// Force a password change at the next login.
    fn expire_password(&self, name: &str) -> Result<(), Error>;

    fn group_exists(&self, group: &str) -> Result<bool, Error>;

    fn create_group(&self, group: &str) -> Result<(), Error>;

    fn add_to_group(&self, name: &str, group: &str) -> Result<(), Error>;
}

/// The identity database of the running host, changed through the system's
/// user management tools.
///
/// By default, all known tools for a change are tried in order until one
/// succeeds. The `*_provisioners()` methods restrict which ones are tried
/// ([`Host::user_provisioners`], [`Host::group_provisioners`], etc).
#[derive(Default, Clone, Debug)]
pub struct Host {
    user_backends: Option<Vec<user::Provisioner>>,
    password_backends: Option<Vec<password::Provisioner>>,
    lock_backends: Option<Vec<password::Locker>>,
    expire_backends: Option<Vec<password::Expirer>>,
    group_backends: Option<Vec<group::Provisioner>>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify the ways to create a user.
    pub fn user_provisioners(
        mut self,
        backends: impl Into<Vec<user::Provisioner>>,
    ) -> Self {
        self.user_backends = Some(backends.into());
        self
    }

    /// Specify the ways to set a user's password.
    pub fn password_provisioners(
        mut self,
        backends: impl Into<Vec<password::Provisioner>>,
    ) -> Self {
        self.password_backends = Some(backends.into());
        self
    }

    /// Specify the ways to lock a user's password.
    pub fn lock_provisioners(
        mut self,
        backends: impl Into<Vec<password::Locker>>,
    ) -> Self {
        self.lock_backends = Some(backends.into());
        self
    }

    /// Specify the ways to expire a user's password.
    pub fn expire_provisioners(
        mut self,
        backends: impl Into<Vec<password::Expirer>>,
    ) -> Self {
        self.expire_backends = Some(backends.into());
        self
    }

    /// Specify the ways to add a user to a group.
    pub fn group_provisioners(
        mut self,
        backends: impl Into<Vec<group::Provisioner>>,
    ) -> Self {
        self.group_backends = Some(backends.into());
        self
    }
}

/// Apply `f` with each backend in turn until one succeeds.
fn first_success<B>(
    backends: &Option<Vec<B>>,
    resource: &'static str,
    exhausted: Error,
    f: impl Fn(&B) -> Result<(), Error>,
) -> Result<(), Error>
where
    B: IntoEnumIterator + Clone + fmt::Debug,
{
    backends
        .clone()
        .unwrap_or_else(|| B::iter().collect())
        .iter()
        .find_map(|backend| {
            f(backend)
                .map_err(|e| {
                    tracing::info!(
                        error=?e,
                        backend=?backend,
                        resource,
                        "Provisioning did not succeed"
                    );
                    e
                })
                .ok()
        })
        .ok_or(exhausted)
}

impl Identity for Host {
    fn is_privileged(&self) -> bool {
        geteuid().is_root()
    }

    fn user_exists(&self, name: &str) -> Result<bool, Error> {
        Ok(User::from_name(name)?.is_some())
    }

    fn create_user(
        &self,
        name: &str,
        home: &Path,
        shell: &Path,
    ) -> Result<(), Error> {
        first_success(
            &self.user_backends,
            "user",
            Error::NoUserProvisioner,
            |backend| backend.create(name, home, shell),
        )
    }

    fn lookup_user(&self, name: &str) -> Result<Account, Error> {
        User::from_name(name)?
            .map(Account::from)
            .ok_or(Error::UserMissing {
                user: name.to_string(),
            })
    }

    fn set_password(&self, name: &str, password: &str) -> Result<(), Error> {
        first_success(
            &self.password_backends,
            "password",
            Error::NoPasswordProvisioner,
            |backend| backend.set(name, password),
        )
    }

    fn lock_password(&self, name: &str) -> Result<(), Error> {
        first_success(
            &self.lock_backends,
            "password",
            Error::NoPasswordProvisioner,
            |backend| backend.lock(name),
        )
    }

    fn expire_password(&self, name: &str) -> Result<(), Error> {
        first_success(
            &self.expire_backends,
            "password",
            Error::NoPasswordProvisioner,
            |backend| backend.expire(name),
        )
    }

    fn group_exists(&self, group: &str) -> Result<bool, Error> {
        Ok(Group::from_name(group)?.is_some())
    }

    fn create_group(&self, group: &str) -> Result<(), Error> {
        group::groupadd(group)
    }

    fn add_to_group(&self, name: &str, group: &str) -> Result<(), Error> {
        first_success(
            &self.group_backends,
            "group",
            Error::NoGroupProvisioner,
            |backend| backend.add(name, group),
        )
    }
}
