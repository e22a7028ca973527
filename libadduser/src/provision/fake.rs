// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An in-memory identity database for exercising the provisioning workflow.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fs,
    os::unix::process::ExitStatusExt,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use nix::unistd::{getgid, getuid};

use crate::{
    error::Error,
    provision::{Account, Identity},
};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeUser {
    pub home: PathBuf,
    pub password: Option<String>,
    pub locked: bool,
    pub expired: bool,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<String, FakeUser>,
    groups: BTreeMap<String, BTreeSet<String>>,
    calls: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct FakeIdentity {
    privileged: bool,
    failing: Option<&'static str>,
    state: RefCell<State>,
}

impl FakeIdentity {
    /// A privileged identity database that only has a `sudo` group.
    pub fn new() -> Self {
        Self {
            privileged: true,
            failing: None,
            state: RefCell::default(),
        }
        .with_group("sudo")
    }

    pub fn unprivileged(mut self) -> Self {
        self.privileged = false;
        self
    }

    /// Make the named operation fail.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing = Some(operation);
        self
    }

    pub fn with_user(self, name: &str) -> Self {
        self.state
            .borrow_mut()
            .users
            .insert(name.to_string(), FakeUser::default());
        self
    }

    pub fn with_group(self, group: &str) -> Self {
        self.state
            .borrow_mut()
            .groups
            .insert(group.to_string(), BTreeSet::new());
        self
    }

    pub fn user(&self, name: &str) -> Option<FakeUser> {
        self.state.borrow().users.get(name).cloned()
    }

    pub fn is_member(&self, name: &str, group: &str) -> bool {
        self.state
            .borrow()
            .groups
            .get(group)
            .is_some_and(|members| members.contains(name))
    }

    /// Mutating calls made so far, e.g. `"create_group staff"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    fn record(&self, operation: &'static str, args: &str) -> Result<(), Error> {
        self.state
            .borrow_mut()
            .calls
            .push(format!("{operation} {args}"));

        if self.failing == Some(operation) {
            return Err(Error::SubprocessFailed {
                command: operation.to_string(),
                status: ExitStatus::from_raw(1 << 8),
                stderr: "simulated failure".to_string(),
            });
        }

        Ok(())
    }

    fn update_user(
        &self,
        name: &str,
        f: impl FnOnce(&mut FakeUser),
    ) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        let user = state.users.get_mut(name).ok_or(Error::UserMissing {
            user: name.to_string(),
        })?;
        f(user);
        Ok(())
    }
}

impl Identity for FakeIdentity {
    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn user_exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.state.borrow().users.contains_key(name))
    }

    fn create_user(
        &self,
        name: &str,
        home: &Path,
        _shell: &Path,
    ) -> Result<(), Error> {
        self.record("create_user", name)?;
        fs::create_dir_all(home)?;
        self.state.borrow_mut().users.insert(
            name.to_string(),
            FakeUser {
                home: home.to_path_buf(),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn lookup_user(&self, name: &str) -> Result<Account, Error> {
        let user = self.user(name).ok_or(Error::UserMissing {
            user: name.to_string(),
        })?;
        Ok(Account {
            name: name.to_string(),
            uid: getuid(),
            gid: getgid(),
            home: user.home,
        })
    }

    fn set_password(&self, name: &str, password: &str) -> Result<(), Error> {
        self.record("set_password", name)?;
        self.update_user(name, |user| user.password = Some(password.to_string()))
    }

    fn lock_password(&self, name: &str) -> Result<(), Error> {
        self.record("lock_password", name)?;
        self.update_user(name, |user| user.locked = true)
    }

    fn expire_password(&self, name: &str) -> Result<(), Error> {
        self.record("expire_password", name)?;
        self.update_user(name, |user| user.expired = true)
    }

    fn group_exists(&self, group: &str) -> Result<bool, Error> {
        Ok(self.state.borrow().groups.contains_key(group))
    }

    fn create_group(&self, group: &str) -> Result<(), Error> {
        self.record("create_group", group)?;
        self.state
            .borrow_mut()
            .groups
            .entry(group.to_string())
            .or_default();
        Ok(())
    }

    fn add_to_group(&self, name: &str, group: &str) -> Result<(), Error> {
        self.record("add_to_group", &format!("{name} {group}"))?;
        // Like `usermod -aG`, joining a missing group fails.
        let mut state = self.state.borrow_mut();
        let members = state.groups.get_mut(group).ok_or_else(|| {
            Error::SubprocessFailed {
                command: "add_to_group".to_string(),
                status: ExitStatus::from_raw(6 << 8),
                stderr: format!("group '{group}' does not exist"),
            }
        })?;
        members.insert(name.to_string());
        Ok(())
    }
}
