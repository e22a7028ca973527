// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
pub mod group;
mod identity;
pub mod password;
pub mod ssh;
pub mod user;

#[cfg(test)]
mod fake;

use std::{fmt, path::PathBuf};

use tracing::instrument;

pub use identity::{Account, Host, Identity};
pub use ssh::KeyStatus;

use crate::{
    config::Config,
    error::Error,
    request::{PasswordPolicy, ProvisioningRequest},
};

/// The interface for provisioning a new account.
///
/// Combines what the operator asked for ([`ProvisioningRequest`]) with how
/// this host provisions accounts ([`Config`]). To apply it, use
/// [`Provision::provision`] with the [`Identity`] to act on, usually
/// [`Host`].
#[derive(Debug, Clone)]
pub struct Provision {
    request: ProvisioningRequest,
    config: Config,
}

impl Provision {
    pub fn new(request: ProvisioningRequest, config: Config) -> Self {
        Self { request, config }
    }

    /// Provision the account.
    ///
    /// Steps run in order and the first failure aborts. Nothing is changed
    /// if the caller is not privileged, the user already exists or the SSH
    /// key is empty. Steps that completed before a later failure are not
    /// undone.
    #[instrument(skip_all, fields(username = %self.request.username))]
    pub fn provision(self, identity: &impl Identity) -> Result<Summary, Error> {
        let name = self.request.username.as_str();

        if !identity.is_privileged() {
            return Err(Error::NotRoot);
        }
        if identity.user_exists(name)? {
            return Err(Error::UserExists {
                user: name.to_string(),
            });
        }
        let keys = self
            .request
            .ssh_key
            .as_ref()
            .map(ssh::resolve_key)
            .transpose()?;

        let home = self.config.home_dir(name);
        identity.create_user(name, &home, &self.config.shell)?;
        tracing::info!(home = %home.display(), "Created user");

        let mut password = match self.request.password {
            PasswordPolicy::Unset => PasswordStatus::NotSet,
            PasswordPolicy::Disabled => {
                identity.lock_password(name)?;
                tracing::info!("Disabled password login");
                PasswordStatus::Disabled
            }
            PasswordPolicy::Explicit(value) => {
                identity.set_password(name, &value)?;
                tracing::info!("Set password");
                PasswordStatus::Set {
                    value,
                    generated: false,
                    expired: false,
                }
            }
            PasswordPolicy::Generate => {
                let value = password::generate(self.config.password_length);
                identity.set_password(name, &value)?;
                tracing::info!("Set generated password");
                PasswordStatus::Set {
                    value,
                    generated: true,
                    expired: false,
                }
            }
        };

        if self.request.force_password_change {
            match &mut password {
                PasswordStatus::Set { expired, .. } => {
                    identity.expire_password(name)?;
                    *expired = true;
                    tracing::info!("Expired password, it must be changed at first login");
                }
                _ => tracing::warn!(
                    "No password was set, ignoring the forced password change"
                ),
            }
        }

        let mut groups = Vec::new();
        let group = &self.config.group;
        if !identity.group_exists(group)? {
            identity.create_group(group)?;
            tracing::info!(%group, "Created group");
        }
        identity.add_to_group(name, group)?;
        tracing::info!(%group, "Added user to group");
        groups.push(group.clone());

        if self.request.grant_sudo {
            let group = &self.config.sudo_group;
            identity.add_to_group(name, group)?;
            tracing::info!(%group, "Granted sudo privileges");
            groups.push(group.clone());
        }

        let ssh_key = match keys {
            Some(keys) => {
                let account = identity.lookup_user(name)?;
                Some(ssh::provision_ssh(&account, &keys)?)
            }
            None => None,
        };

        Ok(Summary {
            username: name.to_string(),
            home,
            groups,
            sudo: self.request.grant_sudo,
            ssh_key,
            password,
        })
    }
}

/// What happened to the account's password.
#[derive(Clone, PartialEq, Eq)]
pub enum PasswordStatus {
    NotSet,
    Disabled,
    Set {
        value: String,
        generated: bool,
        expired: bool,
    },
}

impl fmt::Debug for PasswordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSet => f.write_str("NotSet"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Set {
                generated, expired, ..
            } => f
                .debug_struct("Set")
                .field("generated", generated)
                .field("expired", expired)
                .finish_non_exhaustive(),
        }
    }
}

/// The result of a successful [`Provision::provision`].
///
/// Its `Display` output is the report shown to the operator, including the
/// password when one was set, since a generated one can't be recovered
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub username: String,
    pub home: PathBuf,
    pub groups: Vec<String>,
    pub sudo: bool,
    pub ssh_key: Option<KeyStatus>,
    pub password: PasswordStatus,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User {} provisioned", self.username)?;
        writeln!(f, "  Home directory: {}", self.home.display())?;
        writeln!(f, "  Groups:         {}", self.groups.join(", "))?;
        writeln!(
            f,
            "  Sudo access:    {}",
            if self.sudo { "yes" } else { "no" }
        )?;
        let ssh_key = match self.ssh_key {
            Some(KeyStatus::Added) => "installed",
            Some(KeyStatus::AlreadyPresent) => "already present",
            None => "none",
        };
        writeln!(f, "  SSH key:        {ssh_key}")?;
        match &self.password {
            PasswordStatus::NotSet => writeln!(f, "  Password:       not set"),
            PasswordStatus::Disabled => {
                writeln!(f, "  Password:       login disabled")
            }
            PasswordStatus::Set {
                value,
                generated,
                expired,
            } => {
                write!(f, "  Password:       {value}")?;
                if *generated {
                    write!(f, " (generated, store it now)")?;
                }
                if *expired {
                    write!(f, " (must be changed at first login)")?;
                }
                writeln!(f)
            }
        }
    }
}
