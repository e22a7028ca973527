// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Settings for how accounts are provisioned on this host.
//!
//! Defaults come from build-time environment variables (see
//! `libadduser/build.rs`) and can be overridden by a JSON file:
//!
//! ```json
//! {
//!   "group": "developers",
//!   "sudo_group": "wheel",
//!   "shell": "/bin/zsh",
//!   "home_base_dir": "/srv/home",
//!   "password_length": 24,
//!   "color": false
//! }
//! ```
//!
//! Fields missing from the file keep their defaults.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{error::Error, request::is_valid_name};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The group every provisioned account is added to.
    pub group: String,
    /// The group that grants administrative privileges.
    pub sudo_group: String,
    /// Login shell of new accounts.
    pub shell: PathBuf,
    /// Directory under which home directories are created.
    pub home_base_dir: PathBuf,
    /// Length of generated passwords.
    pub password_length: usize,
    /// Whether status output uses colors.
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            group: env!("DEFAULT_GROUP").to_string(),
            sudo_group: env!("SUDO_GROUP").to_string(),
            shell: PathBuf::from(env!("DEFAULT_SHELL")),
            home_base_dir: PathBuf::from("/home"),
            password_length: 16,
            color: true,
        }
    }
}

impl Config {
    /// Load the configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| {
            Error::ConfigFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (field, group) in
            [("group", &self.group), ("sudo_group", &self.sudo_group)]
        {
            if !is_valid_name(group) {
                return Err(Error::Config {
                    reason: format!(
                        "{field} \"{group}\" is not a valid group name"
                    ),
                });
            }
        }
        if !self.home_base_dir.is_absolute() {
            return Err(Error::Config {
                reason: format!(
                    "home_base_dir must be an absolute path, got {}",
                    self.home_base_dir.display()
                ),
            });
        }
        if self.password_length < MIN_PASSWORD_LENGTH {
            return Err(Error::Config {
                reason: format!(
                    "password_length must be at least {MIN_PASSWORD_LENGTH}, got {}",
                    self.password_length
                ),
            });
        }

        Ok(())
    }

    /// The home directory of a new account named `username`.
    pub fn home_dir(&self, username: &str) -> PathBuf {
        self.home_base_dir.join(username)
    }
}
