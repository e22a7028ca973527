// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;

use crate::error::Error;

/// Whether `name` is usable as a user or group name: a lowercase letter
/// followed by lowercase letters, digits, hyphens or underscores.
pub(crate) fn is_valid_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[a-z][-a-z0-9_]*$").expect("Invalid name pattern")
    });

    re.is_match(name)
}

/// A validated account name.
///
/// Names start with a lowercase letter, followed by any number of lowercase
/// letters, digits, hyphens or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(Error::InvalidUsername { name });
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Username {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An SSH public key as given by the operator: either the path to a public
/// key file or the key itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKey(String);

impl SshKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What to do about the new account's password.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum PasswordPolicy {
    /// Leave the password as the account creation left it.
    #[default]
    Unset,
    /// Generate a random password and report it to the operator.
    Generate,
    /// Use the password given by the operator.
    Explicit(String),
    /// Lock password authentication for the account.
    Disabled,
}

impl PasswordPolicy {
    /// Combine the password related options of a command line.
    ///
    /// `generate` selects what happens when neither a password nor
    /// `no_password` is given.
    pub fn from_options(
        password: Option<String>,
        no_password: bool,
        generate: bool,
    ) -> Result<Self, Error> {
        match (password, no_password) {
            (Some(_), true) => Err(Error::ConflictingPasswordOptions),
            (Some(password), false) => Ok(Self::Explicit(password)),
            (None, true) => Ok(Self::Disabled),
            (None, false) if generate => Ok(Self::Generate),
            (None, false) => Ok(Self::Unset),
        }
    }
}

// Keep explicit passwords out of debug output and logs.
impl fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("Unset"),
            Self::Generate => f.write_str("Generate"),
            Self::Explicit(_) => f.write_str("Explicit(<redacted>)"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Everything needed to provision one account.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub(crate) username: Username,
    pub(crate) grant_sudo: bool,
    pub(crate) ssh_key: Option<SshKey>,
    pub(crate) password: PasswordPolicy,
    pub(crate) force_password_change: bool,
}

impl ProvisioningRequest {
    pub fn new(username: Username) -> Self {
        Self {
            username,
            grant_sudo: false,
            ssh_key: None,
            password: PasswordPolicy::default(),
            force_password_change: false,
        }
    }

    /// Add the account to the sudo group.
    pub fn sudo(mut self, grant_sudo: bool) -> Self {
        self.grant_sudo = grant_sudo;
        self
    }

    /// Install the given public key for the account.
    pub fn ssh_key(mut self, key: Option<SshKey>) -> Self {
        self.ssh_key = key;
        self
    }

    pub fn password(mut self, password: PasswordPolicy) -> Self {
        self.password = password;
        self
    }

    /// Expire the password once it is set, so the first login asks for a
    /// new one. Has no effect when no password is set.
    pub fn force_password_change(mut self, force: bool) -> Self {
        self.force_password_change = force;
        self
    }

    pub fn username(&self) -> &Username {
        &self.username
    }
}
