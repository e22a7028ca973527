// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{path::PathBuf, process::ExitStatus};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(
        "Invalid username \"{name}\": it must start with a lowercase letter followed by lowercase letters, digits, '-' or '_'"
    )]
    InvalidUsername { name: String },
    #[error("--password and --no-password cannot be used together")]
    ConflictingPasswordOptions,
    #[error("An SSH public key is required (--ssh-key)")]
    MissingSshKey,
    #[error("The option {option} is not supported by this command")]
    UnsupportedOption { option: &'static str },
    #[error("The SSH public key is empty")]
    EmptySshKey,
    #[error("This command must be run as root")]
    NotRoot,
    #[error("User \"{user}\" already exists")]
    UserExists { user: String },
    #[error("Unable to get user {user}")]
    UserMissing { user: String },
    #[error("Unable to decode {path} as a configuration file: {source}")]
    ConfigFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
    #[error("Unable to create the user with any of the available backends")]
    NoUserProvisioner,
    #[error("Unable to set the password with any of the available backends")]
    NoPasswordProvisioner,
    #[error("Unable to update group membership with any of the available backends")]
    NoGroupProvisioner,
    #[error("Subprocess {command} failed with {status}: {stderr}")]
    SubprocessFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("A system call failed: {0}")]
    Nix(#[from] nix::Error),
}

impl Error {
    /// Whether the error was caused by the operator's input rather than by the
    /// host, meaning nothing was changed on the system.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::InvalidUsername { .. }
                | Self::ConflictingPasswordOptions
                | Self::MissingSshKey
                | Self::UnsupportedOption { .. }
                | Self::EmptySshKey
                | Self::ConfigFile { .. }
                | Self::Config { .. }
        )
    }
}
