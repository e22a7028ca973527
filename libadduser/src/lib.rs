// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
pub mod config;
pub mod error;
pub mod provision;
pub mod request;

pub use config::Config;
pub use provision::{
    Account, Host, Identity, KeyStatus, PasswordStatus, Provision, Summary,
};
pub use request::{PasswordPolicy, ProvisioningRequest, SshKey, Username};

use std::process::Command;

use crate::error::Error;

/// Run a command, returning an error if it does not exit successfully.
///
/// Standard output is discarded and standard error is captured so it can be
/// attached to the error.
pub(crate) fn run(mut command: Command) -> Result<(), Error> {
    let program = command.get_program().to_string_lossy().into_owned();
    tracing::debug!(command = %program, args = ?command.get_args().collect::<Vec<_>>(), "Running");

    let output = command.output()?;
    if !output.status.success() {
        return Err(Error::SubprocessFailed {
            command: program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}
