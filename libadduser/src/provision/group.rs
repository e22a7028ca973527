// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::process::Command;

use tracing::instrument;

use crate::error::Error;

/// Ways to add an existing user to an existing group.
#[derive(strum::EnumIter, Debug, Clone)]
#[non_exhaustive]
pub enum Provisioner {
    Usermod,
    Gpasswd,
    #[cfg(test)]
    FakeUsermod,
}

impl Provisioner {
    pub(crate) fn add(
        &self,
        username: impl AsRef<str>,
        group: impl AsRef<str>,
    ) -> Result<(), Error> {
        match self {
            Self::Usermod => usermod(username.as_ref(), group.as_ref()),
            Self::Gpasswd => gpasswd(username.as_ref(), group.as_ref()),
            #[cfg(test)]
            Self::FakeUsermod => Ok(()),
        }
    }
}

#[instrument(skip_all)]
fn usermod(username: &str, group: &str) -> Result<(), Error> {
    let mut command = Command::new(env!("PATH_USERMOD"));
    command.arg("--append").arg("--groups").arg(group).arg(username);

    crate::run(command)
}

#[instrument(skip_all)]
fn gpasswd(username: &str, group: &str) -> Result<(), Error> {
    let mut command = Command::new(env!("PATH_GPASSWD"));
    command.arg("--add").arg(username).arg(group);

    crate::run(command)
}

#[instrument(skip_all)]
pub(crate) fn groupadd(group: &str) -> Result<(), Error> {
    let mut command = Command::new(env!("PATH_GROUPADD"));
    command.arg(group);

    crate::run(command)
}
