// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{path::Path, process::Command};

use tracing::instrument;

use crate::error::Error;

#[derive(strum::EnumIter, Debug, Clone)]
#[non_exhaustive]
pub enum Provisioner {
    Useradd,
    #[cfg(test)]
    FakeUseradd,
}

impl Provisioner {
    pub(crate) fn create(
        &self,
        name: impl AsRef<str>,
        home: impl AsRef<Path>,
        shell: impl AsRef<Path>,
    ) -> Result<(), Error> {
        match self {
            Self::Useradd => {
                useradd(name.as_ref(), home.as_ref(), shell.as_ref())
            }
            #[cfg(test)]
            Self::FakeUseradd => Ok(()),
        }
    }
}

#[instrument(skip_all)]
fn useradd(name: &str, home: &Path, shell: &Path) -> Result<(), Error> {
    let mut command = Command::new(env!("PATH_USERADD"));
    command
        .arg("--comment")
        .arg("Account created by add-user")
        .arg("--home-dir")
        .arg(home)
        .arg("--create-home")
        .arg("--shell")
        .arg(shell)
        .arg(name);

    crate::run(command)
}

#[cfg(test)]
mod tests {
    use super::Provisioner;

    #[test]
    fn test_fake_useradd() {
        assert!(Provisioner::FakeUseradd
            .create("alice", "/home/alice", "/bin/bash")
            .is_ok());
    }
}
