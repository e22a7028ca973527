// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The basic variant of `add-user`: an SSH key is mandatory and no password
//! is generated.

use std::process::ExitCode;

use add_user::cli::{self, Variant};

fn main() -> ExitCode {
    cli::run(Variant::Basic)
}
