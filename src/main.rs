// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::process::ExitCode;

use add_user::cli::{self, Variant};

fn main() -> ExitCode {
    cli::run(Variant::Full)
}
