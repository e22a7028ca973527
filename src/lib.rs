// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Command line front end shared by the `add-user` and `add-user-basic`
//! binaries.

pub mod cli;
