// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, FromArgMatches, Parser};
use libadduser::{
    error::Error, Config, Host, PasswordPolicy, Provision, ProvisioningRequest,
    SshKey, Username,
};
use tracing_subscriber::EnvFilter;

/// The flavors of the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// `--ssh-key` is optional, `--no-password` is available and a password
    /// is generated when none is given.
    Full,
    /// `--ssh-key` is required and no password is set unless one is given.
    Basic,
}

impl Variant {
    fn bin_name(self) -> &'static str {
        match self {
            Self::Full => "add-user",
            Self::Basic => "add-user-basic",
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Provision a new user account",
    long_about = "Provision a new user account

NOTE: This command must be run as root!

Creates the user with a home directory and login shell, sets up its password, adds it to the \
organizational group (created if missing), optionally to the sudo group, and installs an SSH \
public key into ~/.ssh/authorized_keys. A key already present in authorized_keys is not added \
again.

Steps that completed before a failure are not rolled back."
)]
pub struct Cli {
    /// Name of the account to create
    pub username: Username,

    /// Add the account to the sudo group
    #[arg(long)]
    pub sudo: bool,

    /// Path to a public key file, or the public key itself
    #[arg(long, value_name = "PATH|KEY")]
    pub ssh_key: Option<String>,

    /// Password of the account
    #[arg(long)]
    pub password: Option<String>,

    /// Expire the password so it must be changed at first login
    #[arg(long)]
    pub force_password_change: bool,

    /// Disable password authentication for the account
    #[arg(long)]
    pub no_password: bool,

    /// Path to a JSON configuration file
    #[arg(long, short, env = "ADD_USER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Organizational group to add the account to
    #[arg(long)]
    pub group: Option<String>,

    /// Disable colored output
    #[arg(
        long,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,
}

impl Cli {
    fn parse_for(variant: Variant) -> Result<Self, clap::Error> {
        let mut command = Cli::command().name(variant.bin_name());
        if variant == Variant::Basic {
            command = command.mut_arg("no_password", |arg| arg.hide(true));
        }
        let matches = command.try_get_matches()?;
        Self::from_arg_matches(&matches)
    }

    /// Load the configuration file, if any, and apply command line overrides.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?,
            None => Config::default(),
        };

        if let Some(group) = &self.group {
            config.group = group.clone();
        }
        if self.no_color {
            config.color = false;
        }
        config.validate().context("Invalid command line options")?;

        Ok(config)
    }

    fn request(&self, variant: Variant) -> Result<ProvisioningRequest, Error> {
        if variant == Variant::Basic {
            if self.no_password {
                return Err(Error::UnsupportedOption {
                    option: "--no-password",
                });
            }
            if self.ssh_key.is_none() {
                return Err(Error::MissingSshKey);
            }
        }

        let password = PasswordPolicy::from_options(
            self.password.clone(),
            self.no_password,
            variant == Variant::Full,
        )?;

        Ok(ProvisioningRequest::new(self.username.clone())
            .sudo(self.sudo)
            .ssh_key(self.ssh_key.clone().map(SshKey::new))
            .password(password)
            .force_password_change(self.force_password_change))
    }
}

fn setup_logging(color: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(color)
        .with_target(false)
        .without_time()
        .init();
}

/// Parse the command line, provision the account and print the summary.
pub fn run(variant: Variant) -> ExitCode {
    let cli = match Cli::parse_for(variant) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::FAILURE,
            };
        }
    };

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error:#}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(config.color);

    let result = cli
        .request(variant)
        .and_then(|request| Provision::new(request, config).provision(&Host::new()));

    match result {
        Ok(summary) => {
            println!();
            print!("{summary}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!("{error}");
            if error.is_usage() {
                eprintln!("Run '{} --help' for usage.", variant.bin_name());
            }
            ExitCode::FAILURE
        }
    }
}
