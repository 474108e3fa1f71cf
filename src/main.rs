mod backup;
mod binding;
mod cli;
mod commands;
mod error;
mod git;
mod hook;
mod identity;
mod menu;
mod reconciler;
mod remote;
mod settings;
mod ssh_block;
mod storage;
mod validation;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cli::{Cli, Commands},
    commands::{AddOptions, BindOptions, NewIdentity, RemoveOptions, Workspace},
    error::AppError,
    git::GitCli,
    hook::HookChange,
    settings::Settings,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red(), err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level picked by `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let ws = Workspace::from_settings(&settings);

    match cli.command {
        Some(Commands::Add {
            alias,
            name,
            email,
            github_user,
            auth,
            ssh_key,
            dry_run,
        }) => {
            let new = NewIdentity {
                alias,
                name,
                email,
                github_user,
                auth_method: auth,
                ssh_key_path: ssh_key,
            };
            commands::add_identity(&ws, new, AddOptions { dry_run })?;
        }
        Some(Commands::List) => commands::list_identities(&ws)?,
        Some(Commands::Remove {
            alias,
            dry_run,
            force,
            delete_keys,
        }) => {
            let options = RemoveOptions {
                dry_run,
                force,
                delete_keys,
            };
            let outcome = commands::remove_identity(&ws, &alias, options, menu::confirm)?;
            if !outcome.warnings.is_empty() {
                eprintln!(
                    "{}",
                    "some cleanup steps failed, see warnings above".yellow()
                );
            }
        }
        Some(Commands::Bind { alias, dry_run }) => {
            let repo = GitCli::current()?;
            commands::bind(&ws, &repo, &alias, BindOptions { dry_run })?;
        }
        Some(Commands::Unbind) => {
            let repo = GitCli::current()?;
            commands::unbind(&repo)?;
        }
        Some(Commands::Status) => {
            let repo = GitCli::current()?;
            let report = commands::status(&ws, &repo)?;
            commands::print_status(&report);
        }
        Some(Commands::ShowKey { alias }) => {
            let key = commands::show_key(&ws, &alias)?;
            print!("{key}");
            if !key.ends_with('\n') {
                println!();
            }
            println!(
                "{}",
                "add this key at https://github.com/settings/ssh/new".blue()
            );
        }
        Some(Commands::InstallHook) => {
            let repo = GitCli::current()?;
            match hook::install_hook(repo.git_dir())? {
                HookChange::Installed => println!("{}", "pre-push hook installed".green()),
                HookChange::AlreadyInstalled => {
                    println!("{}", "gitx pre-push hook already installed".yellow())
                }
                _ => println!(
                    "{}",
                    "a pre-push hook already exists, gitx hook not installed".yellow()
                ),
            }
        }
        Some(Commands::UninstallHook) => {
            let repo = GitCli::current()?;
            match hook::uninstall_hook(repo.git_dir())? {
                HookChange::Removed => println!("{}", "pre-push hook uninstalled".green()),
                HookChange::NotInstalled => println!("{}", "no pre-push hook found".yellow()),
                _ => println!(
                    "{}",
                    "pre-push hook exists but was not written by gitx".yellow()
                ),
            }
        }
        None => menu::run_menu(&ws)?,
    }

    Ok(())
}
