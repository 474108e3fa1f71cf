use clap::{Parser, Subcommand};

use crate::identity::AuthMethod;

/// CLI arguments parser using `clap`
#[derive(Parser, Debug)]
#[command(name = "gitx", version, about = "Bind repositories to separate GitHub identities")]
pub struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Subcommand chosen to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Adds a new identity
    Add {
        /// Unique alias, e.g. 'work' or 'personal'
        alias: String,
        /// Git author name
        name: String,
        /// Git author email
        email: String,
        /// GitHub username
        github_user: String,
        /// How the identity authenticates
        #[arg(long, value_enum, default_value_t = AuthMethod::Ssh)]
        auth: AuthMethod,
        /// Private key path for ssh identities (default: ~/.ssh/gitx_<alias>)
        #[arg(long)]
        ssh_key: Option<String>,
        /// Show the identity without storing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Lists all stored identities
    List,
    /// Removes an identity and its SSH config entry
    Remove {
        /// Alias of identity to remove
        alias: String,
        /// Show what would be removed without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
        /// Also delete the SSH key pair
        #[arg(long)]
        delete_keys: bool,
    },
    /// Binds the current repository to an identity
    Bind {
        /// Alias of identity to bind
        alias: String,
        /// Show what would change without changing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Reverts repository-local changes made by bind
    Unbind,
    /// Displays the identity the current repository is bound to
    Status,
    /// Prints the SSH public key of an identity
    ShowKey {
        /// Alias of identity
        alias: String,
    },
    /// Installs a pre-push hook that blocks pushes from unbound repositories
    InstallHook,
    /// Removes the gitx pre-push hook
    UninstallHook,
}
