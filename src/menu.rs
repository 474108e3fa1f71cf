use colored::Colorize;
use inquire::{Confirm, Select};

use crate::{
    commands::{
        self, AddOptions, BindOptions, NewIdentity, RemoveOptions, Workspace, print_status,
    },
    error::AppError,
    git::GitCli,
    identity::{AuthMethod, Identity},
    validation::{
        BACK_OPTION, prompt_until_valid, validate_input_alias, validate_input_email,
        validate_input_github_user, validate_input_name,
    },
};

/// Runs interactive menu interface
pub fn run_menu(ws: &Workspace) -> Result<(), AppError> {
    loop {
        let actions: Vec<&'static str> = vec![
            "bind repository",
            "unbind repository",
            "show status",
            "add identity",
            "remove identity",
            "show all identities",
            "quit",
        ];

        let action_selected: &'static str =
            Select::new(&format!("{}", "select action".blue()), actions).prompt()?;

        let result = match action_selected {
            "bind repository" => menu_bind(ws),
            "unbind repository" => GitCli::current().and_then(|repo| commands::unbind(&repo).map(|_| ())),
            "show status" => GitCli::current()
                .and_then(|repo| commands::status(ws, &repo))
                .map(|report| print_status(&report)),
            "add identity" => menu_add_identity(ws),
            "remove identity" => menu_remove_identity(ws),
            "show all identities" => commands::list_identities(ws),
            "quit" => {
                println!("{}", "quitting".yellow());
                break Ok(());
            }
            _ => unreachable!("unexpected input"),
        };

        // Keep the menu alive on ordinary failures, bail out when the prompt itself fails.
        match result {
            Err(AppError::Inquire(err)) => return Err(AppError::Inquire(err)),
            Err(err) => println!("{} {}", "error:".red(), err),
            Ok(()) => {}
        }
    }
}

/// Menu for binding the current repository
fn menu_bind(ws: &Workspace) -> Result<(), AppError> {
    let repo = GitCli::current()?;
    let identities = ws.store.list()?;
    let Some(alias) = select_alias("select identity to bind:", &identities)? else {
        return Ok(());
    };
    commands::bind(ws, &repo, &alias, BindOptions::default())?;
    Ok(())
}

/// Menu for adding a new identity
fn menu_add_identity(ws: &Workspace) -> Result<(), AppError> {
    let identities = ws.store.list()?;

    let alias = prompt_until_valid(&format!("{}", "enter alias:".blue()), |input| {
        validate_input_alias(input, &identities)
    })?;
    let name = prompt_until_valid(&format!("{}", "enter git name:".blue()), validate_input_name)?;
    let email =
        prompt_until_valid(&format!("{}", "enter git email:".blue()), validate_input_email)?;
    let github_user = prompt_until_valid(
        &format!("{}", "enter github username:".blue()),
        validate_input_github_user,
    )?;
    let auth_method = Select::new(
        &format!("{}", "select auth method:".blue()),
        vec![AuthMethod::Ssh, AuthMethod::Pat],
    )
    .prompt()?;

    commands::add_identity(
        ws,
        NewIdentity {
            alias,
            name,
            email,
            github_user,
            auth_method,
            ssh_key_path: None,
        },
        AddOptions::default(),
    )?;
    Ok(())
}

/// Menu for removing an identity
fn menu_remove_identity(ws: &Workspace) -> Result<(), AppError> {
    let identities = ws.store.list()?;
    let Some(alias) = select_alias("select identity to remove:", &identities)? else {
        return Ok(());
    };

    let delete_keys = Confirm::new("delete SSH key files too?")
        .with_default(false)
        .prompt()?;
    let options = RemoveOptions {
        delete_keys,
        ..RemoveOptions::default()
    };
    commands::remove_identity(ws, &alias, options, confirm)?;
    Ok(())
}

/// Asks a yes/no question, defaulting to no
pub fn confirm(question: &str) -> Result<bool, AppError> {
    Ok(Confirm::new(question).with_default(false).prompt()?)
}

/// Lets the user pick an alias; `None` when they choose to go back
fn select_alias(prompt: &str, identities: &[Identity]) -> Result<Option<String>, AppError> {
    if identities.is_empty() {
        return Err(AppError::Validation("no identities found".to_string()));
    }

    let aliases = build_alias_list(identities);
    let selected = Select::new(&format!("{}", prompt.blue()), aliases).prompt()?;
    Ok((selected != BACK_OPTION).then_some(selected))
}

/// Builds list of identity aliases for menu to display
pub fn build_alias_list(identities: &[Identity]) -> Vec<String> {
    let mut aliases: Vec<String> = identities
        .iter()
        .map(|identity| identity.alias.clone())
        .collect();
    aliases.push(BACK_OPTION.to_string());
    aliases
}
