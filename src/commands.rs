use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use colored::Colorize;
use tracing::{debug, info, warn};

use crate::{
    backup,
    binding::{BINDING_MARKER_KEY, Binding, BindingSource, resolve_binding},
    error::{AppError, StepContext},
    git::Repository,
    identity::{AuthMethod, HOST_ALIAS_PREFIX, Identity, host_alias_for},
    reconciler::{NoSyntaxCheck, Reconciliation, SshConfigFile},
    remote,
    settings::Settings,
    storage::IdentityStore,
    validation::{
        validate_input_alias, validate_input_email, validate_input_github_user,
        validate_input_name,
    },
};

const USER_NAME_KEY: &str = "user.name";
const USER_EMAIL_KEY: &str = "user.email";
const NOT_SET: &str = "(not set)";

/// The two stores gitx rewrites, plus how many SSH config backups to keep
pub struct Workspace {
    pub store: IdentityStore,
    pub ssh: SshConfigFile,
    pub backup_keep: usize,
}

impl Workspace {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            store: IdentityStore::new(settings.identities_path.clone()),
            ssh: if settings.ssh_check {
                SshConfigFile::new(settings.ssh_config_path.clone())
            } else {
                SshConfigFile::with_checker(
                    settings.ssh_config_path.clone(),
                    Box::new(NoSyntaxCheck),
                )
            },
            backup_keep: settings.backup_keep,
        }
    }

    /// Default private key location for an alias, next to the SSH config
    fn default_key_path(&self, alias: &str) -> PathBuf {
        self.ssh
            .path()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("gitx_{alias}"))
    }

    /// Reports a reconciliation and trims old backups
    fn after_reconcile(&self, outcome: &Reconciliation) {
        if let Some(backup) = &outcome.backup {
            println!("{} {}", "ssh config backed up to:".green(), backup.display());
        }
        if let Some(reason) = &outcome.warning {
            eprintln!(
                "{} {}",
                "warning: ssh could not validate the new config:".yellow(),
                reason
            );
        }
        if outcome.changed {
            println!("{} {}", "ssh config updated:".green(), self.ssh.path().display());
        }

        match backup::prune_backups(self.ssh.path(), self.backup_keep) {
            Ok(removed) if !removed.is_empty() => {
                debug!(count = removed.len(), "pruned old ssh config backups")
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "failed to prune ssh config backups"),
        }
    }
}

/// Options for `add`
#[derive(Debug, Default, Clone, Copy)]
pub struct AddOptions {
    pub dry_run: bool,
}

/// Options for `bind`
#[derive(Debug, Default, Clone, Copy)]
pub struct BindOptions {
    pub dry_run: bool,
}

/// Options for `remove`
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveOptions {
    pub dry_run: bool,
    pub force: bool,
    pub delete_keys: bool,
}

/// Fields collected for a new identity
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub alias: String,
    pub name: String,
    pub email: String,
    pub github_user: String,
    pub auth_method: AuthMethod,
    pub ssh_key_path: Option<String>,
}

/// Validates and stores a new identity
///
/// SSH identities get a host alias and a key path; the key itself is not
/// generated here.
pub fn add_identity(
    ws: &Workspace,
    new: NewIdentity,
    options: AddOptions,
) -> Result<Identity, AppError> {
    let existing = ws.store.list()?;
    validate_input_alias(&new.alias, &existing)?;
    validate_input_name(&new.name)?;
    validate_input_email(&new.email)?;
    validate_input_github_user(&new.github_user)?;

    let (ssh_key_path, ssh_host_alias) = match new.auth_method {
        AuthMethod::Ssh => {
            let key = new
                .ssh_key_path
                .unwrap_or_else(|| ws.default_key_path(&new.alias).to_string_lossy().into_owned());
            (Some(key), Some(host_alias_for(&new.alias)))
        }
        AuthMethod::Pat if new.ssh_key_path.is_some() => {
            return Err(AppError::Validation(
                "an SSH key path only applies to ssh identities".to_string(),
            ));
        }
        AuthMethod::Pat => (None, None),
    };

    let identity = Identity {
        alias: new.alias,
        name: new.name,
        email: new.email,
        github_user: new.github_user,
        ssh_key_path,
        auth_method: new.auth_method,
        ssh_host_alias,
    };

    if options.dry_run {
        println!("{}", "[dry run] would add identity:".yellow());
        print_identity(&identity);
        return Ok(identity);
    }

    if let Some(key) = &identity.ssh_key_path {
        if !Path::new(key).exists() {
            eprintln!(
                "{} {key}\n  generate it with: ssh-keygen -t ed25519 -f {key} -C gitx-{}",
                "warning: no private key at".yellow(),
                identity.alias
            );
        }
    }

    ws.store.add(identity.clone())?;
    info!(alias = %identity.alias, store = %ws.store.path().display(), "added identity");
    println!("{} {}", "identity added:".green(), identity.alias);
    Ok(identity)
}

/// Prints all stored identities
pub fn list_identities(ws: &Workspace) -> Result<(), AppError> {
    let identities = ws.store.list()?;
    if identities.is_empty() {
        println!(
            "{}",
            "no identities configured, add one with 'gitx add'".yellow()
        );
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<16} {:<24} {:<32} {}", "alias", "name", "email", "auth").blue()
    );
    for identity in &identities {
        println!(
            "{:<16} {:<24} {:<32} {}",
            identity.alias, identity.name, identity.email, identity.auth_method
        );
    }
    Ok(())
}

/// Changes a bind will make
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindPlan {
    pub identity: Identity,
    /// Current and new remote URL, when the remote changes
    pub remote_change: Option<(String, String)>,
    pub has_remote: bool,
}

/// Remote URL shape an identity expects
pub fn target_remote(identity: &Identity, current: &str) -> String {
    match identity.auth_method {
        AuthMethod::Ssh => match identity
            .ssh_host_alias
            .as_deref()
            .and_then(|host| host.strip_prefix(HOST_ALIAS_PREFIX))
        {
            Some(alias) => remote::alias_ssh_remote(&remote::to_canonical_ssh(current), alias),
            None => current.to_string(),
        },
        AuthMethod::Pat => remote::to_https(current),
    }
}

/// Binds the repository to an identity
///
/// Steps run in order: author config, marker, SSH host entry, remote URL.
/// A failing step is reported by name and earlier steps stay applied.
pub fn bind<R: Repository>(
    ws: &Workspace,
    repo: &R,
    alias: &str,
    options: BindOptions,
) -> Result<BindPlan, AppError> {
    let identity = ws.store.find_by_alias(alias)?;
    let current_remote = repo.remote_url().step("failed to read remote URL")?;

    let remote_change = current_remote.as_deref().and_then(|current| {
        let target = target_remote(&identity, current);
        (target != current).then(|| (current.to_string(), target))
    });
    let plan = BindPlan {
        identity,
        remote_change,
        has_remote: current_remote.is_some(),
    };

    if options.dry_run {
        print_bind_plan(ws, repo, &plan)?;
        return Ok(plan);
    }

    let identity = &plan.identity;
    repo.set_local_config(USER_NAME_KEY, &identity.name)
        .step("failed to set user.name")?;
    repo.set_local_config(USER_EMAIL_KEY, &identity.email)
        .step("failed to set user.email")?;
    repo.set_local_config(BINDING_MARKER_KEY, &identity.alias)
        .step("failed to set binding marker")?;

    if let Some((host_alias, key_path)) = identity.ssh_host_entry() {
        let outcome = ws
            .ssh
            .upsert(host_alias, key_path)
            .step("failed to update SSH config")?;
        ws.after_reconcile(&outcome);
    }

    match &plan.remote_change {
        Some((from, to)) => {
            repo.set_remote_url(to).step("failed to update remote URL")?;
            info!(from = %from, to = %to, "rewrote remote");
            println!("{} {} -> {}", "remote updated:".green(), from, to);
        }
        None if !plan.has_remote => {
            println!("{}", "no remote configured, remote URL left alone".yellow())
        }
        None => {}
    }

    println!("{} {}", "repository bound to identity:".green(), identity.alias);
    Ok(plan)
}

fn print_bind_plan<R: Repository>(
    ws: &Workspace,
    repo: &R,
    plan: &BindPlan,
) -> Result<(), AppError> {
    let identity = &plan.identity;
    let current_name = repo.local_config(USER_NAME_KEY)?.unwrap_or_default();
    let current_email = repo.local_config(USER_EMAIL_KEY)?.unwrap_or_default();
    let current_marker = repo.local_config(BINDING_MARKER_KEY)?.unwrap_or_default();

    println!("{}", "[dry run] would make the following changes:".yellow());
    println!("  user.name: '{current_name}' -> '{}'", identity.name);
    println!("  user.email: '{current_email}' -> '{}'", identity.email);
    println!("  {BINDING_MARKER_KEY}: '{current_marker}' -> '{}'", identity.alias);
    if let Some((host_alias, key_path)) = identity.ssh_host_entry() {
        let present = ws
            .ssh
            .load()?
            .entries
            .iter()
            .any(|e| e.host_alias == host_alias && e.identity_file == key_path);
        if present {
            println!("  ssh config: Host {host_alias} already up to date");
        } else {
            println!("  ssh config: Host {host_alias} -> IdentityFile {key_path}");
        }
    }
    if let Some((from, to)) = &plan.remote_change {
        println!("  remote URL: '{from}' -> '{to}'");
    }
    Ok(())
}

/// What an unbind did to the remote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnbindReport {
    pub remote_restored: Option<String>,
    pub warning: Option<String>,
}

/// Reverts the repository-local changes made by bind
///
/// Restoring the remote URL is best effort and only produces a warning.
pub fn unbind<R: Repository>(repo: &R) -> Result<UnbindReport, AppError> {
    for key in [USER_NAME_KEY, USER_EMAIL_KEY, BINDING_MARKER_KEY] {
        repo.unset_local_config(key)
            .step(&format!("failed to unset {key}"))?;
    }

    let mut report = UnbindReport::default();
    let restored = repo.remote_url().and_then(|url| match url {
        Some(url) if remote::bound_alias(&url).is_some() => {
            let canonical = remote::to_canonical_ssh(&url);
            repo.set_remote_url(&canonical).map(|()| Some(canonical))
        }
        _ => Ok(None),
    });
    match restored {
        Ok(url) => report.remote_restored = url,
        Err(err) => {
            warn!(error = %err, "could not revert remote URL");
            report.warning = Some(format!("could not revert remote URL: {err}"));
        }
    }

    if let Some(url) = &report.remote_restored {
        println!("{} {}", "remote restored:".green(), url);
    }
    if let Some(warning) = &report.warning {
        eprintln!("{} {}", "warning:".yellow(), warning);
    }
    println!("{}", "repository unbound".green());
    Ok(report)
}

/// Identity state of a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub name: Option<String>,
    pub email: Option<String>,
    pub remote: Option<String>,
    pub binding: Binding,
}

/// Collects the author, remote and binding of a repository
pub fn status<R: Repository>(ws: &Workspace, repo: &R) -> Result<StatusReport, AppError> {
    let name = repo.effective_config(USER_NAME_KEY)?;
    let email = repo.effective_config(USER_EMAIL_KEY)?;
    let remote = repo.remote_url()?;
    let marker = repo.local_config(BINDING_MARKER_KEY)?;

    let known: BTreeSet<String> = ws
        .store
        .list()?
        .into_iter()
        .map(|identity| identity.alias)
        .collect();
    let binding = resolve_binding(marker.as_deref(), remote.as_deref(), &known);
    debug!(alias = ?binding.alias(), "resolved binding");

    Ok(StatusReport {
        name,
        email,
        remote,
        binding,
    })
}

pub fn print_status(report: &StatusReport) {
    let or_unset = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_SET.to_string());

    println!("{}", "repository identity status".blue());
    println!("  name:   {}", or_unset(&report.name));
    println!("  email:  {}", or_unset(&report.email));
    println!("  remote: {}", or_unset(&report.remote));
    match &report.binding {
        Binding::Bound { alias, source } => {
            println!("{} {}", "bound to:".green(), alias);
            if let BindingSource::RemoteUrl { orphaned: true } = source {
                println!(
                    "{}",
                    format!("note: identity '{alias}' is no longer configured").yellow()
                );
            }
        }
        Binding::Unbound => println!("{}", "not bound to any identity".yellow()),
    }
}

/// Result of a remove
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: bool,
    /// Best-effort cleanup steps that failed
    pub warnings: Vec<String>,
}

/// Removes an identity along with its SSH host entry and, optionally, its key files
///
/// # Arguments
/// * `confirm` - Asked before anything changes unless `force` is set
pub fn remove_identity<C>(
    ws: &Workspace,
    alias: &str,
    options: RemoveOptions,
    confirm: C,
) -> Result<RemoveOutcome, AppError>
where
    C: FnOnce(&str) -> Result<bool, AppError>,
{
    let identity = ws.store.find_by_alias(alias)?;
    let key_files: Vec<PathBuf> = match (&identity.ssh_key_path, options.delete_keys) {
        (Some(key), true) => vec![PathBuf::from(key), PathBuf::from(format!("{key}.pub"))],
        _ => Vec::new(),
    };

    println!("{} {}", "removing identity:".blue(), alias);
    println!("  identity record");
    if let Some(host_alias) = &identity.ssh_host_alias {
        println!("  ssh config entry: {host_alias}");
    }
    for path in &key_files {
        println!("  key file: {}", path.display());
    }

    if options.dry_run {
        println!("{}", "[dry run] no changes were made".yellow());
        return Ok(RemoveOutcome::default());
    }

    if !options.force && !confirm(&format!("remove identity '{alias}'?"))? {
        println!("{}", "cancelled".yellow());
        return Ok(RemoveOutcome::default());
    }

    let mut warnings = Vec::new();

    if let Some(host_alias) = &identity.ssh_host_alias {
        match ws.ssh.remove(host_alias) {
            Ok(outcome) => ws.after_reconcile(&outcome),
            Err(err) => warnings.push(format!("failed to remove SSH config entry: {err}")),
        }
    }

    for path in &key_files {
        match fs::remove_file(path) {
            Ok(()) => println!("{} {}", "deleted key file:".green(), path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warnings.push(format!("failed to delete {}: {err}", path.display())),
        }
    }

    for warning in &warnings {
        warn!(alias, "{warning}");
        eprintln!("{} {}", "warning:".yellow(), warning);
    }

    ws.store
        .remove(alias)
        .step("failed to remove identity from store")?;
    info!(alias, "removed identity");
    println!("{} {}", "identity removed:".green(), alias);

    Ok(RemoveOutcome {
        removed: true,
        warnings,
    })
}

/// Reads the public key of an SSH identity
pub fn show_key(ws: &Workspace, alias: &str) -> Result<String, AppError> {
    let identity = ws.store.find_by_alias(alias)?;
    let key = identity.ssh_key_path.ok_or_else(|| {
        AppError::Validation(format!("identity '{alias}' does not have an SSH key"))
    })?;

    let public_key = format!("{key}.pub");
    fs::read_to_string(&public_key).map_err(AppError::config_io(format!(
        "failed to read public key {public_key}"
    )))
}

fn print_identity(identity: &Identity) {
    println!("  alias:  {}", identity.alias);
    println!("  name:   {}", identity.name);
    println!("  email:  {}", identity.email);
    println!("  github: {}", identity.github_user);
    println!("  auth:   {}", identity.auth_method);
    if let Some(key) = &identity.ssh_key_path {
        println!("  key:    {key}");
    }
}
