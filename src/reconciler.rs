use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use tracing::{debug, info, warn};

use crate::{
    backup,
    error::AppError,
    ssh_block::{HostEntry, SshConfig, remove_entry, upsert_entry},
    storage::{sibling_path, write_private},
};

/// Suffix of the sibling file written before the atomic rename
const TEMP_SUFFIX: &str = ".gitx.tmp";
/// Host probed when validating a config after a removal
const FALLBACK_PROBE_HOST: &str = "github.com";

/// Syntax check run against the rewritten config before it replaces the original
pub trait SyntaxChecker {
    /// Returns a description of the problem when `config_path` is rejected
    fn check(&self, config_path: &Path, host: &str) -> Result<(), String>;
}

/// Asks the OpenSSH client to evaluate the config for a host
#[derive(Debug, Default, Clone, Copy)]
pub struct SshSyntaxCheck;

impl SyntaxChecker for SshSyntaxCheck {
    fn check(&self, config_path: &Path, host: &str) -> Result<(), String> {
        let output = Command::new("ssh")
            .arg("-G")
            .arg("-F")
            .arg(config_path)
            .arg(host)
            .output()
            .map_err(|err| format!("could not run ssh: {err}"))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

/// Skips validation entirely
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSyntaxCheck;

impl SyntaxChecker for NoSyntaxCheck {
    fn check(&self, _config_path: &Path, _host: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Result of one reconciliation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// False when the rendered content equals what is on disk
    pub changed: bool,
    /// Copy of the previous file, if one existed
    pub backup: Option<PathBuf>,
    /// Syntax check failure; the new content was still written
    pub warning: Option<String>,
}

/// The user's SSH client config and the rules for rewriting it
pub struct SshConfigFile {
    path: PathBuf,
    checker: Box<dyn SyntaxChecker>,
}

impl SshConfigFile {
    pub fn new(path: PathBuf) -> Self {
        Self::with_checker(path, Box::new(SshSyntaxCheck))
    }

    pub fn with_checker(path: PathBuf, checker: Box<dyn SyntaxChecker>) -> Self {
        Self { path, checker }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the current file; a missing file is empty
    pub fn load(&self) -> Result<SshConfig, AppError> {
        Ok(SshConfig::parse(&self.read_raw()?.unwrap_or_default()))
    }

    /// Points `host_alias` at `key_path`, adding the entry if needed
    pub fn upsert(&self, host_alias: &str, key_path: &str) -> Result<Reconciliation, AppError> {
        let entry = HostEntry::new(host_alias, key_path);
        self.reconcile(host_alias, |entries| upsert_entry(entries, entry))
    }

    /// Drops every entry for `host_alias`
    pub fn remove(&self, host_alias: &str) -> Result<Reconciliation, AppError> {
        self.reconcile(FALLBACK_PROBE_HOST, |entries| remove_entry(entries, host_alias))
    }

    fn reconcile<F>(&self, probe_host: &str, update: F) -> Result<Reconciliation, AppError>
    where
        F: FnOnce(&[HostEntry]) -> Vec<HostEntry>,
    {
        let raw = self.read_raw()?;
        let current = SshConfig::parse(raw.as_deref().unwrap_or_default());
        let next = SshConfig {
            entries: update(&current.entries),
            ..current
        };
        let rendered = next.render();

        let unchanged = match &raw {
            Some(existing) => *existing == rendered,
            None => rendered.is_empty(),
        };
        if unchanged {
            debug!(path = %self.path.display(), "ssh config already up to date");
            return Ok(Reconciliation::default());
        }

        let backup = backup::create_backup(&self.path)?;
        let warning = self.persist(&rendered, probe_host)?;

        info!(path = %self.path.display(), entries = next.entries.len(), "rewrote ssh config");
        Ok(Reconciliation {
            changed: true,
            backup,
            warning,
        })
    }

    /// Writes a sibling temp file, validates it and renames it into place
    fn persist(&self, contents: &str, probe_host: &str) -> Result<Option<String>, AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(AppError::config_io(format!(
                    "failed to create {}",
                    parent.display()
                )))?;
                #[cfg(unix)]
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(
                    AppError::config_io(format!("failed to restrict {}", parent.display())),
                )?;
            }
        }

        let temp_path = sibling_path(&self.path, TEMP_SUFFIX);
        debug!(temp = %temp_path.display(), "writing candidate ssh config");

        let result = write_private(&temp_path, contents.as_bytes()).and_then(|()| {
            let warning = self.checker.check(&temp_path, probe_host).err();
            if let Some(reason) = &warning {
                warn!(reason = %reason, "ssh config syntax check failed");
            }
            fs::rename(&temp_path, &self.path)
                .map(|()| warning)
                .map_err(AppError::config_io(format!(
                    "failed to replace {}",
                    self.path.display()
                )))
        });

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn read_raw(&self) -> Result<Option<String>, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AppError::ConfigIo {
                context: format!("failed to read {}", self.path.display()),
                source,
            }),
        }
    }
}
