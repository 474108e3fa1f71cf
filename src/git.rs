use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tracing::debug;

use crate::error::AppError;

/// Remote consulted and rewritten by gitx
const DEFAULT_REMOTE: &str = "origin";

/// Repository configuration consumed by bind, unbind and status
///
/// Absent values are `Ok(None)`, not errors.
pub trait Repository {
    /// URL of `origin`, falling back to the first listed remote
    fn remote_url(&self) -> Result<Option<String>, AppError>;
    fn set_remote_url(&self, url: &str) -> Result<(), AppError>;
    fn local_config(&self, key: &str) -> Result<Option<String>, AppError>;
    /// Value from any config scope, local first
    fn effective_config(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set_local_config(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// Removes every local value of `key`; missing keys are fine
    fn unset_local_config(&self, key: &str) -> Result<(), AppError>;
}

/// Repository backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    git_dir: PathBuf,
}

impl GitCli {
    /// Opens the repository enclosing `dir`
    ///
    /// # Arguments
    /// * `dir` - Any directory inside the work tree
    pub fn discover(dir: &Path) -> Result<Self, AppError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["rev-parse", "--absolute-git-dir"])
            .output()?;

        if !output.status.success() {
            return Err(AppError::NotARepository);
        }

        let git_dir = PathBuf::from(String::from_utf8(output.stdout)?.trim());
        debug!(git_dir = %git_dir.display(), "found repository");
        Ok(Self {
            workdir: dir.to_path_buf(),
            git_dir,
        })
    }

    /// Opens the repository enclosing the current directory
    pub fn current() -> Result<Self, AppError> {
        let dir = std::env::current_dir()?;
        Self::discover(&dir)
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn git(&self, args: &[&str]) -> Result<Output, AppError> {
        Ok(Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .output()?)
    }

    /// Runs git and returns trimmed stdout, failing on a non-zero exit
    fn run(&self, args: &[&str]) -> Result<String, AppError> {
        let output = self.git(args)?;
        if !output.status.success() {
            return Err(AppError::GitCommand(
                String::from_utf8(output.stderr)?.trim().to_string(),
            ));
        }
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    /// Remote whose URL `remote_url` reports
    fn remote_name(&self) -> Result<String, AppError> {
        let names = self.run(&["remote"])?;
        let mut names = names.lines();
        let first = names.next().map(str::to_string);
        if first.as_deref() == Some(DEFAULT_REMOTE) || names.any(|n| n == DEFAULT_REMOTE) {
            return Ok(DEFAULT_REMOTE.to_string());
        }
        first.ok_or_else(|| AppError::GitCommand("no remote configured".to_string()))
    }

    /// Runs `git config --get`; exit status 1 means the key is unset
    fn config_get(&self, scope: Option<&str>, key: &str) -> Result<Option<String>, AppError> {
        let mut args = vec!["config"];
        args.extend(scope);
        args.extend(["--get", key]);

        let output = self.git(&args)?;
        match output.status.code() {
            Some(0) => Ok(Some(String::from_utf8(output.stdout)?.trim().to_string())),
            Some(1) => Ok(None),
            _ => Err(AppError::GitCommand(
                String::from_utf8(output.stderr)?.trim().to_string(),
            )),
        }
    }
}

impl Repository for GitCli {
    fn remote_url(&self) -> Result<Option<String>, AppError> {
        let output = self.git(&["remote", "get-url", DEFAULT_REMOTE])?;
        if output.status.success() {
            return Ok(Some(String::from_utf8(output.stdout)?.trim().to_string()));
        }

        let listing = self.run(&["remote", "-v"])?;
        Ok(listing
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .map(str::to_string))
    }

    fn set_remote_url(&self, url: &str) -> Result<(), AppError> {
        let name = self.remote_name()?;
        self.run(&["remote", "set-url", name.as_str(), url])?;
        Ok(())
    }

    fn local_config(&self, key: &str) -> Result<Option<String>, AppError> {
        self.config_get(Some("--local"), key)
    }

    fn effective_config(&self, key: &str) -> Result<Option<String>, AppError> {
        self.config_get(None, key)
    }

    fn set_local_config(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.run(&["config", "--local", key, value])?;
        Ok(())
    }

    fn unset_local_config(&self, key: &str) -> Result<(), AppError> {
        let output = self.git(&["config", "--local", "--unset-all", key])?;
        // Exit status 5 means the key was not set.
        match output.status.code() {
            Some(0) | Some(5) => Ok(()),
            _ => Err(AppError::GitCommand(
                String::from_utf8(output.stderr)?.trim().to_string(),
            )),
        }
    }
}
