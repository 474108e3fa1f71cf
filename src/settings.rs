use std::path::PathBuf;

use crate::error::AppError;

/// Directory holding the identities file, relative to the home directory
const DEFAULT_GITX_DIR: &str = ".config/gitx";
/// Identities file name inside the gitx directory
const IDENTITIES_FILE: &str = "identities.json";
/// Number of SSH config backups kept after each reconciliation
const DEFAULT_BACKUP_KEEP: usize = 5;

/// Overrides the gitx directory
pub const ENV_GITX_HOME: &str = "GITX_HOME";
/// Overrides the SSH client config path
pub const ENV_SSH_CONFIG: &str = "GITX_SSH_CONFIG";
/// Overrides the backup retention count
pub const ENV_BACKUP_KEEP: &str = "GITX_BACKUP_KEEP";
/// Set to `0` or `false` to skip `ssh -G` on rewritten configs
pub const ENV_SSH_CHECK: &str = "GITX_SSH_CHECK";

/// Resolved locations and limits, threaded into every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub identities_path: PathBuf,
    pub ssh_config_path: PathBuf,
    pub backup_keep: usize,
    /// Run the OpenSSH syntax check before replacing the SSH config
    pub ssh_check: bool,
}

impl Settings {
    /// Resolves settings from the process environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::resolve(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Resolves settings from an arbitrary variable lookup
    ///
    /// # Arguments
    /// * `var` - Environment lookup, `None` when unset
    /// * `home_dir` - Home directory used for defaults
    pub fn resolve<F>(var: F, home_dir: Option<PathBuf>) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = || {
            home_dir.clone().ok_or_else(|| {
                AppError::Validation("failed to find the home directory".to_string())
            })
        };

        let gitx_dir = match non_empty(var(ENV_GITX_HOME)) {
            Some(dir) => PathBuf::from(dir),
            None => home()?.join(DEFAULT_GITX_DIR),
        };

        let ssh_config_path = match non_empty(var(ENV_SSH_CONFIG)) {
            Some(path) => PathBuf::from(path),
            None => home()?.join(".ssh").join("config"),
        };

        let backup_keep = match non_empty(var(ENV_BACKUP_KEEP)) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                AppError::Validation(format!("{ENV_BACKUP_KEEP} must be a number, got '{raw}'"))
            })?,
            None => DEFAULT_BACKUP_KEEP,
        };

        let ssh_check = match non_empty(var(ENV_SSH_CHECK)) {
            Some(raw) => !matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"),
            None => true,
        };

        Ok(Self {
            identities_path: gitx_dir.join(IDENTITIES_FILE),
            ssh_config_path,
            backup_keep,
            ssh_check,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve_with(vars: &[(&str, &str)]) -> Result<Settings, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::resolve(|key| vars.get(key).cloned(), Some(PathBuf::from("/home/dev")))
    }

    #[test]
    fn defaults_live_under_home() {
        let settings = resolve_with(&[]).unwrap();

        assert_eq!(
            settings.identities_path,
            PathBuf::from("/home/dev/.config/gitx/identities.json")
        );
        assert_eq!(settings.ssh_config_path, PathBuf::from("/home/dev/.ssh/config"));
        assert_eq!(settings.backup_keep, DEFAULT_BACKUP_KEEP);
        assert!(settings.ssh_check);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = resolve_with(&[
            (ENV_GITX_HOME, "/tmp/gitx"),
            (ENV_SSH_CONFIG, "/tmp/ssh_config"),
            (ENV_BACKUP_KEEP, "2"),
            (ENV_SSH_CHECK, "false"),
        ])
        .unwrap();

        assert_eq!(settings.identities_path, PathBuf::from("/tmp/gitx/identities.json"));
        assert_eq!(settings.ssh_config_path, PathBuf::from("/tmp/ssh_config"));
        assert_eq!(settings.backup_keep, 2);
        assert!(!settings.ssh_check);
    }

    #[test]
    fn rejects_non_numeric_retention() {
        let err = resolve_with(&[(ENV_BACKUP_KEEP, "lots")]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn missing_home_is_only_an_error_when_needed() {
        let settings = Settings::resolve(
            |key| match key {
                ENV_GITX_HOME => Some("/a".to_string()),
                ENV_SSH_CONFIG => Some("/b".to_string()),
                _ => None,
            },
            None,
        );
        assert!(settings.is_ok());

        assert!(Settings::resolve(|_| None, None).is_err());
    }
}
