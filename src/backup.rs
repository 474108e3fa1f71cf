use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use chrono::Local;
use tracing::{debug, warn};

use crate::{error::AppError, storage::sibling_path};

/// Infix between the config path and the backup timestamp
const BACKUP_INFIX: &str = ".gitx.backup.";
/// Timestamp layout; lexical order equals chronological order
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
/// Counter limit for backups taken within one second
const MAX_SAME_SECOND: u32 = 999;

/// Backup path for `config_path` taken at `timestamp`
pub fn backup_path(config_path: &Path, timestamp: &str) -> PathBuf {
    sibling_path(config_path, &format!("{BACKUP_INFIX}{timestamp}"))
}

/// Copies the config file to a timestamped sibling
///
/// Returns `None` when there is no file to back up.
pub fn create_backup(config_path: &Path) -> Result<Option<PathBuf>, AppError> {
    let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
    create_backup_at(config_path, &timestamp)
}

/// Backs up under `timestamp`, never overwriting an earlier backup
///
/// A taken name gets a zero-padded counter (`-001`, `-002`, ...) so name order
/// stays chronological.
fn create_backup_at(config_path: &Path, timestamp: &str) -> Result<Option<PathBuf>, AppError> {
    let mut source = match File::open(config_path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AppError::ConfigIo {
                context: format!("failed to read {}", config_path.display()),
                source,
            });
        }
    };

    let (path, mut backup) = open_unused(config_path, timestamp)?;
    let copied = io::copy(&mut source, &mut backup).and_then(|_| backup.sync_all());
    if let Err(source) = copied {
        let _ = fs::remove_file(&path);
        return Err(AppError::ConfigIo {
            context: format!(
                "failed to back up {} to {}",
                config_path.display(),
                path.display()
            ),
            source,
        });
    }

    debug!(backup = %path.display(), "backed up ssh config");
    Ok(Some(path))
}

fn open_unused(config_path: &Path, timestamp: &str) -> Result<(PathBuf, File), AppError> {
    for attempt in 0..=MAX_SAME_SECOND {
        let stamp = match attempt {
            0 => timestamp.to_string(),
            n => format!("{timestamp}-{n:03}"),
        };
        let path = backup_path(config_path, &stamp);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        match options.open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(AppError::ConfigIo {
                    context: format!("failed to create backup {}", path.display()),
                    source,
                });
            }
        }
    }

    Err(AppError::ConfigIo {
        context: format!("failed to back up {}", config_path.display()),
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("too many backups for {timestamp}"),
        ),
    })
}

/// Lists backups of `config_path`, oldest first by file name
pub fn list_backups(config_path: &Path) -> Result<Vec<PathBuf>, AppError> {
    let Some(file_name) = config_path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{file_name}{BACKUP_INFIX}");
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let read_dir = fs::read_dir(&dir).map_err(AppError::config_io(format!(
        "failed to list {}",
        dir.display()
    )))?;

    let mut backups: Vec<PathBuf> = read_dir
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .map(|entry| entry.path())
        .collect();
    backups.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(backups)
}

/// Deletes all but the `keep` most recent backups
///
/// Deletion failures are logged and skipped. Returns the removed paths.
pub fn prune_backups(config_path: &Path, keep: usize) -> Result<Vec<PathBuf>, AppError> {
    let backups = list_backups(config_path)?;
    let excess = backups.len().saturating_sub(keep);

    let mut removed = Vec::new();
    for path in backups.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(err) => warn!(backup = %path.display(), error = %err, "failed to remove old backup"),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn backup_path_appends_timestamp() {
        let path = backup_path(Path::new("/home/dev/.ssh/config"), "20240102-030405");
        assert_eq!(
            path,
            PathBuf::from("/home/dev/.ssh/config.gitx.backup.20240102-030405")
        );
    }

    #[test]
    fn no_backup_without_config() {
        let temp = TempDir::new().unwrap();
        let backup = create_backup(&temp.path().join("config")).unwrap();
        assert!(backup.is_none());
    }

    #[test]
    fn backup_copies_content() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        fs::write(&config, "Host a\n").unwrap();

        let backup = create_backup(&config).unwrap().expect("backup created");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "Host a\n");
        assert_eq!(list_backups(&config).unwrap(), vec![backup]);
    }

    #[test]
    fn same_second_backups_get_counters() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        let stamp = "20240102-030405";

        fs::write(&config, "first\n").unwrap();
        let first = create_backup_at(&config, stamp).unwrap().unwrap();
        fs::write(&config, "second\n").unwrap();
        let second = create_backup_at(&config, stamp).unwrap().unwrap();
        fs::write(&config, "third\n").unwrap();
        let third = create_backup_at(&config, stamp).unwrap().unwrap();

        assert_eq!(first, backup_path(&config, stamp));
        assert_eq!(second, backup_path(&config, "20240102-030405-001"));
        assert_eq!(fs::read_to_string(&first).unwrap(), "first\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "second\n");
        assert_eq!(fs::read_to_string(&third).unwrap(), "third\n");

        fs::write(backup_path(&config, "20240102-030406"), "").unwrap();
        let listed = list_backups(&config).unwrap();
        assert_eq!(listed[..3], [first, second, third]);
        assert_eq!(listed[3], backup_path(&config, "20240102-030406"));
    }

    #[test]
    fn prune_keeps_newest_by_name() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        fs::write(&config, "").unwrap();
        fs::write(temp.path().join("unrelated"), "").unwrap();
        for stamp in ["20240103-000000", "20240101-000000", "20240102-000000"] {
            fs::write(backup_path(&config, stamp), stamp).unwrap();
        }

        let removed = prune_backups(&config, 2).unwrap();

        assert_eq!(removed, vec![backup_path(&config, "20240101-000000")]);
        assert_eq!(
            list_backups(&config).unwrap(),
            vec![
                backup_path(&config, "20240102-000000"),
                backup_path(&config, "20240103-000000"),
            ]
        );
        assert!(temp.path().join("unrelated").exists());
    }

    #[test]
    fn prune_below_limit_is_noop() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        fs::write(backup_path(&config, "20240101-000000"), "").unwrap();

        assert!(prune_backups(&config, 5).unwrap().is_empty());
        assert_eq!(list_backups(&config).unwrap().len(), 1);
    }
}
