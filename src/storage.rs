use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::AppError, identity::Identity};

/// Suffix of the sibling file written before the atomic rename
const TEMP_SUFFIX: &str = ".tmp";

/// On-disk shape of the identities file
#[derive(Serialize, Deserialize, Debug, Default)]
struct IdentitiesFile {
    identities: Vec<Identity>,
}

/// Ordered, alias-keyed collection of identities backed by a JSON file
///
/// Every mutation loads the whole sequence, derives a new one and replaces
/// the file atomically.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists identities in file order
    pub fn list(&self) -> Result<Vec<Identity>, AppError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(AppError::config_io(format!(
            "failed to read identities from {}",
            self.path.display()
        )))?;

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: IdentitiesFile = serde_json::from_str(&contents)?;
        Ok(file.identities)
    }

    /// Finds a single identity
    ///
    /// # Arguments
    /// * `alias` - Alias of the identity to look up
    pub fn find_by_alias(&self, alias: &str) -> Result<Identity, AppError> {
        self.list()?
            .into_iter()
            .find(|identity| identity.alias == alias)
            .ok_or_else(|| AppError::IdentityNotFound(alias.to_string()))
    }

    /// Adds a new identity, failing when the alias is taken
    pub fn add(&self, identity: Identity) -> Result<(), AppError> {
        let identities = with_identity(&self.list()?, identity)?;
        self.save(&identities)
    }

    /// Removes an identity, returning the removed record
    pub fn remove(&self, alias: &str) -> Result<Identity, AppError> {
        let (identities, removed) = without_identity(&self.list()?, alias)?;
        self.save(&identities)?;
        Ok(removed)
    }

    fn save(&self, identities: &[Identity]) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(&IdentitiesFile {
            identities: identities.to_vec(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(AppError::config_io(format!(
                "failed to create {}",
                parent.display()
            )))?;
        }

        let temp_path = sibling_path(&self.path, TEMP_SUFFIX);
        let result = write_private(&temp_path, json.as_bytes()).and_then(|()| {
            fs::rename(&temp_path, &self.path).map_err(AppError::config_io(format!(
                "failed to replace {}",
                self.path.display()
            )))
        });
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result?;

        debug!(path = %self.path.display(), count = identities.len(), "saved identities");
        Ok(())
    }
}

/// Returns a new sequence with `identity` appended
pub fn with_identity(identities: &[Identity], identity: Identity) -> Result<Vec<Identity>, AppError> {
    if identities.iter().any(|existing| existing.alias == identity.alias) {
        return Err(AppError::AliasConflict(identity.alias));
    }
    let mut next = identities.to_vec();
    next.push(identity);
    Ok(next)
}

/// Returns a new sequence without `alias`, together with the dropped record
pub fn without_identity(
    identities: &[Identity],
    alias: &str,
) -> Result<(Vec<Identity>, Identity), AppError> {
    let removed = identities
        .iter()
        .find(|identity| identity.alias == alias)
        .cloned()
        .ok_or_else(|| AppError::IdentityNotFound(alias.to_string()))?;
    let next = identities
        .iter()
        .filter(|identity| identity.alias != alias)
        .cloned()
        .collect();
    Ok((next, removed))
}

/// Appends `suffix` to the file name of `path`
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes `contents` to `path` with owner-only permissions and syncs it to disk
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    let context = || format!("failed to write {}", path.display());

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(AppError::config_io(context()))?;

    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(AppError::config_io(context()))?;

    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(AppError::config_io(context()))?;
    Ok(())
}
