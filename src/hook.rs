use std::{fs, path::Path};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use tracing::info;

use crate::{binding::BINDING_MARKER_KEY, error::AppError, identity::HOST_ALIAS_PREFIX};

/// Comment identifying hooks written by gitx
const HOOK_SIGNATURE: &str = "# gitx pre-push hook";

/// Outcome of installing or removing the pre-push hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChange {
    Installed,
    AlreadyInstalled,
    /// A hook not written by gitx is in the way
    ForeignHook,
    Removed,
    NotInstalled,
}

fn hook_script() -> String {
    format!(
        r#"#!/bin/sh
{HOOK_SIGNATURE}
# Blocks pushes from repositories that are not bound to an identity.

if [ -n "$(git config --local --get {BINDING_MARKER_KEY} 2>/dev/null)" ]; then
  exit 0
fi

remote=$(git remote get-url origin 2>/dev/null)
case "$remote" in
  *@{HOST_ALIAS_PREFIX}*) exit 0 ;;
esac

name=$(git config --local --get user.name 2>/dev/null)
email=$(git config --local --get user.email 2>/dev/null)
if [ -n "$name" ] && [ -n "$email" ]; then
  exit 0
fi

echo "error: repository is not bound to an identity" >&2
echo "run 'gitx bind <identity>' first" >&2
exit 1
"#
    )
}

/// Writes the pre-push hook unless another hook already exists
///
/// # Arguments
/// * `git_dir` - The repository's git directory
pub fn install_hook(git_dir: &Path) -> Result<HookChange, AppError> {
    let hooks_dir = git_dir.join("hooks");
    let hook_path = hooks_dir.join("pre-push");

    if hook_path.exists() {
        let existing = fs::read_to_string(&hook_path).map_err(AppError::config_io(format!(
            "failed to read {}",
            hook_path.display()
        )))?;
        return Ok(if existing.contains(HOOK_SIGNATURE) {
            HookChange::AlreadyInstalled
        } else {
            HookChange::ForeignHook
        });
    }

    fs::create_dir_all(&hooks_dir)?;
    fs::write(&hook_path, hook_script()).map_err(AppError::config_io(format!(
        "failed to write {}",
        hook_path.display()
    )))?;
    #[cfg(unix)]
    fs::set_permissions(&hook_path, fs::Permissions::from_mode(0o755))?;

    info!(hook = %hook_path.display(), "installed pre-push hook");
    Ok(HookChange::Installed)
}

/// Removes the pre-push hook if gitx wrote it
pub fn uninstall_hook(git_dir: &Path) -> Result<HookChange, AppError> {
    let hook_path = git_dir.join("hooks").join("pre-push");
    if !hook_path.exists() {
        return Ok(HookChange::NotInstalled);
    }

    let existing = fs::read_to_string(&hook_path).map_err(AppError::config_io(format!(
        "failed to read {}",
        hook_path.display()
    )))?;
    if !existing.contains(HOOK_SIGNATURE) {
        return Ok(HookChange::ForeignHook);
    }

    fs::remove_file(&hook_path).map_err(AppError::config_io(format!(
        "failed to remove {}",
        hook_path.display()
    )))?;
    Ok(HookChange::Removed)
}
