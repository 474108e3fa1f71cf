//! Conversions between the three remote URL shapes gitx understands:
//! canonical SSH (`git@github.com:org/repo`), aliased SSH
//! (`git@github.com-<alias>:org/repo`) and HTTPS (`https://github.com/org/repo`).
//!
//! Every function is total: a URL in a shape it does not recognise comes
//! back unchanged.

use crate::identity::HOST_ALIAS_PREFIX;

const SSH_USER_PREFIX: &str = "git@";
const SERVICE_HOST: &str = "github.com";
const CANONICAL_SSH_PREFIX: &str = "git@github.com:";
const HTTPS_PREFIX: &str = "https://github.com/";

/// Host and path of an scp-style `git@<host>:<path>` URL on the managed service
fn split_ssh(url: &str) -> Option<(&str, &str)> {
    let (host, path) = url.strip_prefix(SSH_USER_PREFIX)?.split_once(':')?;
    let on_service = host == SERVICE_HOST || host.starts_with(HOST_ALIAS_PREFIX);
    (on_service && !path.is_empty()).then_some((host, path))
}

/// Rewrites `git@github.com:org/repo` to `git@github.com-<alias>:org/repo`
pub fn alias_ssh_remote(url: &str, alias: &str) -> String {
    match url.strip_prefix(CANONICAL_SSH_PREFIX) {
        Some(path) => format!("{SSH_USER_PREFIX}{HOST_ALIAS_PREFIX}{alias}:{path}"),
        None => url.to_string(),
    }
}

/// Rewrites a canonical or aliased SSH remote to HTTPS
///
/// Only `github.com` and `github.com-<alias>` hosts are converted. An SSH
/// remote on any other host is returned as is, since its HTTPS form cannot be
/// derived from the host name alone.
pub fn to_https(url: &str) -> String {
    match split_ssh(url) {
        Some((_, path)) => format!("{HTTPS_PREFIX}{path}"),
        None => url.to_string(),
    }
}

/// Rewrites an aliased SSH or HTTPS remote to canonical SSH
pub fn to_canonical_ssh(url: &str) -> String {
    if let Some((host, path)) = split_ssh(url) {
        if host.starts_with(HOST_ALIAS_PREFIX) {
            return format!("{CANONICAL_SSH_PREFIX}{path}");
        }
        return url.to_string();
    }
    match url.strip_prefix(HTTPS_PREFIX) {
        Some(path) if !path.is_empty() => format!("{CANONICAL_SSH_PREFIX}{path}"),
        _ => url.to_string(),
    }
}

/// Identity alias encoded in an aliased SSH remote, if it parses cleanly
pub fn bound_alias(url: &str) -> Option<&str> {
    let (host, _) = split_ssh(url.trim())?;
    let alias = host.strip_prefix(HOST_ALIAS_PREFIX)?;
    let clean = !alias.is_empty()
        && alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    clean.then_some(alias)
}
