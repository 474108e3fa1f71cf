use std::collections::BTreeSet;

use crate::remote;

/// Local git config key recording the alias set by the last bind
pub const BINDING_MARKER_KEY: &str = "gitx.bound";

/// Where a binding was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    /// The marker key, naming a known identity
    Marker,
    /// The host alias segment of the remote URL
    RemoteUrl {
        /// The alias is not present in the identity store
        orphaned: bool,
    },
}

/// Identity a repository is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Bound { alias: String, source: BindingSource },
    Unbound,
}

impl Binding {
    pub fn alias(&self) -> Option<&str> {
        match self {
            Binding::Bound { alias, .. } => Some(alias),
            Binding::Unbound => None,
        }
    }
}

/// Decides which identity a repository is bound to
///
/// A marker naming a known identity wins. Otherwise an aliased SSH remote
/// names the identity, even when that identity no longer exists. A stale
/// marker is ignored.
pub fn resolve_binding(
    marker: Option<&str>,
    remote_url: Option<&str>,
    known_identities: &BTreeSet<String>,
) -> Binding {
    if let Some(alias) = marker.map(str::trim).filter(|m| known_identities.contains(*m)) {
        return Binding::Bound {
            alias: alias.to_string(),
            source: BindingSource::Marker,
        };
    }

    if let Some(alias) = remote_url.and_then(remote::bound_alias) {
        return Binding::Bound {
            alias: alias.to_string(),
            source: BindingSource::RemoteUrl {
                orphaned: !known_identities.contains(alias),
            },
        };
    }

    Binding::Unbound
}
