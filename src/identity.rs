use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every synthetic SSH host alias managed by gitx
pub const HOST_ALIAS_PREFIX: &str = "github.com-";

/// How an identity authenticates against the remote service
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// SSH key pair selected through a host alias
    #[default]
    Ssh,
    /// Personal access token over HTTPS
    Pat,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Ssh => write!(f, "ssh"),
            AuthMethod::Pat => write!(f, "pat"),
        }
    }
}

/// Represents a Git identity stored in the identities file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Unique alias, reused as the SSH host alias suffix
    pub alias: String,
    /// Git author name (user.name)
    pub name: String,
    /// Git author email (user.email)
    pub email: String,
    /// GitHub account name
    pub github_user: String,
    /// Path to the private key, SSH identities only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<String>,
    pub auth_method: AuthMethod,
    /// `github.com-<alias>`, SSH identities only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_host_alias: Option<String>,
}

impl Identity {
    /// Host entry to keep in the SSH config, if this identity authenticates over SSH
    pub fn ssh_host_entry(&self) -> Option<(&str, &str)> {
        if self.auth_method != AuthMethod::Ssh {
            return None;
        }
        match (&self.ssh_host_alias, &self.ssh_key_path) {
            (Some(host_alias), Some(key_path)) => Some((host_alias, key_path)),
            _ => None,
        }
    }
}

/// Builds the SSH host alias for an identity alias
pub fn host_alias_for(alias: &str) -> String {
    format!("{HOST_ALIAS_PREFIX}{alias}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_identities_file_shape() {
        let identity = Identity {
            alias: "work".to_string(),
            name: "Work User".to_string(),
            email: "work@example.com".to_string(),
            github_user: "workuser".to_string(),
            ssh_key_path: None,
            auth_method: AuthMethod::Pat,
            ssh_host_alias: None,
        };

        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["auth_method"], "pat");
        assert_eq!(json["github_user"], "workuser");
        assert!(json.get("ssh_key_path").is_none());
    }

    #[test]
    fn pat_identity_has_no_host_entry() {
        let identity = Identity {
            alias: "work".to_string(),
            name: "Work User".to_string(),
            email: "work@example.com".to_string(),
            github_user: "workuser".to_string(),
            ssh_key_path: Some("/keys/work".to_string()),
            auth_method: AuthMethod::Pat,
            ssh_host_alias: Some(host_alias_for("work")),
        };

        assert_eq!(identity.ssh_host_entry(), None);
    }
}
