//! Parser and renderer for the gitx-managed region of an SSH client config.
//!
//! The region sits between two sentinel lines. Everything outside it is
//! foreign content and is carried through byte for byte; inside it only
//! `Host` and `IdentityFile` are read back, every stanza is re-rendered
//! from [`HostEntry`] values.

/// Opens the managed region
pub const MARKER_BEGIN: &str = "# BEGIN gitx managed";
/// Closes the managed region
pub const MARKER_END: &str = "# END gitx managed";

/// Host name every managed alias resolves to
const MANAGED_HOST_NAME: &str = "github.com";

/// One `Host` stanza of the managed region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub host_alias: String,
    pub identity_file: String,
}

impl HostEntry {
    pub fn new(host_alias: impl Into<String>, identity_file: impl Into<String>) -> Self {
        Self {
            host_alias: host_alias.into(),
            identity_file: identity_file.into(),
        }
    }
}

/// Config text split into foreign content and managed entries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SshConfig {
    /// Every line outside the managed region, in original order
    pub outside: String,
    /// Managed entries in file order, one per host alias
    pub entries: Vec<HostEntry>,
}

impl SshConfig {
    /// Splits raw config text into foreign content and managed entries
    ///
    /// An unterminated region runs to the end of the file. A stanza without
    /// an `IdentityFile` is dropped, and when an alias repeats the later
    /// key path wins at the position of the first occurrence.
    pub fn parse(raw: &str) -> Self {
        let mut outside = String::new();
        let mut parsed: Vec<HostEntry> = Vec::new();
        let mut in_region = false;
        let mut current: Option<(String, Option<String>)> = None;

        for line in raw.split_inclusive('\n') {
            if !in_region {
                if line.contains(MARKER_BEGIN) {
                    in_region = true;
                } else {
                    outside.push_str(line);
                }
                continue;
            }

            if line.contains(MARKER_END) {
                flush_stanza(&mut current, &mut parsed);
                in_region = false;
                continue;
            }

            let directive = line.trim();
            if let Some(alias) = directive_value(directive, "Host") {
                flush_stanza(&mut current, &mut parsed);
                current = Some((alias.to_string(), None));
            } else if let Some(path) = directive_value(directive, "IdentityFile") {
                if let Some((_, key_path)) = current.as_mut() {
                    *key_path = Some(path.to_string());
                }
            }
        }
        flush_stanza(&mut current, &mut parsed);

        let entries = parsed
            .into_iter()
            .fold(Vec::new(), |entries, entry| upsert_entry(&entries, entry));

        Self { outside, entries }
    }

    /// Renders foreign content followed by the managed region
    ///
    /// With no entries the region is omitted entirely.
    pub fn render(&self) -> String {
        let mut out = self.outside.clone();
        if self.entries.is_empty() {
            return out;
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&render_block(&self.entries));
        out
    }
}

/// Renders the managed region, markers included
pub fn render_block(entries: &[HostEntry]) -> String {
    let stanzas: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                "Host {}\n  HostName {MANAGED_HOST_NAME}\n  User git\n  IdentityFile {}\n  IdentitiesOnly yes\n",
                entry.host_alias, entry.identity_file
            )
        })
        .collect();
    format!("{MARKER_BEGIN}\n{}{MARKER_END}\n", stanzas.join("\n"))
}

/// Returns a new entry list with `entry` replacing its alias or appended
pub fn upsert_entry(entries: &[HostEntry], entry: HostEntry) -> Vec<HostEntry> {
    let mut next = entries.to_vec();
    match next.iter().position(|e| e.host_alias == entry.host_alias) {
        Some(index) => next[index].identity_file = entry.identity_file,
        None => next.push(entry),
    }
    next
}

/// Returns a new entry list without any entry for `host_alias`
pub fn remove_entry(entries: &[HostEntry], host_alias: &str) -> Vec<HostEntry> {
    entries
        .iter()
        .filter(|e| e.host_alias != host_alias)
        .cloned()
        .collect()
}

fn flush_stanza(current: &mut Option<(String, Option<String>)>, parsed: &mut Vec<HostEntry>) {
    if let Some((host_alias, Some(identity_file))) = current.take() {
        parsed.push(HostEntry {
            host_alias,
            identity_file,
        });
    }
}

/// Value of `<keyword> <value>` with the keyword matched case-insensitively
fn directive_value<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let (head, rest) = line.split_once(char::is_whitespace)?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let value = rest.trim();
    (!value.is_empty()).then_some(value)
}
