//! Minimal `.netrc` lookup for API credentials.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetrcEntry {
    pub login: String,
    pub password: Option<String>,
}

/// Find the entry for `host`, falling back to a `default` entry.
pub fn lookup(contents: &str, host: &str) -> Option<NetrcEntry> {
    let mut tokens = contents.split_whitespace();
    let mut matched: Option<NetrcEntry> = None;
    let mut default: Option<NetrcEntry> = None;

    // Which entry the login/password tokens currently belong to.
    enum Current {
        Host,
        Default,
        Other,
    }
    let mut current = Current::Other;

    while let Some(token) = tokens.next() {
        match token {
            "machine" => {
                current = match tokens.next() {
                    Some(name) if name == host && matched.is_none() => {
                        matched = Some(NetrcEntry { login: String::new(), password: None });
                        Current::Host
                    }
                    _ => Current::Other,
                };
            }
            "default" => {
                default = Some(NetrcEntry { login: String::new(), password: None });
                current = Current::Default;
            }
            "login" | "password" | "account" => {
                let Some(value) = tokens.next() else { break };
                let entry = match current {
                    Current::Host => matched.as_mut(),
                    Current::Default => default.as_mut(),
                    Current::Other => None,
                };
                if let Some(entry) = entry {
                    match token {
                        "login" => entry.login = value.to_string(),
                        "password" => entry.password = Some(value.to_string()),
                        _ => {}
                    }
                }
            }
            "macdef" => {
                // Macro bodies never carry credentials.
                current = Current::Other;
            }
            _ => {}
        }
    }

    matched.or(default).filter(|e| !e.login.is_empty())
}

/// Read `path` and look up `host`. A missing or unreadable file yields `None`.
pub fn lookup_file(path: &Path, host: &str) -> Option<NetrcEntry> {
    let contents = std::fs::read_to_string(path).ok()?;
    lookup(&contents, host)
}
