//! Per-secret host allow-lists.

/// Suffix of the companion variable holding a secret's policy.
pub const ACCESS_SUFFIX: &str = "_ACCESS";

/// Which upstream hosts may receive a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// `*`: any host.
    Any,
    /// Comma-separated list of exact hostnames.
    Hosts(Vec<String>),
}

impl AccessPolicy {
    /// Parse the value of a `NAME_ACCESS` variable.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "*" {
            return AccessPolicy::Any;
        }
        AccessPolicy::Hosts(
            raw.split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Whether `host` is allowed by this policy.
    pub fn permits(&self, host: &str) -> bool {
        match self {
            AccessPolicy::Any => true,
            AccessPolicy::Hosts(hosts) => hosts.iter().any(|allowed| allowed == host),
        }
    }
}
