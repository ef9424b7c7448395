//! `${NAME}` substitution gated by host allow-lists.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::observability::metrics;
use crate::secrets::access::{AccessPolicy, ACCESS_SUFFIX};

/// Immutable set of secret values and their access policies.
#[derive(Clone, Default)]
pub struct SecretSet {
    values: HashMap<String, String>,
}

impl SecretSet {
    /// Capture the current process environment.
    pub fn from_env() -> Self {
        Self {
            values: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The parsed `NAME_ACCESS` policy for `name`, if one is set.
    pub fn policy(&self, name: &str) -> Option<AccessPolicy> {
        self.values
            .get(&format!("{name}{ACCESS_SUFFIX}"))
            .map(|raw| AccessPolicy::parse(raw))
    }

    /// Number of captured variables, policies included.
    pub fn variable_count(&self) -> usize {
        self.values.len()
    }
}

impl fmt::Debug for SecretSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("SecretSet").field("names", &names).finish()
    }
}

/// Why a placeholder was left unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The variable is not defined.
    Missing,
    /// The variable has no `NAME_ACCESS` companion.
    NoPolicy,
    /// The policy does not list the target host.
    HostDenied,
}

impl Denial {
    pub fn as_str(&self) -> &'static str {
        match self {
            Denial::Missing => "missing",
            Denial::NoPolicy => "no_policy",
            Denial::HostDenied => "host_denied",
        }
    }
}

/// Rewrites `${NAME}` placeholders for a given upstream host.
#[derive(Debug, Clone)]
pub struct Interpolator {
    secrets: Arc<SecretSet>,
}

impl Interpolator {
    pub fn new(secrets: SecretSet) -> Self {
        Self {
            secrets: Arc::new(secrets),
        }
    }

    /// Look up `name` for delivery to `host`.
    pub fn resolve(&self, name: &str, host: &str) -> Result<&str, Denial> {
        let value = self.secrets.get(name).ok_or(Denial::Missing)?;
        let policy = self.secrets.policy(name).ok_or(Denial::NoPolicy)?;
        if policy.permits(host) {
            Ok(value)
        } else {
            Err(Denial::HostDenied)
        }
    }

    /// Replace every resolvable placeholder in `template`.
    ///
    /// Unresolvable placeholders are kept verbatim and logged with the
    /// variable name and host.
    pub fn interpolate(&self, template: &str, host: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                // Unterminated: nothing further can match.
                out.push_str(&rest[start..]);
                return out;
            };

            let name = &after[..end];
            if !is_variable_name(name) {
                out.push_str("${");
                rest = after;
                continue;
            }

            match self.resolve(name, host) {
                Ok(value) => out.push_str(value),
                Err(denial) => {
                    tracing::warn!(
                        variable = name,
                        host = host,
                        reason = denial.as_str(),
                        "Secret placeholder left unresolved"
                    );
                    metrics::record_interpolation_denied(denial.as_str());
                    out.push_str(&rest[start..start + 2 + end + 1]);
                }
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    /// In-memory log sink for a scoped subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn interpolator(pairs: &[(&str, &str)]) -> Interpolator {
        Interpolator::new(SecretSet::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_allowed_host_resolves() {
        let i = interpolator(&[("FOO", "secret"), ("FOO_ACCESS", "api.example.com")]);
        assert_eq!(i.interpolate("${FOO}", "api.example.com"), "secret");
        assert_eq!(i.interpolate("${FOO}", "other.com"), "${FOO}");
    }

    #[test]
    fn test_missing_policy_never_resolves() {
        let i = interpolator(&[("FOO", "secret")]);
        assert_eq!(i.interpolate("${FOO}", "api.example.com"), "${FOO}");
        assert_eq!(i.interpolate("${FOO}", ""), "${FOO}");
        assert_eq!(i.resolve("FOO", "api.example.com"), Err(Denial::NoPolicy));
    }

    #[test]
    fn test_undefined_variable_with_policy() {
        let i = interpolator(&[("FOO_ACCESS", "*")]);
        assert_eq!(i.interpolate("Bearer ${FOO}", "x.com"), "Bearer ${FOO}");
        assert_eq!(i.resolve("FOO", "x.com"), Err(Denial::Missing));
    }

    #[test]
    fn test_wildcard_policy() {
        let i = interpolator(&[("KEY", "k"), ("KEY_ACCESS", "*")]);
        assert_eq!(i.interpolate("key=${KEY}", "anywhere.net"), "key=k");
    }

    #[test]
    fn test_multiple_placeholders_resolved_independently() {
        let i = interpolator(&[
            ("A", "1"),
            ("A_ACCESS", "h"),
            ("B", "2"),
            ("B_ACCESS", "elsewhere"),
        ]);
        assert_eq!(
            i.interpolate("${A}-${B}-${A}-${C}", "h"),
            "1-${B}-1-${C}"
        );
    }

    #[test]
    fn test_case_sensitive_names() {
        let i = interpolator(&[("Token", "t"), ("Token_ACCESS", "*")]);
        assert_eq!(i.interpolate("${TOKEN}", "h"), "${TOKEN}");
        assert_eq!(i.interpolate("${Token}", "h"), "t");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let i = interpolator(&[
            ("OUTER", "${INNER}"),
            ("OUTER_ACCESS", "*"),
            ("INNER", "leaked"),
            ("INNER_ACCESS", "*"),
        ]);
        assert_eq!(i.interpolate("${OUTER}", "h"), "${INNER}");
    }

    #[test]
    fn test_malformed_placeholders_are_literal() {
        let i = interpolator(&[("FOO", "x"), ("FOO_ACCESS", "*")]);
        assert_eq!(i.interpolate("${", "h"), "${");
        assert_eq!(i.interpolate("${FOO", "h"), "${FOO");
        assert_eq!(i.interpolate("${}", "h"), "${}");
        assert_eq!(i.interpolate("${1FOO}", "h"), "${1FOO}");
        assert_eq!(i.interpolate("${ ${FOO}", "h"), "${ x");
        assert_eq!(i.interpolate("$FOO {FOO}", "h"), "$FOO {FOO}");
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        let i = interpolator(&[]);
        assert_eq!(i.interpolate("application/json", "h"), "application/json");
        assert_eq!(i.interpolate("", "h"), "");
    }

    #[test]
    fn test_debug_hides_values() {
        let set = SecretSet::from_pairs([("FOO", "hunter2")]);
        let rendered = format!("{set:?}");
        assert!(rendered.contains("FOO"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_denials_log_name_and_host_never_value() {
        let logs = CapturedLogs::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let i = interpolator(&[
            ("API_TOKEN", "tok-9f8e7d"),
            ("API_TOKEN_ACCESS", "api.example.com"),
            ("UNGUARDED", "plain-value-1"),
        ]);

        tracing::subscriber::with_default(subscriber, || {
            assert_eq!(i.interpolate("${API_TOKEN}", "api.example.com"), "tok-9f8e7d");
            assert_eq!(
                i.interpolate("${API_TOKEN} ${UNGUARDED} ${ABSENT}", "evil.example"),
                "${API_TOKEN} ${UNGUARDED} ${ABSENT}"
            );
        });

        let output = logs.text();
        for (variable, reason) in [
            ("API_TOKEN", "host_denied"),
            ("UNGUARDED", "no_policy"),
            ("ABSENT", "missing"),
        ] {
            let line = output
                .lines()
                .find(|line| line.contains(&format!("\"{variable}\"")))
                .unwrap_or_else(|| panic!("no log line for {variable}:\n{output}"));
            assert!(line.contains("evil.example"), "{line}");
            assert!(line.contains(reason), "{line}");
        }
        assert!(!output.contains("tok-9f8e7d"));
        assert!(!output.contains("plain-value-1"));
        assert!(!output.contains("api.example.com"));
    }
}
