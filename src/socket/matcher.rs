//! Proxy bypass matching with NO_PROXY support.
//!
//! Entries are plain substrings, not domain suffixes: `example.com` also
//! excludes `notexample.com` and `example.com.cdn.net`.

/// Proxy exclusion list built from a NO_PROXY string.
///
/// - Entries are comma-separated and trimmed
/// - Empty entries are ignored
/// - A host is excluded when it contains any entry, ignoring case
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoProxyList {
    entries: Vec<String>,
}

impl NoProxyList {
    /// Create from environment variables.
    ///
    /// Checks `NO_PROXY` then `no_proxy`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create from an arbitrary variable lookup.
    ///
    /// Empty values count as unset, so an empty `NO_PROXY` still falls
    /// through to `no_proxy`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = ["NO_PROXY", "no_proxy"]
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty())
            .unwrap_or_default();
        Self::from_string(&raw)
    }

    /// Create from a NO_PROXY string such as `localhost,.internal,10.0.`.
    pub fn from_string(no_proxy: &str) -> Self {
        let entries = no_proxy
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { entries }
    }

    /// Check if a host (optionally with `:port`) should bypass the proxy.
    pub fn matches(&self, host: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }

        let host = host.to_lowercase();
        self.entries.iter().any(|entry| host.contains(entry.as_str()))
    }

    /// Number of exclusion entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no exclusion entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
