//! Sandbox policy: a set of absolute path patterns (literal paths or
//! shell-style globs) expanded once, at sandbox install time, into a flat
//! list of permitted absolute paths (spec.md §3 "Sandbox policy", §4.6).

use std::path::PathBuf;

use glob::glob;

/// The host's DNS resolver configuration path, the one path permitted by
/// default so a UDF performing name resolution (permitted by the Layer A
/// syscall allowlist for socket use) doesn't immediately stall on `-EPERM`.
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// An unexpanded sandbox policy: literal absolute paths and/or `*`-globs.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    patterns: Vec<String>,
}

impl SandboxPolicy {
    /// A policy admitting only the given patterns, verbatim.
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// The built-in default policy: just the DNS resolver path.
    pub fn default_policy() -> Self {
        Self::new(vec![DEFAULT_RESOLV_CONF.to_string()])
    }

    /// Layers `HDF5_UDF_SANDBOX_EXTRA_PATHS` (colon-separated absolute paths
    /// or globs) on top of [`Self::default_policy`].
    pub fn from_env() -> Self {
        let mut patterns = vec![DEFAULT_RESOLV_CONF.to_string()];
        if let Ok(extra) = std::env::var("HDF5_UDF_SANDBOX_EXTRA_PATHS") {
            patterns.extend(extra.split(':').filter(|p| !p.is_empty()).map(str::to_string));
        }
        Self::new(patterns)
    }

    /// Expands every pattern into a flat list of permitted absolute paths.
    ///
    /// Entries containing `*` are expanded via filesystem globbing
    /// (unsorted, matching whatever order the filesystem walk returns);
    /// literal entries are kept verbatim regardless of whether they exist on
    /// disk yet. After expansion, membership tests are exact-string
    /// equality — no prefix or symlink interpretation (spec.md §3).
    pub fn expand(&self) -> Vec<String> {
        let mut expanded = Vec::with_capacity(self.patterns.len());
        for pattern in &self.patterns {
            if pattern.contains('*') {
                match glob(pattern) {
                    Ok(paths) => {
                        for entry in paths.flatten() {
                            expanded.push(path_to_string(entry));
                        }
                    }
                    Err(e) => {
                        log::warn!("invalid sandbox glob pattern {pattern:?}: {e}");
                    }
                }
            } else {
                expanded.push(pattern.clone());
            }
        }
        expanded
    }

    /// Colon-joins the expanded allowlist for the interceptor shim's
    /// `LD_PRELOAD`-time environment configuration (spec.md §4.6); see
    /// `crate::worker` and `interceptor_shim.c`'s constructor.
    pub fn env_value(&self) -> String {
        self.expand().join(":")
    }
}

fn path_to_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn literal_entries_pass_through_verbatim() {
        let policy = SandboxPolicy::new(vec!["/etc/resolv.conf".to_string()]);
        assert_eq!(policy.expand(), vec!["/etc/resolv.conf".to_string()]);
    }

    #[test]
    fn env_value_colon_joins_the_expanded_list() {
        let policy = SandboxPolicy::new(vec![
            "/etc/resolv.conf".to_string(),
            "/etc/hosts".to_string(),
        ]);
        assert_eq!(policy.env_value(), "/etc/resolv.conf:/etc/hosts");
    }

    #[test]
    fn default_policy_admits_only_resolv_conf() {
        let policy = SandboxPolicy::default_policy();
        assert_eq!(policy.expand(), vec![DEFAULT_RESOLV_CONF.to_string()]);
    }

    #[test]
    fn glob_entries_expand_to_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.conf")).unwrap();
        File::create(dir.path().join("b.conf")).unwrap();
        let pattern = format!("{}/*.conf", dir.path().display());
        let policy = SandboxPolicy::new(vec![pattern]);
        let mut expanded = policy.expand();
        expanded.sort();
        let mut expected = vec![
            dir.path().join("a.conf").to_string_lossy().into_owned(),
            dir.path().join("b.conf").to_string_lossy().into_owned(),
        ];
        expected.sort();
        assert_eq!(expanded, expected);
    }
}
