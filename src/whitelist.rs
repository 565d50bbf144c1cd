//! Route whitelist: path patterns exempt from authentication.
//!
//! Registration stores every intermediate prefix of a pattern, so matching is
//! a left-to-right walk over segment lookups instead of per-pattern regex
//! work. Supported pattern forms:
//!
//! - exact segments: `/health/live`
//! - single-level wildcard: `/files/*/meta` (one segment, any value)
//! - multi-level wildcard: `/static/**` (everything below)
//! - suffix patterns: `/**.css` (any path whose last segment ends in `.css`)
//!
//! Fully matched paths go into a positive-only memo; negative results are
//! never cached, so patterns registered later still take effect for paths
//! that failed earlier. Both sets are concurrent and append-only, safe for
//! lookup from any number of request tasks while registrations happen.

use dashmap::DashSet;

pub struct RouteWhitelist {
    /// Every registered prefix of every pattern (`/a/b/c` also registers
    /// `/a` and `/a/b`).
    prefixes: DashSet<String>,
    /// Fully matched paths.
    memo: DashSet<String>,
}

impl RouteWhitelist {
    pub fn new() -> Self {
        Self {
            prefixes: DashSet::new(),
            memo: DashSet::new(),
        }
    }

    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let whitelist = Self::new();
        whitelist.add(patterns);
        whitelist
    }

    /// Register patterns. Blank patterns and blank segments are ignored;
    /// leading/trailing separators are irrelevant.
    pub fn add<I, S>(&self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.trim().is_empty() {
                continue;
            }
            let mut prefix = String::new();
            for segment in pattern.split('/').filter(|s| !s.trim().is_empty()) {
                prefix.push('/');
                prefix.push_str(segment);
                self.prefixes.insert(prefix.clone());
            }
        }
    }

    /// Whether `path` is exempt from authentication.
    pub fn is_whitelisted(&self, path: &str) -> bool {
        if self.memo.contains(path) {
            return true;
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.trim().is_empty()).collect();

        // A final segment with a dot is a file request: match suffix
        // patterns only, no segment walk.
        if let Some(last) = segments.last() {
            if let Some(dot) = last.rfind('.') {
                let matched = self.prefixes.contains(&format!("/**{}", &last[dot..]));
                if matched {
                    self.memo.insert(path.to_string());
                }
                return matched;
            }
        }

        if segments.is_empty() {
            return false;
        }

        let mut prefix = String::new();
        for segment in segments {
            if self.prefixes.contains(&format!("{prefix}/**")) {
                // Multi-level wildcard swallows the rest of the path.
                self.memo.insert(path.to_string());
                return true;
            }
            if self.prefixes.contains(&format!("{prefix}/*")) {
                // Single-level wildcard: this segment matches generically;
                // the walk continues under the literal `/*` branch.
                prefix.push_str("/*");
            } else {
                let literal = format!("{prefix}/{segment}");
                if !self.prefixes.contains(&literal) {
                    return false;
                }
                prefix = literal;
            }
        }

        self.memo.insert(path.to_string());
        true
    }

    /// Number of memoized positive matches (test hook).
    #[cfg(test)]
    fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

impl Default for RouteWhitelist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_exact_path() {
        let wl = RouteWhitelist::with_patterns(["/health/live"]);
        assert!(wl.is_whitelisted("/health/live"));
        assert!(!wl.is_whitelisted("/health/ready"));
    }

    #[test]
    fn test_intermediate_prefixes_match() {
        // Registering /a/b/c makes /a and /a/b walkable targets too.
        let wl = RouteWhitelist::with_patterns(["/a/b/c"]);
        assert!(wl.is_whitelisted("/a"));
        assert!(wl.is_whitelisted("/a/b"));
        assert!(wl.is_whitelisted("/a/b/c"));
        assert!(!wl.is_whitelisted("/a/b/c/d"));
    }

    #[test]
    fn test_multi_level_wildcard() {
        let wl = RouteWhitelist::with_patterns(["/static/**"]);
        assert!(wl.is_whitelisted("/static"));
        assert!(wl.is_whitelisted("/static/js"));
        assert!(wl.is_whitelisted("/static/js/vendor/lib"));
        assert!(!wl.is_whitelisted("/api/static"));
    }

    #[test]
    fn test_single_level_wildcard() {
        let wl = RouteWhitelist::with_patterns(["/files/*/meta"]);
        assert!(wl.is_whitelisted("/files/abc/meta"));
        assert!(wl.is_whitelisted("/files/xyz/meta"));
        assert!(!wl.is_whitelisted("/files/abc/data"));
        assert!(!wl.is_whitelisted("/files/abc/meta/extra"));
    }

    #[test]
    fn test_suffix_patterns() {
        let wl = RouteWhitelist::with_patterns(["/**.css", "**.js"]);
        assert!(wl.is_whitelisted("/app.css"));
        assert!(wl.is_whitelisted("/deep/nested/theme.css"));
        assert!(wl.is_whitelisted("/bundle.min.js"));
        assert!(!wl.is_whitelisted("/logo.png"));

        wl.add(["/**.png"]);
        assert!(wl.is_whitelisted("/logo.png"));
    }

    #[test]
    fn test_suffix_skips_segment_walk() {
        // /static/** would match by walk, but a dotted final segment only
        // consults suffix patterns.
        let wl = RouteWhitelist::with_patterns(["/static/**"]);
        assert!(!wl.is_whitelisted("/static/app.css"));
        wl.add(["/**.css"]);
        assert!(wl.is_whitelisted("/static/app.css"));
    }

    #[test]
    fn test_separator_normalization() {
        let wl = RouteWhitelist::with_patterns(["public//docs/"]);
        assert!(wl.is_whitelisted("/public/docs"));
        assert!(wl.is_whitelisted("public/docs/"));
        assert!(wl.is_whitelisted("//public///docs"));
    }

    #[test]
    fn test_empty_path_never_matches() {
        let wl = RouteWhitelist::with_patterns(["/static/**"]);
        assert!(!wl.is_whitelisted(""));
        assert!(!wl.is_whitelisted("/"));
    }

    #[test]
    fn test_positive_match_memoized() {
        let wl = RouteWhitelist::with_patterns(["/static/**"]);
        assert_eq!(wl.memo_len(), 0);
        assert!(wl.is_whitelisted("/static/js/app"));
        assert_eq!(wl.memo_len(), 1);
        // Second call is served from the memo; result is identical.
        assert!(wl.is_whitelisted("/static/js/app"));
        assert_eq!(wl.memo_len(), 1);
    }

    #[test]
    fn test_negative_results_not_cached() {
        let wl = RouteWhitelist::new();
        assert!(!wl.is_whitelisted("/late/arrival"));
        assert_eq!(wl.memo_len(), 0);
        wl.add(["/late/**"]);
        assert!(wl.is_whitelisted("/late/arrival"));
    }

    #[test]
    fn test_concurrent_lookups() {
        let wl = Arc::new(RouteWhitelist::with_patterns(["/static/**", "/**.css"]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wl = Arc::clone(&wl);
                thread::spawn(move || {
                    for i in 0..200 {
                        assert!(wl.is_whitelisted(&format!("/static/asset{i}")));
                        assert!(wl.is_whitelisted("/theme.css"));
                        assert!(!wl.is_whitelisted("/api/orders"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
