use url::Url;

/// Checks if a host matches a domain pattern
///
/// Patterns are either exact (`example.com` matches only `example.com`) or
/// wildcards (`*.example.com` matches `example.com` itself and any subdomain at
/// any depth). Comparison ignores ASCII case.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "EXAMPLE.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let candidate = candidate.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .map_or(false, |prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Offsite filter built from `allowed-domains`
///
/// An empty filter admits every host.
#[derive(Debug, Clone, Default)]
pub struct HostFilter {
    patterns: Vec<String>,
}

impl HostFilter {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.to_vec(),
        }
    }

    /// Returns true if no patterns are configured
    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true if the URL's host is admitted by the filter
    pub fn allows(&self, url: &Url) -> bool {
        if self.is_unrestricted() {
            return true;
        }

        match url.host_str() {
            Some(host) => self.patterns.iter().any(|p| matches_wildcard(p, host)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "blog.example.com"));
        assert!(!matches_wildcard("blog.example.com", "example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "blog.example.com"));
        assert!(matches_wildcard("*.example.com", "deep.nested.sub.example.com"));
    }

    #[test]
    fn test_wildcard_no_partial_label_match() {
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
        assert!(!matches_wildcard("*.example.com", ""));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_wildcard("Example.com", "EXAMPLE.COM"));
        assert!(matches_wildcard("*.EXAMPLE.com", "Blog.example.COM"));
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = HostFilter::default();
        assert!(filter.is_unrestricted());
        assert!(filter.allows(&url("https://anything.test/page")));
    }

    #[test]
    fn test_filter_allows_matching_hosts_only() {
        let filter = HostFilter::new(&["example.com".to_string(), "*.docs.rs".to_string()]);

        assert!(filter.allows(&url("https://example.com/a")));
        assert!(filter.allows(&url("https://docs.rs/")));
        assert!(filter.allows(&url("https://serde.docs.rs/serde")));
        assert!(!filter.allows(&url("https://blog.example.com/")));
        assert!(!filter.allows(&url("https://other.org/")));
    }

    #[test]
    fn test_filter_with_ip_host() {
        let filter = HostFilter::new(&["127.0.0.1".to_string()]);
        assert!(filter.allows(&url("http://127.0.0.1:8080/x")));
        assert!(!filter.allows(&url("http://127.0.0.2/x")));
    }
}
