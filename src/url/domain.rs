use url::Url;

/// Extracts the host key used for per-host politeness
///
/// The key is the lowercase host, plus the port when the URL carries a
/// non-default one, so that two servers on the same machine are throttled
/// independently.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_default_port_omitted() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_explicit_port_kept() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com:8080".to_string()));
    }

    #[test]
    fn test_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_no_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(extract_domain(&url), None);
    }
}
