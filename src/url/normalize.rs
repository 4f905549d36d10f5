use crate::UrlError;
use url::Url;

/// Tracking query parameters dropped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "mc_cid", "msclkid"];

/// Normalizes an absolute URL into its canonical identity
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Lowercase the host (the parser also drops default ports)
/// 4. Normalize path:
///    - Remove dot segments and repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment
/// 6. Remove tracking query parameters (`utm_*`, `fbclid`, ...)
/// 7. Sort remaining query parameters by key, keeping the relative order of
///    repeated keys
/// 8. Remove an empty query string
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.COM/a/../page/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Resolves a possibly relative reference against a base URL and normalizes it
///
/// This is how follow-up links found on a page become request identities:
/// `/next`, `next`, `../next` and `https://host/next` all collapse to the same
/// entry when they point at the same resource.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/list/page1").unwrap();
/// let next = resolve_url(&base, "page2#results").unwrap();
/// assert_eq!(next.as_str(), "https://example.com/list/page2");
/// ```
pub fn resolve_url(base: &Url, reference: &str) -> Result<Url, UrlError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(UrlError::Malformed("empty reference".to_string()));
    }

    let joined = base
        .join(reference)
        .map_err(|e| UrlError::Parse(format!("{}: {}", reference, e)))?;
    canonicalize(joined)
}

fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts the rest by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    // Stable sort keeps repeated keys in their original order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
