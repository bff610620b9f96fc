use crate::UrlError;
use url::Url;

/// Query parameters that only carry tracking state and never identify a listing
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "refId",
    "trackingId",
    "position",
    "pageNum",
    "from",
    "ref",
    "source",
];

/// Canonicalizes a job link into the absolute URL used as the record's identity
///
/// # Canonicalization Steps
///
/// 1. Reject empty hrefs and non-navigable schemes (`javascript:`, `mailto:`, ...)
/// 2. Resolve the href against the source's base URL
/// 3. Require an HTTP(S) URL with a host
/// 4. Remove the fragment
/// 5. Either drop the whole query (`strip_query`) or remove tracking parameters
///    and sort what remains
/// 6. Remove the trailing slash of non-root paths
///
/// # Examples
///
/// ```
/// use jobtrawl::url::canonicalize_job_url;
/// use url::Url;
///
/// let base = Url::parse("https://glints.com").unwrap();
/// let url = canonicalize_job_url("/id/opportunities/jobs/abc/?utm_source=x#top", &base, false).unwrap();
/// assert_eq!(url.as_str(), "https://glints.com/id/opportunities/jobs/abc");
/// ```
pub fn canonicalize_job_url(href: &str, base: &Url, strip_query: bool) -> Result<Url, UrlError> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return Err(UrlError::Empty);
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return Err(UrlError::InvalidScheme(href.to_string()));
    }

    let mut url = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if strip_query {
        url.set_query(None);
    } else if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url)
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.indeed.com/jobs?q=rust").unwrap()
    }

    #[test]
    fn test_resolves_relative_link() {
        let result = canonicalize_job_url("/viewjob?jk=abc123", &base(), false).unwrap();
        assert_eq!(result.as_str(), "https://www.indeed.com/viewjob?jk=abc123");
    }

    #[test]
    fn test_keeps_absolute_link() {
        let result =
            canonicalize_job_url("https://glints.com/id/opportunities/jobs/x", &base(), false)
                .unwrap();
        assert_eq!(result.as_str(), "https://glints.com/id/opportunities/jobs/x");
    }

    #[test]
    fn test_remove_fragment() {
        let result = canonicalize_job_url("/viewjob?jk=1#apply", &base(), false).unwrap();
        assert_eq!(result.as_str(), "https://www.indeed.com/viewjob?jk=1");
    }

    #[test]
    fn test_remove_tracking_params_and_sort() {
        let result =
            canonicalize_job_url("/viewjob?utm_medium=x&jk=1&from=serp&b=2", &base(), false)
                .unwrap();
        assert_eq!(result.as_str(), "https://www.indeed.com/viewjob?b=2&jk=1");
    }

    #[test]
    fn test_strip_query_entirely() {
        let result = canonicalize_job_url(
            "https://www.linkedin.com/jobs/view/rust-dev-123?refId=abc&trackingId=def",
            &base(),
            true,
        )
        .unwrap();
        assert_eq!(
            result.as_str(),
            "https://www.linkedin.com/jobs/view/rust-dev-123"
        );
    }

    #[test]
    fn test_same_listing_different_tracking_is_same_identity() {
        let a = canonicalize_job_url("/viewjob?jk=9&from=a", &base(), false).unwrap();
        let b = canonicalize_job_url("/viewjob?from=b&jk=9#x", &base(), false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = canonicalize_job_url("/jobs/123/", &base(), false).unwrap();
        assert_eq!(result.as_str(), "https://www.indeed.com/jobs/123");
    }

    #[test]
    fn test_reject_empty_and_fragment_only() {
        assert!(matches!(
            canonicalize_job_url("  ", &base(), false),
            Err(UrlError::Empty)
        ));
        assert!(matches!(
            canonicalize_job_url("#top", &base(), false),
            Err(UrlError::Empty)
        ));
    }

    #[test]
    fn test_reject_javascript_link() {
        let result = canonicalize_job_url("javascript:void(0)", &base(), false);
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_reject_non_http_scheme() {
        let result = canonicalize_job_url("ftp://example.com/file", &base(), false);
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }
}
