use url::Url;

/// Extracts the rate-limit key of a URL
///
/// This is the lowercase host, followed by `:port` when the URL names a port
/// that is not the scheme default. Two bookmarks share a limiter exactly when
/// they share this key.
///
/// # Returns
///
/// * `Some(String)` - The host key
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use nate_archive::url::extract_host;
///
/// let url = Url::parse("https://Example.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_host(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
