//! Endpoint URL construction.

/// Join a backend base URL and an endpoint path without producing double
/// slashes, whatever mix of trailing and leading slashes the inputs carry.
///
/// ```
/// use palaver::utils::url::join_endpoint;
///
/// assert_eq!(join_endpoint("http://localhost:8000/", "chat"), "http://localhost:8000/chat");
/// assert_eq!(join_endpoint("http://localhost:8000", "/chat"), "http://localhost:8000/chat");
/// ```
pub fn join_endpoint(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
