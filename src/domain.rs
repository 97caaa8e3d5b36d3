/// URL helpers for bookmark display and favicon lookup
use url::Url;

/// Whether a URL can be shown as a bookmark tile
///
/// Only web pages qualify; `javascript:`, `chrome://`, `file://` and friends
/// are skipped when the bookmark tree is flattened.
pub fn is_web_url(url: &str) -> bool {
    url.starts_with("http")
}

/// Lowercased hostname of an absolute URL
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Scheme + host + port of an absolute http(s) URL, without a trailing slash
pub fn origin(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    let origin = parsed.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        None
    }
}

/// Short name for a URL, used when a bookmark or site has no title
///
/// Examples:
/// - https://www.google.com/search → google.com
/// - https://docs.rs/serde → docs.rs
/// - not a url → not a url
pub fn display_domain(url: &str) -> String {
    match hostname(url) {
        Some(host) => host.strip_prefix("www.").map(str::to_string).unwrap_or(host),
        None => url.to_string(),
    }
}
