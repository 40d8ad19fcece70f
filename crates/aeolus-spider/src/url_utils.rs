//! URL normalization and content filtering
//!
//! Normalization produces the canonical form used for dedup everywhere:
//! queue membership, the visited set, and the persisted page key. Two URLs
//! are the same page iff their normal forms are byte-equal.

use url::Url;

/// Path prefixes that never hold crawlable content
const NON_CONTENT_PATH_PREFIXES: &[&str] = &[
    "/wp-admin",
    "/wp-json",
    "/admin",
    "/api/",
    "/cdn-cgi/",
    "/cgi-bin/",
    "/cart",
    "/checkout",
    "/account",
];

/// Path suffixes (feeds, binaries) excluded from crawling
const NON_CONTENT_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".json", ".xml", ".rss", ".atom", ".pdf", ".zip", ".gz", ".tar", ".png",
    ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".mp3", ".mp4", ".webm", ".avi", ".mov",
    ".woff", ".woff2", ".ttf", ".eot", ".exe", ".dmg",
];

/// Canonicalize a URL for dedup.
///
/// Clears the fragment, strips the trailing slash unless the path is "/",
/// and rebuilds the query string with parameters in ascending key order.
/// Unparseable input is returned unchanged. Idempotent.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    url.set_fragment(None);

    // Sort query parameters for a stable canonical form
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let mut sorted = pairs;
        sorted.sort();
        url.query_pairs_mut().clear().extend_pairs(sorted);
    }

    // Trailing slash is insignificant except on the root path
    let path = url.path().to_string();
    if path != "/" && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    let out = url.to_string();

    // The root path serializes as a bare slash; the canonical form drops it
    match out.strip_suffix('/') {
        Some(stripped) if url.path() == "/" && url.query().is_none() => stripped.to_string(),
        _ => out,
    }
}

/// Whether two URLs share a host (exact, case-insensitive match)
pub fn is_same_host(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => match (a.host_str(), b.host_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        },
        _ => false,
    }
}

/// Whether a URL points at crawlable page content.
///
/// Rejects admin/API paths and binary or feed extensions from the
/// hard-coded denylist.
pub fn is_content_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    let path = url.path().to_lowercase();

    if NON_CONTENT_PATH_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return false;
    }
    if NON_CONTENT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
    {
        return false;
    }
    true
}

/// The normalized origin root for a URL, e.g. `https://example.com`
pub fn homepage_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.host_str()?;
    let origin = url.origin().ascii_serialization();
    Some(normalize_url(&origin))
}
