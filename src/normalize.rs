/// URL normalization and safety filtering
use log::debug;
use url::Url;

/// Canonicalize a URL for comparison and for opening in a tab
///
/// Algorithm:
/// 1. Parse as an absolute URL, rejecting anything that does not parse
/// 2. Reject every scheme except `http` and `https`
/// 3. Take the canonical href and strip a single trailing `/`
///
/// Examples:
/// - https://example.com/foo/ → https://example.com/foo
/// - https://Example.COM → https://example.com
/// - https://example.com/?q=1 → https://example.com/?q=1
/// - javascript:alert(1) → None
pub fn normalize_url(raw: &str) -> Option<String> {
    let parsed = match Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Rejected unparseable URL {:?}: {}", raw, e);
            return None;
        }
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        debug!("Rejected URL with unsafe scheme {:?}", parsed.scheme());
        return None;
    }

    let href = String::from(parsed);
    match href.strip_suffix('/') {
        Some(stripped) => Some(stripped.to_string()),
        None => Some(href),
    }
}
