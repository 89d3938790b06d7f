//! Event link resolution.

use url::Url;

/// Link schemes that never point at an event page.
const NON_NAVIGABLE_PREFIXES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

/// Resolve an `href` found on the listing into an absolute event URL.
///
/// Absolute `http(s)` links are returned exactly as given, so resolving an
/// already-resolved URL is a no-op. Relative links are joined onto
/// `base_origin` (e.g. `https://lu.ma`). Fragment-only and non-navigable
/// links (`javascript:`, `mailto:`, ...) yield `None`.
#[must_use]
pub fn resolve_event_url(base_origin: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if NON_NAVIGABLE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return None;
    }

    if let Ok(absolute) = Url::parse(href) {
        return matches!(absolute.scheme(), "http" | "https").then(|| href.to_string());
    }

    match Url::parse(base_origin).and_then(|base| base.join(href)) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(e) => {
            tracing::debug!(base_origin, href, error = %e, "could not resolve event link");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_root_relative_link() {
        assert_eq!(
            resolve_event_url("https://lu.ma", "/ai-night").as_deref(),
            Some("https://lu.ma/ai-night")
        );
    }

    #[test]
    fn resolves_bare_relative_link_against_origin() {
        assert_eq!(
            resolve_event_url("https://lu.ma", "ai-night?tk=1").as_deref(),
            Some("https://lu.ma/ai-night?tk=1")
        );
    }

    #[test]
    fn absolute_link_is_unchanged() {
        let href = "https://lu.ma/ai-night";
        assert_eq!(resolve_event_url("https://example.org", href).as_deref(), Some(href));
        // No normalisation either: an origin without a trailing slash stays as-is.
        assert_eq!(
            resolve_event_url("https://example.org", "https://lu.ma").as_deref(),
            Some("https://lu.ma")
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = resolve_event_url("https://lu.ma", "/ai-night").unwrap();
        let twice = resolve_event_url("https://lu.ma", &once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            resolve_event_url("https://lu.ma", "/ai-night"),
            resolve_event_url("https://lu.ma", "/ai-night")
        );
    }

    #[test]
    fn protocol_relative_link_takes_origin_scheme() {
        assert_eq!(
            resolve_event_url("https://lu.ma", "//lu.ma/ai-night").as_deref(),
            Some("https://lu.ma/ai-night")
        );
    }

    #[test]
    fn ignores_non_navigable_links() {
        for href in ["#", "#details", "javascript:void(0)", "mailto:a@b.c", "  ", "ftp://x/y"] {
            assert_eq!(resolve_event_url("https://lu.ma", href), None, "{href}");
        }
    }
}
