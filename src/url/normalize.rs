use url::Url;

/// Normalizes a URL string into the canonical form used for all
/// dedup/visited/queued identity checks.
///
/// # Normalization Steps
///
/// 1. Trim leading/trailing whitespace
/// 2. Parse the URL; if it does not parse, return the trimmed input
///    unchanged (this function never fails)
/// 3. Lowercase the scheme and host (the `url` crate does both on parse)
/// 4. Remove the fragment (everything after `#`)
/// 5. Remove the query string
///
/// Path case, port, userinfo, and percent-encoding are preserved: two docs
/// pages that differ only in path case are genuinely different resources on
/// the sites this crawler targets.
///
/// Two URL strings that normalize to the same output are the same page.
///
/// # Examples
///
/// ```
/// use docatlas::url::normalize;
///
/// let url = normalize("  HTTPS://Docs.Example.com/Guide/intro.html?hl=en#setup ");
/// assert_eq!(url, "https://docs.example.com/Guide/intro.html");
/// ```
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();

    let mut url = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => return trimmed.to_string(),
    };

    url.set_fragment(None);
    url.set_query(None);

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fragment() {
        assert_eq!(
            normalize("https://example.com/page#section-3"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_strips_query() {
        assert_eq!(
            normalize("https://example.com/page?hl=en&v=2"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_strips_query_and_fragment() {
        assert_eq!(
            normalize("https://example.com/page?x=1#top"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_lowercases_scheme_and_host() {
        assert_eq!(
            normalize("HTTPS://DOCS.Example.COM/Guide"),
            "https://docs.example.com/Guide"
        );
    }

    #[test]
    fn test_preserves_path_case() {
        assert_eq!(
            normalize("https://example.com/Docs/Install.html"),
            "https://example.com/Docs/Install.html"
        );
    }

    #[test]
    fn test_preserves_port() {
        assert_eq!(
            normalize("http://example.com:8080/page"),
            "http://example.com:8080/page"
        );
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            normalize("  https://example.com/page \n"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_malformed_returned_unchanged() {
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize("  ./relative/path  "), "./relative/path");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://example.com/page?x=1#frag",
            "HTTP://EXAMPLE.COM/A/B.html",
            "not a url at all",
            "https://example.com",
            "ftp://example.com/file",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_empty_path_gets_root_slash() {
        // Url renders a missing path as "/" for http(s); both spellings of
        // the site root must collapse to one identity.
        assert_eq!(normalize("https://example.com"), "https://example.com/");
        assert_eq!(normalize("https://example.com/"), "https://example.com/");
    }
}
