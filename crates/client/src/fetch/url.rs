//! Origin handling: resolving asset paths to URLs and request URLs back to
//! logical asset paths.

use percent_encoding::percent_decode_str;
use url::Url;

/// Error type for URL handling failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http(s) scheme
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// The base URL assets are served from.
///
/// The base path always ends in `/`, so `http://h:3000` and
/// `http://h:3000/` name the same origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    base: Url,
}

impl Origin {
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let mut base = canonicalize(input)?;
        base.set_query(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn as_url(&self) -> &Url {
        &self.base
    }

    /// URL of the asset at origin-relative `path`.
    pub fn asset_url(&self, path: &str) -> Result<Url, UrlError> {
        let relative = path.trim_start_matches('/');
        self.base
            .join(relative)
            .map_err(|e| UrlError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Logical asset path for a request URL, or `None` if the URL is not
    /// under this origin.
    ///
    /// Query and fragment are dropped. The remainder is percent-decoded so it
    /// matches the raw paths listed in the manifest; a remainder that does
    /// not decode to UTF-8 yields `None`.
    pub fn logical_path(&self, request_url: &str) -> Option<String> {
        let url = canonicalize(request_url).ok()?;

        if url.scheme() != self.base.scheme()
            || url.host_str() != self.base.host_str()
            || url.port_or_known_default() != self.base.port_or_known_default()
        {
            return None;
        }

        let relative = url.path().strip_prefix(self.base.path())?;
        if relative.is_empty() {
            return None;
        }
        let decoded = percent_decode_str(relative).decode_utf8().ok()?;
        Some(decoded.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("http://EXAMPLE.com:3000/static/a.css").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com/a.js#section").unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_origin_adds_trailing_slash() {
        let a = Origin::parse("http://172.20.68.11:3000").unwrap();
        let b = Origin::parse("http://172.20.68.11:3000/").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_url().path(), "/");
    }

    #[test]
    fn test_asset_url_joins_relative_path() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        let url = origin.asset_url("static/assets/style.css").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/static/assets/style.css");
    }

    #[test]
    fn test_asset_url_under_base_path() {
        let origin = Origin::parse("https://cdn.example.com/static").unwrap();
        let url = origin.asset_url("assets/font.ttf").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/static/assets/font.ttf");
    }

    #[test]
    fn test_logical_path_strips_origin() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        assert_eq!(
            origin.logical_path("http://localhost:3000/static/assets/a.css").as_deref(),
            Some("static/assets/a.css")
        );
    }

    #[test]
    fn test_logical_path_drops_query_and_fragment() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        assert_eq!(origin.logical_path("http://localhost:3000/a.js?v=2#x").as_deref(), Some("a.js"));
    }

    #[test]
    fn test_logical_path_under_base_path() {
        let origin = Origin::parse("https://cdn.example.com/static/").unwrap();
        assert_eq!(
            origin.logical_path("https://cdn.example.com/static/assets/a.png").as_deref(),
            Some("assets/a.png")
        );
        assert_eq!(origin.logical_path("https://cdn.example.com/other/a.png"), None);
    }

    #[test]
    fn test_logical_path_rejects_foreign_origin() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        assert_eq!(origin.logical_path("http://localhost:4000/a.js"), None);
        assert_eq!(origin.logical_path("https://localhost:3000/a.js"), None);
        assert_eq!(origin.logical_path("http://evil.example/a.js"), None);
    }

    #[test]
    fn test_logical_path_default_port_matches() {
        let origin = Origin::parse("https://cdn.example.com/").unwrap();
        assert_eq!(origin.logical_path("https://cdn.example.com:443/a.js").as_deref(), Some("a.js"));
    }

    #[test]
    fn test_logical_path_is_percent_decoded() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        assert_eq!(
            origin.logical_path("http://localhost:3000/static/assets/my%20logo.png").as_deref(),
            Some("static/assets/my logo.png")
        );
        assert_eq!(
            origin.logical_path("http://localhost:3000/fonts/%E5%AD%97%E4%BD%93.ttf").as_deref(),
            Some("fonts/字体.ttf")
        );
        assert_eq!(origin.logical_path("http://localhost:3000/fonts/字体.ttf").as_deref(), Some("fonts/字体.ttf"));
    }

    #[test]
    fn test_logical_path_invalid_utf8_is_none() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        assert_eq!(origin.logical_path("http://localhost:3000/bad%FF.js"), None);
    }

    #[test]
    fn test_asset_url_and_logical_path_agree() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        for path in ["static/assets/my logo.png", "fonts/字体.ttf", "a.css"] {
            let url = origin.asset_url(path).unwrap();
            assert_eq!(origin.logical_path(url.as_str()).as_deref(), Some(path));
        }
    }

    #[test]
    fn test_logical_path_of_root_is_none() {
        let origin = Origin::parse("http://localhost:3000/").unwrap();
        assert_eq!(origin.logical_path("http://localhost:3000/"), None);
        assert_eq!(origin.logical_path("not a url"), None);
    }
}
