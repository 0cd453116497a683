use std::fmt;

use url::Url;

use crate::error::UrlError;

/// Host labels that are dropped when deriving the API host and output stem.
const STRIPPED_LABELS: &[&str] = &["docs.", "www."];

/// A validated absolute sitemap URL with an `http`/`https` scheme and a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapUrl {
    text: String,
    url: Url,
}

impl SitemapUrl {
    /// Normalize raw CLI input: prepend `https://` when no scheme is given,
    /// then require a network location.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(UrlError::Empty);
        }

        let text = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };

        let url = Url::parse(&text).map_err(|_| UrlError::Invalid(text.clone()))?;
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self { text, url }),
            _ => Err(UrlError::Invalid(text)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host plus explicit port, e.g. `docs.example.com:8080`.
    pub fn netloc(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Network location with leading `docs.`/`www.` labels removed.
    pub fn bare_netloc(&self) -> String {
        strip_doc_labels(&self.netloc()).to_string()
    }
}

impl fmt::Display for SitemapUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// clap `value_parser` hook.
pub fn parse_sitemap_url(raw: &str) -> Result<SitemapUrl, UrlError> {
    SitemapUrl::parse(raw)
}

fn strip_doc_labels(mut host: &str) -> &str {
    while let Some(rest) = STRIPPED_LABELS
        .iter()
        .find_map(|label| host.strip_prefix(label))
    {
        host = rest;
    }
    host
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_https_when_scheme_missing() {
        let url = SitemapUrl::parse("docs.example.com/sitemap.xml").unwrap();
        assert_eq!(url.as_str(), "https://docs.example.com/sitemap.xml");
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn keeps_explicit_http() {
        let url = SitemapUrl::parse("http://example.com/sitemap.xml").unwrap();
        assert_eq!(url.as_str(), "http://example.com/sitemap.xml");
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(SitemapUrl::parse(""), Err(UrlError::Empty));
        assert_eq!(SitemapUrl::parse("   "), Err(UrlError::Empty));
    }

    #[test]
    fn rejects_missing_host() {
        assert!(matches!(SitemapUrl::parse("https://"), Err(UrlError::Invalid(_))));
        assert!(matches!(SitemapUrl::parse("https://:8080/sitemap.xml"), Err(UrlError::Invalid(_))));
    }

    #[test]
    fn netloc_keeps_port() {
        let url = SitemapUrl::parse("http://127.0.0.1:8080/sitemap.xml").unwrap();
        assert_eq!(url.netloc(), "127.0.0.1:8080");
    }

    #[test]
    fn bare_netloc_strips_leading_labels_only() {
        let url = SitemapUrl::parse("https://docs.example.com/sitemap.xml").unwrap();
        assert_eq!(url.bare_netloc(), "example.com");

        let url = SitemapUrl::parse("https://www.docs.example.com/sitemap.xml").unwrap();
        assert_eq!(url.bare_netloc(), "example.com");

        // Only leading labels go; an inner "docs." stays.
        let url = SitemapUrl::parse("https://api.docs.example.com/sitemap.xml").unwrap();
        assert_eq!(url.bare_netloc(), "api.docs.example.com");
    }
}
