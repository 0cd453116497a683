use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::{info, warn};

use crate::client::HttpClient;
use crate::error::SitemapError;
use crate::validate::SitemapUrl;

/// Sitemap schema namespaces, tried in order.
const SITEMAP_NAMESPACES: &[&str] = &[
    "http://www.sitemaps.org/schemas/sitemap/0.9",
    "https://www.sitemaps.org/schemas/sitemap/0.9",
    "http://www.google.com/schemas/sitemap/0.9",
    "http://www.google.com/schemas/sitemap/0.84",
];

/// Fetch the sitemap and return every page URL it lists.
///
/// Transport, status and XML failures are logged and yield an empty list;
/// the caller decides whether an empty list is fatal.
pub async fn fetch_page_urls(client: &HttpClient, sitemap: &SitemapUrl) -> Vec<String> {
    info!("Fetching sitemap: {}", sitemap);
    match try_fetch_page_urls(client, sitemap.as_str()).await {
        Ok(urls) => {
            info!("Total URLs in sitemap: {}", urls.len());
            urls
        }
        Err(e) => {
            warn!(url = %sitemap, "{}", e);
            Vec::new()
        }
    }
}

async fn try_fetch_page_urls(client: &HttpClient, url: &str) -> Result<Vec<String>, SitemapError> {
    let xml = client.fetch_sitemap(url).await?;
    parse_urlset(&xml)
}

/// One `<url>` element: its resolved namespace and the text of its first
/// same-namespace `<loc>` child, if any.
#[derive(Debug, Default)]
struct UrlElement {
    ns: Option<String>,
    loc: Option<String>,
}

/// Parse a urlset XML document and return its `<loc>` URLs in document order.
pub fn parse_urlset(xml: &str) -> Result<Vec<String>, SitemapError> {
    let elements = scan_url_elements(xml)?;
    Ok(select_locs(&elements))
}

fn select_locs(elements: &[UrlElement]) -> Vec<String> {
    let locs_in = |ns: Option<&str>| -> Vec<String> {
        elements
            .iter()
            .filter(|e| e.ns.as_deref() == ns)
            .filter_map(|e| e.loc.clone())
            .filter(|loc| !loc.is_empty())
            .collect()
    };

    // First namespace with any <url> elements wins, even if none had a <loc>.
    let namespaced = SITEMAP_NAMESPACES
        .iter()
        .find(|ns| elements.iter().any(|e| e.ns.as_deref() == Some(**ns)))
        .map(|ns| locs_in(Some(ns)))
        .unwrap_or_default();

    if namespaced.is_empty() {
        locs_in(None)
    } else {
        namespaced
    }
}

fn scan_url_elements(xml: &str) -> Result<Vec<UrlElement>, SitemapError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut elements: Vec<UrlElement> = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    // Depth of the currently open <url> element.
    let mut open_url: Option<usize> = None;
    let mut in_loc = false;

    loop {
        let (resolved, event) = reader.read_resolved_event().map_err(xml_error)?;
        let ns = namespace_of(&resolved);

        match event {
            Event::Start(e) => {
                depth += 1;
                seen_root = true;
                match e.local_name().as_ref() {
                    b"url" => {
                        elements.push(UrlElement { ns, loc: None });
                        open_url = Some(depth);
                    }
                    b"loc" => in_loc = start_loc(&mut elements, open_url, depth, ns),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                seen_root = true;
                match e.local_name().as_ref() {
                    b"url" => elements.push(UrlElement { ns, loc: None }),
                    b"loc" => {
                        start_loc(&mut elements, open_url, depth + 1, ns);
                    }
                    _ => {}
                }
            }
            Event::Text(e) if in_loc => {
                let text = e.unescape().map_err(xml_error)?;
                append_loc(&mut elements, &text);
            }
            Event::CData(e) if in_loc => {
                let raw = e.into_inner();
                append_loc(&mut elements, &String::from_utf8_lossy(&raw));
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"loc" if in_loc => in_loc = false,
                    b"url" if open_url == Some(depth) => open_url = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(SitemapError::NoRoot);
    }
    if depth > 0 {
        return Err(SitemapError::Xml("unexpected end of document".to_string()));
    }

    for element in &mut elements {
        if let Some(loc) = element.loc.as_mut() {
            *loc = loc.trim().to_string();
        }
    }
    Ok(elements)
}

/// Open a `<loc>` if it is a direct child of the open `<url>`, shares its
/// namespace, and is the first one seen there.
fn start_loc(
    elements: &mut [UrlElement],
    open_url: Option<usize>,
    depth: usize,
    ns: Option<String>,
) -> bool {
    let Some(url_depth) = open_url else {
        return false;
    };
    match elements.last_mut() {
        Some(current) if url_depth + 1 == depth && current.ns == ns && current.loc.is_none() => {
            current.loc = Some(String::new());
            true
        }
        _ => false,
    }
}

fn append_loc(elements: &mut [UrlElement], text: &str) {
    if let Some(loc) = elements.last_mut().and_then(|e| e.loc.as_mut()) {
        loc.push_str(text);
    }
}

fn namespace_of(resolved: &ResolveResult) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

fn xml_error(e: impl std::fmt::Display) -> SitemapError {
    SitemapError::Xml(e.to_string())
}
