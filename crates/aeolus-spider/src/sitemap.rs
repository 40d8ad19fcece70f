//! Sitemap discovery and parsing
//!
//! Probes the standard sitemap locations plus any `Sitemap:` directives in
//! robots.txt, then parses sitemap-index and urlset documents recursively.
//! Probe failures are non-fatal; the first probe that contributes URLs stops
//! further probing.

use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use xml::reader::{EventReader, XmlEvent};

use crate::config::UrlFilters;
use crate::url_utils::{is_content_url, is_same_host, normalize_url};

/// Sitemap fetch timeout per document
const SITEMAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Robots fetch timeout while looking for Sitemap: directives
const ROBOTS_TIMEOUT: Duration = Duration::from_secs(5);

/// Cap on sitemap documents fetched per discovery run
const MAX_SITEMAP_FETCHES: usize = 50;

/// A parsed sitemap document
#[derive(Debug)]
enum SitemapDocument {
    /// `<sitemapindex>`: locs are nested sitemap URLs
    Index(Vec<String>),
    /// `<urlset>`: locs are page URLs
    UrlSet(Vec<String>),
    /// Anything else
    Other,
}

/// Discovers page URLs for a host via its sitemaps
#[derive(Debug)]
pub struct SitemapDiscovery {
    client: Client,
}

impl SitemapDiscovery {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(SITEMAP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Discover up to `max_pages` URLs for the start URL's host.
    ///
    /// Extracted URLs are normalized and filtered: same host as the start
    /// URL, include/exclude patterns, non-content denylist.
    pub async fn discover(
        &self,
        start_url: &str,
        filters: &UrlFilters,
        max_pages: usize,
    ) -> Vec<String> {
        let Ok(start) = Url::parse(start_url) else {
            return Vec::new();
        };
        let origin = start.origin().ascii_serialization();

        let mut probes: Vec<String> = vec![
            format!("{origin}/sitemap.xml"),
            format!("{origin}/sitemap_index.xml"),
            format!("{origin}/sitemaps.xml"),
            format!("{origin}/sitemap/sitemap.xml"),
        ];
        probes.extend(self.robots_sitemaps(&origin).await);

        let mut seen_probes = HashSet::new();
        probes.retain(|probe| seen_probes.insert(probe.clone()));

        let mut urls: Vec<String> = Vec::new();
        let mut seen_urls = HashSet::new();

        for probe in probes {
            let found = self
                .collect_from_sitemap(&probe, start_url, filters, max_pages, &mut seen_urls)
                .await;
            if found.is_empty() {
                continue;
            }
            urls.extend(found);
            // A probe that contributed URLs ends discovery
            break;
        }

        urls.truncate(max_pages);
        info!(start_url, discovered = urls.len(), "Sitemap discovery finished");
        urls
    }

    /// Fetch one sitemap and recurse through index documents
    async fn collect_from_sitemap(
        &self,
        sitemap_url: &str,
        start_url: &str,
        filters: &UrlFilters,
        max_pages: usize,
        seen_urls: &mut HashSet<String>,
    ) -> Vec<String> {
        let mut urls = Vec::new();
        let mut pending = vec![sitemap_url.to_string()];
        let mut fetched_sitemaps = HashSet::new();

        while let Some(current) = pending.pop() {
            if urls.len() >= max_pages || fetched_sitemaps.len() >= MAX_SITEMAP_FETCHES {
                break;
            }
            if !fetched_sitemaps.insert(current.clone()) {
                continue;
            }

            let content = match self.fetch_text(&current).await {
                Some(content) => content,
                None => continue,
            };

            match parse_sitemap(&content) {
                SitemapDocument::Index(children) => {
                    debug!(sitemap = %current, children = children.len(), "Recursing sitemap index");
                    pending.extend(children);
                }
                SitemapDocument::UrlSet(locs) => {
                    for loc in locs {
                        if urls.len() >= max_pages {
                            break;
                        }
                        let normalized = normalize_url(loc.trim());
                        if !is_same_host(&normalized, start_url) {
                            continue;
                        }
                        if !is_content_url(&normalized) || !filters.matches(&normalized) {
                            continue;
                        }
                        if seen_urls.insert(normalized.clone()) {
                            urls.push(normalized);
                        }
                    }
                }
                SitemapDocument::Other => {
                    debug!(sitemap = %current, "Skipping non-sitemap document");
                }
            }
        }

        urls
    }

    async fn fetch_text(&self, url: &str) -> Option<String> {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(text) => Some(text),
                Err(error) => {
                    warn!(url, error = %error, "Sitemap body read failed");
                    None
                }
            },
            Ok(response) => {
                debug!(url, status = response.status().as_u16(), "Sitemap probe missed");
                None
            }
            Err(error) => {
                debug!(url, error = %error, "Sitemap probe failed");
                None
            }
        }
    }

    /// `Sitemap:` directives from robots.txt, case-insensitive per RFC 9309
    async fn robots_sitemaps(&self, origin: &str) -> Vec<String> {
        let robots_url = format!("{origin}/robots.txt");
        let client = match Client::builder().timeout(ROBOTS_TIMEOUT).build() {
            Ok(client) => client,
            Err(_) => self.client.clone(),
        };

        let body = match client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => {
                response.text().await.unwrap_or_default()
            }
            _ => return Vec::new(),
        };

        let mut sitemaps = Vec::new();
        for line in body.lines() {
            let trimmed = line.trim();
            if trimmed.len() < 8 || !trimmed[..8].eq_ignore_ascii_case("sitemap:") {
                continue;
            }
            let value = trimmed[8..].trim();
            if let Ok(parsed) = Url::parse(value) {
                if parsed.scheme() == "http" || parsed.scheme() == "https" {
                    debug!(sitemap = value, "Found sitemap in robots.txt");
                    sitemaps.push(value.to_string());
                }
            }
        }
        sitemaps
    }
}

impl Default for SitemapDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one sitemap document, tracking element context
fn parse_sitemap(content: &str) -> SitemapDocument {
    let parser = EventReader::from_str(content);

    let mut root: Option<String> = None;
    let mut in_loc = false;
    let mut current_loc = String::new();
    let mut locs = Vec::new();

    for event in parser {
        match event {
            Ok(XmlEvent::StartElement { name, .. }) => {
                let local = name.local_name.to_lowercase();
                if root.is_none() {
                    root = Some(local.clone());
                }
                if local == "loc" {
                    in_loc = true;
                    current_loc.clear();
                }
            }
            Ok(XmlEvent::Characters(data)) | Ok(XmlEvent::CData(data)) => {
                if in_loc {
                    current_loc.push_str(&data);
                }
            }
            Ok(XmlEvent::EndElement { name }) => {
                if name.local_name.eq_ignore_ascii_case("loc") {
                    in_loc = false;
                    let loc = current_loc.trim().to_string();
                    if !loc.is_empty() {
                        locs.push(loc);
                    }
                }
            }
            Err(error) => {
                debug!(error = %error, "Sitemap XML parse stopped");
                break;
            }
            _ => {}
        }
    }

    match root.as_deref() {
        Some("sitemapindex") => SitemapDocument::Index(locs),
        Some("urlset") => SitemapDocument::UrlSet(locs),
        _ => SitemapDocument::Other,
    }
}
