//! Representative vehicle photos: Wikipedia page images first, Brave image
//! search as a fallback.

use std::collections::HashMap;
use std::time::Duration;

use askmycar_config::{ImageConfig, SearchConfig};
use serde::Deserialize;
use tracing::debug;

use crate::cache::ImageCache;

/// Candidate Wikipedia article titles, most likely first.
pub fn wiki_titles(make: &str, model: &str) -> Vec<String> {
    let make = normalize_make(make.trim());
    let model = model.trim();
    let first_word = model.split(' ').next().unwrap_or(model);

    let make = slug(&make);
    let model_slug = slug(model);

    vec![
        format!("{make}_{model_slug}"),
        format!("{make}_{model_slug}_(automobile)"),
        format!("{make}_{}", slug(first_word)),
        format!("{make}_{model_slug}_pickup"),
        format!("{make}_pickup"),
        format!("{make}_{model_slug}_truck"),
    ]
}

fn normalize_make(make: &str) -> String {
    match make.to_lowercase().as_str() {
        "ram" => "Ram".into(),
        "gmc" => "GMC".into(),
        "bmw" => "BMW".into(),
        "mercedes-benz" | "mercedes benz" => "Mercedes-Benz".into(),
        _ => {
            let mut chars = make.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

fn slug(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("_")
}

pub struct ImageLookup {
    client: reqwest::Client,
    wikipedia_url: String,
    user_agent: String,
    search_url: String,
    search_key: Option<String>,
}

impl ImageLookup {
    pub fn new(images: &ImageConfig, search: &SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(images.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            wikipedia_url: images.wikipedia_url.clone(),
            user_agent: images.user_agent.clone(),
            search_url: search.base_url.trim_end_matches('/').to_string(),
            search_key: search.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    /// Find a photo, trying Wikipedia then Brave.
    pub async fn find(&self, year: u16, make: &str, model: &str) -> Option<String> {
        if let Some(url) = self.from_wikipedia(make, model).await {
            return Some(url);
        }
        self.from_brave(year, make, model).await
    }

    async fn from_wikipedia(&self, make: &str, model: &str) -> Option<String> {
        for title in wiki_titles(make, model) {
            match self.wikipedia_thumbnail(&title).await {
                Ok(Some(url)) => {
                    debug!(%title, "Wikipedia image found");
                    return Some(url);
                }
                Ok(None) => {}
                Err(e) => debug!(%title, error = %e, "Wikipedia lookup failed"),
            }
        }
        None
    }

    async fn wikipedia_thumbnail(&self, title: &str) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .client
            .get(&self.wikipedia_url)
            .header("User-Agent", &self.user_agent)
            .query(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "pageimages"),
                ("format", "json"),
                ("pithumbsize", "800"),
                ("piprop", "thumbnail"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: WikiResponse = response.json().await?;
        let page = body.query.and_then(|q| q.pages.into_values().next());
        Ok(page.and_then(WikiPage::thumbnail_url))
    }

    async fn from_brave(&self, year: u16, make: &str, model: &str) -> Option<String> {
        let key = self.search_key.as_deref()?;
        let query = format!("{year} {make} {model} car");
        let url = format!("{}/res/v1/images/search", self.search_url);

        let result = async {
            self.client
                .get(&url)
                .header("X-Subscription-Token", key)
                .header("Accept", "application/json")
                .query(&[("q", query.as_str()), ("count", "5"), ("safesearch", "strict")])
                .send()
                .await?
                .error_for_status()?
                .json::<BraveImages>()
                .await
        }
        .await;

        match result {
            Ok(images) => images.results.into_iter().find_map(BraveImage::https_src),
            Err(e) => {
                debug!(error = %e, "Brave image search failed");
                None
            }
        }
    }
}

/// Cached image resolution.
pub struct CarImages {
    lookup: ImageLookup,
    cache: ImageCache,
}

impl CarImages {
    pub fn new(lookup: ImageLookup, cache: ImageCache) -> Self {
        Self { lookup, cache }
    }

    pub fn from_config(images: &ImageConfig, search: &SearchConfig) -> Self {
        Self::new(
            ImageLookup::new(images, search),
            ImageCache::new(images.cache_capacity, Duration::from_secs(images.cache_ttl_secs)),
        )
    }

    /// Image URL for the vehicle, or `None` when no source has one.
    /// Only hits are cached.
    pub async fn url_for(&self, year: u16, make: &str, model: &str) -> Option<String> {
        let key = ImageCache::key(year, make, model);
        if let Some(url) = self.cache.get(&key).await {
            return Some(url);
        }

        let url = self.lookup.find(year, make, model).await?;
        self.cache.insert(key, url.clone()).await;
        Some(url)
    }
}

#[derive(Debug, Deserialize)]
struct WikiResponse {
    #[serde(default)]
    query: Option<WikiQuery>,
}

#[derive(Debug, Deserialize)]
struct WikiQuery {
    #[serde(default)]
    pages: HashMap<String, WikiPage>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    #[serde(default)]
    pageid: Option<i64>,
    #[serde(default)]
    missing: Option<serde_json::Value>,
    #[serde(default)]
    thumbnail: Option<WikiThumbnail>,
}

#[derive(Debug, Deserialize)]
struct WikiThumbnail {
    source: String,
}

impl WikiPage {
    fn thumbnail_url(self) -> Option<String> {
        if self.missing.is_some() || self.pageid == Some(-1) {
            return None;
        }
        self.thumbnail.map(|t| t.source).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct BraveImages {
    #[serde(default)]
    results: Vec<BraveImage>,
}

#[derive(Debug, Deserialize)]
struct BraveImage {
    #[serde(default)]
    thumbnail: Option<ImageSrc>,
    #[serde(default)]
    image: Option<ImageSrc>,
}

#[derive(Debug, Deserialize)]
struct ImageSrc {
    #[serde(default)]
    src: Option<String>,
}

impl BraveImage {
    fn https_src(self) -> Option<String> {
        let src = self
            .thumbnail
            .and_then(|t| t.src)
            .filter(|s| !s.is_empty())
            .or_else(|| self.image.and_then(|i| i.src))?;
        src.starts_with("https").then_some(src)
    }
}
