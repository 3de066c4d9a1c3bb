use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TmdbConfig;

/// Movie as described by the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub original_language: Option<String>,
}

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<CatalogMovie>>;
    async fn movie(&self, tmdb_id: i64) -> anyhow::Result<CatalogMovie>;
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<CatalogMovie>,
}

pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TmdbClient {
    pub fn new(cfg: &TmdbConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        }
    }

    fn api_key(&self) -> anyhow::Result<&str> {
        self.api_key
            .as_deref()
            .context("TMDB_API_KEY is not configured")
    }
}

#[async_trait]
impl MovieCatalog for TmdbClient {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<CatalogMovie>> {
        let url = format!("{}/search/movie", self.base_url);
        let page: SearchPage = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key()?), ("query", query)])
            .send()
            .await
            .context("tmdb search request")?
            .error_for_status()
            .context("tmdb search status")?
            .json()
            .await
            .context("tmdb search body")?;
        debug!(%query, hits = page.results.len(), "tmdb search");
        Ok(page.results)
    }

    async fn movie(&self, tmdb_id: i64) -> anyhow::Result<CatalogMovie> {
        let url = format!("{}/movie/{}", self.base_url, tmdb_id);
        let movie = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key()?)])
            .send()
            .await
            .with_context(|| format!("tmdb movie {tmdb_id} request"))?
            .error_for_status()
            .with_context(|| format!("tmdb movie {tmdb_id} status"))?
            .json::<CatalogMovie>()
            .await
            .with_context(|| format!("tmdb movie {tmdb_id} body"))?;
        Ok(movie)
    }
}
