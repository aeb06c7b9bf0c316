//! Where builders get article data from.
//!
//! [`ArticleSource`] is the seam between the traversal code and the outside
//! world. [`CachedSource`] answers from the local [`Database`] first and falls
//! back to the [`WikipediaClient`], writing what it fetched back to the cache.

use crate::data::Database;
use crate::error::{Result, WikipyError};
use crate::model::Article;
use tracing::{debug, warn};
use wikipy_provider::WikipediaClient;

#[allow(async_fn_in_trait)]
pub trait ArticleSource {
    /// Outbound article links of `title` in source order.
    async fn get_links(&mut self, title: &str) -> Result<Vec<String>>;

    /// Summary, description and categories of `title`.
    async fn get_article(&mut self, title: &str) -> Result<Article>;
}

/// How a [`CachedSource`] treats the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve cache hits, fetch and store misses.
    #[default]
    ReadWrite,
    /// Ignore cached rows, always fetch, overwrite the cache.
    Refresh,
    /// Never touch the network; a miss is `NotFound`.
    Offline,
}

pub struct CachedSource<'a> {
    client: &'a WikipediaClient,
    db: &'a Database,
    mode: CacheMode,
    cache_hits: usize,
    fetches: usize,
}

impl<'a> CachedSource<'a> {
    pub fn new(client: &'a WikipediaClient, db: &'a Database) -> Self {
        Self {
            client,
            db,
            mode: CacheMode::ReadWrite,
            cache_hits: 0,
            fetches: 0,
        }
    }

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }

    fn use_cache(&self) -> bool {
        self.mode != CacheMode::Refresh
    }

    fn offline_miss(&self, title: &str) -> Result<()> {
        if self.mode == CacheMode::Offline {
            return Err(WikipyError::NotFound(format!("{} (not cached)", title)));
        }
        Ok(())
    }

    /// Parsoid HTML of the article, cached alongside the summary row.
    pub async fn get_html(&mut self, title: &str) -> Result<String> {
        if self.use_cache()
            && let Some(html) = self.db.get_article_html(title)?
        {
            self.cache_hits += 1;
            debug!("HTML cache hit for {}", title);
            return Ok(html);
        }
        self.offline_miss(title)?;

        self.fetches += 1;
        let html = self.client.page_html(title).await?;
        if let Err(e) = self.db.set_article_html(title, &html) {
            warn!("Failed to cache HTML for {}: {}", title, e);
        }
        Ok(html)
    }

    pub async fn get_categories(&mut self, title: &str) -> Result<Vec<String>> {
        if self.use_cache()
            && let Some(categories) = self.db.get_categories(title)?
        {
            self.cache_hits += 1;
            return Ok(categories);
        }
        self.offline_miss(title)?;

        self.fetches += 1;
        let categories = self.client.categories(title).await?;
        if let Err(e) = self.db.replace_categories(title, &categories) {
            warn!("Failed to cache categories for {}: {}", title, e);
        }
        Ok(categories)
    }
}

impl ArticleSource for CachedSource<'_> {
    async fn get_links(&mut self, title: &str) -> Result<Vec<String>> {
        if self.use_cache()
            && let Some(links) = self.db.get_links(title)?
        {
            self.cache_hits += 1;
            debug!("Link cache hit for {} ({} links)", title, links.len());
            return Ok(links);
        }
        self.offline_miss(title)?;

        self.fetches += 1;
        let links = self.client.links(title).await?;
        if let Err(e) = self.db.replace_links(title, &links) {
            warn!("Failed to cache links for {}: {}", title, e);
        }
        Ok(links)
    }

    async fn get_article(&mut self, title: &str) -> Result<Article> {
        if self.use_cache()
            && let Some(article) = self.db.get_article(title)?
            && self.db.get_categories(title)?.is_some()
        {
            self.cache_hits += 1;
            debug!("Article cache hit for {}", title);
            return Ok(article);
        }
        self.offline_miss(title)?;

        self.fetches += 1;
        let summary = self.client.summary(title).await?;
        let categories = self.get_categories(title).await?;

        let article = Article {
            title: title.to_string(),
            page_id: summary.pageid.map(|id| id as i64),
            description: summary.description,
            summary: summary.extract,
            html: None,
            links: self.db.get_links(title)?.unwrap_or_default(),
            categories,
        };
        if let Err(e) = self.db.upsert_article(&article) {
            warn!("Failed to cache article {}: {}", title, e);
        }
        Ok(article)
    }
}
