// In-memory article source shared by the builder tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use wikipy_core::error::{Result, WikipyError};
use wikipy_core::model::Article;
use wikipy_core::source::ArticleSource;
use wikipy_provider::ApiError;

#[derive(Default)]
pub struct FakeSource {
    links: HashMap<String, Vec<String>>,
    articles: HashMap<String, Article>,
    failing: HashSet<String>,
    fatal: HashSet<String>,
    pub link_calls: Vec<String>,
    pub article_calls: Vec<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(mut self, title: &str, links: &[&str]) -> Self {
        self.links
            .insert(title.to_string(), links.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_article(mut self, article: Article) -> Self {
        self.articles.insert(article.title.clone(), article);
        self
    }

    /// Every call for `title` fails with a recoverable fetch error.
    pub fn failing(mut self, title: &str) -> Self {
        self.failing.insert(title.to_string());
        self
    }

    /// Every call for `title` fails with an error the builders must not swallow.
    pub fn fatal(mut self, title: &str) -> Self {
        self.fatal.insert(title.to_string());
        self
    }

    fn check(&self, title: &str) -> Result<()> {
        if self.fatal.contains(title) {
            return Err(WikipyError::Render(format!("fatal {}", title)));
        }
        if self.failing.contains(title) {
            return Err(WikipyError::Fetch(ApiError::Status {
                code: 503,
                url: format!("https://example.test/{}", title),
            }));
        }
        Ok(())
    }
}

impl ArticleSource for FakeSource {
    async fn get_links(&mut self, title: &str) -> Result<Vec<String>> {
        self.link_calls.push(title.to_string());
        self.check(title)?;
        Ok(self.links.get(title).cloned().unwrap_or_default())
    }

    async fn get_article(&mut self, title: &str) -> Result<Article> {
        self.article_calls.push(title.to_string());
        self.check(title)?;
        self.articles
            .get(title)
            .cloned()
            .ok_or_else(|| WikipyError::NotFound(title.to_string()))
    }
}

pub fn seeds(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
