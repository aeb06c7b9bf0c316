use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `GET search/page` and `GET search/title` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub pages: Vec<SearchPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub id: u64,
    /// URL-friendly title, usable as `{page}` in the page endpoints.
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub matched_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub mimetype: Option<String>,
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// `GET page/summary/{title}` payload from the per-wiki REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub title: String,
    #[serde(default)]
    pub pageid: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extract: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Summary {
    pub fn is_disambiguation(&self) -> bool {
        self.kind.as_deref() == Some("disambiguation")
    }
}

/// `GET page/{page}/files` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFiles {
    pub files: Vec<PageFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFile {
    pub title: String,
    #[serde(default)]
    pub file_description_url: Option<String>,
    #[serde(default)]
    pub preferred: Option<FileVariant>,
    #[serde(default)]
    pub original: Option<FileVariant>,
}

impl PageFile {
    /// Best downloadable URL, preferring the original upload and normalizing
    /// protocol-relative links.
    pub fn download_url(&self) -> Option<String> {
        let variant = self.original.as_ref().or(self.preferred.as_ref())?;
        Some(absolute_url(&variant.url))
    }

    /// File name without the `File:` namespace prefix.
    pub fn file_name(&self) -> &str {
        self.title
            .split_once(':')
            .map(|(_, name)| name)
            .unwrap_or(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileVariant {
    #[serde(default)]
    pub mediatype: Option<String>,
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// OAuth2 token endpoint payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
}

impl AccessToken {
    /// Unix timestamp at which the token stops being valid, counted from `now`.
    pub fn expires_at(&self, now: i64) -> i64 {
        now + self.expires_in
    }
}

// Action API (`action=query&formatversion=2`) shapes. Only the fields the
// client reads are modelled; anything else is ignored by serde.

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub query: Option<QueryPages>,
    #[serde(rename = "continue", default)]
    pub continuation: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryPages {
    #[serde(default)]
    pub pages: Vec<QueryPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryPage {
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub links: Vec<TitleRef>,
    #[serde(default)]
    pub categories: Vec<TitleRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TitleRef {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryError {
    pub code: String,
    #[serde(default)]
    pub info: String,
}

pub(crate) fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}
