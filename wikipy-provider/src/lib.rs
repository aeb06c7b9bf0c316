pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{WikipediaClient, page_key, search_query};
pub use config::{ClientConfig, ClientCredentials};
pub use error::ApiError;
pub use types::{AccessToken, PageFile, SearchPage, Summary};
