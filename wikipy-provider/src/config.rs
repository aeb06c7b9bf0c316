use crate::error::{ApiError, Result};
use std::env;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "wikipy/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/wikipy/wikipy)"
);

/// Endpoint layout and transport settings for [`crate::WikipediaClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub language: String,
    /// Wikimedia core REST API, e.g. `https://api.wikimedia.org/core/v1/wikipedia/en/`
    pub core_api_url: String,
    /// Per-wiki REST API, e.g. `https://en.wikipedia.org/api/rest_v1/`
    pub rest_api_url: String,
    /// MediaWiki Action API, e.g. `https://en.wikipedia.org/w/api.php`
    pub action_api_url: String,
    pub random_url: String,
    pub auth_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Upper bound on `continue` round-trips for a single links/categories query.
    pub max_continue_pages: usize,
}

impl ClientConfig {
    pub fn for_language(language: &str) -> Self {
        let lang = language.trim().to_lowercase();
        Self {
            core_api_url: format!("https://api.wikimedia.org/core/v1/wikipedia/{lang}/"),
            rest_api_url: format!("https://{lang}.wikipedia.org/api/rest_v1/"),
            action_api_url: format!("https://{lang}.wikipedia.org/w/api.php"),
            random_url: format!("https://{lang}.wikipedia.org/wiki/Special:Random"),
            auth_url: "https://meta.wikimedia.org/w/rest.php/oauth2/access_token".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            max_continue_pages: 10,
            language: lang,
        }
    }

    /// Point every endpoint at a single host, keeping the production path layout.
    /// Used against mock servers and mirrors.
    pub fn with_base_url(base: &str, language: &str) -> Self {
        let base = base.trim_end_matches('/');
        let lang = language.trim().to_lowercase();
        Self {
            core_api_url: format!("{base}/core/v1/wikipedia/{lang}/"),
            rest_api_url: format!("{base}/api/rest_v1/"),
            action_api_url: format!("{base}/w/api.php"),
            random_url: format!("{base}/wiki/Special:Random"),
            auth_url: format!("{base}/w/rest.php/oauth2/access_token"),
            language: lang,
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_language("en")
    }
}

/// OAuth2 client-credentials pair for the Wikimedia API portal.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub const CLIENT_ID_VAR: &'static str = "WM_CLIENT_ID";
    pub const CLIENT_SECRET_VAR: &'static str = "WM_CLIENT_SECRET";

    pub fn from_env() -> Result<Self> {
        let client_id = env::var(Self::CLIENT_ID_VAR).unwrap_or_default();
        let client_secret = env::var(Self::CLIENT_SECRET_VAR).unwrap_or_default();
        Self::from_parts(&client_id, &client_secret)
    }

    pub fn from_parts(client_id: &str, client_secret: &str) -> Result<Self> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(ApiError::Auth(format!(
                "Client credentials not found (set {} and {})",
                Self::CLIENT_ID_VAR,
                Self::CLIENT_SECRET_VAR
            )));
        }
        Ok(Self {
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
        })
    }
}
