use crate::config::{ClientConfig, ClientCredentials};
use crate::error::{ApiError, Result};
use crate::types::{
    AccessToken, PageFile, PageFiles, QueryResponse, SearchPage, SearchResponse, Summary,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Search endpoints accept 1..=100 results.
pub const MAX_SEARCH_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryProp {
    Links,
    Categories,
}

pub struct WikipediaClient {
    client: Client,
    no_redirect: Client,
    config: ClientConfig,
    token: Option<String>,
    warned_no_token: AtomicBool,
}

impl WikipediaClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(config.timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        // Special:Random answers with a redirect whose Location names the article.
        let no_redirect = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect,
            config,
            token: None,
            warned_no_token: AtomicBool::new(false),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn search_pages(&self, terms: &[String], limit: u32) -> Result<Vec<SearchPage>> {
        debug!("Searching Wikipedia for: {}", terms.join(","));
        self.search("search/page", terms, limit).await
    }

    pub async fn search_titles(&self, terms: &[String], limit: u32) -> Result<Vec<SearchPage>> {
        debug!("Searching Wikipedia titles for: {}", terms.join(","));
        self.search("search/title", terms, limit).await
    }

    async fn search(&self, endpoint: &str, terms: &[String], limit: u32) -> Result<Vec<SearchPage>> {
        let query = search_query(terms);
        if query.is_empty() {
            return Err(ApiError::InvalidResponse(
                "search requires at least one term".to_string(),
            ));
        }
        let url = self.core_url(endpoint)?;
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT).to_string();
        let request = self
            .authorized(self.client.get(url.clone()))
            .query(&[("q", query.as_str()), ("limit", limit.as_str())]);

        let response: SearchResponse = self.get_json(request, url.as_str(), &query).await?;
        Ok(response.pages)
    }

    pub async fn summary(&self, title: &str) -> Result<Summary> {
        let url = self.join(&self.config.rest_api_url, &format!("page/summary/{}", page_key(title)))?;
        debug!("Fetching summary for {}", title);
        self.get_json(self.client.get(url.clone()), url.as_str(), title)
            .await
    }

    pub async fn page_html(&self, title: &str) -> Result<String> {
        let url = self.core_url(&format!("page/{}/html", page_key(title)))?;
        debug!("Fetching HTML for {}", title);
        let response = self.authorized(self.client.get(url.clone())).send().await?;
        let response = check_status(response, url.as_str(), title)?;
        Ok(response.text().await?)
    }

    pub async fn page_files(&self, title: &str) -> Result<Vec<PageFile>> {
        let url = self.core_url(&format!("page/{}/files", page_key(title)))?;
        debug!("Fetching file list for {}", title);
        let files: PageFiles = self
            .get_json(self.authorized(self.client.get(url.clone())), url.as_str(), title)
            .await?;
        Ok(files.files)
    }

    /// Resolve `Special:Random` to an article title without downloading the page.
    pub async fn random_title(&self) -> Result<String> {
        debug!("Getting a random page");
        let response = self.no_redirect.get(&self.config.random_url).send().await?;
        let status = response.status();
        if !status.is_redirection() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                url: self.config.random_url.clone(),
            });
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::InvalidResponse("redirect without Location header".to_string()))?;
        debug!("Random page: {}", location);

        let base = Url::parse(&self.config.random_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.config.random_url, e)))?;
        let resolved = base
            .join(location)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", location, e)))?;
        title_from_article_url(&resolved)
            .ok_or_else(|| ApiError::InvalidResponse(format!("not an article URL: {}", resolved)))
    }

    /// Outbound article links (namespace 0) in API response order, following
    /// `continue` pagination.
    pub async fn links(&self, title: &str) -> Result<Vec<String>> {
        self.query_titles(title, QueryProp::Links).await
    }

    /// Visible category names without the namespace prefix.
    pub async fn categories(&self, title: &str) -> Result<Vec<String>> {
        let raw = self.query_titles(title, QueryProp::Categories).await?;
        Ok(raw
            .into_iter()
            .map(|c| match c.split_once(':') {
                Some((_, name)) => name.to_string(),
                None => c,
            })
            .collect())
    }

    async fn query_titles(&self, title: &str, prop: QueryProp) -> Result<Vec<String>> {
        let title = title.trim();
        let mut params: Vec<(&str, &str)> = vec![
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("redirects", "1"),
            ("titles", title),
        ];
        match prop {
            QueryProp::Links => {
                params.extend([("prop", "links"), ("pllimit", "max"), ("plnamespace", "0")])
            }
            QueryProp::Categories => {
                params.extend([("prop", "categories"), ("cllimit", "max"), ("clshow", "!hidden")])
            }
        }

        let mut titles = Vec::new();
        let mut continuation: Option<BTreeMap<String, String>> = None;

        for round in 0..self.config.max_continue_pages.max(1) {
            let mut request = self.client.get(&self.config.action_api_url).query(&params);
            if let Some(ref cont) = continuation {
                request = request.query(cont);
            }

            let response: QueryResponse = self
                .get_json(request, &self.config.action_api_url, title)
                .await?;

            if let Some(err) = response.error {
                return Err(ApiError::InvalidResponse(format!("{}: {}", err.code, err.info)));
            }

            let page = response
                .query
                .and_then(|q| q.pages.into_iter().next())
                .ok_or_else(|| ApiError::InvalidResponse(format!("no page in query response for {}", title)))?;

            if page.missing || page.invalid {
                return Err(ApiError::NotFound(page.title));
            }

            let batch = match prop {
                QueryProp::Links => page.links,
                QueryProp::Categories => page.categories,
            };
            debug!("[{}] round {} returned {} {:?}", title, round, batch.len(), prop);
            titles.extend(batch.into_iter().map(|t| t.title));

            match response.continuation {
                Some(cont) => continuation = Some(cont),
                None => return Ok(titles),
            }
        }

        warn!(
            "Stopped paginating {:?} for {} after {} requests",
            prop, title, self.config.max_continue_pages
        );
        Ok(titles)
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let url = crate::types::absolute_url(url);
        debug!("Downloading {}", url);
        let response = self.client.get(&url).send().await?;
        let response = check_status(response, &url, &url)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Exchange client credentials for an access token.
    pub async fn request_token(&self, credentials: &ClientCredentials) -> Result<AccessToken> {
        debug!("Authenticating client credentials");
        let response = self
            .client
            .post(&self.config.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Auth(format!(
                "{} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown")
            )));
        }

        let body = response.text().await?;
        let token: AccessToken = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("token response: {}", e)))?;
        info!("Obtained access token valid for {}s", token.expires_in);
        Ok(token)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => {
                if !self.warned_no_token.swap(true, Ordering::Relaxed) {
                    warn!("No access token found.");
                }
                request
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
        subject: &str,
    ) -> Result<T> {
        let response = request.send().await?;
        let response = check_status(response, url, subject)?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }

    fn core_url(&self, path: &str) -> Result<Url> {
        self.join(&self.config.core_api_url, path)
    }

    fn join(&self, base: &str, path: &str) -> Result<Url> {
        let base = Url::parse(base).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?;
        base.join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

fn check_status(response: reqwest::Response, url: &str, subject: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(subject.to_string()));
    }
    if !status.is_success() {
        warn!("Error: {} - {}", status.as_u16(), status.canonical_reason().unwrap_or("unknown"));
        return Err(ApiError::Status {
            code: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}

/// Search terms joined the way the search endpoints expect them.
pub fn search_query(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("+")
}

/// Title as a REST path segment: spaces become underscores, the rest is percent-encoded.
pub fn page_key(title: &str) -> String {
    urlencoding::encode(&title.trim().replace(' ', "_")).into_owned()
}

/// Extract the article title from a `/wiki/<Title>` URL.
pub fn title_from_article_url(url: &Url) -> Option<String> {
    let path = url.path();
    let raw = path.strip_prefix("/wiki/")?;
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw).ok()?;
    Some(decoded.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header, method, path, query_param},
    };

    async fn client_for(server: &MockServer) -> WikipediaClient {
        WikipediaClient::new(ClientConfig::with_base_url(&server.uri(), "en")).unwrap()
    }

    #[test]
    fn test_page_key_encoding() {
        assert_eq!(page_key("Dog"), "Dog");
        assert_eq!(page_key(" New York City "), "New_York_City");
        assert_eq!(page_key("AC/DC"), "AC%2FDC");
    }

    #[test]
    fn test_search_query_joins_terms() {
        let terms = vec!["Python".to_string(), " ".to_string(), "language".to_string()];
        assert_eq!(search_query(&terms), "Python+language");
    }

    #[test]
    fn test_title_from_article_url() {
        let url = Url::parse("https://en.wikipedia.org/wiki/Caf%C3%A9_society").unwrap();
        assert_eq!(title_from_article_url(&url).as_deref(), Some("Café society"));
        let url = Url::parse("https://en.wikipedia.org/w/index.php").unwrap();
        assert_eq!(title_from_article_url(&url), None);
    }

    #[tokio::test]
    async fn test_search_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/core/v1/wikipedia/en/search/page"))
            .and(query_param("q", "Python"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"pages":[{"id":23862,"key":"Python_(programming_language)","title":"Python (programming language)","excerpt":"<span>Python</span> is","description":"General-purpose programming language"}]}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let pages = client.search_pages(&["Python".to_string()], 5).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].key, "Python_(programming_language)");
    }

    #[tokio::test]
    async fn test_search_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/core/v1/wikipedia/en/search/title"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"pages":[]}"#))
            .mount(&server)
            .await;

        let client = client_for(&server).await.with_token("secret-token");
        let pages = client.search_titles(&["Dog".to_string()], 500).await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_summary_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Does_Not_Exist"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.summary("Does Not Exist").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_summary_invalid_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Dog"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"unexpected":true}"#))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.summary("Dog").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/core/v1/wikipedia/en/page/Dog/html"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.page_html("Dog").await {
            Err(ApiError::Status { code, .. }) => assert_eq!(code, 503),
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_links_follow_continuation() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "links"))
            .and(query_param("plcontinue", "123|0|Pet"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"batchcomplete":true,"query":{"pages":[{"pageid":123,"ns":0,"title":"Dog","links":[{"ns":0,"title":"Pet"}]}]}}"#,
            ))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "links"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"continue":{"plcontinue":"123|0|Pet","continue":"||"},"query":{"pages":[{"pageid":123,"ns":0,"title":"Dog","links":[{"ns":0,"title":"Canine"},{"ns":0,"title":"Wolf"}]}]}}"#,
            ))
            .with_priority(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let links = client.links("Dog").await.unwrap();
        assert_eq!(links, vec!["Canine", "Wolf", "Pet"]);
    }

    #[tokio::test]
    async fn test_links_missing_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"query":{"pages":[{"ns":0,"title":"Nope","missing":true}]}}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.links("Nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_categories_strip_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "categories"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"query":{"pages":[{"ns":0,"title":"Inception","categories":[{"ns":14,"title":"Category:2010 films"},{"ns":14,"title":"Category:Films directed by Christopher Nolan"}]}]}}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let categories = client.categories("Inception").await.unwrap();
        assert_eq!(categories, vec!["2010 films", "Films directed by Christopher Nolan"]);
    }

    #[tokio::test]
    async fn test_random_title_from_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Special:Random"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", "https://en.wikipedia.org/wiki/Grey_wolf"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.random_title().await.unwrap(), "Grey wolf");
    }

    #[tokio::test]
    async fn test_random_title_without_redirect_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Special:Random"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.random_title().await.is_err());
    }

    #[tokio::test]
    async fn test_request_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/w/rest.php/oauth2/access_token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"tok","token_type":"Bearer","expires_in":14400}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let creds = ClientCredentials::from_parts("id", "secret").unwrap();
        let token = client.request_token(&creds).await.unwrap();
        assert_eq!(token.access_token, "tok");
        assert_eq!(token.token_type.to_lowercase(), "bearer");
        assert!(token.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_request_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/w/rest.php/oauth2/access_token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let creds = ClientCredentials::from_parts("id", "bad").unwrap();
        assert!(matches!(
            client.request_token(&creds).await,
            Err(ApiError::Auth(_))
        ));
    }
}
