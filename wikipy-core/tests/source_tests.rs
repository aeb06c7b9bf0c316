// Tests for the cache-first article source against a mock Wikipedia

use serde_json::json;
use wikipy_core::data::Database;
use wikipy_core::error::WikipyError;
use wikipy_core::graph::GraphBuilder;
use wikipy_core::source::{ArticleSource, CacheMode, CachedSource};
use wikipy_provider::{ClientConfig, WikipediaClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> WikipediaClient {
    WikipediaClient::new(ClientConfig::with_base_url(&server.uri(), "en")).unwrap()
}

fn links_body(title: &str, links: &[&str]) -> serde_json::Value {
    let links: Vec<_> = links.iter().map(|t| json!({ "ns": 0, "title": t })).collect();
    json!({ "batchcomplete": true, "query": { "pages": [{ "title": title, "links": links }] } })
}

async fn mount_links(server: &MockServer, title: &str, links: &[&str], times: u64) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("prop", "links"))
        .and(query_param("titles", title))
        .respond_with(ResponseTemplate::new(200).set_body_json(links_body(title, links)))
        .expect(times)
        .mount(server)
        .await;
}

// ============================================================================
// Link Cache Tests
// ============================================================================

#[tokio::test]
async fn test_links_fetched_once_then_cached() {
    let server = MockServer::start().await;
    mount_links(&server, "Dog", &["Canine", "Wolf"], 1).await;

    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    let mut source = CachedSource::new(&client, &db);

    let first = source.get_links("Dog").await.unwrap();
    let second = source.get_links("Dog").await.unwrap();

    assert_eq!(first, vec!["Canine", "Wolf"]);
    assert_eq!(first, second);
    assert_eq!(source.fetches(), 1);
    assert_eq!(source.cache_hits(), 1);
    assert_eq!(db.get_links("Dog").unwrap().unwrap(), vec!["Canine", "Wolf"]);
}

#[tokio::test]
async fn test_refresh_ignores_cache() {
    let server = MockServer::start().await;
    mount_links(&server, "Dog", &["Canine"], 1).await;

    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    db.replace_links("Dog", &["Stale".to_string()]).unwrap();

    let mut source = CachedSource::new(&client, &db).with_mode(CacheMode::Refresh);
    assert_eq!(source.get_links("Dog").await.unwrap(), vec!["Canine"]);
    assert_eq!(db.get_links("Dog").unwrap().unwrap(), vec!["Canine"]);
}

#[tokio::test]
async fn test_offline_miss_is_not_found() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    db.replace_links("Dog", &["Canine".to_string()]).unwrap();

    let mut source = CachedSource::new(&client, &db).with_mode(CacheMode::Offline);
    assert_eq!(source.get_links("Dog").await.unwrap(), vec!["Canine"]);

    let miss = source.get_links("Cat").await;
    assert!(matches!(miss, Err(WikipyError::NotFound(_))));
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn test_missing_page_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "pages": [{ "title": "Nowhere", "missing": true }] }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    let mut source = CachedSource::new(&client, &db);

    let err = source.get_links("Nowhere").await.unwrap_err();
    assert!(matches!(err, WikipyError::NotFound(_)));
    assert!(err.is_recoverable());
    assert_eq!(db.get_links("Nowhere").unwrap(), None);
}

// ============================================================================
// Article Cache Tests
// ============================================================================

#[tokio::test]
async fn test_article_fetch_and_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "title": "Paris",
            "pageid": 22989,
            "description": "Capital of France",
            "extract": "Paris is the capital and largest city of France."
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("prop", "categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "pages": [{
                "title": "Paris",
                "categories": [
                    { "ns": 14, "title": "Category:Cities in France" },
                    { "ns": 14, "title": "Category:Capitals in Europe" }
                ]
            }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    let mut source = CachedSource::new(&client, &db);

    let article = source.get_article("Paris").await.unwrap();
    assert_eq!(article.page_id, Some(22989));
    assert_eq!(article.description.as_deref(), Some("Capital of France"));
    assert_eq!(article.categories, vec!["Cities in France", "Capitals in Europe"]);

    let cached = source.get_article("Paris").await.unwrap();
    assert_eq!(cached.summary, article.summary);
    assert_eq!(cached.categories, article.categories);
    assert_eq!(source.cache_hits(), 1);
}

#[tokio::test]
async fn test_article_summary_404_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    let mut source = CachedSource::new(&client, &db);

    let err = source.get_article("Ghost").await.unwrap_err();
    assert!(matches!(err, WikipyError::NotFound(_)));
    assert!(db.get_article("Ghost").unwrap().is_none());
}

#[tokio::test]
async fn test_html_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/core/v1/wikipedia/en/page/Dog/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Woof</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    let mut source = CachedSource::new(&client, &db);

    assert_eq!(source.get_html("Dog").await.unwrap(), "<p>Woof</p>");
    assert_eq!(source.get_html("Dog").await.unwrap(), "<p>Woof</p>");
    assert_eq!(db.get_article_html("Dog").unwrap().as_deref(), Some("<p>Woof</p>"));
}

// ============================================================================
// End-to-end Traversal
// ============================================================================

#[tokio::test]
async fn test_graph_over_mock_api_skips_missing_page() {
    let server = MockServer::start().await;
    mount_links(&server, "Dog", &["Canine", "Wolf", "Pet"], 1).await;
    mount_links(&server, "Canine", &["Dog"], 1).await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("titles", "Wolf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "pages": [{ "title": "Wolf", "missing": true }] }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let db = Database::open_in_memory().unwrap();
    let mut source = CachedSource::new(&client, &db);

    let graph = GraphBuilder::new(&mut source)
        .with_max_depth(2)
        .with_max_links_per_node(2)
        .build(&["Dog".to_string()])
        .await
        .unwrap();

    let nodes: Vec<&str> = graph.nodes().map(|n| n.title.as_str()).collect();
    assert_eq!(nodes, vec!["Dog", "Canine"]);
    assert!(graph.contains_edge("Dog", "Canine"));
    assert!(graph.contains_edge("Canine", "Dog"));
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.skipped()[0].title, "Wolf");

    // A second build is served entirely from the cache.
    let mut cached = CachedSource::new(&client, &db);
    let again = GraphBuilder::new(&mut cached)
        .with_max_depth(1)
        .with_max_links_per_node(2)
        .build(&["Dog".to_string()])
        .await
        .unwrap();
    assert_eq!(again.node_count(), 3);
    assert_eq!(cached.fetches(), 0);
}
