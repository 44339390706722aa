//! Prismic REST API v2 client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

use super::{CmsError, ContentFetcher, PostsPage, Result, MAX_PAGE_SIZE};
use crate::config::CmsConfig;
use crate::content::RawPost;

const USER_AGENT: &str = concat!("spacetravelling/", env!("CARGO_PKG_VERSION"));

/// API root document; only the refs matter here
#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Client for a Prismic repository
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    /// Create a client for the API v2 root `endpoint`
    pub fn new(endpoint: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(CmsError::MissingEndpoint);
        }
        let endpoint = Url::parse(endpoint.trim_end_matches('/')).map_err(|source| {
            CmsError::InvalidUrl {
                url: endpoint.to_string(),
                source,
            }
        })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: access_token.filter(|t| !t.is_empty()),
            master_ref: OnceCell::new(),
        })
    }

    pub fn from_config(config: &CmsConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            config.access_token.clone(),
            Duration::from_secs(config.timeout.max(1)),
        )
    }

    /// The ref of the currently published content, fetched once
    async fn master_ref(&self) -> Result<&str> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async move {
                let url = self.authorize(&self.endpoint);
                let info: ApiInfo = self.get_json(url).await?;
                let master = info
                    .refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .ok_or(CmsError::NoMasterRef)?;
                tracing::debug!("Prismic master ref: {}", master.reference);
                Ok::<_, CmsError>(master.reference)
            })
            .await?;
        Ok(reference.as_str())
    }

    /// `documents/search` URL for a predicate query
    async fn search_url(&self, query: &str, page_size: u32) -> Result<Url> {
        let reference = self.master_ref().await?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| CmsError::InvalidUrl {
                url: self.endpoint.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .pop_if_empty()
            .extend(["documents", "search"]);
        url.query_pairs_mut()
            .append_pair("ref", reference)
            .append_pair("q", query)
            .append_pair("pageSize", &page_size.to_string());
        Ok(self.authorize(&url))
    }

    /// `url` carrying the configured access token and no other
    fn authorize(&self, url: &Url) -> Url {
        let mut url = without_token(url);
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        url
    }

    /// Check that a cursor points at this repository before following it
    fn resolve_cursor(&self, cursor: &str) -> Result<Url> {
        let url = Url::parse(cursor).map_err(|source| CmsError::InvalidUrl {
            url: cursor.to_string(),
            source,
        })?;
        if !same_origin(&url, &self.endpoint) {
            return Err(CmsError::ForeignCursor(cursor.to_string()));
        }
        Ok(self.authorize(&url))
    }

    /// Fetch a page of results; its cursor never carries the access token
    async fn get_page(&self, url: Url) -> Result<PostsPage> {
        let mut page: PostsPage = self.get_json(url).await?;
        page.next_page = page.next_page.map(|next| match Url::parse(&next) {
            Ok(cursor) => without_token(&cursor).to_string(),
            Err(_) => next,
        });
        Ok(page)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", redact(&url));
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: redact(&url),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentFetcher for PrismicClient {
    async fn get_by_type(&self, doc_type: &str, page_size: u32) -> Result<PostsPage> {
        let url = self
            .search_url(&type_predicate(doc_type), page_size.clamp(1, MAX_PAGE_SIZE))
            .await?;
        self.get_page(url).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawPost> {
        let url = self.search_url(&uid_predicate(doc_type, uid), 1).await?;
        let page = self.get_page(url).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| CmsError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn fetch_page(&self, url: &str) -> Result<PostsPage> {
        let url = self.resolve_cursor(url)?;
        self.get_page(url).await
    }
}

/// `[[at(document.type,"posts")]]`
fn type_predicate(doc_type: &str) -> String {
    format!("[[at(document.type,{})]]", quote(doc_type))
}

/// `[[at(my.posts.uid,"slug")]]`
fn uid_predicate(doc_type: &str, uid: &str) -> String {
    format!("[[at(my.{}.uid,{})]]", doc_type, quote(uid))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// URL for logs, without the access token
fn redact(url: &Url) -> String {
    without_token(url).to_string()
}

fn without_token(url: &Url) -> Url {
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "access_token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::post;
    use axum::{
        extract::{Query, State},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Local stand-in for a Prismic repository
    #[derive(Default)]
    struct MockRepo {
        endpoint: String,
        api_calls: Mutex<usize>,
        searches: Mutex<Vec<HashMap<String, String>>>,
    }

    impl MockRepo {
        fn last_search(&self) -> HashMap<String, String> {
            self.searches.lock().unwrap().last().cloned().unwrap()
        }
    }

    async fn api_root(State(repo): State<Arc<MockRepo>>) -> Json<Value> {
        *repo.api_calls.lock().unwrap() += 1;
        Json(json!({
            "refs": [
                { "id": "preview", "ref": "preview-ref", "isMasterRef": false },
                { "id": "master", "ref": "master-ref", "isMasterRef": true }
            ]
        }))
    }

    async fn search(
        State(repo): State<Arc<MockRepo>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> std::result::Result<Json<Value>, StatusCode> {
        repo.searches.lock().unwrap().push(params.clone());
        let q = params.get("q").cloned().unwrap_or_default();
        let document = |uid: &str| serde_json::to_value(post(uid)).unwrap();

        if q.contains(r#""broken""#) {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        if q.contains("my.posts.uid") {
            let results: Vec<Value> = if q.contains(r#""missing""#) {
                vec![]
            } else {
                vec![document("como-utilizar-hooks")]
            };
            return Ok(Json(json!({ "results": results, "next_page": null })));
        }
        if params.get("page").map(String::as_str) == Some("2") {
            return Ok(Json(json!({ "results": [document("b")], "next_page": null })));
        }
        Ok(Json(json!({
            "results": [document("a")],
            "next_page": format!(
                "{}/documents/search?page=2&pageSize=1&access_token=SECRET",
                repo.endpoint
            )
        })))
    }

    async fn mock_repo() -> Arc<MockRepo> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/api/v2", listener.local_addr().unwrap());
        let repo = Arc::new(MockRepo {
            endpoint,
            ..Default::default()
        });
        let app = Router::new()
            .route("/api/v2", get(api_root))
            .route("/api/v2/documents/search", get(search))
            .with_state(Arc::clone(&repo));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        repo
    }

    fn local_client(repo: &MockRepo, token: Option<&str>) -> PrismicClient {
        PrismicClient::new(
            &repo.endpoint,
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn client() -> PrismicClient {
        PrismicClient::new(
            "https://spacetravelling.cdn.prismic.io/api/v2/",
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_endpoint() {
        let err = PrismicClient::new("", None, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, CmsError::MissingEndpoint));
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = PrismicClient::new("not a url", None, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, CmsError::InvalidUrl { .. }));
    }

    #[test]
    fn test_predicates() {
        assert_eq!(type_predicate("posts"), r#"[[at(document.type,"posts")]]"#);
        assert_eq!(
            uid_predicate("posts", "como-utilizar-hooks"),
            r#"[[at(my.posts.uid,"como-utilizar-hooks")]]"#
        );
        assert_eq!(quote(r#"a"b"#), r#""a\"b""#);
    }

    #[test]
    fn test_cursor_must_match_endpoint_origin() {
        let client = client();
        assert!(client
            .resolve_cursor("https://spacetravelling.cdn.prismic.io/api/v2/documents/search?page=2")
            .is_ok());
        assert!(matches!(
            client.resolve_cursor("https://evil.example/api/v2/documents/search?page=2"),
            Err(CmsError::ForeignCursor(_))
        ));
        assert!(matches!(
            client.resolve_cursor("http://spacetravelling.cdn.prismic.io/api/v2/documents/search"),
            Err(CmsError::ForeignCursor(_))
        ));
        assert!(matches!(
            client.resolve_cursor("/p2"),
            Err(CmsError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_redact_access_token() {
        let url = Url::parse("https://repo.cdn.prismic.io/api/v2?access_token=secret&page=2").unwrap();
        assert_eq!(redact(&url), "https://repo.cdn.prismic.io/api/v2?page=2");

        let url = Url::parse("https://repo.cdn.prismic.io/api/v2?access_token=secret").unwrap();
        assert_eq!(redact(&url), "https://repo.cdn.prismic.io/api/v2");
    }

    #[test]
    fn test_parse_api_refs() {
        let json = r#"{
            "refs": [
                { "id": "master", "ref": "YF1kvhIAACMAYe7m", "label": "Master", "isMasterRef": true },
                { "id": "preview", "ref": "abc", "label": "Preview" }
            ],
            "types": { "posts": "Posts" }
        }"#;
        let info: ApiInfo = serde_json::from_str(json).unwrap();
        let master = info.refs.into_iter().find(|r| r.is_master_ref).unwrap();
        assert_eq!(master.reference, "YF1kvhIAACMAYe7m");
    }

    #[tokio::test]
    async fn test_get_by_type_searches_master_ref() {
        let repo = mock_repo().await;
        let client = local_client(&repo, Some("SECRET"));

        let page = client.get_by_type("posts", 1).await.unwrap();
        assert_eq!(page.results[0].uid.as_deref(), Some("a"));

        let params = repo.last_search();
        assert_eq!(params["ref"], "master-ref");
        assert_eq!(params["q"], r#"[[at(document.type,"posts")]]"#);
        assert_eq!(params["pageSize"], "1");
        assert_eq!(params["access_token"], "SECRET");

        client.get_by_type("posts", 500).await.unwrap();
        assert_eq!(repo.last_search()["pageSize"], "100");
        assert_eq!(*repo.api_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cursor_hides_and_restores_access_token() {
        let repo = mock_repo().await;
        let client = local_client(&repo, Some("SECRET"));

        let page = client.get_by_type("posts", 1).await.unwrap();
        let cursor = page.next_page.unwrap();
        assert!(!cursor.contains("SECRET"));
        assert!(cursor.contains("page=2"));

        let next = client.fetch_page(&cursor).await.unwrap();
        assert_eq!(next.results[0].uid.as_deref(), Some("b"));
        assert!(next.next_page.is_none());
        let params = repo.last_search();
        assert_eq!(params["page"], "2");
        assert_eq!(params["access_token"], "SECRET");

        let all = client.get_all_by_type("posts").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_public_repository_sends_no_token() {
        let repo = mock_repo().await;
        let client = local_client(&repo, None);

        let page = client.get_by_type("posts", 1).await.unwrap();
        assert!(!repo.last_search().contains_key("access_token"));

        client.fetch_page(&page.next_page.unwrap()).await.unwrap();
        assert!(!repo.last_search().contains_key("access_token"));
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let repo = mock_repo().await;
        let client = local_client(&repo, None);

        let raw = client.get_by_uid("posts", "como-utilizar-hooks").await.unwrap();
        assert_eq!(raw.data.title, "Post como-utilizar-hooks");
        assert_eq!(
            repo.last_search()["q"],
            r#"[[at(my.posts.uid,"como-utilizar-hooks")]]"#
        );

        let err = client.get_by_uid("posts", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_error_status_is_reported_without_token() {
        let repo = mock_repo().await;
        let client = local_client(&repo, Some("SECRET"));

        match client.get_by_type("broken", 1).await {
            Err(CmsError::Status { status, url }) => {
                assert_eq!(status, 500);
                assert!(url.contains("documents/search"));
                assert!(!url.contains("SECRET"));
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.results.len())),
        }
    }

    #[tokio::test]
    async fn test_generated_index_does_not_publish_token() {
        let repo = mock_repo().await;
        let dir = tempfile::tempdir().unwrap();
        let mut site = crate::Site::new(dir.path()).unwrap();
        site.config.cms.endpoint = repo.endpoint.clone();
        site.config.cms.access_token = Some("SECRET".to_string());

        let generator = crate::generator::Generator::new(&site, site.fetcher().unwrap()).unwrap();
        generator.generate_index().await.unwrap();

        let html = std::fs::read_to_string(generator.index_output_path()).unwrap();
        assert!(html.contains("Post a"));
        assert!(html.contains("page=2"));
        assert!(!html.contains("SECRET"));
    }
}
