use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Sort key for repository listings
pub const SORT_FULL_NAME: &str = "full_name";

/// Records requested per listing page
pub const PAGE_SIZE: u8 = 100;

/// Error type produced by a [`RepositoryLister`] transport
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A GitHub request failed
///
/// `message` is the explanation GitHub returned (e.g. "Bad credentials"), or the
/// full error chain when the request never got a GitHub response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestError {
    /// HTTP status of a GitHub error response
    pub status: Option<u16>,
    pub message: String,
    #[source]
    source: octocrab::Error,
}

impl From<octocrab::Error> for RequestError {
    fn from(error: octocrab::Error) -> Self {
        if let octocrab::Error::GitHub { source, .. } = &error {
            let status = Some(source.status_code.as_u16());
            let message = source.message.clone();
            return Self {
                status,
                message,
                source: error,
            };
        }

        let mut message = error.to_string();
        let mut cause = std::error::Error::source(&error);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }

        Self {
            status: None,
            message,
            source: error,
        }
    }
}

/// A repository as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub id: i64,
}

impl RepositoryRecord {
    pub fn new(name: impl Into<String>, id: i64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// Parameters for one "list repositories for account" call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRequest {
    #[serde(skip)]
    pub account: String,
    pub sort: &'static str,
    pub per_page: u8,
    /// Page to fetch; the first page when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ListRequest {
    /// Request for the first page of `account`'s repositories
    pub fn first(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            sort: SORT_FULL_NAME,
            per_page: PAGE_SIZE,
            page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// One page of a repository listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPage {
    pub records: Vec<RepositoryRecord>,
    /// Next page to request, `None` when this was the last one
    pub next_page: Option<u32>,
}

/// Paginated access to an account's repositories
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryLister: Send + Sync {
    async fn list_page(&self, request: &ListRequest) -> Result<RepositoryPage, TransportError>;
}

/// Authenticated GitHub API client
#[derive(Clone)]
pub struct GitHubClient {
    client: Octocrab,
    base_url: String,
}

impl GitHubClient {
    /// Create a client for `base_url` authenticated with a personal access token
    pub fn new(token: &str, base_url: &str) -> octocrab::Result<Self> {
        let client = Octocrab::builder()
            .base_uri(base_url)?
            .personal_token(token.to_string())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RepositoryLister for GitHubClient {
    async fn list_page(&self, request: &ListRequest) -> Result<RepositoryPage, TransportError> {
        debug!(
            "Fetching repositories for organization: {} page {:?}",
            request.account, request.page
        );

        let route = format!("/orgs/{}/repos", request.account);
        let page: Page<RepositoryRecord> = self
            .client
            .get(route, Some(request))
            .await
            .map_err(RequestError::from)?;

        let next_page = page
            .next
            .as_ref()
            .and_then(|next| next.query())
            .and_then(page_from_query);

        Ok(RepositoryPage {
            records: page.items,
            next_page,
        })
    }
}

/// Extract the `page` parameter from a pagination link's query string
fn page_from_query(query: &str) -> Option<u32> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_page_from_query() {
        assert_eq!(page_from_query("sort=full_name&per_page=100&page=2"), Some(2));
        assert_eq!(page_from_query("page=17"), Some(17));
        assert_eq!(page_from_query("per_page=100"), None);
        assert_eq!(page_from_query("page=abc"), None);
    }

    #[test]
    fn test_list_request_query_parameters() {
        let request = ListRequest::first("acme");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"sort": "full_name", "per_page": 100})
        );

        let request = request.with_page(3);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"sort": "full_name", "per_page": 100, "page": 3})
        );
    }

    #[tokio::test]
    async fn test_debug_does_not_leak_token() {
        let client = GitHubClient::new("ghp_secret", "https://api.github.com/").unwrap();
        let rendered = format!("{:?}", client);

        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("api.github.com"));
    }

    #[tokio::test]
    async fn test_list_page_follows_link_header() {
        let mock_server = MockServer::start().await;

        // Mounted first so it wins over the catch-all first-page mock
        Mock::given(method("GET"))
            .and(path("/orgs/acme/repos"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 3, "name": "gamma"}
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orgs/acme/repos"))
            .and(query_param("sort", "full_name"))
            .and(query_param("per_page", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "link",
                        format!(
                            "<{}/orgs/acme/repos?sort=full_name&per_page=100&page=2>; rel=\"next\"",
                            mock_server.uri()
                        )
                        .as_str(),
                    )
                    .set_body_json(json!([
                        {"id": 1, "name": "alpha", "full_name": "acme/alpha"},
                        {"id": 2, "name": "beta", "full_name": "acme/beta"}
                    ])),
            )
            .mount(&mock_server)
            .await;

        let client = GitHubClient::new("test-token", &mock_server.uri()).unwrap();

        let first = client.list_page(&ListRequest::first("acme")).await.unwrap();
        assert_eq!(
            first.records,
            vec![RepositoryRecord::new("alpha", 1), RepositoryRecord::new("beta", 2)]
        );
        assert_eq!(first.next_page, Some(2));

        let second = client
            .list_page(&ListRequest::first("acme").with_page(2))
            .await
            .unwrap();
        assert_eq!(second.records, vec![RepositoryRecord::new("gamma", 3)]);
        assert_eq!(second.next_page, None);
    }

    #[tokio::test]
    async fn test_list_page_surfaces_api_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orgs/acme/repos"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&mock_server)
            .await;

        let client = GitHubClient::new("expired-token", &mock_server.uri()).unwrap();
        let err = client
            .list_page(&ListRequest::first("acme"))
            .await
            .unwrap_err();

        let request_error = err
            .downcast_ref::<RequestError>()
            .expect("GitHub failures are reported as RequestError");
        assert_eq!(request_error.status, Some(401));
        assert_eq!(request_error.message, "Bad credentials");
    }

    #[tokio::test]
    async fn test_fetch_error_carries_remote_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orgs/acme/repos"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&mock_server)
            .await;

        let client = GitHubClient::new("expired-token", &mock_server.uri()).unwrap();
        let err = crate::reconcile::fetch_all_repositories("acme", &client)
            .await
            .unwrap_err();

        assert_eq!(err.page, 1);
        assert!(err.to_string().contains("Bad credentials"), "{}", err);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error_chain() {
        // Nothing listens on the discard port
        let client = GitHubClient::new("test-token", "http://127.0.0.1:9").unwrap();
        let err = client
            .list_page(&ListRequest::first("acme"))
            .await
            .unwrap_err();

        let request_error = err.downcast_ref::<RequestError>().unwrap();
        assert_eq!(request_error.status, None);
        assert!(!request_error.message.is_empty());
    }
}
