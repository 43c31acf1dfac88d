//! GitLab REST listing client backed by reqwest.
//!
//! Calls `GET {host}/api/v4/groups/{id}/subgroups` and follows the
//! `x-next-page` header until GitLab reports no further page.

use crate::GroupLister;
use async_trait::async_trait;
use nestwalk_core::error::{NestwalkError, NestwalkResult};
use nestwalk_core::{GroupId, GroupRef, ListingError};
use reqwest::header::HeaderMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "https://gitlab.com";

/// GitLab caps `per_page` at 100.
pub const MAX_PER_PAGE: u32 = 100;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on pages fetched for one listing.
const DEFAULT_MAX_PAGES: u32 = 1000;

/// Lists subgroups through the GitLab v4 API with a bearer token.
///
/// ```ignore
/// let lister = GitLabLister::new("https://gitlab.com", &token)?.with_per_page(50);
/// let children = lister.list_subgroups(&GroupId::parse("gitlab-org")?).await?;
/// ```
#[derive(Clone)]
pub struct GitLabLister {
    client: reqwest::Client,
    host: Url,
    token: String,
    per_page: u32,
    max_pages: u32,
    timeout: Duration,
}

impl std::fmt::Debug for GitLabLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabLister")
            .field("host", &self.host.as_str())
            .field("per_page", &self.per_page)
            .field("max_pages", &self.max_pages)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GitLabLister {
    pub fn new(host: &str, token: &str) -> NestwalkResult<Self> {
        if token.trim().is_empty() {
            return Err(NestwalkError::Config("GitLab token must not be empty".into()));
        }

        let host = Url::parse(host)
            .map_err(|e| NestwalkError::Config(format!("Invalid GitLab host {host}: {e}")))?;
        if host.cannot_be_a_base() || !matches!(host.scheme(), "http" | "https") {
            return Err(NestwalkError::Config(format!(
                "GitLab host must be an http(s) URL, got {host}"
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("nestwalk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NestwalkError::Internal(format!("Failed to build HTTP client: {e}")))?;

        tracing::info!(host = %host, "GitLab lister ready");

        Ok(Self {
            client,
            host,
            token: token.to_string(),
            per_page: MAX_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Page size, clamped to [1, 100].
    pub fn with_per_page(mut self, n: u32) -> Self {
        self.per_page = n.clamp(1, MAX_PER_PAGE);
        self
    }

    /// Per-request timeout (default: 30s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, n: u32) -> Self {
        self.max_pages = n.max(1);
        self
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    /// `{host}/api/v4/groups/{id}/subgroups?per_page=..&page=..`.
    ///
    /// Path ids are pushed as one segment, so `a/b` becomes `a%2Fb`.
    pub fn subgroups_url(&self, group: &GroupId, page: u32) -> Url {
        let mut url = self.host.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v4", "groups"])
                .push(&group.to_string())
                .push("subgroups");
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("per_page", &self.per_page.to_string())
            .append_pair("page", &page.to_string());
        url
    }

    async fn fetch_page(&self, group: &GroupId, page: u32) -> Result<Page, ListingError> {
        let url = self.subgroups_url(group, page);
        tracing::debug!(group = %group, page, "listing subgroups");

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ListingError::Transport {
                message: e.to_string(),
            })?;

        let status = resp.status();
        let next = next_page(resp.headers());
        let body = resp.bytes().await.map_err(|e| ListingError::Transport {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), group, &body));
        }

        let batch: Vec<GroupRef> =
            serde_json::from_slice(&body).map_err(|e| ListingError::Decode {
                message: e.to_string(),
            })?;
        Ok(Page {
            groups: batch,
            next,
            status: status.as_u16(),
        })
    }
}

/// One successful page of a subgroup listing.
struct Page {
    groups: Vec<GroupRef>,
    next: Option<u32>,
    status: u16,
}

#[async_trait]
impl GroupLister for GitLabLister {
    async fn list_subgroups(&self, group: &GroupId) -> Result<Vec<GroupRef>, ListingError> {
        let mut subgroups = Vec::new();
        let mut page = 1u32;
        let mut fetched = 0u32;

        loop {
            let Page {
                groups,
                next,
                status,
            } = self.fetch_page(group, page).await?;
            fetched += 1;
            subgroups.extend(groups);

            match next {
                Some(n) if n > page => page = n,
                _ => break,
            }

            // A further page exists but the cap is spent.
            if fetched == self.max_pages {
                return Err(ListingError::Api {
                    status,
                    message: format!(
                        "pagination for {group} did not end after {} pages",
                        self.max_pages
                    ),
                });
            }
        }

        tracing::debug!(group = %group, children = subgroups.len(), pages = fetched, "listed subgroups");
        Ok(subgroups)
    }
}

/// Parses `x-next-page`; GitLab sends it empty on the last page.
fn next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get("x-next-page")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Maps a non-2xx response to a [`ListingError`].
fn status_error(status: u16, group: &GroupId, body: &[u8]) -> ListingError {
    let group = group.to_string();
    match status {
        404 => ListingError::NotFound { group },
        401 | 403 => ListingError::Unauthorized { group },
        429 => ListingError::RateLimited { group },
        _ => ListingError::Api {
            status,
            message: api_message(body),
        },
    }
}

/// GitLab error bodies carry `message` (string or object) or `error`.
fn api_message(body: &[u8]) -> String {
    if let Ok(v) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            match v.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn lister(host: &str) -> GitLabLister {
        GitLabLister::new(host, "glpat-test").unwrap()
    }

    #[test]
    fn rejects_empty_token() {
        assert!(GitLabLister::new(DEFAULT_HOST, "  ").is_err());
    }

    #[test]
    fn rejects_non_http_host() {
        assert!(GitLabLister::new("ftp://gitlab.com", "t").is_err());
        assert!(GitLabLister::new("not a url", "t").is_err());
    }

    #[test]
    fn url_for_numeric_id() {
        let url = lister(DEFAULT_HOST).subgroups_url(&GroupId::Numeric(42), 3);
        assert_eq!(
            url.as_str(),
            "https://gitlab.com/api/v4/groups/42/subgroups?per_page=100&page=3"
        );
    }

    #[test]
    fn url_encodes_path_ids_and_keeps_relative_root() {
        let url = lister("https://git.example.com/gitlab/")
            .with_per_page(20)
            .subgroups_url(&GroupId::Path("org/team".into()), 1);
        assert_eq!(
            url.as_str(),
            "https://git.example.com/gitlab/api/v4/groups/org%2Fteam/subgroups?per_page=20&page=1"
        );
    }

    #[test]
    fn per_page_is_clamped() {
        assert_eq!(lister(DEFAULT_HOST).with_per_page(0).per_page, 1);
        assert_eq!(lister(DEFAULT_HOST).with_per_page(500).per_page, 100);
    }

    #[test]
    fn next_page_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(next_page(&headers), None);
        headers.insert("x-next-page", HeaderValue::from_static(""));
        assert_eq!(next_page(&headers), None);
        headers.insert("x-next-page", HeaderValue::from_static("2"));
        assert_eq!(next_page(&headers), Some(2));
    }

    #[test]
    fn status_mapping() {
        let g = GroupId::Numeric(7);
        assert!(status_error(404, &g, b"").is_not_found());
        assert_eq!(
            status_error(403, &g, b""),
            ListingError::Unauthorized { group: "7".into() }
        );
        assert_eq!(
            status_error(429, &g, b""),
            ListingError::RateLimited { group: "7".into() }
        );
        assert_eq!(
            status_error(500, &g, br#"{"message":"500 Internal Server Error"}"#),
            ListingError::Api {
                status: 500,
                message: "500 Internal Server Error".into()
            }
        );
    }

    #[test]
    fn api_message_fallbacks() {
        assert_eq!(api_message(br#"{"error":"invalid_token"}"#), "invalid_token");
        assert_eq!(api_message(br#"{"message":{"name":["bad"]}}"#), r#"{"name":["bad"]}"#);
        assert_eq!(api_message(b"  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(api_message(b""), "empty response body");
    }
}
