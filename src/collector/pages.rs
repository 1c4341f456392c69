use log::{error, info};
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Method, Url};

use crate::collector::rate_limit::RateLimitGate;
use crate::error::{RequestFailure, Result, SyncError};
use crate::schema::{Login, UserItem, UserSet};
use crate::session::{GithubSession, ensure_success};

/// One decoded page of a listing.
struct Page {
    logins: Vec<Login>,
    next: Option<Url>,
}

/// Collects every `login` of a paginated listing, following `rel="next"`
/// links until the server stops offering one.
///
/// FLOW (per page):
/// - rate-limit gate
/// - GET the cursor URL
/// - decode the JSON array, keep the logins
/// - move the cursor to the `Link` header's next URL
///
/// GUARANTEES:
/// - The result holds exactly the distinct logins seen across all pages
/// - Any failure aborts the whole collection; no partial set is returned
///
pub async fn collect_logins(
    session: &GithubSession,
    gate: &RateLimitGate,
    start: Url,
) -> Result<UserSet> {
    let mut users = UserSet::new();
    let mut cursor = Some(start);

    while let Some(url) = cursor.take() {
        let remaining = gate
            .check(session)
            .await
            .inspect_err(|e| error!("Error fetching users from {}: {}", url, e.describe()))?;
        info!("API calls remaining: {}", remaining);

        let page = fetch_page(session, &url).await.map_err(|source| {
            error!("Error fetching users from {}: {}", url, source);
            SyncError::Fetch {
                url: url.to_string(),
                source,
            }
        })?;

        users.extend(page.logins);
        cursor = page.next;
    }

    Ok(users)
}

async fn fetch_page(session: &GithubSession, url: &Url) -> std::result::Result<Page, RequestFailure> {
    let resp = ensure_success(session.send(Method::GET, url).await?).await?;

    // Headers must be read before the body consumes the response
    let next = match next_link(resp.headers()) {
        Some(raw) => Some(
            Url::parse(&raw)
                .map_err(|e| RequestFailure::Decode(format!("invalid next link {raw:?}: {e}")))?,
        ),
        None => None,
    };

    let items: Vec<UserItem> = serde_json::from_str(&resp.text().await?)?;

    Ok(Page {
        logins: items.into_iter().map(|u| u.login).collect(),
        next,
    })
}

/// Extracts the `rel="next"` target from RFC 8288 `Link` headers.
///
/// Example header:
///   <https://api.github.com/user/1/followers?page=2>; rel="next",
///   <https://api.github.com/user/1/followers?page=5>; rel="last"
///
/// A relation list (`rel="next last"`) also counts as next.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts.next()?.trim();
            let target = target.strip_prefix('<')?.strip_suffix('>')?;

            let is_next = parts.any(|param| {
                let Some((key, value)) = param.split_once('=') else {
                    return false;
                };
                key.trim().eq_ignore_ascii_case("rel")
                    && value
                        .trim()
                        .trim_matches('"')
                        .split_ascii_whitespace()
                        .any(|rel| rel.eq_ignore_ascii_case("next"))
            });

            is_next.then(|| target.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn users(logins: &[&str]) -> serde_json::Value {
        json!(logins.iter().map(|l| json!({ "login": l, "id": 1 })).collect::<Vec<_>>())
    }

    fn link_next(server: &MockServer, page: u32) -> String {
        format!(
            "<{}/users/octocat/followers?page={}>; rel=\"next\", <{}/users/octocat/followers?page=3>; rel=\"last\"",
            server.uri(),
            page,
            server.uri()
        )
    }

    async fn mount_quota(server: &MockServer, checks: u64) {
        Mock::given(method("GET"))
            .and(path("/rate_limit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": { "core": { "remaining": 4000, "reset": 0 } }
            })))
            .expect(checks)
            .mount(server)
            .await;
    }

    #[test]
    fn next_link_picks_the_next_relation() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://x/a?page=1>; rel=\"prev\", <https://x/a?page=3>; rel=\"next\", <https://x/a?page=9>; rel=\"last\"",
            ),
        );
        assert_eq!(next_link(&headers).as_deref(), Some("https://x/a?page=3"));
    }

    #[test]
    fn next_link_absent_on_last_page() {
        let mut headers = HeaderMap::new();
        assert_eq!(next_link(&headers), None);

        headers.insert(
            LINK,
            HeaderValue::from_static("<https://x/a?page=1>; rel=\"first\", <https://x/a?page=2>; rel=\"prev\""),
        );
        assert_eq!(next_link(&headers), None);
    }

    #[test]
    fn next_link_accepts_relation_lists() {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_static("<https://x/a?page=2>;rel=\"next last\""));
        assert_eq!(next_link(&headers).as_deref(), Some("https://x/a?page=2"));
    }

    #[tokio::test]
    async fn collects_distinct_logins_across_pages() {
        let server = MockServer::start().await;
        mount_quota(&server, 3).await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/followers"))
            .and(query_param("per_page", "100"))
            .and(query_param_is_missing("page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(users(&["alice", "bob"]))
                    .insert_header("link", link_next(&server, 2).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/followers"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(users(&["carol", "alice"]))
                    .insert_header("link", link_next(&server, 3).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/followers"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(users(&["dave", "erin"])))
            .expect(1)
            .mount(&server)
            .await;

        let session = GithubSession::new(&test_config(&server.uri())).unwrap();
        let mut start = session.endpoint(&["users", "octocat", "followers"]);
        start.query_pairs_mut().append_pair("per_page", "100");

        let got = collect_logins(&session, &RateLimitGate::new(10), start)
            .await
            .unwrap();

        let want: UserSet = ["alice", "bob", "carol", "dave", "erin"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn empty_listing_yields_empty_set() {
        let server = MockServer::start().await;
        mount_quota(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/following"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let session = GithubSession::new(&test_config(&server.uri())).unwrap();
        let start = session.endpoint(&["users", "octocat", "following"]);
        let got = collect_logins(&session, &RateLimitGate::new(10), start)
            .await
            .unwrap();

        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn failing_page_aborts_collection() {
        let server = MockServer::start().await;
        mount_quota(&server, 2).await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/followers"))
            .and(query_param_is_missing("page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(users(&["alice"]))
                    .insert_header("link", link_next(&server, 2).as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/followers"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let session = GithubSession::new(&test_config(&server.uri())).unwrap();
        let start = session.endpoint(&["users", "octocat", "followers"]);
        let err = collect_logins(&session, &RateLimitGate::new(10), start)
            .await
            .unwrap_err();

        match err {
            SyncError::Fetch { url, source } => {
                assert!(url.ends_with("/users/octocat/followers?page=2"), "{url}");
                assert_eq!(source.status(), Some(reqwest::StatusCode::NOT_FOUND));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_array_body_is_a_fetch_error() {
        let server = MockServer::start().await;
        mount_quota(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/followers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "nope" })))
            .mount(&server)
            .await;

        let session = GithubSession::new(&test_config(&server.uri())).unwrap();
        let start = session.endpoint(&["users", "octocat", "followers"]);
        let err = collect_logins(&session, &RateLimitGate::new(10), start)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Fetch {
                source: RequestFailure::Decode(_),
                ..
            }
        ));
    }
}
