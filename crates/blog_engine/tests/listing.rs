use std::sync::Arc;

use blog_engine::{Blog, FetchSettings, ListingSettings, ReqwestFetcher, POST_LIST_PATH};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOG_ID: &str = "someone";

/// A listing body in the platform's shape: quoted numbers and a trailing
/// `pagingHtml` field that is not valid JSON on its own.
fn listing_body(log_nos: impl IntoIterator<Item = u64>, total: u64, per_page: u64) -> String {
    let posts: Vec<_> = log_nos
        .into_iter()
        .map(|n| {
            json!({
                "logNo": n.to_string(),
                "title": format!("Post+{n}"),
                "categoryNo": "1",
                "addDate": "2025. 11. 9."
            })
        })
        .collect();
    let head = json!({
        "resultCode": "S",
        "postList": posts,
        "countPerPage": per_page.to_string(),
        "totalCount": total.to_string(),
    })
    .to_string();
    format!(
        "{},\"pagingHtml\":\"<a href='#' onclick=\\'go(2)\\'>2</a>\"}}",
        head.trim_end_matches('}')
    )
}

async fn mount_page(server: &MockServer, page: u64, body: String, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{POST_LIST_PATH}")))
        .and(query_param("blogId", BLOG_ID))
        .and(query_param("currentPage", page.to_string()))
        .and(query_param("countPerPage", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain; charset=utf-8"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn blog(server: &MockServer) -> Blog {
    let fetcher = ReqwestFetcher::new(FetchSettings::with_base_url(server.uri())).unwrap();
    Blog::with_settings(
        BLOG_ID,
        Arc::new(fetcher),
        ListingSettings {
            workers: 4,
            ..ListingSettings::default()
        },
    )
}

#[tokio::test]
async fn all_pages_are_concatenated_in_page_order() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_body(1..=30, 65, 30), 1).await;
    mount_page(&server, 2, listing_body(31..=60, 65, 30), 1).await;
    mount_page(&server, 3, listing_body(61..=65, 65, 30), 1).await;

    let blog = blog(&server);
    let posts = blog.posts().await.unwrap();

    assert_eq!(posts.len(), 65);
    let log_nos: Vec<u64> = posts.iter().map(|p| p.log_no).collect();
    assert_eq!(log_nos, (1..=65).collect::<Vec<_>>());
    assert_eq!(posts[0].title, "Post 1");
    assert_eq!(posts[0].category_no, Some(1));

    // Cached: the mocks' expectations above allow one call per page.
    assert_eq!(blog.posts().await.unwrap().len(), 65);
}

#[tokio::test]
async fn failing_later_page_is_treated_as_empty() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_body(1..=30, 65, 30), 1).await;
    Mock::given(method("GET"))
        .and(path(format!("/{POST_LIST_PATH}")))
        .and(query_param("currentPage", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, 3, listing_body(61..=65, 65, 30), 1).await;

    let blog = blog(&server);
    let posts = blog.posts().await.unwrap();

    assert_eq!(posts.len(), 35);
    assert_eq!(posts[29].log_no, 30);
    assert_eq!(posts[30].log_no, 61);
}

#[tokio::test]
async fn failing_first_page_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{POST_LIST_PATH}")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = blog(&server).posts().await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn empty_blog_has_no_posts() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_body([], 0, 30), 1).await;

    assert!(blog(&server).posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn single_page_needs_one_request() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_body([7, 5, 3], 3, 30), 1).await;

    let blog = blog(&server);
    let log_nos: Vec<u64> = blog.posts().await.unwrap().iter().map(|p| p.log_no).collect();
    assert_eq!(log_nos, vec![7, 5, 3]);
}

#[tokio::test]
async fn single_page_can_be_fetched_directly() {
    let server = MockServer::start().await;
    mount_page(&server, 2, listing_body(31..=60, 65, 30), 1).await;

    let page = blog(&server).fetch_page(2, 30).await.unwrap();
    assert_eq!(page.total_count, 65);
    assert_eq!(page.count_per_page, 30);
    assert_eq!(page.posts.first().map(|p| p.log_no), Some(31));
}
