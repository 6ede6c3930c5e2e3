use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use blog_engine::{
    crawl, failure_action, is_resource_exhausted, Blog, CrawlReport, CrawlSettings,
    FailureAction, FailureKind, FetchError, FetchSettings, PersistError, PostError,
    ReqwestFetcher, POST_LIST_PATH, POST_VIEW_PATH, TAG_LIST_PATH,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOG_ID: &str = "someone";

fn post_view(title: &str, image_src: &str, body_kind: &str) -> String {
    format!(
        r#"<html><body>
<div class="se-title-text">{title}</div>
<span class="se_publishDate">2025. 11. 9. 21:05</span>
<div class="se-main-container">
  <div class="se-component se-image"><img src="{image_src}"><p class="se-caption">Cover</p></div>
  <div class="se-component {body_kind}"><p class="se-text-paragraph">Body text</p></div>
</div></body></html>"#
    )
}

async fn mount_blog(server: &MockServer) {
    let listing = r#"{"postList":[{"logNo":"223","title":"Good"},{"logNo":"224","title":"Broken"}],"countPerPage":"30","totalCount":"2","pagingHtml":"<b>1</b>"}"#;
    Mock::given(method("GET"))
        .and(path(format!("/{POST_LIST_PATH}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(listing, "text/plain"))
        .mount(server)
        .await;

    let image_src = format!("{}/img/cover.jpg?type=w966", server.uri());
    let views = [
        ("223", post_view("Hello Crawler", &image_src, "se-text")),
        ("224", post_view("Broken One", &image_src, "se-poll")),
    ];
    for (log_no, view) in views {
        Mock::given(method("GET"))
            .and(path(format!("/{POST_VIEW_PATH}")))
            .and(query_param("logNo", log_no))
            .respond_with(ResponseTemplate::new(200).set_body_raw(view, "text/html; charset=utf-8"))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(format!("/{TAG_LIST_PATH}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"taggingList":[{"logNo":"223","tagName":"rust"}]}"#, "application/json"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/cover.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"JPEG".to_vec(), "image/jpeg"))
        .mount(server)
        .await;
}

fn blog(server: &MockServer) -> Blog {
    let fetcher = ReqwestFetcher::new(FetchSettings::with_base_url(server.uri())).unwrap();
    Blog::new(BLOG_ID, Arc::new(fetcher))
}

fn settings(root: &TempDir) -> CrawlSettings {
    let mut settings = CrawlSettings::new(root.path().join("posts"), root.path().join("assets"));
    settings.post_delay = Duration::ZERO;
    settings.busy_backoff = Duration::ZERO;
    settings
}

#[tokio::test]
async fn crawl_saves_posts_and_is_resumable() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    mount_blog(&server).await;
    let root = TempDir::new().unwrap();
    let settings = settings(&root);

    let report = crawl(&blog(&server), &settings).await.unwrap();
    assert_eq!(
        report,
        CrawlReport {
            saved: 1,
            skipped_existing: 0,
            failed: 1,
        }
    );

    let filename = "2025-11-09-hello-crawler";
    let markdown = fs::read_to_string(settings.posts_dir.join(format!("{filename}.md"))).unwrap();
    assert!(markdown.starts_with("---\ntitle: Hello Crawler\n"));
    assert!(markdown.contains("- rust\n"));
    assert!(markdown.contains(&format!("url: assets/{filename}/cover.jpg")));
    assert!(markdown.ends_with(&format!(
        "---\n\n![Cover](assets/{filename}/cover.jpg)\n\nBody text\n"
    )));
    assert_eq!(
        fs::read(settings.assets_dir.join(filename).join("cover.jpg")).unwrap(),
        b"JPEG"
    );
    assert_eq!(fs::read_dir(&settings.posts_dir).unwrap().count(), 1);

    let again = crawl(&blog(&server), &settings).await.unwrap();
    assert_eq!(
        again,
        CrawlReport {
            saved: 0,
            skipped_existing: 1,
            failed: 1,
        }
    );
}

#[tokio::test]
async fn listing_failure_aborts_the_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{POST_LIST_PATH}")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let root = TempDir::new().unwrap();

    assert!(crawl(&blog(&server), &settings(&root)).await.is_err());
}

#[test]
fn resource_exhaustion_is_retried_up_to_the_cap() {
    let root = TempDir::new().unwrap();
    let settings = settings(&root);
    let exhausted = PostError::Persist(PersistError::Io(io::Error::from_raw_os_error(24)));

    assert!(is_resource_exhausted(&exhausted));
    assert_eq!(
        failure_action(&exhausted, 0, &settings),
        FailureAction::RetryAfter(settings.busy_backoff)
    );
    assert_eq!(
        failure_action(&exhausted, settings.max_retries, &settings),
        FailureAction::Skip
    );

    let other = PostError::Io(io::Error::other("Too many open files (os error 24)"));
    assert!(is_resource_exhausted(&other));
}

#[test]
fn transient_fetch_errors_are_retried_only_when_enabled() {
    let root = TempDir::new().unwrap();
    let mut settings = settings(&root);
    let timeout = PostError::Fetch(FetchError::new(FailureKind::Timeout, "timed out"));
    let not_found = PostError::Fetch(FetchError::new(FailureKind::HttpStatus(404), "404"));

    assert_eq!(failure_action(&timeout, 0, &settings), FailureAction::Skip);

    settings.retry_post_fetch = true;
    assert_eq!(
        failure_action(&timeout, 0, &settings),
        FailureAction::RetryAfter(settings.busy_backoff)
    );
    assert_eq!(failure_action(&not_found, 0, &settings), FailureAction::Skip);
    assert!(!is_resource_exhausted(&timeout));
}

#[test]
fn descriptor_exhaustion_during_fetch_is_retried() {
    let root = TempDir::new().unwrap();
    let settings = settings(&root);
    let exhausted = PostError::Fetch(FetchError::new(
        FailureKind::ResourceExhausted,
        "error sending request: Too many open files (os error 24)",
    ));

    assert!(!settings.retry_post_fetch);
    assert!(is_resource_exhausted(&exhausted));
    assert_eq!(
        failure_action(&exhausted, 0, &settings),
        FailureAction::RetryAfter(settings.busy_backoff)
    );
    assert_eq!(
        failure_action(&exhausted, settings.max_retries, &settings),
        FailureAction::Skip
    );
}
