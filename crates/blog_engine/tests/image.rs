use blog_engine::{
    CdnResolver, IdentityResolver, ImageError, ImageResolver, ImageStrategy, LocalImageFetcher,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn identity_and_cdn_resolvers() {
    let src = "https://postfiles.pstatic.net/20251109_1/photo.png?type=w773";
    assert_eq!(IdentityResolver.resolve(src).await, src);
    assert_eq!(
        CdnResolver.resolve(src).await,
        "https://blogfiles.pstatic.net/20251109_1/photo.png"
    );
}

#[tokio::test]
async fn fetch_local_downloads_and_returns_prefixed_path() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/photo.png"))
        .and(header("referer", "https://blog.naver.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PNGDATA".to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let assets = TempDir::new().unwrap();
    let fetcher =
        LocalImageFetcher::new(assets.path().to_path_buf(), "assets/post/".to_string()).unwrap();

    let src = format!("{}/images/photo.png", server.uri());
    assert_eq!(fetcher.resolve(&src).await, "assets/post/photo.png");
    assert_eq!(
        std::fs::read(assets.path().join("photo.png")).unwrap(),
        b"PNGDATA"
    );
}

#[tokio::test]
async fn fetch_local_falls_back_to_the_original_source() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let assets = TempDir::new().unwrap();
    let resolver = ImageStrategy::FetchLocal {
        assets_dir: assets.path().to_path_buf(),
        src_prefix: "assets/post/".to_string(),
    }
    .resolver()
    .unwrap();

    let src = format!("{}/images/missing.png?type=w966", server.uri());
    assert_eq!(resolver.resolve(&src).await, src);
    assert_eq!(std::fs::read_dir(assets.path()).unwrap().count(), 0);
}

#[test]
fn fetch_local_requires_an_existing_directory() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");
    let err = ImageStrategy::FetchLocal {
        assets_dir: missing.clone(),
        src_prefix: String::new(),
    }
    .resolver()
    .err()
    .unwrap();
    assert!(matches!(err, ImageError::AssetsDir(path) if path == missing));
}
