//! Integration tests for the static file handler and the restart
//! endpoint's HTTP response mapping.

use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::Response;

use devserve::handler::restart::handle_restart;
use devserve::handler::router::RequestContext;
use devserve::handler::static_files::serve;
use devserve::http::nocache;

async fn body_bytes(resp: Response<http_body_util::Full<Bytes>>) -> Bytes {
    resp.into_body().collect().await.unwrap().to_bytes()
}

fn ctx(path: &str) -> RequestContext<'_> {
    RequestContext {
        path,
        is_head: false,
    }
}

#[tokio::test]
async fn existing_file_returns_bytes_and_content_type() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("app.js"), "console.log(1);\n").unwrap();

    let resp = serve(&ctx("/app.js"), tmp.path()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/javascript"
    );
    assert_eq!(resp.headers().get("Content-Length").unwrap(), "16");
    assert_eq!(&body_bytes(resp).await[..], b"console.log(1);\n");
}

#[tokio::test]
async fn missing_file_is_404() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = serve(&ctx("/nope.txt"), tmp.path()).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn head_request_sends_headers_only() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("data.bin"), [0u8; 32]).unwrap();

    let resp = serve(
        &RequestContext {
            path: "/data.bin",
            is_head: true,
        },
        tmp.path(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("Content-Length").unwrap(), "32");
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn file_with_trailing_slash_is_404() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("file.txt"), "content").unwrap();

    let resp = serve(&ctx("/file.txt/"), tmp.path()).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn directory_without_slash_redirects() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("assets")).unwrap();

    let resp = serve(&ctx("/assets"), tmp.path()).await;
    assert_eq!(resp.status(), 301);
    assert_eq!(resp.headers().get("Location").unwrap(), "/assets/");
}

#[tokio::test]
async fn directory_with_index_serves_it() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("index.html"), "<h1>home</h1>").unwrap();

    let resp = serve(&ctx("/"), tmp.path()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(&body_bytes(resp).await[..], b"<h1>home</h1>");
}

#[tokio::test]
async fn directory_without_index_lists_entries() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("track one.mid"), "midi").unwrap();
    std::fs::create_dir(tmp.path().join("songs")).unwrap();

    let resp = serve(&ctx("/"), tmp.path()).await;
    assert_eq!(resp.status(), 200);
    let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(body.contains("Directory listing for /"));
    assert!(body.contains("href=\"track%20one.mid\""));
    assert!(body.contains("songs/"));
}

#[tokio::test]
async fn percent_encoded_paths_resolve() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a b.txt"), "spaced").unwrap();

    let resp = serve(&ctx("/a%20b.txt"), tmp.path()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(&body_bytes(resp).await[..], b"spaced");
}

#[tokio::test]
async fn traversal_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(tmp.path().join("secret.txt"), "secret").unwrap();

    let resp = serve(&ctx("/../secret.txt"), &root).await;
    assert_eq!(resp.status(), 404);
    let resp = serve(&ctx("/%2e%2e/secret.txt"), &root).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn restart_outside_a_repo_maps_to_400_json() {
    let tmp = tempfile::tempdir().unwrap();

    let resp = handle_restart(tmp.path()).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/json; charset=utf-8"
    );
    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(resp).await).expect("json body");
    assert_eq!(body["ok"], false);
    assert_ne!(body["returncode"], 0);
}

#[tokio::test]
async fn injector_overrides_handler_headers() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("x.txt"), "x").unwrap();

    let mut resp = serve(&ctx("/x.txt"), tmp.path()).await;
    nocache::apply(&mut resp);
    assert_eq!(
        resp.headers().get("Cache-Control").unwrap(),
        "no-store, no-cache, must-revalidate, max-age=0"
    );
    assert_eq!(resp.headers().get("Pragma").unwrap(), "no-cache");
    assert_eq!(resp.headers().get("Expires").unwrap(), "0");
}
