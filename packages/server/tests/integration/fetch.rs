use std::net::SocketAddr;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::json;

use crate::common::{TestApp, routes};

/// Serve a couple of fixed files on an ephemeral port.
async fn spawn_origin() -> SocketAddr {
    let app = Router::new()
        .route("/files/notes.md", get(|| async { "# Notes\n\nremote body" }))
        .route("/files/", get(|| async { "index" }))
        .route(
            "/gone.pdf",
            get(|| async { (StatusCode::NOT_FOUND, "no such file") }),
        )
        .route(
            "/moved.pdf",
            get(|| async { (StatusCode::NO_CONTENT, "") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind origin server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn fetch_stores_remote_document() {
    let app = TestApp::spawn().await;
    let origin = spawn_origin().await;

    let res = app
        .post_json(
            routes::FETCH,
            &json!({ "url": format!("http://{origin}/files/notes.md"), "name": "Remote notes" }),
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    let id = res.id();
    assert_eq!(res.body["name"], "Remote notes");
    assert_eq!(res.body["original_filename"], "notes.md");
    assert_eq!(res.body["status"], "pending");
    assert!(res.body["local_path"].as_str().unwrap().ends_with(".md"));

    let download = app.get_raw(&routes::download(&id)).await;
    assert_eq!(download.status(), 200);
    assert_eq!(
        download.bytes().await.unwrap().as_ref(),
        b"# Notes\n\nremote body"
    );
}

#[tokio::test]
async fn fetch_without_file_segment_defaults_extension() {
    let app = TestApp::spawn().await;
    let origin = spawn_origin().await;

    let res = app
        .post_json(
            routes::FETCH,
            &json!({ "url": format!("http://{origin}/files/"), "name": "Index" }),
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["original_filename"], "files");
    assert!(res.body["local_path"].as_str().unwrap().ends_with(".txt"));
}

#[tokio::test]
async fn non_ok_status_is_fetch_failure() {
    let app = TestApp::spawn().await;
    let origin = spawn_origin().await;

    for path in ["gone.pdf", "moved.pdf"] {
        let res = app
            .post_json(
                routes::FETCH,
                &json!({ "url": format!("http://{origin}/{path}"), "name": "Broken" }),
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.code(), "FETCH_FAILED");
    }
    assert_eq!(app.stored_files(), 0);
    assert_eq!(app.get(routes::DOCUMENTS).await.body["total"], 0);
}

#[tokio::test]
async fn unreachable_origin_is_fetch_failure() {
    let app = TestApp::spawn().await;
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let res = app
        .post_json(
            routes::FETCH,
            &json!({ "url": format!("http://{addr}/a.txt"), "name": "Nowhere" }),
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "FETCH_FAILED");
}

#[tokio::test]
async fn unsupported_scheme_is_validation_error() {
    let app = TestApp::spawn().await;

    let res = app
        .post_json(
            routes::FETCH,
            &json!({ "url": "file:///etc/passwd", "name": "Local" }),
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_body_is_validation_error() {
    let app = TestApp::spawn().await;

    let res = app.post_json(routes::FETCH, &json!({ "name": "No url" })).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "VALIDATION_ERROR");
}
