use ::common::DocumentStatus;
use chrono::Utc;
use server::documents::{MetadataStore, SeaOrmMetadataStore};
use server::entity::document;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn fresh_service_is_healthy() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::HEALTH).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "healthy");
    assert!(res.body["timestamp"].as_str().is_some());
    let checks = &res.body["checks"];
    assert_eq!(checks["database"]["status"], "healthy");
    assert_eq!(checks["database"]["total_documents"], 0);
    assert_eq!(checks["repository"]["status"], "healthy");
    assert_eq!(checks["documents"]["error_documents"], 0);
    assert!(checks["system"]["memory"]["total_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn error_documents_degrade_health() {
    let app = TestApp::spawn().await;
    app.create_document("Fine", "a.txt", b"x").await;
    let now = Utc::now();
    SeaOrmMetadataStore::new(app.db.clone())
        .insert(document::Model {
            id: "ee000000-0000-4000-8000-000000000001".to_string(),
            name: "Broken".to_string(),
            original_filename: None,
            local_path: "nowhere.txt".to_string(),
            status: DocumentStatus::Error,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let res = app.get(routes::HEALTH).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "degraded");
    let checks = &res.body["checks"];
    assert_eq!(checks["documents"]["status"], "warning");
    assert_eq!(checks["documents"]["error_documents"], 1);
    assert_eq!(checks["database"]["by_status"]["error"], 1);
    assert_eq!(checks["database"]["by_status"]["pending"], 1);
}

#[tokio::test]
async fn unwritable_repository_is_unavailable() {
    let app = TestApp::spawn().await;
    std::fs::remove_dir_all(&app.repository).unwrap();
    std::fs::write(&app.repository, b"not a directory").unwrap();

    let res = app.get(routes::HEALTH).await;

    assert_eq!(res.status, 503);
    assert_eq!(res.body["status"], "unhealthy");
    assert_eq!(res.body["checks"]["repository"]["status"], "unhealthy");
    assert!(res.body["checks"]["repository"]["error"].as_str().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_health_requests_all_succeed() {
    let app = TestApp::spawn().await;

    let responses =
        futures::future::join_all((0..32).map(|_| app.get(routes::HEALTH))).await;

    for res in responses {
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["checks"]["repository"]["status"], "healthy");
    }
}
