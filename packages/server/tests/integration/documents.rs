use std::path::Path;

use reqwest::header;
use reqwest::multipart::{Form, Part};

use crate::common::{TestApp, routes};

mod document_upload {
    use super::*;

    #[tokio::test]
    async fn upload_returns_pending_document() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("Quarterly report", "report.pdf", b"%PDF-1.7 data".to_vec())
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        assert_eq!(res.body["name"], "Quarterly report");
        assert_eq!(res.body["original_filename"], "report.pdf");
        assert_eq!(res.body["status"], "pending");
        assert_eq!(res.body["created_at"], res.body["updated_at"]);

        let local_path = res.body["local_path"].as_str().unwrap();
        assert!(local_path.ends_with(&format!("{id}.pdf")));
        let stored = Path::new(local_path);
        assert_eq!(
            stored.parent().unwrap(),
            app.repository.join(&id[..2]),
            "file should live in the shard named after the id prefix"
        );
        assert_eq!(std::fs::read(stored).unwrap(), b"%PDF-1.7 data");
    }

    #[tokio::test]
    async fn name_field_may_precede_file() {
        let app = TestApp::spawn().await;
        let form = Form::new()
            .text("name", "Notes")
            .part("file", Part::bytes(b"x".to_vec()).file_name("notes.md"));

        let res = app.send_form(form).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["local_path"].as_str().unwrap().ends_with(".md"));
    }

    #[tokio::test]
    async fn unusual_extension_falls_back_to_txt() {
        let app = TestApp::spawn().await;

        let res = app.upload("Odd", "archive.tar-gz!", b"x".to_vec()).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["local_path"].as_str().unwrap().ends_with(".txt"));
        assert_eq!(res.body["original_filename"], "archive.tar-gz!");
    }

    #[tokio::test]
    async fn missing_name_is_rejected_without_storing() {
        let app = TestApp::spawn().await;
        let form = Form::new().part("file", Part::bytes(b"x".to_vec()).file_name("a.txt"));

        let res = app.send_form(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert_eq!(app.stored_files(), 0);
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let app = TestApp::spawn().await;
        let form = Form::new().text("name", "Nothing");

        let res = app.send_form(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn blank_name_is_rejected_without_storing() {
        let app = TestApp::spawn().await;

        let res = app.upload("   ", "a.txt", b"x".to_vec()).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert_eq!(app.stored_files(), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn_with(|c| c.storage.max_upload_size = 16).await;

        let res = app.upload("Big", "big.bin", vec![7u8; 1024]).await;

        assert_eq!(res.status, 413);
        assert_eq!(res.code(), "PAYLOAD_TOO_LARGE");
        assert_eq!(app.stored_files(), 0);

        let list = app.get(routes::DOCUMENTS).await;
        assert_eq!(list.body["total"], 0);
    }
}

mod document_read {
    use super::*;

    #[tokio::test]
    async fn get_returns_metadata() {
        let app = TestApp::spawn().await;
        let id = app.create_document("Readme", "README.md", b"# hi").await;

        let res = app.get(&routes::document(&id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id.as_str());
        assert_eq!(res.body["name"], "Readme");
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        let id = "00000000-0000-4000-8000-000000000000";

        let res = app.get(&routes::document(id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");

        let res = app.get(&routes::download(id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn download_streams_content_with_original_name() {
        let app = TestApp::spawn().await;
        let id = app
            .create_document("Report", "report.pdf", b"%PDF-1.7 body")
            .await;

        let res = app.get_raw(&routes::download(&id)).await;

        assert_eq!(res.status(), 200);
        let headers = res.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::CONTENT_LENGTH], "13");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment;"));
        assert!(disposition.contains("filename=\"report.pdf\""));
        assert_eq!(res.bytes().await.unwrap().as_ref(), b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn download_with_missing_file_reports_blob_missing() {
        let app = TestApp::spawn().await;
        let res = app.upload("Gone", "gone.txt", b"bye".to_vec()).await;
        let id = res.id();
        std::fs::remove_file(res.body["local_path"].as_str().unwrap()).unwrap();

        let res = app.get(&routes::download(&id)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "BLOB_MISSING");
    }
}

mod document_list {
    use super::*;

    #[tokio::test]
    async fn list_pages_in_creation_order() {
        let app = TestApp::spawn().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(
                app.create_document(&format!("Doc {i}"), "a.txt", b"x")
                    .await,
            );
        }

        let res = app.get(routes::DOCUMENTS).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 3);
        assert_eq!(res.body["skip"], 0);
        assert_eq!(res.body["limit"], 100);
        let listed: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_str().unwrap())
            .collect();
        assert_eq!(listed, ids.iter().map(String::as_str).collect::<Vec<_>>());

        let res = app
            .get(&format!("{}?skip=1&limit=1", routes::DOCUMENTS))
            .await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["data"][0]["id"], ids[1].as_str());
        assert_eq!(res.body["total"], 3);
    }

    #[tokio::test]
    async fn status_filter() {
        let app = TestApp::spawn().await;
        app.create_document("One", "a.txt", b"x").await;

        let res = app
            .get(&format!("{}?status=pending", routes::DOCUMENTS))
            .await;
        assert_eq!(res.body["total"], 1);

        let res = app.get(&format!("{}?status=error", routes::DOCUMENTS)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 0);
        assert!(res.body["data"].as_array().unwrap().is_empty());

        let res = app
            .get(&format!("{}?status=archived", routes::DOCUMENTS))
            .await;
        assert_eq!(res.status, 200);
        assert!(res.body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_status_lists_everything() {
        let app = TestApp::spawn().await;
        let id = app.create_document("One", "a.txt", b"x").await;

        let res = app.get(&format!("{}?status=", routes::DOCUMENTS)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn limit_is_capped() {
        let app = TestApp::spawn().await;

        let res = app.get(&format!("{}?limit=5000", routes::DOCUMENTS)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["limit"], 1000);
    }
}

mod document_delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_row_file_and_shard() {
        let app = TestApp::spawn().await;
        let res = app.upload("Temp", "temp.txt", b"tmp".to_vec()).await;
        let id = res.id();
        let stored = res.body["local_path"].as_str().unwrap().to_string();

        let res = app.delete(&routes::document(&id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], id.as_str());
        assert_eq!(res.body["name"], "Temp");
        assert!(res.body["message"].as_str().is_some());
        assert!(!Path::new(&stored).exists());
        assert!(!app.repository.join(&id[..2]).exists());
        assert!(app.repository.exists());

        let res = app.get(&routes::document(&id)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let app = TestApp::spawn().await;
        let id = app.create_document("Once", "once.txt", b"1").await;

        assert_eq!(app.delete(&routes::document(&id)).await.status, 200);

        let res = app.delete(&routes::document(&id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let app = TestApp::spawn().await;
        let res = app.upload("Gone", "gone.txt", b"bye".to_vec()).await;
        let id = res.id();
        std::fs::remove_file(res.body["local_path"].as_str().unwrap()).unwrap();

        let res = app.delete(&routes::document(&id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(app.get(&routes::document(&id)).await.status, 404);
    }

    #[tokio::test]
    async fn delete_keeps_shard_shared_with_other_documents() {
        let app = TestApp::spawn().await;
        // Upload until two documents share a shard prefix.
        let mut by_shard = std::collections::HashMap::<String, Vec<String>>::new();
        let pair = loop {
            let id = app.create_document("Doc", "a.txt", b"x").await;
            let shard = by_shard.entry(id[..2].to_string()).or_default();
            shard.push(id);
            if shard.len() == 2 {
                break shard.clone();
            }
        };

        app.delete(&routes::document(&pair[0])).await;

        assert!(app.repository.join(&pair[1][..2]).is_dir());
        let res = app.get_raw(&routes::download(&pair[1])).await;
        assert_eq!(res.status(), 200);
    }
}

mod openapi {
    use super::*;

    #[tokio::test]
    async fn document_is_served() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::OPENAPI).await;

        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/api/v1/documents/{id}"].is_object());
        assert!(res.body["paths"]["/health"].is_object());
    }
}
