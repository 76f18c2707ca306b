use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;

use server::config::{
    AppConfig, CorsConfig, DatabaseConfig, HealthConfig, ServerConfig, StorageConfig,
};
use server::state::AppState;

pub mod routes {
    pub const DOCUMENTS: &str = "/api/v1/documents";
    pub const FETCH: &str = "/api/v1/documents/fetch";
    pub const HEALTH: &str = "/health";
    pub const OPENAPI: &str = "/api-docs/openapi.json";

    pub fn document(id: &str) -> String {
        format!("/api/v1/documents/{id}")
    }

    pub fn download(id: &str) -> String {
        format!("/api/v1/documents/{id}/download")
    }
}

/// A running test server backed by a SQLite file and a repository in a temp dir.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub repository: PathBuf,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

fn test_config(dir: &Path) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.join("documents.db").display()),
            max_connections: 5,
            reset_on_schema_mismatch: false,
        },
        storage: StorageConfig {
            repository_path: dir.join("repository"),
            max_upload_size: 1024 * 1024,
            fetch_timeout_secs: 5,
        },
        health: HealthConfig {
            // Host load must not flip health assertions.
            warning_threshold_percent: 100.0,
            min_free_bytes: 0,
            cpu_sample_ms: 1,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(dir.path());
        configure(&mut config);

        let db = server::database::init_db(&config.database)
            .await
            .expect("Failed to initialize test database");
        let repository = config.storage.repository_path.clone();

        let state = AppState::build(config, db.clone())
            .await
            .expect("Failed to build app state");
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            repository,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_raw(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn send_form(&self, form: Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::DOCUMENTS))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Upload with the `file` part first and `name` last.
    pub async fn upload(&self, name: &str, file_name: &str, file_bytes: Vec<u8>) -> TestResponse {
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("name", name.to_string());
        self.send_form(form).await
    }

    /// Upload a document and return its `id`.
    pub async fn create_document(&self, name: &str, file_name: &str, content: &[u8]) -> String {
        let res = self.upload(name, file_name, content.to_vec()).await;
        assert_eq!(res.status, 201, "create_document failed: {}", res.text);
        res.id()
    }

    /// Number of regular files anywhere under the repository.
    pub fn stored_files(&self) -> usize {
        fn count(dir: &Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .map(|e| e.unwrap().path())
                .map(|p| if p.is_dir() { count(&p) } else { 1 })
                .sum()
        }
        count(&self.repository)
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}
