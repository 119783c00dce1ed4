//! Integration tests for the QR backend.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, LogFormat, S3Config, StorageBackend};
use crate::db::{init_database, Repository};
use crate::storage::LocalObjectStore;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let storage_path = temp_dir.path().join("objects");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Initialize object store
        let store = Arc::new(
            LocalObjectStore::new(storage_path.clone(), "http://objects.test".to_string())
                .await
                .expect("Failed to init object store"),
        );

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
            storage_backend: StorageBackend::Local,
            storage_path,
            public_base_url: "http://objects.test".to_string(),
            s3: S3Config {
                bucket: "unused".to_string(),
                region: "us-west-1".to_string(),
                endpoint_url: None,
                force_path_style: false,
            },
            max_upload_bytes: 1024 * 1024,
            qr_image_size: 120,
        };

        let app = create_router(AppState::new(repo, store, config));

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn object_exists(&self, key: &str) -> bool {
        self.temp_dir.path().join("objects").join(key).exists()
    }

    async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn create_location(&self, number: i64, name: &str) -> String {
        let resp = self
            .post_json(
                "/api/locations",
                json!({"locationNumber": number, "name": name}),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_category(&self, name: &str, category_type: &str) -> String {
        let resp = self
            .post_json(
                "/api/categories",
                json!({"name": name, "categoryType": category_type}),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn file_part(name: &str, bytes: &[u8], mime: &str) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(name.to_string())
        .mime_str(mime)
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/health").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_location_crud() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_location(7, "Pool Deck").await;

    let resp = fixture.get("/api/locations").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "pool deck");

    for term in [id.as_str(), "7", "Pool%20Deck"] {
        let resp = fixture.get(&format!("/api/locations/{}", term)).await;
        assert_eq!(resp.status(), 200, "lookup by {}", term);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["id"], id.as_str());
    }

    // Duplicate number
    let resp = fixture
        .post_json("/api/locations", json!({"locationNumber": 7, "name": "Other"}))
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_location_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post_json("/api/locations", json!({"locationNumber": 0, "name": " "}))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_category_type_is_normalised() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_category("Specials", "flyers").await;

    let resp = fixture.get(&format!("/api/categories/{}", id)).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["categoryType"], "links");

    let resp = fixture.get("/api/categories/nope").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_create_links_qr_from_json() {
    let fixture = TestFixture::new().await;
    let location = fixture.create_location(1, "Pool").await;
    let category = fixture.create_category("Menus", "links").await;

    let resp = fixture
        .post_json(
            "/api/qrs",
            json!({
                "name": "PoolBar",
                "qrUrl": "abc123",
                "location": location,
                "category": category
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let qr = &body["data"];

    assert_eq!(qr["name"], "poolbar");
    assert_eq!(qr["qrImageReference"], "qr-images/poolbar.png");
    assert_eq!(
        qr["qrImageUrl"],
        "http://objects.test/qr-images/poolbar.png"
    );
    assert_eq!(qr["location"]["locationNumber"], 1);
    assert_eq!(qr["category"]["categoryType"], "links");
    assert_eq!(
        qr["qrData"],
        json!([{"doc": "poolbar", "value": "https://www.abc123"}])
    );
    assert!(fixture.object_exists("qr-images/poolbar.png"));

    // Lookup by id, name and slug
    let id = qr["id"].as_str().unwrap();
    for term in [id, "poolbar", "abc123"] {
        let resp = fixture.get(&format!("/api/qrs/{}", term)).await;
        assert_eq!(resp.status(), 200, "lookup by {}", term);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["id"], id);
    }
}

#[tokio::test]
async fn test_local_objects_are_served() {
    let fixture = TestFixture::new().await;
    let location = fixture.create_location(1, "Pool").await;
    let category = fixture.create_category("Menus", "links").await;

    let resp = fixture
        .post_json(
            "/api/qrs",
            json!({"name": "poolbar", "location": location, "category": category}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.get("/objects/qr-images/poolbar.png").await;
    assert_eq!(resp.status(), 200);
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));

    let resp = fixture.get("/objects/qr-images/missing.png").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_create_images_qr_from_multipart() {
    let fixture = TestFixture::new().await;
    let location = fixture.create_location(2, "Lobby").await;
    let category = fixture.create_category("Gallery", "images").await;

    let form = Form::new()
        .text("name", "Lobby Gallery")
        .text("location", location)
        .text("category", category)
        .part("files", file_part("first.png", b"one", "image/png"))
        .part("files", file_part("second.png", b"two", "image/png"));

    let resp = fixture
        .client
        .post(fixture.url("/api/qrs"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let qr = &body["data"];

    let children = qr["qrData"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["order"], 1);
    assert_eq!(children[1]["order"], 2);
    let first_url = children[0]["value"].as_str().unwrap();
    assert!(first_url.starts_with("http://objects.test/media/"));
    assert!(first_url.ends_with("/first.png"));

    // Delete cascades to images and their objects
    let id = qr["id"].as_str().unwrap();
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/qrs/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["msg"], "QR lobby gallery deleted");
    assert!(!fixture.object_exists("qr-images/lobby_20gallery.png"));

    let resp = fixture.get(&format!("/api/qrs/{}", id)).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_create_with_unknown_location() {
    let fixture = TestFixture::new().await;
    let category = fixture.create_category("Menus", "links").await;

    let resp = fixture
        .post_json(
            "/api/qrs",
            json!({
                "name": "ghost",
                "location": uuid::Uuid::new_v4().to_string(),
                "category": category
            }),
        )
        .await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REFERENCE_NOT_FOUND");

    let resp = fixture.get("/api/qrs").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_create_validation_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post_json("/api/qrs", json!({"name": "", "location": "x"}))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_duplicate_name_conflicts() {
    let fixture = TestFixture::new().await;
    let location = fixture.create_location(1, "Pool").await;
    let category = fixture.create_category("Menus", "links").await;
    let body = json!({"name": "poolbar", "location": location, "category": category});

    let resp = fixture.post_json("/api/qrs", body.clone()).await;
    assert_eq!(resp.status(), 200);

    let mut upper = body;
    upper["name"] = json!("POOLBAR");
    let resp = fixture.post_json("/api/qrs", upper).await;
    assert_eq!(resp.status(), 409);

    let resp = fixture.get("/api/qrs").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_and_filter() {
    let fixture = TestFixture::new().await;
    let pool = fixture.create_location(1, "Pool").await;
    let lobby = fixture.create_location(2, "Lobby").await;
    let menus = fixture.create_category("Menus", "links").await;

    for (name, location) in [("poolbar", &pool), ("pool snacks", &pool), ("lobby bar", &lobby)] {
        let resp = fixture
            .post_json(
                "/api/qrs",
                json!({"name": name, "location": location, "category": menus}),
            )
            .await;
        assert_eq!(resp.status(), 200);
    }

    let resp = fixture.get("/api/qrs/search/BAR").await;
    let first: Value = resp.json().await.unwrap();
    assert_eq!(first["data"].as_array().unwrap().len(), 2);
    let resp = fixture.get("/api/qrs/search/BAR").await;
    let second: Value = resp.json().await.unwrap();
    assert_eq!(first, second);

    let resp = fixture.get("/api/qrs/search/zzz").await;
    assert_eq!(resp.status(), 404);

    let resp = fixture.get("/api/qrs?location=poo").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let resp = fixture.get("/api/qrs?location=lob&category=men").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "lobby bar");

    // Unmatched fragment narrows to nothing instead of erroring
    let resp = fixture.get("/api/qrs?category=flyers").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_patch_renames_and_appends_documents() {
    let fixture = TestFixture::new().await;
    let location = fixture.create_location(3, "Spa").await;
    let category = fixture.create_category("Handbooks", "documents").await;

    let form = Form::new()
        .text("name", "spa guide")
        .text("location", location)
        .text("category", category)
        .part("files", file_part("rules.pdf", b"%PDF-rules", "application/pdf"));
    let resp = fixture
        .client
        .post(fixture.url("/api/qrs"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(fixture.object_exists("qr-images/spa_20guide.png"));

    let form = Form::new()
        .text("name", "Spa Handbook")
        .text("active", "false")
        .part("files", file_part("hours.pdf", b"%PDF-hours", "application/pdf"));
    let resp = fixture
        .client
        .patch(fixture.url("/api/qrs/spa%20guide"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let qr = &body["data"];

    assert_eq!(qr["name"], "spa handbook");
    assert_eq!(qr["active"], false);
    assert_eq!(qr["qrImageReference"], "qr-images/spa_20handbook.png");
    let docs: Vec<&str> = qr["qrData"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["doc"].as_str().unwrap())
        .collect();
    assert_eq!(docs, vec!["rules.pdf", "hours.pdf"]);

    assert!(fixture.object_exists("qr-images/spa_20handbook.png"));
    assert!(!fixture.object_exists("qr-images/spa_20guide.png"));
}

#[tokio::test]
async fn test_patch_rejects_files_for_links_qr() {
    let fixture = TestFixture::new().await;
    let location = fixture.create_location(1, "Pool").await;
    let category = fixture.create_category("Menus", "links").await;
    let resp = fixture
        .post_json(
            "/api/qrs",
            json!({"name": "poolbar", "location": location, "category": category}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let form = Form::new().part("files", file_part("menu.pdf", b"x", "application/pdf"));
    let resp = fixture
        .client
        .patch(fixture.url("/api/qrs/poolbar"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_delete_unknown_qr() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .delete(fixture.url("/api/qrs/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
