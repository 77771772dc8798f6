use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::json;

use soundvault_api::app::{self, services::AppServices};
use soundvault_api::config::AppConfig;
use soundvault_auth::{AuthGate, RsaTokenCodec, TokenCodec};
use soundvault_infra::{
    InMemoryFileStore, InMemoryObjectStore, InMemoryUserStore, ObjectStore, ObjectUpload, StoreError,
};

const PRIVATE_PEM: &str = include_str!("../../auth/tests/fixtures/private_key.pem");
const PUBLIC_PEM: &str = include_str!("../../auth/tests/fixtures/public_key.pem");

const ADMIN_EMAIL: &str = "admin@soundvault.test";
const ADMIN_PASSWORD: &str = "Admin@pass1";
const ISSUER: &str = "https://auth.soundvault.test/";
const AUDIENCE: &str = "https://app.soundvault.test/";

fn test_config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("JWT_PRIVATE_KEY", PRIVATE_PEM),
        ("JWT_PUBLIC_KEY", PUBLIC_PEM),
        ("JWT_ISSUER", ISSUER),
        ("JWT_AUDIENCE", AUDIENCE),
        ("S3_BUCKET_NAME", "audio-test"),
        ("MAX_AUDIO_FILE_SIZE_MB", "1"),
        ("ADMIN_EMAIL", ADMIN_EMAIL),
        ("ADMIN_PASSWORD", ADMIN_PASSWORD),
    ]);
    AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).expect("test config")
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = app::build_app(&test_config()).await.expect("failed to build app");
        Self::serve(app).await
    }

    async fn serve(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn create_user(&self, token: &str, email: &str, permissions: &[&str]) -> reqwest::Response {
        self.client
            .post(self.url("/users"))
            .bearer_auth(token)
            .json(&json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": email,
                "password": "Secret@1",
                "confirm_password": "Secret@1",
                "permissions": permissions,
            }))
            .send()
            .await
            .unwrap()
    }

    async fn upload(&self, token: &str, file_name: &str, content_type: &str, body: &[u8]) -> reqwest::Response {
        let part = Part::bytes(body.to_vec())
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .unwrap();
        self.client
            .post(self.url("/audio/upload"))
            .bearer_auth(token)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_token(aud: &str, permissions: &[&str]) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": "01890a5d-ac96-774b-bcce-b302099a8057",
        "email": "forged@soundvault.test",
        "permissions": permissions,
        "iss": ISSUER,
        "aud": aud,
        "iat": now,
        "exp": now + 600,
    });
    jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(PRIVATE_PEM.as_bytes()).unwrap(),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn login_rejects_wrong_password_without_revealing_which_part_failed() {
    let srv = TestServer::spawn().await;

    for (email, password) in [(ADMIN_EMAIL, "Wrong@pass1"), ("nobody@soundvault.test", ADMIN_PASSWORD)] {
        let res = srv
            .client
            .post(srv.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/audio")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");

    let res = srv
        .client
        .get(srv.url("/audio"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bare_token_is_accepted_like_a_bearer_token() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let res = srv
        .client
        .get(srv.url("/users/permissions"))
        .header("Authorization", token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["permissions"].as_array().unwrap().iter().any(|p| p == "admin"));
}

#[tokio::test]
async fn token_for_another_audience_is_unauthenticated_even_for_admin() {
    let srv = TestServer::spawn().await;
    let token = mint_token("https://someone-else.test/", &["admin"]);

    let res = srv
        .client
        .get(srv.url("/users"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_permission_is_forbidden_and_named() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.create_user(&admin, "listener@soundvault.test", &["read:audio"]).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let listener = srv.login("listener@soundvault.test", "Secret@1").await;

    // Reading is allowed.
    let res = srv
        .client
        .get(srv.url("/audio"))
        .bearer_auth(&listener)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Uploading is not.
    let res = srv.upload(&listener, "song.mp3", "audio/mpeg", b"ID3").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["missing_permissions"], json!(["write:audio"]));
}

#[tokio::test]
async fn user_lifecycle_create_conflict_update_delete() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.create_user(&admin, "Editor@SoundVault.test", &["write:audio"]).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["email"], "editor@soundvault.test");
    assert!(created.get("password_hash").is_none());
    let perms = created["permissions"].as_array().unwrap();
    assert!(perms.iter().any(|p| p == "read:audio"));
    assert!(perms.iter().any(|p| p == "write:audio"));

    let res = srv.create_user(&admin, "editor@soundvault.test", &[]).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .put(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "first_name": "Grace" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["first_name"], "Grace");
    assert_eq!(updated["last_name"], "Lovelace");

    let res = srv
        .client
        .get(srv.url("/users?skip=0&limit=10"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let users: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(users.len(), 2);

    let res = srv
        .client
        .delete(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .client
        .get(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_user_input_is_unprocessable() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.create_user(&admin, "not-an-email", &[]).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv.create_user(&admin, "x@soundvault.test", &["sudo"]).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv
        .client
        .get(srv.url("/users?limit=0"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn audio_lifecycle_upload_list_play_rename_delete() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.upload(&admin, "my song.mp3", "audio/mpeg", b"ID3-fake-bytes").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let file: serde_json::Value = res.json().await.unwrap();
    let id = file["id"].as_str().unwrap().to_string();
    assert_eq!(file["file_name"], "my song.mp3");
    assert_eq!(file["file_type"], "audio/mpeg");
    assert_eq!(file["file_metadata"]["size"], 14);
    let file_url = file["file_url"].as_str().unwrap();
    assert!(file_url.starts_with("s3://audio-test/users/"));
    assert!(file_url.ends_with("/my_song.mp3"));

    let res = srv
        .client
        .get(srv.url("/audio"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let listing: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listing["files"].as_array().unwrap().len(), 1);

    let res = srv
        .client
        .get(srv.url(&format!("/audio/{id}/play")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let play: serde_json::Value = res.json().await.unwrap();
    assert_eq!(play["expires_in"], 3600);
    assert!(play["signed_url"].as_str().unwrap().starts_with("https://audio-test.s3."));

    let res = srv
        .client
        .put(srv.url(&format!("/audio/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "file_name": "renamed.mp3" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let renamed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(renamed["file_name"], "renamed.mp3");

    let res = srv
        .client
        .delete(srv.url(&format!("/audio/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .client
        .get(srv.url(&format!("/audio/{id}/play")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_rejects_non_audio_and_mismatched_types() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.upload(&admin, "notes.txt", "text/plain", b"hello").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv.upload(&admin, "song.mp3", "audio/ogg", b"OggS").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let too_big = vec![0u8; 1024 * 1024 + 1];
    let res = srv.upload(&admin, "long.mp3", "audio/mpeg", &too_big).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

/// Object store whose deletes always fail; uploads go to memory.
struct FailingDeletes(InMemoryObjectStore);

#[async_trait]
impl ObjectStore for FailingDeletes {
    async fn upload(&self, upload: ObjectUpload<'_>) -> Result<String, StoreError> {
        self.0.upload(upload).await
    }

    async fn signed_url(&self, file_url: &str, expires_in_secs: u64) -> Result<String, StoreError> {
        self.0.signed_url(file_url, expires_in_secs).await
    }

    async fn delete(&self, _file_url: &str) -> Result<bool, StoreError> {
        Err(StoreError::ObjectStorage("bucket unreachable".into()))
    }
}

#[tokio::test]
async fn file_record_is_deleted_even_when_object_storage_fails() {
    let config = test_config();
    let codec: Arc<dyn TokenCodec> = Arc::new(RsaTokenCodec::new(config.token.clone()));
    let services = Arc::new(AppServices::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryFileStore::new()),
        Arc::new(FailingDeletes(InMemoryObjectStore::new("audio-test", "us-east-1"))),
        codec.clone(),
        config.max_audio_file_size_bytes(),
    ));
    services.users.seed_admin(&config.admin).await.unwrap();
    let srv = TestServer::serve(app::router(services, AuthGate::new(codec))).await;
    let admin = srv.admin_token().await;

    let res = srv.upload(&admin, "track.wav", "audio/wav", b"RIFF").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = srv
        .client
        .delete(srv.url(&format!("/audio/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .client
        .get(srv.url("/audio"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let listing: serde_json::Value = res.json().await.unwrap();
    assert!(listing["files"].as_array().unwrap().is_empty());
}
