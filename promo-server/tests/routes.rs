//! Route behavior through the full router, with LinkedIn faked at the
//! `HttpClient` bridge.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use axum_extra::extract::cookie::Key;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::SecureStore;
use bridge_traits::time::FixedClock;
use core_service::{CoreConfig, LinkedInSettings, PromoService};
use promo_server::{build_router, spawn_state_sweeper};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tower::ServiceExt;

const REGISTER_BODY: &str = r#"{"value":{"uploadMechanism":{"com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest":{"uploadUrl":"https://upload.example/slot"}},"asset":"urn:li:digitalmediaAsset:Q1"}}"#;

struct FakeLinkedIn {
    calls: Mutex<Vec<String>>,
    userinfo_status: AtomicU16,
    post_status: AtomicU16,
}

impl Default for FakeLinkedIn {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            userinfo_status: AtomicU16::new(200),
            post_status: AtomicU16::new(201),
        }
    }
}

impl FakeLinkedIn {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for FakeLinkedIn {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.lock().unwrap().push(request.url.clone());

        let url = request.url.as_str();
        if url.ends_with("/oauth/v2/accessToken") {
            return Ok(HttpResponse::new(
                200,
                r#"{"access_token":"AQV","expires_in":5184000,"refresh_token":"AQX"}"#,
            ));
        }
        if url.ends_with("/v2/userinfo") {
            let status = self.userinfo_status.load(Ordering::SeqCst);
            return Ok(HttpResponse::new(
                status,
                r#"{"sub":"782bbtaQ","name":"Ada Lovelace"}"#,
            ));
        }
        if url.ends_with("/assets?action=registerUpload") {
            return Ok(HttpResponse::new(200, REGISTER_BODY));
        }
        if url == "https://upload.example/slot" {
            return Ok(HttpResponse::new(201, ""));
        }
        if url.ends_with("/v2/ugcPosts") {
            let status = self.post_status.load(Ordering::SeqCst);
            return Ok(HttpResponse::new(status, r#"{"id":"urn:li:share:77"}"#));
        }
        Err(BridgeError::OperationFailed(format!("unrouted {url}")))
    }
}

#[derive(Default)]
struct Store {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for Store {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

const NOW: i64 = 1_760_000_000_000;

fn service(fake: Arc<FakeLinkedIn>, store: Arc<Store>) -> PromoService {
    let config = CoreConfig::builder()
        .linkedin(LinkedInSettings::new(
            "client-id",
            "client-secret",
            "http://localhost:3000/api/auth/linkedin/callback",
        ))
        .http_client(fake)
        .secure_store(store)
        .clock(Arc::new(FixedClock::from_millis(NOW)))
        .build()
        .unwrap();
    PromoService::new(config).unwrap()
}

fn app(fake: Arc<FakeLinkedIn>) -> Router {
    build_router(service(fake, Arc::default()), Key::generate(), false)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// `name=value` part of the first `Set-Cookie` header.
fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Run the redirect and callback, returning the session cookie.
async fn sign_in(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(get("/api/auth/linkedin", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response);
    let state = url::Url::parse(&location(&response))
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/auth/linkedin/callback?code=abc&state={state}"),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    cookie
}

fn share_body() -> Value {
    json!({
        "text": "Join us at the AfterParty",
        "imageData": "data:image/png;base64,iVBORw0KGgo="
    })
}

#[tokio::test]
async fn healthz_answers_ok() {
    let response = app(Arc::default()).oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 16).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn authorize_redirects_to_linkedin_with_session_cookie() {
    let response = app(Arc::default())
        .oneshot(get("/api/auth/linkedin", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("https://www.linkedin.com/oauth/v2/authorization?"));

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("__promo_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn sign_in_then_share_returns_post_url() {
    let fake = Arc::new(FakeLinkedIn::default());
    let app = app(fake.clone());
    let cookie = sign_in(&app).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/linkedin/share", Some(&cookie), share_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "postId": "urn:li:share:77",
            "postUrl": "https://www.linkedin.com/feed/update/urn:li:share:77/"
        })
    );
}

#[tokio::test]
async fn callback_with_foreign_state_redirects_with_error() {
    let fake = Arc::new(FakeLinkedIn::default());
    let app = app(fake.clone());

    let response = app
        .clone()
        .oneshot(get("/api/auth/linkedin", None))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(get(
            "/api/auth/linkedin/callback?code=abc&state=forged",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=state_mismatch");
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn callback_error_codes() {
    let app = app(Arc::default());
    let cases = [
        ("/api/auth/linkedin/callback?error=user_cancelled_login", "/?error=auth_failed"),
        ("/api/auth/linkedin/callback?state=xyz", "/?error=no_code"),
        ("/api/auth/linkedin/callback?code=abc", "/?error=no_state"),
    ];

    for (uri, expected) in cases {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), expected, "{uri}");
    }
}

#[tokio::test]
async fn share_without_session_asks_for_authorization() {
    let response = app(Arc::default())
        .oneshot(post_json("/api/linkedin/share", None, share_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["authorizeUrl"], "/api/auth/linkedin");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn share_with_empty_text_is_bad_request() {
    let fake = Arc::new(FakeLinkedIn::default());
    let app = app(fake.clone());
    let cookie = sign_in(&app).await;
    let calls_before = fake.call_count();

    let response = app
        .oneshot(post_json(
            "/api/linkedin/share",
            Some(&cookie),
            json!({ "text": "   ", "imageData": "iVBORw0KGgo=" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fake.call_count(), calls_before);
}

#[tokio::test]
async fn share_with_malformed_body_is_bad_request() {
    let app = app(Arc::default());
    let cookie = sign_in(&app).await;

    let response = app
        .oneshot(post_json(
            "/api/linkedin/share",
            Some(&cookie),
            json!({ "text": "hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_failure_is_reported_generically() {
    let fake = Arc::new(FakeLinkedIn::default());
    fake.post_status.store(422, Ordering::SeqCst);
    let app = app(fake.clone());
    let cookie = sign_in(&app).await;

    let response = app
        .oneshot(post_json("/api/linkedin/share", Some(&cookie), share_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Failed to share on LinkedIn. Please try again." })
    );
}

#[tokio::test]
async fn userinfo_401_clears_session() {
    let fake = Arc::new(FakeLinkedIn::default());
    let app = app(fake.clone());
    let cookie = sign_in(&app).await;

    fake.userinfo_status.store(401, Ordering::SeqCst);
    let response = app
        .clone()
        .oneshot(get("/api/linkedin/userinfo", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    fake.userinfo_status.store(200, Ordering::SeqCst);
    let response = app
        .oneshot(post_json("/api/linkedin/share", Some(&cookie), share_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn userinfo_returns_profile() {
    let app = app(Arc::default());
    let cookie = sign_in(&app).await;

    let response = app
        .oneshot(get("/api/linkedin/userinfo", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["sub"], "782bbtaQ");
    assert_eq!(body["name"], "Ada Lovelace");
}

#[tokio::test]
async fn logout_forgets_credentials() {
    let app = app(Arc::default());
    let cookie = sign_in(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/auth/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get("/api/linkedin/userinfo", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sweeper_removes_abandoned_authorization_states() {
    let store = Arc::new(Store::default());
    let abandoned = "linkedin:state:550e8400-e29b-41d4-a716-446655440000";
    let stale = json!({ "value": "old-nonce", "issued_at": NOW - 11 * 60 * 1000 });
    store
        .set_secret(abandoned, stale.to_string().as_bytes())
        .await
        .unwrap();

    let fake = Arc::new(FakeLinkedIn::default());
    let service = service(fake.clone(), store.clone());
    let waiting = core_service::SessionId::new();
    service.begin_authorization(waiting).await.unwrap();

    let sweeper = spawn_state_sweeper(&service, Duration::from_millis(5));
    let mut swept = false;
    for _ in 0..200 {
        if !store.has_secret(abandoned).await.unwrap() {
            swept = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    sweeper.abort();

    assert!(swept);
    assert_eq!(
        service.status(waiting).await.unwrap(),
        core_service::SessionStatus::AwaitingCallback
    );
    assert_eq!(fake.call_count(), 0);
}
