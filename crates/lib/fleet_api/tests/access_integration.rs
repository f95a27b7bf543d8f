//! Integration test: build the router over an in-memory store and drive it
//! through the authentication gate and per-route policies.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use fleet_api::services::users::create_user;
use fleet_api::{AppState, config::ApiConfig};
use fleet_core::models::auth::Role;
use fleet_core::models::vehicle::NewVehicle;
use fleet_core::store::{MemoryStore, UserStore, VehicleStore};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-that-is-long-enough-for-hs512";

struct Fixture {
    app: Router,
    state: AppState,
    store: Arc<MemoryStore>,
    user1_id: i64,
    user2_id: i64,
}

impl Fixture {
    async fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let store = Arc::new(MemoryStore::new());
        create_user(store.as_ref(), "admin", "adminpass", Role::Admin)
            .await
            .expect("seed admin");
        let user1 = create_user(store.as_ref(), "user1", "userpass", Role::User)
            .await
            .expect("seed user1");
        let user2 = create_user(store.as_ref(), "user2", "userpass", Role::User)
            .await
            .expect("seed user2");
        store
            .create_vehicle(NewVehicle {
                plate: "AB-123-CD".into(),
                model: "Clio".into(),
                user_id: Some(user1.id),
            })
            .await
            .expect("seed vehicle");

        let state = AppState::new(ApiConfig::with_secret(SECRET), store.clone()).expect("state");
        Self {
            app: fleet_api::router(state.clone()),
            state,
            store,
            user1_id: user1.id,
            user2_id: user2.id,
        }
    }

    fn token(&self, subject: &str, role: Role) -> String {
        self.state.codec().issue(subject, role).expect("issue")
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
    }

    async fn send_as(
        &self,
        method: Method,
        uri: &str,
        subject: &str,
        role: Role,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let auth = format!("Bearer {}", self.token(subject, role));
        self.send(method, uri, Some(&auth), body).await
    }
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).expect("parse JSON")
}

// ---------------------------------------------------------------------------
// Authentication gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_header_is_json_401() {
    let fx = Fixture::new().await;
    let (status, body) = fx.send(Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(&body),
        json!({
            "error": "Unauthorized",
            "message": "Missing authorization header",
            "status": 401
        })
    );
}

#[tokio::test]
async fn non_bearer_scheme_is_401() {
    let fx = Fixture::new().await;
    let (status, body) = fx
        .send(Method::GET, "/api/users", Some("Basic dXNlcjE6dXNlcnBhc3M="), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["message"], "Invalid authorization scheme");
}

#[tokio::test]
async fn tampered_token_is_401() {
    let fx = Fixture::new().await;
    let token = fx.token("user1", Role::User);
    let (head, sig) = token.rsplit_once('.').unwrap();
    let flipped = if sig.starts_with('A') { "B" } else { "A" };
    let tampered = format!("Bearer {head}.{flipped}{}", &sig[1..]);

    let (status, body) = fx.send(Method::GET, "/api/users", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["message"], "Invalid or expired token");
}

#[tokio::test]
async fn expired_token_is_401() {
    let fx = Fixture::new().await;
    let issued = chrono::Utc::now() - chrono::Duration::days(2);
    let token = fx
        .state
        .codec()
        .issue_at("admin", Role::Admin, issued)
        .unwrap();
    let (status, _) = fx
        .send(Method::GET, "/api/users", Some(&format!("Bearer {token}")), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_from_another_key_is_401() {
    let fx = Fixture::new().await;
    let other = AppState::new(
        ApiConfig::with_secret("a-completely-different-secret-for-hs512-signing"),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    let token = other.codec().issue("admin", Role::Admin).unwrap();
    let (status, _) = fx
        .send(Method::GET, "/api/users", Some(&format!("Bearer {token}")), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_returns_usable_token() {
    let fx = Fixture::new().await;
    let (status, body) = fx
        .send(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"username": "user1", "password": "userpass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let json = json_body(&body);
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["expiresIn"], 86_400);

    let auth = format!("Bearer {}", json["token"].as_str().unwrap());
    let (status, _) = fx.send(Method::GET, "/api/users", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let fx = Fixture::new().await;
    let (status, body) = fx
        .send(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"username": "user1", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["message"], "Invalid credentials");
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_only_rejects_users_with_plain_text_403() {
    let fx = Fixture::new().await;
    let (status, body) = fx
        .send_as(
            Method::POST,
            "/api/users",
            "user1",
            Role::User,
            Some(json!({"username": "user3", "password": "userpass"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Admin access required");
    assert!(fx.store.find_user_by_username("user3").await.unwrap().is_none());
}

#[tokio::test]
async fn admin_can_create_users() {
    let fx = Fixture::new().await;
    let (status, body) = fx
        .send_as(
            Method::POST,
            "/api/users",
            "admin",
            Role::Admin,
            Some(json!({"username": "user3", "password": "userpass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let json = json_body(&body);
    assert_eq!(json["username"], "user3");
    assert_eq!(json["role"], "USER");
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_username_is_400() {
    let fx = Fixture::new().await;
    let (status, _) = fx
        .send_as(
            Method::POST,
            "/api/users",
            "admin",
            Role::Admin,
            Some(json!({"username": "user1", "password": "userpass"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn self_or_admin_allows_self_and_admin() {
    let fx = Fixture::new().await;
    let uri = format!("/api/users/{}", fx.user1_id);
    let update = json!({"username": "user1-renamed"});

    let (status, body) = fx
        .send_as(Method::PUT, &uri, "user1", Role::User, Some(update))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["username"], "user1-renamed");

    let (status, _) = fx
        .send_as(
            Method::PUT,
            &uri,
            "admin",
            Role::Admin,
            Some(json!({"username": "user1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn self_or_admin_rejects_other_users() {
    let fx = Fixture::new().await;
    let uri = format!("/api/users/{}", fx.user2_id);
    let (status, body) = fx
        .send_as(
            Method::PUT,
            &uri,
            "user1",
            Role::User,
            Some(json!({"username": "hijacked"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Not authorized");
    let user2 = fx.store.find_user_by_id(fx.user2_id).await.unwrap().unwrap();
    assert_eq!(user2.username, "user2");
}

#[tokio::test]
async fn missing_owner_is_403_for_users_and_404_for_admins() {
    let fx = Fixture::new().await;
    let (status, body) = fx
        .send_as(Method::DELETE, "/api/users/999", "user1", Role::User, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Not authorized");

    let (status, _) = fx
        .send_as(Method::DELETE, "/api/users/999", "admin", Role::Admin, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn username_in_id_path_is_not_treated_as_self() {
    let fx = Fixture::new().await;
    let (status, body) = fx
        .send_as(
            Method::PUT,
            "/api/users/user1",
            "user1",
            Role::User,
            Some(json!({"username": "renamed"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Not authorized");

    let (status, body) = fx
        .send_as(Method::GET, "/api/vehicles/user/user1", "user1", Role::User, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Not authorized");
}

#[tokio::test]
async fn users_cannot_grant_themselves_admin() {
    let fx = Fixture::new().await;
    let uri = format!("/api/users/{}", fx.user1_id);
    let (status, body) = fx
        .send_as(
            Method::PUT,
            &uri,
            "user1",
            Role::User,
            Some(json!({"role": "ADMIN"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Admin access required");
    let user1 = fx.store.find_user_by_id(fx.user1_id).await.unwrap().unwrap();
    assert_eq!(user1.role, Role::User);
}

#[tokio::test]
async fn deleting_a_user_removes_their_vehicles() {
    let fx = Fixture::new().await;
    let uri = format!("/api/users/{}", fx.user1_id);
    let (status, _) = fx
        .send_as(Method::DELETE, &uri, "admin", Role::Admin, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(fx.store.list_vehicles_by_user(fx.user1_id).await.unwrap().is_empty());
    assert!(fx.store.list_vehicles().await.unwrap().is_empty());
}

#[tokio::test]
async fn user_detail_includes_vehicle_summaries() {
    let fx = Fixture::new().await;
    let uri = format!("/api/users/{}", fx.user1_id);
    let (status, body) = fx.send_as(Method::GET, &uri, "user2", Role::User, None).await;
    assert_eq!(status, StatusCode::OK);
    let json = json_body(&body);
    assert_eq!(json["vehicles"][0]["plate"], "AB-123-CD");
}

#[tokio::test]
async fn vehicles_by_user_is_self_or_admin() {
    let fx = Fixture::new().await;
    let uri = format!("/api/vehicles/user/{}", fx.user1_id);

    let (status, body) = fx.send_as(Method::GET, &uri, "user1", Role::User, None).await;
    assert_eq!(status, StatusCode::OK);
    let json = json_body(&body);
    assert_eq!(json[0]["user"]["username"], "user1");

    let (status, body) = fx.send_as(Method::GET, &uri, "user2", Role::User, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Not authorized");
}

#[tokio::test]
async fn vehicle_writes_are_admin_only() {
    let fx = Fixture::new().await;
    let new_vehicle = json!({"plate": "EF-456-GH", "model": "Zoe", "userId": fx.user1_id});

    let (status, body) = fx
        .send_as(
            Method::POST,
            "/api/vehicles",
            "user1",
            Role::User,
            Some(new_vehicle.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Admin access required");

    let (status, body) = fx
        .send_as(
            Method::POST,
            "/api/vehicles",
            "admin",
            Role::Admin,
            Some(new_vehicle),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["user"]["id"], fx.user1_id);
}

#[tokio::test]
async fn vehicle_with_unknown_owner_is_400() {
    let fx = Fixture::new().await;
    let (status, _) = fx
        .send_as(
            Method::POST,
            "/api/vehicles",
            "admin",
            Role::Admin,
            Some(json!({"plate": "XX-000-XX", "model": "Ghost", "userId": 999})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reads_need_only_authentication() {
    let fx = Fixture::new().await;
    for uri in ["/api/users", "/api/vehicles"] {
        let (status, _) = fx.send_as(Method::GET, uri, "user2", Role::User, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

// ---------------------------------------------------------------------------
// Startup configuration
// ---------------------------------------------------------------------------

#[test]
fn out_of_range_ttl_is_refused_at_startup() {
    for ttl in [0, -1, 10_000_000_000_000, i64::MAX] {
        let config = ApiConfig {
            token_ttl_secs: ttl,
            ..ApiConfig::with_secret(SECRET)
        };
        assert!(
            AppState::new(config, Arc::new(MemoryStore::new())).is_err(),
            "ttl {ttl} accepted"
        );
    }
}
