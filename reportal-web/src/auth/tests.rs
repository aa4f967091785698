//! Tests for the authentication gateway and the gated report endpoints

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::auth::provider::testing::MockProvider;
use crate::state::AppState;
use crate::storage::MemoryObjectStore;
use reportal_core::{Company, NewFolder, NewProfile, Role};

/// Build an app around scripted provider/blob store backends
fn test_app(provider: Arc<MockProvider>, objects: MemoryObjectStore) -> (Router, AppState) {
    let state = AppState::for_tests(provider, Arc::new(objects));
    (crate::create_app(state.clone()), state)
}

/// GET request with an optional bearer token
fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// POST request with a JSON body and bearer token
fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed_profile(
    state: &AppState,
    remote_id: &str,
    email: &str,
    company: Company,
    role: Role,
) {
    state
        .profiles
        .create(NewProfile {
            remote_identity_id: remote_id.to_string(),
            email: email.to_string(),
            company,
            role,
            can_view_reports: true,
            can_view_user_management: role == Role::Admin,
        })
        .await
        .unwrap();
}

async fn seed_folder(
    state: &AppState,
    name: &str,
    prefix: &str,
    company: Company,
    role_required: Role,
) {
    state
        .folders
        .create(NewFolder {
            name: name.to_string(),
            path_prefix: prefix.to_string(),
            company,
            role_required,
        })
        .await
        .unwrap();
}

mod gateway {
    use super::*;

    #[tokio::test]
    async fn anonymous_request_passes_through_to_open_endpoints() {
        let (app, _) = test_app(Arc::new(MockProvider::default()), MemoryObjectStore::default());

        let response = app.oneshot(get_request("/api/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());
    }

    #[tokio::test]
    async fn anonymous_request_rejected_by_protected_endpoints() {
        let (app, _) = test_app(Arc::new(MockProvider::default()), MemoryObjectStore::default());

        let response = app
            .oneshot(get_request("/api/reports/list", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Authentication credentials were not provided");
    }

    #[tokio::test]
    async fn header_without_token_segment_is_malformed() {
        let (app, _) = test_app(Arc::new(MockProvider::default()), MemoryObjectStore::default());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/reports/list")
            .header("authorization", "Bearer")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Token prefix missing");
    }

    #[tokio::test]
    async fn rejected_token_is_invalid() {
        let (app, _) = test_app(Arc::new(MockProvider::default()), MemoryObjectStore::default());

        let response = app
            .oneshot(get_request("/api/reports/list", Some("bogus")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn verified_token_without_permission_record_degrades() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "user@example.com"),
        );
        let (app, _) = test_app(provider, MemoryObjectStore::default());

        // The caller is authenticated but has no record, so the context
        // lacks company and role.
        let response = app
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "User profile incomplete");
    }

    #[tokio::test]
    async fn provider_profile_fills_in_when_record_is_missing() {
        let provider = Arc::new(
            MockProvider::default()
                .with_token("t1", "id-1", "user@example.com")
                .with_remote_profile("id-1", "CompanyA", "LocalUnit"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_folder(&state, "Sales", "sales/", Company::CompanyA, Role::LocalUnit).await;

        // Role and company come from the provider-hosted row, so the
        // listing works; capabilities stay denied without a local record.
        let response = app
            .clone()
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_request("/api/users/me/permissions", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "User profile not found. Please contact administrator."
        );
    }

    #[tokio::test]
    async fn local_record_wins_over_provider_profile() {
        let provider = Arc::new(
            MockProvider::default()
                .with_token("t1", "id-1", "user@example.com")
                .with_remote_profile("id-1", "CompanyB", "Admin"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(
            &state,
            "id-1",
            "user@example.com",
            Company::CompanyA,
            Role::LocalUnit,
        )
        .await;

        let response = app
            .oneshot(get_request("/api/users/me/permissions", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["company"], "CompanyA");
        assert_eq!(body["role"], "LocalUnit");
        assert_eq!(body["can_view_reports"], true);
        assert_eq!(body["can_view_user_management"], false);
    }

    #[tokio::test]
    async fn deactivated_record_still_authenticates() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "user@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(
            &state,
            "id-1",
            "user@example.com",
            Company::CompanyA,
            Role::LocalUnit,
        )
        .await;
        let profile = state.profiles.get_by_remote_id("id-1").await.unwrap().unwrap();
        state.profiles.deactivate(profile.id).await.unwrap();

        // The gateway does not consult is_active; the flag is reported
        // but nothing enforces it at authentication time.
        let response = app
            .oneshot(get_request("/api/users/me/permissions", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["is_active"], false);
    }
}

mod reports {
    use super::*;

    async fn seeded_catalog(state: &AppState) {
        seed_folder(state, "A-Store", "a/store/", Company::CompanyA, Role::LocalUnit).await;
        seed_folder(state, "A-Region", "a/region/", Company::CompanyA, Role::Regional).await;
        seed_folder(state, "B-Store", "b/store/", Company::CompanyB, Role::LocalUnit).await;
    }

    #[tokio::test]
    async fn local_unit_sees_only_local_unit_folders_of_its_company() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "store@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "id-1", "store@example.com", Company::CompanyA, Role::LocalUnit)
            .await;
        seeded_catalog(&state).await;

        let response = app
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A-Store"]);
    }

    #[tokio::test]
    async fn regional_sees_regional_and_local_unit_folders() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "region@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "id-1", "region@example.com", Company::CompanyA, Role::Regional)
            .await;
        seeded_catalog(&state).await;

        let response = app
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A-Store", "A-Region"]);
    }

    #[tokio::test]
    async fn admin_sees_every_folder_of_its_company() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "admin@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "id-1", "admin@example.com", Company::CompanyA, Role::Admin).await;
        seeded_catalog(&state).await;

        // Admin skips the role filter but stays company-scoped.
        let response = app
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A-Store", "A-Region"]);
    }

    #[tokio::test]
    async fn listing_skips_placeholder_and_sorts_newest_first() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let objects = MemoryObjectStore::default()
            .with_object("a/store/", 0, Some(t1))
            .with_object("a/store/jan.pdf", 100, Some(t1))
            .with_object("a/store/mar.pdf", 300, Some(t3))
            .with_object("a/store/feb.pdf", 200, Some(t2));

        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "store@example.com"),
        );
        let (app, state) = test_app(provider, objects);
        seed_profile(&state, "id-1", "store@example.com", Company::CompanyA, Role::LocalUnit)
            .await;
        seed_folder(&state, "A-Store", "a/store/", Company::CompanyA, Role::LocalUnit).await;

        let response = app
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        let body = body_json(response).await;
        let files = body[0]["files"].as_array().unwrap();
        let names: Vec<&str> = files.iter().map(|f| f["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["mar.pdf", "feb.pdf", "jan.pdf"]);
        assert_eq!(files[0]["size"], 300);
        assert!(files[0]["key"].as_str().unwrap().starts_with("a/store/"));
    }

    #[tokio::test]
    async fn failing_folder_is_flagged_without_hiding_the_rest() {
        let objects = MemoryObjectStore::default()
            .with_object("a/store/report.pdf", 10, None)
            .with_object("a/archive/old.pdf", 20, None)
            .with_failing_prefix("a/region/");

        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "region@example.com"),
        );
        let (app, state) = test_app(provider, objects);
        seed_profile(&state, "id-1", "region@example.com", Company::CompanyA, Role::Regional)
            .await;
        seed_folder(&state, "A-Store", "a/store/", Company::CompanyA, Role::LocalUnit).await;
        seed_folder(&state, "A-Region", "a/region/", Company::CompanyA, Role::Regional).await;
        seed_folder(&state, "A-Archive", "a/archive/", Company::CompanyA, Role::Regional).await;

        // The middle folder fails; the listing continues past it and all
        // three entries come back in catalog order.
        let response = app
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let folders = body.as_array().unwrap();
        assert_eq!(folders.len(), 3);
        assert_eq!(folders[0]["name"], "A-Store");
        assert!(folders[0].get("error").is_none());
        assert_eq!(folders[1]["name"], "A-Region (ACCESS ERROR)");
        assert_eq!(folders[1]["files"].as_array().unwrap().len(), 0);
        assert!(folders[1]["error"].as_str().is_some());
        assert_eq!(folders[2]["name"], "A-Archive");
        assert_eq!(folders[2]["files"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn generic_store_failure_uses_plain_error_suffix() {
        let objects = MemoryObjectStore::default().with_broken_prefix("a/store/");

        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "store@example.com"),
        );
        let (app, state) = test_app(provider, objects);
        seed_profile(&state, "id-1", "store@example.com", Company::CompanyA, Role::LocalUnit)
            .await;
        seed_folder(&state, "A-Store", "a/store/", Company::CompanyA, Role::LocalUnit).await;

        // Only access denials get the ACCESS wording; any other blob
        // store failure is flagged with the plain suffix.
        let response = app
            .oneshot(get_request("/api/reports/list", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let folders = body.as_array().unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0]["name"], "A-Store (ERROR)");
        assert!(folders[0]["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn download_requires_key_parameter() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "store@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "id-1", "store@example.com", Company::CompanyA, Role::LocalUnit)
            .await;

        let response = app
            .oneshot(get_request("/api/reports/download", Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_gated_by_prefix_containment() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "store@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "id-1", "store@example.com", Company::CompanyA, Role::LocalUnit)
            .await;
        seeded_catalog(&state).await;

        // Inside a company folder: allowed. The role requirement on the
        // folder does not apply to downloads, only prefix containment.
        let response = app
            .clone()
            .oneshot(get_request(
                "/api/reports/download?key=a/region/summary.pdf",
                Some("t1"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["url"].as_str().unwrap().contains("a/region/summary.pdf"));

        // Another company's folder: denied.
        let response = app
            .oneshot(get_request(
                "/api/reports/download?key=b/store/summary.pdf",
                Some("t1"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn admin_downloads_any_key() {
        let provider = Arc::new(
            MockProvider::default().with_token("t1", "id-1", "admin@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "id-1", "admin@example.com", Company::CompanyA, Role::Admin).await;

        // No folder catalog entry covers this key at all.
        let response = app
            .oneshot(get_request(
                "/api/reports/download?key=anything/at/all.pdf",
                Some("t1"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

mod provisioning {
    use super::*;

    async fn admin_app(provider: Arc<MockProvider>) -> (Router, AppState) {
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "admin-id", "admin@example.com", Company::CompanyA, Role::Admin)
            .await;
        (app, state)
    }

    fn admin_provider() -> MockProvider {
        MockProvider::default().with_token("admin-token", "admin-id", "admin@example.com")
    }

    #[tokio::test]
    async fn create_user_provisions_identity_then_record() {
        let provider = Arc::new(admin_provider());
        let (app, state) = admin_app(provider.clone()).await;

        let response = app
            .oneshot(post_json(
                "/api/users",
                "admin-token",
                json!({
                    "email": "new@example.com",
                    "password": "secret123",
                    "company": "CompanyB",
                    "role": "Regional"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["email"], "new@example.com");
        assert_eq!(body["role"], "Regional");
        assert_eq!(body["can_view_reports"], true);
        assert_eq!(body["can_view_user_management"], false);

        let stored = state
            .profiles
            .get_by_remote_id("remote-new@example.com")
            .await
            .unwrap();
        assert!(stored.is_some());

        // Company/role mirrored into the provider-hosted profile row.
        let upserts = provider.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].1, Company::CompanyB);
        assert_eq!(upserts[0].2, Role::Regional);
    }

    #[tokio::test]
    async fn provider_failure_aborts_provisioning() {
        let mut provider = admin_provider();
        provider.fail_create = true;
        let provider = Arc::new(provider);
        let (app, state) = admin_app(provider.clone()).await;

        let response = app
            .oneshot(post_json(
                "/api/users",
                "admin-token",
                json!({
                    "email": "new@example.com",
                    "password": "secret123",
                    "company": "CompanyA",
                    "role": "LocalUnit"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to create user in identity provider");

        let stored = state
            .profiles
            .get_by_remote_id("remote-new@example.com")
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn duplicate_record_compensates_by_deleting_remote_identity() {
        let provider = Arc::new(admin_provider());
        let (app, state) = admin_app(provider.clone()).await;
        seed_profile(
            &state,
            "existing-id",
            "dup@example.com",
            Company::CompanyA,
            Role::LocalUnit,
        )
        .await;

        let response = app
            .oneshot(post_json(
                "/api/users",
                "admin-token",
                json!({
                    "email": "dup@example.com",
                    "password": "secret123",
                    "company": "CompanyA",
                    "role": "LocalUnit"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "User with this email already exists");

        // The freshly created remote identity was rolled back.
        let deleted = provider.deleted.lock().unwrap();
        assert_eq!(deleted.as_slice(), ["remote-dup@example.com"]);
    }

    #[tokio::test]
    async fn non_admin_cannot_manage_users() {
        let provider = Arc::new(
            admin_provider().with_token("user-token", "user-id", "user@example.com"),
        );
        let (app, state) = admin_app(provider).await;
        seed_profile(&state, "user-id", "user@example.com", Company::CompanyA, Role::Regional)
            .await;

        let response = app
            .oneshot(get_request("/api/users", Some("user-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Admin privileges required");
    }

    #[tokio::test]
    async fn update_and_deactivate_round_trip() {
        let provider = Arc::new(admin_provider());
        let (app, state) = admin_app(provider.clone()).await;
        seed_profile(&state, "u-1", "user@example.com", Company::CompanyA, Role::LocalUnit)
            .await;
        let profile = state.profiles.get_by_remote_id("u-1").await.unwrap().unwrap();

        let request = Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/users/{}", profile.id))
            .header("authorization", "Bearer admin-token")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(&json!({ "role": "Regional" })).unwrap(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["role"], "Regional");
        assert_eq!(body["company"], "CompanyA");

        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/users/{}", profile.id))
            .header("authorization", "Bearer admin-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let after = state.profiles.get(profile.id).await.unwrap().unwrap();
        assert!(!after.is_active);
    }
}

mod folders_admin {
    use super::*;

    #[tokio::test]
    async fn folder_crud_requires_admin_and_validates_fields() {
        let provider = Arc::new(
            MockProvider::default().with_token("admin-token", "admin-id", "admin@example.com"),
        );
        let (app, state) = test_app(provider, MemoryObjectStore::default());
        seed_profile(&state, "admin-id", "admin@example.com", Company::CompanyA, Role::Admin)
            .await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/folders",
                "admin-token",
                json!({
                    "name": "Quarterly",
                    "path_prefix": "a/quarterly/",
                    "company": "CompanyA",
                    "role_required": "Regional"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["path_prefix"], "a/quarterly/");
        let folder_id = body["id"].as_i64().unwrap();

        // Unknown role string is rejected before anything is stored.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/folders",
                "admin-token",
                json!({
                    "name": "Broken",
                    "path_prefix": "a/broken/",
                    "company": "CompanyA",
                    "role_required": "Superuser"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/folders/{}", folder_id))
            .header("authorization", "Bearer admin-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.folders.list().await.unwrap().is_empty());
    }
}
