//! Token handling at the HTTP boundary. Rejections happen before any
//! database access, so these run without Postgres.

mod common;

use arbor_api::auth::jwt::{generate_access_token, JwtConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

async fn get_with_header(uri: &str, value: &str) -> axum::http::Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("Authorization", value)
        .body(Body::empty())
        .unwrap();
    common::build_offline_app().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn missing_token_is_401() {
    let response = get(common::build_offline_app(), "/api/v1/entities/tree").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn non_bearer_scheme_is_401() {
    let response = get_with_header("/api/v1/permissions", "Basic dXNlcjpwYXNz").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_401() {
    let response = get_with_header("/api/v1/entities/1", "Bearer not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_other_secret_is_401() {
    let foreign = JwtConfig {
        secret: "some-other-secret".into(),
        access_token_expiry_mins: 15,
    };
    let token = generate_access_token(1, &foreign).unwrap();

    let response = get_with_header("/api/v1/entities/tree", &format!("Bearer {token}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let response = get(common::build_offline_app(), "/api/v1/admin/users/1/roles").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn version_zero_is_rejected_before_lookup() {
    let token = common::token_for(1);
    let response = get_with_header("/api/v1/entities/1/versions/0", &format!("Bearer {token}")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}
