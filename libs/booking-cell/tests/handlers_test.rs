use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use booking_cell::router::{booking_routes, BookingState};
use booking_cell::services::{BookingLifecycleService, ReservationService, SlotLockService};
use shared_config::AppConfig;
use shared_models::auth::JwtClaims;

const JWT_SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

/// Builds the router over lazy pools: nothing connects until a handler
/// actually touches a store, so middleware behavior is testable offline.
fn test_app() -> Router {
    let config = Arc::new(AppConfig {
        database_url: "postgres://localhost:1/unreachable".to_string(),
        redis_url: "redis://localhost:1".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        slot_lock_ttl_secs: 900,
        duplicate_staleness_secs: 300,
        payment_gating: true,
    });

    let pg_pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    let redis_pool = deadpool_redis::Config::from_url(&config.redis_url)
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("lazy redis pool");

    let locks = SlotLockService::new(redis_pool, config.slot_lock_ttl_secs);
    let state = Arc::new(BookingState {
        config: config.clone(),
        reservation: ReservationService::new(
            pg_pool.clone(),
            locks,
            config.duplicate_staleness_secs,
            config.payment_gating,
        ),
        lifecycle: BookingLifecycleService::new(pg_pool),
    });
    booking_routes(state)
}

fn token_for(role: &str) -> String {
    let claims = JwtClaims {
        sub: Uuid::new_v4().to_string(),
        exp: Some(chrono::Utc::now().timestamp() as u64 + 3600),
        email: Some("user@example.com".to_string()),
        role: Some(role.to_string()),
        iat: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/doctors")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/doctors")
                .header("authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let claims = JwtClaims {
        sub: Uuid::new_v4().to_string(),
        exp: Some(1_000_000),
        email: None,
        role: Some("patient".to_string()),
        iat: None,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/doctors")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn visit_metrics_require_admin_role() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/metrics/visits/doctors")
                .header("authorization", format!("Bearer {}", token_for("patient")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn payment_callback_requires_admin_role() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/confirm")
                .header("authorization", format!("Bearer {}", token_for("patient")))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"doctor_booking_ids": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn per_user_spend_metrics_require_admin_role() {
    let app = test_app();
    let uri = format!("/metrics/spend/{}", Uuid::new_v4());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("authorization", format!("Bearer {}", token_for("patient")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
