// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;
use crate::storage::{Channel, Direction, EntryStatus, LedgerEntry};

pub mod ledger;
pub mod webhook;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/webhooks/provider", post(webhook::provider_webhook))
        .route("/webhooks/provider/health", get(webhook::webhook_health))
        .route("/v1/ledger/{user_id}/balance", get(ledger::get_balance))
        .route(
            "/v1/ledger/{user_id}/transactions",
            get(ledger::list_transactions),
        )
        .with_state(state);

    routes
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        webhook::provider_webhook,
        webhook::webhook_health,
        ledger::get_balance,
        ledger::list_transactions
    ),
    components(
        schemas(
            webhook::WebhookAck,
            webhook::WebhookHealthResponse,
            ledger::BalanceResponse,
            ledger::LedgerHistoryResponse,
            LedgerEntry,
            Direction,
            EntryStatus,
            Channel
        )
    ),
    tags(
        (name = "Webhooks", description = "Provider webhook ingestion"),
        (name = "Ledger", description = "Read-only wallet ledger access")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::notify::LogNotifier;
    use crate::provider::{sign_body, SIGNATURE_HEADER};
    use crate::storage::LedgerStore;

    const SECRET: &[u8] = b"whsec_test";

    fn test_state() -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(LedgerStore::open(&temp.path().join("ledger.redb")).unwrap());
        store.register_user("user-1", "buyer@example.com").unwrap();
        let state = AppState::new(store, Arc::new(LogNotifier), SECRET.to_vec());
        (temp, state)
    }

    fn topup_body(reference: &str, amount: u64) -> String {
        format!(
            r#"{{"event":"charge.success","data":{{"reference":"{reference}","amount":{amount},"customer":{{"email":"buyer@example.com"}},"metadata":{{"purpose":"wallet_topup"}}}}}}"#
        )
    }

    fn webhook_request(body: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhooks/provider")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (_temp, state) = test_state();
        let app = router(state);
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn signed_webhook_credits_wallet() {
        let (_temp, state) = test_state();
        let app = router(state.clone());

        let body = topup_body("SWM-API-1", 200_000);
        let signature = sign_body(SECRET, body.as_bytes());

        let response = app.oneshot(webhook_request(&body, &signature)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"status":"processed"}"#);
        assert_eq!(state.store().balance("user-1").unwrap(), 200_000);
    }

    #[tokio::test]
    async fn replayed_webhook_returns_success_without_second_credit() {
        let (_temp, state) = test_state();

        let body = topup_body("SWM-API-2", 100_000);
        let signature = sign_body(SECRET, body.as_bytes());

        let response = router(state.clone())
            .oneshot(webhook_request(&body, &signature))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Exact same body and signature, redelivered
        let response = router(state.clone())
            .oneshot(webhook_request(&body, &signature))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"status":"duplicate"}"#);

        assert_eq!(state.store().balance("user-1").unwrap(), 100_000);
        assert_eq!(state.store().entries_for_user("user-1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_signature_rejected_without_state_change() {
        let (_temp, state) = test_state();
        let app = router(state.clone());

        let body = topup_body("SWM-API-3", 999_999);
        let signature = sign_body(b"wrong_secret", body.as_bytes());

        let response = app.oneshot(webhook_request(&body, &signature)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.store().balance("user-1").unwrap(), 0);
        assert!(state.store().entry("SWM-API-3").unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_signature_header_rejected() {
        let (_temp, state) = test_state();
        let app = router(state);

        let body = topup_body("SWM-API-4", 1_000);
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/provider")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (_temp, state) = test_state();
        let app = router(state);

        let request = Request::builder()
            .uri("/webhooks/provider/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn balance_and_history_endpoints_read_ledger() {
        let (_temp, state) = test_state();
        state
            .store()
            .credit(
                "user-1",
                50_000,
                "SWM-API-5",
                crate::storage::Channel::Card,
                "top-up",
            )
            .unwrap();

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/v1/ledger/user-1/balance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["balance"], 50_000);

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/v1/ledger/user-1/transactions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["transactions"][0]["reference"], "SWM-API-5");

        // Unknown user is a 404 on balance
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/ledger/ghost/balance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
