//! HTTP surface tests
//!
//! Drive the axum router end-to-end with `tower::ServiceExt::oneshot` and
//! assert the documented status codes and response bodies, including the
//! generic wording of fraud rejections.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use http::{header, Request, StatusCode};
use tower::ServiceExt;

use acadpay::handlers::{app_router, AppState};
use acadpay::payment::audit::NoOpAuditLog;
use acadpay::payment::error::VerificationResult;
use acadpay::payment::fees::{
    KEY_FEE_ALEVEL, KEY_FEE_JAMB, KEY_FEE_OLEVEL, KEY_FEE_SUBSCRIPTION,
};
use acadpay::payment::gateway::GatewayVerifier;
use acadpay::payment::orchestrator::{Reconciler, ReconcilerConfig};
use acadpay::payment::store::{InMemoryStore, SettingRow};
use acadpay::payment::types::{
    Account, GatewayRecord, GatewayStatus, PaymentStatus, ProgramType,
};
use acadpay::payment::VerificationError;

struct MockGateway {
    records: HashMap<String, GatewayRecord>,
}

#[async_trait]
impl GatewayVerifier for MockGateway {
    async fn verify(&self, transaction_id: &str) -> VerificationResult<GatewayRecord> {
        self.records
            .get(transaction_id)
            .cloned()
            .ok_or(VerificationError::GatewayDeclined)
    }
}

fn record(reference: &str, amount: u64, owner: &str) -> GatewayRecord {
    GatewayRecord {
        status: GatewayStatus::Successful,
        amount,
        currency: "NGN".to_string(),
        reference: reference.to_string(),
        counterparty_reference: format!("MCAS-{owner}-1714000000-42"),
    }
}

fn setting(key: &str, value: &str) -> SettingRow {
    SettingRow {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn test_app() -> (axum::Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    store.put_account(Account {
        id: "acct-1".to_string(),
        program_type: ProgramType::Jamb,
        payment_status: PaymentStatus::Unpaid,
        subscription: None,
    });
    store.put_settings(vec![
        setting(KEY_FEE_JAMB, "15000"),
        setting(KEY_FEE_ALEVEL, "20000"),
        setting(KEY_FEE_OLEVEL, "10000"),
        setting(KEY_FEE_SUBSCRIPTION, "1500"),
    ]);

    let mut records = HashMap::new();
    records.insert("TX1".to_string(), record("TX1", 15000, "acct-1"));
    records.insert("TX-low".to_string(), record("TX-low", 9000, "acct-1"));

    let reconciler = Reconciler::new(
        Arc::new(MockGateway { records }),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(NoOpAuditLog),
        ReconcilerConfig {
            operating_currency: "NGN".to_string(),
            tolerance_bps: 500,
            subscription_validity_days: 30,
        },
    );
    let state = Arc::new(AppState::new(reconciler, store.clone(), store.clone()));
    (app_router(state), store)
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn verify_endpoint_happy_path() {
    let (app, store) = test_app();

    let request = post_json(
        "/payments/verify",
        &serde_json::json!({
            "transaction_id": "TX1",
            "account_id": "acct-1",
            "purpose": "program_fee",
            "program_type": "JAMB"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["amount"], 15000);
    assert_eq!(body["purpose"], "program_fee");
    assert_eq!(store.successful_count("TX1"), 1);
}

#[tokio::test]
async fn verify_endpoint_requires_program_type_for_program_fee() {
    let (app, _store) = test_app();

    let request = post_json(
        "/payments/verify",
        &serde_json::json!({
            "transaction_id": "TX1",
            "account_id": "acct-1",
            "purpose": "program_fee"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn verify_endpoint_rejects_blank_transaction_details() {
    let (app, _store) = test_app();

    let request = post_json(
        "/payments/verify",
        &serde_json::json!({
            "transaction_id": "  ",
            "account_id": "acct-1",
            "purpose": "subscription_purchase"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn replayed_transaction_returns_conflict() {
    let (app, _store) = test_app();

    let body = serde_json::json!({
        "transaction_id": "TX1",
        "account_id": "acct-1",
        "purpose": "program_fee",
        "program_type": "JAMB"
    });
    let first = app
        .clone()
        .oneshot(post_json("/payments/verify", &body))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_json("/payments/verify", &body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("already been used"));
}

#[tokio::test]
async fn underpayment_returns_generic_rejection() {
    let (app, _store) = test_app();

    let request = post_json(
        "/payments/verify",
        &serde_json::json!({
            "transaction_id": "TX-low",
            "account_id": "acct-1",
            "purpose": "program_fee",
            "program_type": "JAMB"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    // No fee thresholds leak to the caller.
    assert!(!message.contains("15000"));
    assert!(!message.contains("9000"));
}

#[tokio::test]
async fn unknown_transaction_is_declined() {
    let (app, _store) = test_app();

    let request = post_json(
        "/payments/verify",
        &serde_json::json!({
            "transaction_id": "TX-missing",
            "account_id": "acct-1",
            "purpose": "program_fee",
            "program_type": "JAMB"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_account_returns_not_found() {
    let (app, _store) = test_app();

    let request = post_json(
        "/payments/verify",
        &serde_json::json!({
            "transaction_id": "TX1",
            "account_id": "acct-404",
            "purpose": "program_fee",
            "program_type": "JAMB"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_claim_is_accepted_and_queued() {
    let (app, store) = test_app();

    let request = post_json(
        "/payments/manual",
        &serde_json::json!({
            "account_id": "acct-1",
            "reference": "teller-0042",
            "amount": 15000
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let claims = store.review_claims();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].reference, "teller-0042");
    assert_eq!(claims[0].amount, Some(15000));
}

#[tokio::test]
async fn manual_claim_requires_reference() {
    let (app, store) = test_app();

    let request = post_json(
        "/payments/manual",
        &serde_json::json!({
            "account_id": "acct-1",
            "reference": ""
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(store.review_claims().is_empty());
}

#[tokio::test]
async fn fees_endpoint_returns_typed_schedule() {
    let (app, _store) = test_app();

    let response = app.oneshot(get("/fees")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["jamb"], 15000);
    assert_eq!(body["a_level"], 20000);
    assert_eq!(body["o_level"], 10000);
    assert_eq!(body["subscription"], 1500);
}

#[tokio::test]
async fn health_and_status_endpoints_respond() {
    let (app, _store) = test_app();

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");

    let response = app.oneshot(get("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "acadpay");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let (app, _store) = test_app();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("acadpay_verifications_total"));
}
