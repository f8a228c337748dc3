//! Payment Endpoint Handlers
//!
//! The HTTP edge of the verification pipeline. Handlers validate request
//! shape, run the reconciler, and map its typed errors onto status codes.
//! Fraud-class rejections return a deliberately generic message so callers
//! cannot probe tolerance thresholds; full detail stays in server-side logs
//! and the audit trail.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::handlers::AppState;
use crate::metrics::global_metrics;
use crate::payment::error::VerificationError;
use crate::payment::fees::FeeSchedule;
use crate::payment::types::{ManualPaymentClaim, Purpose, VerificationRequest, VerifiedPayment};

// ============================================================================
// Response Types
// ============================================================================

/// Body returned on successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySuccessResponse {
    /// Always true in this body
    pub success: bool,
    /// Human-readable confirmation
    pub message: String,
    /// Amount the gateway confirmed
    pub amount: u64,
    /// What the payment settled
    pub purpose: Purpose,
}

/// Body returned on any rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error
    pub error: String,
    /// Extra context, when safe to share
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Outcome label used for metrics.
fn outcome_label(err: &VerificationError) -> &'static str {
    match err {
        VerificationError::ReplayDetected => "replay",
        VerificationError::GatewayUnavailable(_) => "gateway_unavailable",
        VerificationError::GatewayDeclined => "gateway_declined",
        VerificationError::CurrencyMismatch { .. } => "currency_mismatch",
        VerificationError::AmountMismatch { .. } => "amount_mismatch",
        VerificationError::OwnershipMismatch => "ownership_mismatch",
        VerificationError::AccountNotFound => "account_not_found",
        VerificationError::PersistenceUnavailable(_) => "persistence_unavailable",
    }
}

/// Map a verification error onto an HTTP response.
///
/// Amount and ownership rejections intentionally share one generic message:
/// echoing the exact thresholds would hand an attacker a tuning oracle.
fn error_response(err: &VerificationError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, body) = match err {
        VerificationError::ReplayDetected => (
            StatusCode::CONFLICT,
            ErrorResponse::new("This transaction has already been used."),
        ),
        VerificationError::GatewayDeclined => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("Payment failed or was declined by the provider."),
        ),
        VerificationError::CurrencyMismatch { expected, .. } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!("Invalid currency. Payments must be in {expected}.")),
        ),
        VerificationError::AmountMismatch { .. } | VerificationError::OwnershipMismatch => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("Payment could not be confirmed for this account."),
        ),
        VerificationError::AccountNotFound => (
            StatusCode::NOT_FOUND,
            ErrorResponse::new("Account record not found."),
        ),
        VerificationError::GatewayUnavailable(_) => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse::new("Payment gateway is currently unavailable. Please retry shortly."),
        ),
        VerificationError::PersistenceUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new("Payment records are temporarily unavailable. Please retry shortly."),
        ),
    };
    (status, Json(body))
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// Verify a gateway payment and apply its entitlement.
///
/// # Route
/// `POST /payments/verify`
#[instrument(skip_all, fields(transaction_id = %request.transaction_id, account_id = %request.account_id))]
pub async fn verify_payment_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerificationRequest>,
) -> impl IntoResponse {
    if request.transaction_id.trim().is_empty() || request.account_id.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new("Missing transaction details.")),
        )
            .into_response();
    }
    if request.purpose == Purpose::ProgramFee && request.program_type.is_none() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(
                "program_type is required for program fee payments.",
            )),
        )
            .into_response();
    }

    let started = Instant::now();
    let result = state.reconciler().verify(&request).await;
    let elapsed = started.elapsed();

    state.record_verification_latency(elapsed);

    match result {
        Ok(VerifiedPayment { amount, purpose }) => {
            global_metrics().record_verification("verified", elapsed);
            let body = VerifySuccessResponse {
                success: true,
                message: "Payment verified successfully.".to_string(),
                amount,
                purpose,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            global_metrics().record_verification(outcome_label(&err), elapsed);
            error_response(&err).into_response()
        }
    }
}

/// Accept an offline bank-transfer claim for administrative review.
///
/// # Route
/// `POST /payments/manual`
#[instrument(skip_all, fields(account_id = %claim.account_id))]
pub async fn manual_payment_handler(
    State(state): State<Arc<AppState>>,
    Json(claim): Json<ManualPaymentClaim>,
) -> impl IntoResponse {
    if claim.account_id.trim().is_empty() || claim.reference.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new("Missing details.")),
        )
            .into_response();
    }

    match state.review_queue().submit(claim).await {
        Ok(()) => {
            global_metrics().record_manual_submission();
            info!("manual payment claim forwarded for review");
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "message": "Manual payment submitted for review."
                })),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "review queue rejected manual claim");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "Manual payments cannot be submitted right now. Please retry shortly.",
                )),
            )
                .into_response()
        }
    }
}

/// Expose the resolved fee schedule.
///
/// # Route
/// `GET /fees`
#[instrument(skip_all)]
pub async fn fees_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.settings().fee_settings().await {
        Ok(rows) => {
            let schedule = FeeSchedule::from_settings(&rows);
            (StatusCode::OK, Json(schedule)).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to read fee settings");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("Fee schedule is temporarily unavailable.")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Create the payments router.
///
/// # Routes
/// - `POST /payments/verify` - Verify a gateway payment
/// - `POST /payments/manual` - Submit an offline claim for review
/// - `GET /fees` - Current fee schedule
pub fn payments_router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/payments/verify", post(verify_payment_handler))
        .route("/payments/manual", post(manual_payment_handler))
        .route("/fees", get(fees_handler))
        .with_state(state)
}
