//! Gateway Verification Client
//!
//! One outbound call per verification, authenticated with a server-held
//! bearer secret. The provider's answer is the only trusted source for
//! "was this actually paid" — the amount and status a client claims are
//! never consulted.
//!
//! Failure modes are split by retryability: network trouble and timeouts
//! surface as [`VerificationError::GatewayUnavailable`] (the caller may
//! retry with the same reference; the replay guard keeps retries
//! idempotent), while a provider-reported decline is terminal
//! [`VerificationError::GatewayDeclined`]. No retries happen here.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::GatewayConfig;
use crate::payment::error::{VerificationError, VerificationResult};
use crate::payment::types::{Amount, GatewayRecord, GatewayStatus};

/// Abstract payment-provider verification endpoint.
///
/// Injected into the orchestrator so tests can substitute a double.
#[async_trait]
pub trait GatewayVerifier: Send + Sync {
    /// Query the provider for the transaction and normalize the result.
    async fn verify(&self, transaction_id: &str) -> VerificationResult<GatewayRecord>;
}

/// Envelope the provider wraps verification responses in
#[derive(Debug, Deserialize)]
struct VerifyEnvelope {
    /// Top-level call status (`success` when the transaction was found)
    status: String,
    /// Payment details, present on found transactions
    data: Option<VerifyData>,
}

/// Payment details nested in the verification response
#[derive(Debug, Deserialize)]
struct VerifyData {
    /// Payment status reported by the provider
    status: GatewayStatus,
    /// Captured amount in major currency units
    amount: f64,
    /// ISO currency code
    currency: String,
    /// Merchant-supplied reference echoed back
    tx_ref: String,
}

/// HTTP implementation of [`GatewayVerifier`].
pub struct HttpGatewayVerifier {
    client: reqwest::Client,
    base_url: Url,
    secret_key: String,
}

impl HttpGatewayVerifier {
    /// Build a verifier from gateway configuration.
    ///
    /// The request timeout is applied at the client level, so every
    /// verification call is bounded.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn verify_url(&self, transaction_id: &str) -> VerificationResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                VerificationError::GatewayUnavailable("gateway base URL is not a base".to_string())
            })?
            .pop_if_empty()
            .extend(["transactions", transaction_id, "verify"]);
        Ok(url)
    }
}

#[async_trait]
impl GatewayVerifier for HttpGatewayVerifier {
    async fn verify(&self, transaction_id: &str) -> VerificationResult<GatewayRecord> {
        let url = self.verify_url(transaction_id)?;
        debug!(transaction_id, "querying gateway verification endpoint");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerificationError::GatewayUnavailable("verification call timed out".to_string())
                } else {
                    VerificationError::GatewayUnavailable(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(VerificationError::GatewayUnavailable(format!(
                "provider returned {status}"
            )));
        }

        let envelope: VerifyEnvelope = response.json().await.map_err(|e| {
            warn!(transaction_id, error = %e, "unparsable gateway response");
            VerificationError::GatewayUnavailable("unparsable provider response".to_string())
        })?;

        normalize(transaction_id, envelope)
    }
}

/// Map a provider envelope into the trusted [`GatewayRecord`].
///
/// The gateway-assigned transaction id becomes the ledger reference; the
/// merchant tx_ref is carried for the ownership check.
fn normalize(transaction_id: &str, envelope: VerifyEnvelope) -> VerificationResult<GatewayRecord> {
    if envelope.status != "success" {
        debug!(transaction_id, provider_status = %envelope.status, "gateway declined");
        return Err(VerificationError::GatewayDeclined);
    }
    let data = envelope.data.ok_or(VerificationError::GatewayDeclined)?;

    Ok(GatewayRecord {
        status: data.status,
        amount: data.amount.max(0.0).round() as Amount,
        currency: data.currency,
        reference: transaction_id.to_string(),
        counterparty_reference: data.tx_ref,
    })
}
