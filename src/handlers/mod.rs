//! HTTP Handlers for the AcadPay Service
//!
//! ```text
//! HTTP Request ──> Axum Router ──> verify/manual/fees handlers ──> Reconciler
//!                       │                                             │
//!                       └──> status/health/metrics handlers <── AppState
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::payment::orchestrator::Reconciler;
use crate::payment::store::{ReviewQueue, SettingsStore};

pub mod status;
pub mod verify;

pub use status::{
    health_handler, metrics_handler, status_handler, status_router, HealthResponse,
    LatencyHistogram, LatencyMetrics, MemoryMetrics, StatusResponse,
};
pub use verify::{
    fees_handler, manual_payment_handler, payments_router, verify_payment_handler, ErrorResponse,
    VerifySuccessResponse,
};

/// Shared application state for all handlers.
///
/// Holds the wired reconciler, the external collaborators the non-core
/// endpoints talk to, and the counters behind `/status`.
pub struct AppState {
    reconciler: Reconciler,
    review_queue: Arc<dyn ReviewQueue>,
    settings: Arc<dyn SettingsStore>,
    start_time: Instant,
    verifications_processed: AtomicU64,
    latency_histogram: LatencyHistogram,
}

impl AppState {
    /// Create state around a wired reconciler and its collaborators.
    pub fn new(
        reconciler: Reconciler,
        review_queue: Arc<dyn ReviewQueue>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            reconciler,
            review_queue,
            settings,
            start_time: Instant::now(),
            verifications_processed: AtomicU64::new(0),
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// The verification pipeline.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The manual-payment review collaborator.
    pub fn review_queue(&self) -> &Arc<dyn ReviewQueue> {
        &self.review_queue
    }

    /// The settings collaborator backing `/fees`.
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// Service uptime in seconds.
    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Total verification requests processed.
    #[inline]
    pub fn verifications_processed(&self) -> u64 {
        self.verifications_processed.load(Ordering::Relaxed)
    }

    /// Record one verification request's wall-clock duration.
    #[inline]
    pub fn record_verification_latency(&self, duration: std::time::Duration) {
        self.latency_histogram.record_duration(duration);
        self.verifications_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Latency percentiles for `/status`.
    #[inline]
    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency_histogram.metrics()
    }
}

/// Build the complete application router with middleware.
///
/// Sessions and authentication are handled upstream by the portal; this
/// service only layers request tracing and CORS.
pub fn app_router(state: Arc<AppState>) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    axum::Router::new()
        .merge(payments_router(state.clone()))
        .merge(status_router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
