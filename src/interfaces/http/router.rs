//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::booking::{ReservationService, SweeperService};
use crate::application::payments::{PayoutService, RefundOrchestrator, WebhookDispatcher};
use crate::config::AppConfig;
use crate::interfaces::http::common::{ApiResponse, EmptyData};

use super::modules::metrics::http_metrics_middleware;
use super::modules::request_id::request_id_middleware;
use super::modules::{agencies, health, maintenance, metrics, reservations, webhooks};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Reservations
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::confirm_reservation,
        reservations::cancel_reservation,
        reservations::refund_reservation,
        reservations::recover_reservation,
        // Agencies
        agencies::get_payout_info,
        agencies::create_payout,
        agencies::update_payout_schedule,
        // Webhooks
        webhooks::handlers::receive_payment_webhook,
        // Maintenance
        maintenance::run_sweep,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            EmptyData,
            // Reservations
            reservations::ItemRequest,
            reservations::CreateReservationRequest,
            reservations::CancelReservationRequest,
            reservations::RefundReservationRequest,
            reservations::ReservationDto,
            reservations::ReservationItemDto,
            reservations::ReservationDetailResponse,
            reservations::RefundDto,
            // Agencies
            agencies::CurrencyBalanceDto,
            agencies::PayoutScheduleDto,
            agencies::PayoutInfoDto,
            agencies::CreatePayoutRequest,
            agencies::PayoutReceiptDto,
            // Health
            health::HealthResponse,
            health::ComponentHealth,
            // Maintenance
            maintenance::SweepReportDto,
        )
    ),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Reservations", description = "Hold placement, confirmation, cancellation, refunds and abandoned-booking recovery"),
        (name = "Agencies", description = "Connected-account balances, manual payouts and payout schedules"),
        (name = "Webhooks", description = "Inbound payment provider events"),
        (name = "Maintenance", description = "Operational tasks: on-demand sweeper pass"),
    ),
    info(
        title = "Vistamar Booking API",
        version = "1.0.0",
        description = "REST API for the reservation-payment lifecycle engine",
        license(name = "MIT"),
        contact(name = "Vistamar", email = "support@vistamar.example")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
#[allow(clippy::too_many_arguments)]
pub fn create_api_router(
    reservations: Arc<ReservationService>,
    sweeper: Arc<SweeperService>,
    refunds: Arc<RefundOrchestrator>,
    payouts: Arc<PayoutService>,
    dispatcher: Arc<WebhookDispatcher>,
    db: Option<DatabaseConnection>,
    app_cfg: &AppConfig,
    prometheus_handle: PrometheusHandle,
) -> Router {
    // ── Per-module states ──────────────────────────────────────
    let booking_state = reservations::BookingState {
        reservations,
        sweeper: sweeper.clone(),
        refunds,
    };

    let agency_state = agencies::AgencyState { payouts };

    let webhook_state = webhooks::WebhookState {
        dispatcher,
        webhook_secret: app_cfg.provider.webhook_secret.clone(),
        tolerance_secs: app_cfg.provider.webhook_tolerance_secs,
    };

    let health_state = health::HealthState {
        db,
        started_at: Arc::new(Instant::now()),
    };

    let maintenance_state = maintenance::MaintenanceState { sweeper };

    let metrics_state = metrics::MetricsState {
        handle: prometheus_handle,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // ── Sub-routers ────────────────────────────────────────────
    let reservation_routes = Router::new()
        .route("/", post(reservations::create_reservation))
        .route("/{id}", get(reservations::get_reservation))
        .route("/{id}/confirm", post(reservations::confirm_reservation))
        .route("/{id}/cancel", post(reservations::cancel_reservation))
        .route("/{id}/refund", post(reservations::refund_reservation))
        .route("/{id}/recover", post(reservations::recover_reservation))
        .with_state(booking_state);

    let agency_routes = Router::new()
        .route("/{id}/payout-info", get(agencies::get_payout_info))
        .route("/{id}/payouts", post(agencies::create_payout))
        .route(
            "/{id}/payout-schedule",
            put(agencies::update_payout_schedule),
        )
        .with_state(agency_state);

    let webhook_routes = Router::new()
        .route("/payment", post(webhooks::receive_payment_webhook))
        .with_state(webhook_state);

    let maintenance_routes = Router::new()
        .route("/sweep", post(maintenance::run_sweep))
        .with_state(maintenance_state);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health
        .route(
            "/api/v1/health",
            get(health::health_check).with_state(health_state),
        )
        // Prometheus scrape endpoint
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(metrics_state),
        )
        // Reservations
        .nest("/api/v1/reservations", reservation_routes)
        // Agencies
        .nest("/api/v1/agencies", agency_routes)
        // Webhooks
        .nest("/api/v1/webhooks", webhook_routes)
        // Maintenance
        .nest("/api/v1/maintenance", maintenance_routes)
        // Middleware
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
