//! Reusable booking-engine server runtime.
//!
//! Provides [`ServerHandle`] that encapsulates the full server lifecycle:
//! database init, migrations, payment gateway selection, application
//! services, the abandoned-cart sweeper, the REST API and graceful
//! shutdown. The CLI binary and integration tests use this to start and
//! stop the engine without duplicating bootstrap code.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::booking::{
    start_sweeper_task, CapacityLedger, ReservationService, SweeperService,
};
use crate::application::payments::{PayoutService, RefundOrchestrator, WebhookDispatcher};
use crate::application::ports::PaymentGateway;
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::Migrator;
use crate::infrastructure::{
    init_database, InMemoryRepositoryProvider, MockGateway, SeaOrmRepositoryProvider,
    StripeGateway,
};
use crate::interfaces::http::create_api_router;
use crate::notifications::{LogMailer, Mailer};
use crate::shared::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the booking engine.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Use in-memory repositories instead of the database. Intended for
    /// local development and tests; nothing survives a restart.
    pub in_memory: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            in_memory: false,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running booking engine.
///
/// # Examples
///
/// ```rust,no_run
/// use vistamar_booking::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     // ... wait for shutdown signal ...
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// API port the server is listening on.
    pub api_port: u16,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the booking engine with the given options.
    ///
    /// This will:
    /// 1. Install the Prometheus metrics recorder
    /// 2. Connect to the database and run migrations
    /// 3. Build the payment gateway (real or mock) and all services
    /// 4. Start the abandoned-cart sweeper task
    /// 5. Start the REST API server (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;

        info!("Starting Vistamar booking engine...");

        // ── Prometheus metrics recorder ────────────────────────
        // The global metrics recorder can only be installed once per process.
        // On restart (stop + start within the same process) we must reuse it.
        use std::sync::OnceLock;
        static PROM_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
            OnceLock::new();

        let prometheus_handle = PROM_HANDLE
            .get_or_init(|| {
                let h = metrics_exporter_prometheus::PrometheusBuilder::new()
                    .install_recorder()
                    .expect("Failed to install Prometheus metrics recorder");
                info!("Prometheus metrics recorder installed");
                h
            })
            .clone();

        // ── Repositories ───────────────────────────────────────
        let (db, repos): (Option<DatabaseConnection>, Arc<dyn RepositoryProvider>) =
            if opts.in_memory {
                warn!("Running on in-memory storage; data will not survive a restart");
                (None, Arc::new(InMemoryRepositoryProvider::new()))
            } else {
                let db = init_database(&app_cfg.database).await?;

                if opts.auto_migrate {
                    info!("Running database migrations...");
                    Migrator::up(&db, None).await?;
                    info!("Migrations completed");
                }

                let repos = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
                (Some(db), repos)
            };

        // ── Payment gateway ────────────────────────────────────
        let gateway: Arc<dyn PaymentGateway> = if app_cfg.provider.secret_key.is_empty() {
            warn!("No provider secret key configured; using the mock payment gateway");
            Arc::new(MockGateway::new())
        } else {
            Arc::new(StripeGateway::new(&app_cfg.provider)?)
        };

        // ── Services ───────────────────────────────────────────
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

        let capacity = Arc::new(CapacityLedger::new(repos.clone()));
        let reservations = Arc::new(ReservationService::new(
            repos.clone(),
            capacity.clone(),
            mailer.clone(),
            &app_cfg.booking,
        ));
        let sweeper = Arc::new(SweeperService::new(
            repos.clone(),
            capacity.clone(),
            mailer.clone(),
            &app_cfg.sweeper,
        ));
        let refunds = Arc::new(RefundOrchestrator::new(
            repos.clone(),
            gateway.clone(),
            reservations.clone(),
            mailer.clone(),
        ));
        let payouts = Arc::new(PayoutService::new(
            repos.clone(),
            gateway.clone(),
            &app_cfg.payouts,
        ));
        let dispatcher = Arc::new(WebhookDispatcher::new(
            repos.clone(),
            gateway,
            reservations.clone(),
            sweeper.clone(),
        ));

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        start_sweeper_task(
            sweeper.clone(),
            shutdown_signal.clone(),
            app_cfg.sweeper.interval_secs,
        );

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(
            reservations,
            sweeper,
            refunds,
            payouts,
            dispatcher,
            db.clone(),
            &app_cfg,
            prometheus_handle,
        );

        let api_port = app_cfg.server.api_port;
        let api_addr = format!("{}:{}", app_cfg.server.api_host, api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        });

        info!("Booking engine started.");

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            repos,
            config: app_cfg,
            api_port,
            db,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    ///
    /// Sends the shutdown signal to all server components. Call [`wait`]
    /// to block until everything has stopped.
    ///
    /// [`wait`]: ServerHandle::wait
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to fully stop after shutdown has been triggered.
    pub async fn wait(self) {
        info!("Waiting for server tasks to complete...");

        if let Err(e) = self.api_task.await {
            error!("REST API server task panicked: {}", e);
        } else {
            info!("REST API server stopped");
        }

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        }

        info!("Vistamar booking engine shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down booking engine...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Check if the server is still running.
    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
