use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http::HeaderValue;

mod config;
mod db;
mod error;
mod middleware;
mod routes;
mod scheduling;
mod services;

use config::Config;
use db::repository::{
    InMemoryReservationStore, InMemoryRoomStore, InMemoryUserStore, ReservationStore, RoomStore,
    SqliteReservationRepository, SqliteRoomRepository, SqliteUserRepository, UserStore,
};
use services::{init, locks::RoomLocks};

pub struct AppState {
    pub config: Config,
    pub reservations: Arc<dyn ReservationStore>,
    pub rooms: Arc<dyn RoomStore>,
    pub users: Arc<dyn UserStore>,
    pub room_locks: RoomLocks,
}

impl AppState {
    pub fn sqlite(config: Config, pool: sqlx::SqlitePool) -> Self {
        Self {
            config,
            reservations: Arc::new(SqliteReservationRepository::new(pool.clone())),
            rooms: Arc::new(SqliteRoomRepository::new(pool.clone())),
            users: Arc::new(SqliteUserRepository::new(pool)),
            room_locks: RoomLocks::new(),
        }
    }

    pub fn in_memory(config: Config) -> Self {
        Self {
            config,
            reservations: Arc::new(InMemoryReservationStore::new()),
            rooms: Arc::new(InMemoryRoomStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            room_locks: RoomLocks::new(),
        }
    }
}

/// Assemble the application router. `reservation_writes` is
/// `routes::reservations::write_router()`, optionally wrapped in a rate limiter.
pub fn app_router(state: Arc<AppState>, reservation_writes: Router<Arc<AppState>>) -> Router {
    let cors = state.config.server.frontend_url.as_deref().and_then(|origin| {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([
                        http::Method::GET,
                        http::Method::POST,
                        http::Method::PUT,
                        http::Method::DELETE,
                        http::Method::OPTIONS,
                        http::Method::PATCH,
                    ])
                    .allow_headers([http::header::CONTENT_TYPE, http::header::ACCEPT]),
            ),
            Err(e) => {
                tracing::warn!("Ignoring invalid FRONTEND_URL {:?}: {}", origin, e);
                None
            }
        }
    });

    let app = Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        .nest("/api/rooms", routes::rooms::router())
        .nest("/api/users", routes::users::router())
        .nest(
            "/api/reservations",
            routes::reservations::router().merge(reservation_writes),
        )
        .nest("/api/calendar", routes::calendar::router())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::csp::csp_middleware))
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_reservations=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Room Reservations Service");

    let app_state = Arc::new(init::build_state(config.clone()).await?);

    if config.seed.demo_data {
        init::seed_demo_data(&app_state).await?;
    }

    let thread_shutdown = Arc::new(AtomicBool::new(false));

    // Rate limiter for reservation writes
    let writes_governor = middleware::rate_limit::write_governor(&config.rate_limit)?;
    let writes_cleaner =
        middleware::rate_limit::spawn_cleaner(&writes_governor, thread_shutdown.clone());

    let app = app_router(
        app_state.clone(),
        routes::reservations::write_router()
            .layer(middleware::rate_limit::layer(&writes_governor)),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    let thread_shutdown_clone = thread_shutdown.clone();
    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {},
                        _ = term.recv() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to bind SIGTERM, waiting for Ctrl+C only: {}", e);
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::info!("Shutdown signal received");
        thread_shutdown_clone.store(true, Ordering::SeqCst);
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Signal handler completed; server future dropped to stop accepting new connections");
        }
    }

    // The cleaner polls the flag every second.
    thread_shutdown.store(true, Ordering::SeqCst);
    if let Err(e) = writes_cleaner.join() {
        tracing::warn!("Rate limiter cleanup thread join failed: {:?}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
