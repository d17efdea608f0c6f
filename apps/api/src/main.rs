use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use booking_cell::router::BookingState;
use booking_cell::services::{BookingLifecycleService, ReservationService, SlotLockService};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic Booking API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // Connect the stores
    let pg_pool = shared_database::postgres::connect_pool(&config.database_url).await?;
    let redis_pool = shared_database::redis_store::connect_pool(&config.redis_url).await?;

    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // Wire up the booking cell
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

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
