//! Marketplace engine integration module

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use clap::Parser;
use common::model::user::User;
use dotenv::dotenv;
use listing_service::{ListingService, NewListing};
use order_service::{InMemoryUserDirectory, OrderService};
use rust_decimal_macros::dec;
use tokio::signal;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};
use uuid::Uuid;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Run with demo data
    #[clap(short, long)]
    demo: bool,
}

// Static variable to track service start time
static START_TIME: AtomicU64 = AtomicU64::new(0);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing with debug level if DEBUG=1 in .env
    let env_debug = std::env::var("DEBUG").unwrap_or_else(|_| "0".to_string());
    let log_level = if env_debug == "1" { Level::DEBUG } else { Level::INFO };

    // Create an environment filter
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .parse("tower_http=debug,api_gateway=debug,listing_service=debug,order_service=debug")
        .unwrap();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .finish();

    // Only set the global subscriber if it hasn't been set already
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        info!("Tracing initialized");
        if env_debug == "1" {
            debug!("Debug logging enabled");
        }
    }

    info!("Starting BookMart Marketplace Engine...");

    // Initialize service start time for uptime tracking
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    START_TIME.store(now, Ordering::Relaxed);

    // Initialize services
    let listing_service = Arc::new(ListingService::new());
    let user_directory = Arc::new(InMemoryUserDirectory::new());
    let order_service = Arc::new(OrderService::new(
        listing_service.clone(),
        user_directory.clone(),
    ));

    // Create demo data if requested
    if args.demo {
        info!("Creating demo data...");
        create_demo_data(
            listing_service.clone(),
            order_service.clone(),
            user_directory.clone(),
        ).await?;
    }

    // Start API server in a separate task
    let api_handle = {
        let listing_service = listing_service.clone();
        let order_service = order_service.clone();

        tokio::spawn(async move {
            // Create app state
            let state = Arc::new(api_gateway::AppState {
                listing_service,
                order_service,
            });

            // Set up CORS
            let cors = tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any);

            let app = api_gateway::router(state.clone())
                .merge(
                    axum::Router::new()
                        .route("/health", axum::routing::get(health_check))
                        .with_state(state),
                )
                .layer(cors)
                .layer(tower_http::trace::TraceLayer::new_for_http()
                    .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(log_level))
                    .on_request(tower_http::trace::DefaultOnRequest::new().level(log_level))
                    .on_response(tower_http::trace::DefaultOnResponse::new().level(log_level)));

            // Parse address to listen on
            let port = std::env::var("API_PORT").unwrap_or_else(|_| "8081".to_string());
            let port: u16 = port.parse().expect("Invalid API_PORT value");
            info!("Starting API server on 0.0.0.0:{}", port);
            let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();

            // Start the server
            let listener = tokio::net::TcpListener::bind(&addr).await.expect("Failed to bind to address");
            axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.expect("Server error");
        })
    };

    // Wait for the API server to finish
    api_handle.await?;

    info!("Shutting down");
    Ok(())
}

// Health check endpoint
async fn health_check(
    State(state): State<Arc<api_gateway::AppState>>,
) -> impl IntoResponse {
    let start_time = Instant::now();

    // Check if the listing service is responsive
    let ls_start = Instant::now();
    let listing_service_status = match state.listing_service.get_listing(Uuid::nil()).await {
        // Any response means the service is working, even None for a nil UUID
        Ok(_) => "up",
        Err(_) => "down",
    };
    let listing_service_latency = ls_start.elapsed().as_millis() as u64;

    // Check if the order service is responsive
    let os_start = Instant::now();
    let order_service_status = match state.order_service.get_order(0).await {
        Ok(_) => "up",
        Err(common::error::Error::OrderNotFound(_)) => "up",
        Err(_) => "down",
    };
    let order_service_latency = os_start.elapsed().as_millis() as u64;

    // Overall status depends on all services
    let overall_status = if listing_service_status == "up" && order_service_status == "up" {
        "healthy"
    } else {
        "degraded"
    };

    // Get system metrics
    let memory_usage = get_memory_usage_mb();
    let uptime = get_uptime_seconds();

    // Total response time for this health check
    let total_latency = start_time.elapsed().as_millis() as u64;

    // Build the health information JSON
    let health_info = serde_json::json!({
        "status": overall_status,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime,
        "services": {
            "listing_service": {
                "status": listing_service_status,
                "latency_ms": listing_service_latency
            },
            "order_service": {
                "status": order_service_status,
                "latency_ms": order_service_latency
            }
        },
        "system": {
            "memory_usage_mb": memory_usage,
        },
        "health_check_latency_ms": total_latency
    });

    if overall_status == "healthy" {
        (axum::http::StatusCode::OK, Json(health_info))
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, Json(health_info))
    }
}

// Helper function to get uptime in seconds
fn get_uptime_seconds() -> u64 {
    let current_start = START_TIME.load(Ordering::Relaxed);
    if current_start == 0 {
        // First call, initialize start time
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        START_TIME.store(now, Ordering::Relaxed);
        return 0;
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    now.saturating_sub(current_start)
}

// Helper function to get memory usage in MB
fn get_memory_usage_mb() -> u64 {
    #[cfg(target_os = "linux")]
    {
        use std::fs::File;
        use std::io::Read;

        if let Ok(mut file) = File::open("/proc/self/status") {
            let mut contents = String::new();
            if let Ok(_) = file.read_to_string(&mut contents) {
                if let Some(line) = contents.lines().find(|l| l.starts_with("VmRSS:")) {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<u64>() {
                            return kb / 1024; // Convert KB to MB
                        }
                    }
                }
            }
        }
    }

    // Default if we can't get the actual usage or not on Linux
    0
}

/// Create demo data for testing
async fn create_demo_data(
    listing_service: Arc<ListingService>,
    order_service: Arc<OrderService>,
    user_directory: Arc<InMemoryUserDirectory>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Create two demo users
    let john = User {
        id: Uuid::new_v4(),
        username: "john".to_string(),
        display_name: "John Doe".to_string(),
    };
    let alice = User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        display_name: "Alice Smith".to_string(),
    };
    user_directory.upsert_user(john.clone());
    user_directory.upsert_user(alice.clone());

    info!("Created demo users: John = {}, Alice = {}", john.id, alice.id);

    // John lists a few books
    let gatsby = listing_service.create_listing(john.id, NewListing {
        title: "The Great Gatsby".to_string(),
        author: "F. Scott Fitzgerald".to_string(),
        price: dec!(12.99),
        quantity: 3,
        is_sellable: true,
        is_swappable: false,
        condition: "Good".to_string(),
        city: Some("Nairobi".to_string()),
    }).await?;

    let mockingbird = listing_service.create_listing(john.id, NewListing {
        title: "To Kill a Mockingbird".to_string(),
        author: "Harper Lee".to_string(),
        price: dec!(9.50),
        quantity: 1,
        is_sellable: true,
        is_swappable: true,
        condition: "Like New".to_string(),
        city: Some("Nairobi".to_string()),
    }).await?;

    info!("Created demo listings: {} and {}", gatsby.id, mockingbird.id);

    // Alice buys a copy and the order is walked through the delivery flow
    let order = order_service.create_order(alice.id, gatsby.id, 1).await?;
    order_service.mark_delivering(order.id, john.id).await?;
    order_service.confirm_delivery_seller(order.id, john.id).await?;
    order_service.confirm_delivery_buyer(order.id, alice.id).await?;

    // A second order left in the ACCEPTED state
    order_service.create_order(alice.id, mockingbird.id, 1).await?;

    info!("Demo data created successfully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
