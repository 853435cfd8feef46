use axum::{extract::State, http::StatusCode, routing::get, Router};
use axum_table_admin::{AdminConfig, BlankToNull, Normalizers, TableAdminLayer};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod database;

#[derive(Clone)]
struct ApplicationState {
    pool: SqlitePool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,axum_table_admin=debug")),
        )
        .init();

    let config = AdminConfig::from_env()?;
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            std::fs::create_dir_all("./data")?;
            "sqlite:./data/example.db?mode=rwc".to_string()
        }
    };
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    // Run database setup and seed sample data
    database::setup(&pool).await?;

    // Blank account fields must be stored as NULL, not as empty strings
    let normalizers = Normalizers::new().register(
        "users",
        BlankToNull::new(["stripe_account", "agreement_embed_url"]),
    );

    if config.sandbox {
        tracing::warn!("sandbox mode enabled: all mutations will be skipped");
    }

    let application_state = ApplicationState { pool: pool.clone() };

    // Note: the admin router is stateless, so it is merged after with_state()
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .with_state(application_state)
        .merge(
            TableAdminLayer::sqlite("/admin", pool, config)
                .with_normalizers(normalizers)
                .into_router(),
        )
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("Server running at http://{}", bind_address);
    tracing::info!("Health check at http://{}/api/health", bind_address);
    tracing::info!("Table admin available at http://{}/admin/tables", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn root_handler() -> &'static str {
    "Welcome to the axum-table-admin example server"
}

async fn health_handler(
    State(state): State<ApplicationState>,
) -> Result<(StatusCode, &'static str), StatusCode> {
    // Try to verify database connectivity
    sqlx::query("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((StatusCode::OK, "Server is healthy"))
}
