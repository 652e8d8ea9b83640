use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use delivery_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::from_config(pool).await?;

    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/jobs", get(routes::job::list_jobs));

    let authenticated_api = Router::new()
        .route("/api/jobs/post_job", post(routes::job::post_job))
        .route("/api/jobs/my_jobs", get(routes::job::my_jobs))
        .route("/api/jobs/accept", post(routes::job::accept_job))
        .route("/api/users/send-otp", post(routes::user::send_otp))
        .route("/api/users/verify-email", post(routes::user::verify_email))
        .layer(axum::middleware::from_fn(
            delivery_backend::middleware::auth::require_bearer_auth,
        ));

    let app = public_api
        .merge(authenticated_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
