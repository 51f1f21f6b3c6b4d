use backend::{api, auth::JwtTokenValidator, config::Config, persistence::SqlxPersistence, transport};
use server_core::context::ServerContext;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
    SqlxPersistence::init_schema(&pool).await?;

    let token_validator = Arc::new(JwtTokenValidator::new(config.jwt_secret.clone()));
    let persistence = Arc::new(SqlxPersistence::new(pool.clone()));
    let ctx: Arc<ServerContext> = ServerContext::new(token_validator, persistence);

    let app = api::router(pool, config.jwt_secret.clone()).merge(transport::ws_router(ctx));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.ws_port));
    tracing::info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
