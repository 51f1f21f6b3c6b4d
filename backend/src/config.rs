//! Environment-backed configuration, grounded on the teacher's
//! `backend/src/main.rs` (`dotenv::dotenv().ok()` + `std::env::var`).

#[derive(Debug, Clone)]
pub struct Config {
    pub ws_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
}

impl Config {
    /// Loads `.env` if present, then reads `WS_PORT`, `DATABASE_URL` and
    /// `JWT_SECRET` from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let ws_port = std::env::var("WS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:chess_arena.db".to_string());
        let jwt_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());

        Config { ws_port, database_url, jwt_secret }
    }
}
