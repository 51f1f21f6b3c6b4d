//! HTTP surface: registration and login. Grounded on the teacher's
//! `backend/src/api.rs` router shape; the lobby/connect-token endpoints
//! (Lightyear-specific and unrelated to this protocol) are dropped, the
//! rest kept.

use crate::auth;
use axum::{routing::post, Router};
use sqlx::{Pool, Sqlite};

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub jwt_secret: String,
}

pub fn router(db: Pool<Sqlite>, jwt_secret: String) -> Router {
    let state = AppState { db, jwt_secret };

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state)
}
