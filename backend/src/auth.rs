//! HTTP register/login endpoints plus the `TokenValidator` the websocket
//! `Auth` handshake (§4.8 step 4) calls into. Grounded on the teacher's
//! `backend/src/auth.rs` argon2+jsonwebtoken idiom; the `sub` claim is
//! narrowed from the teacher's UUID string to the `UserId` (u32) §3/GLOSSARY
//! requires, since `sqlx`'s `users.id` is now an autoincrementing integer
//! rather than a UUID.

use crate::api::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use server_core::collaborators::TokenValidator;
use sqlx::Row;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: u32,
    pub username: String,
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // UserId, decimal
    pub exp: usize,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = match argon2.hash_password(payload.password.as_bytes(), &salt) {
        Ok(h) => h.to_string(),
        Err(_) => return Err((StatusCode::INTERNAL_SERVER_ERROR, "password hashing failed")),
    };

    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .execute(&state.db)
    .await;

    match result {
        Ok(_) => Ok(StatusCode::CREATED),
        Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
            Err((StatusCode::CONFLICT, "username or email already exists"))
        }
        Err(e) => {
            tracing::error!(error = %e, "register: database error");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "database error"))
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = sqlx::query("SELECT id, username, password_hash FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.db)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "database error"))?;

    let Some(user) = user else {
        return Err((StatusCode::UNAUTHORIZED, "invalid credentials"));
    };

    let user_id: i64 = user.get("id");
    let username: String = user.get("username");
    let password_hash_str: String = user.get("password_hash");

    let parsed_hash = PasswordHash::new(&password_hash_str)
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "hash parse error"))?;

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err((StatusCode::UNAUTHORIZED, "invalid credentials"));
    }

    let expiration = Utc::now()
        .checked_add_signed(Duration::days(7))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims { sub: user_id.to_string(), exp: expiration as usize };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(state.jwt_secret.as_bytes()))
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "token generation failed"))?;

    Ok(Json(LoginResponse { token, user_id: user_id as u32, username }))
}

/// The websocket `Auth` handshake's collaborator (§6): decodes the bearer
/// JWT the HTTP `login` endpoint issued and resolves it to a `UserId`.
pub struct JwtTokenValidator {
    secret: String,
}

impl JwtTokenValidator {
    pub fn new(secret: String) -> Self {
        JwtTokenValidator { secret }
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate_token(&self, token: &str) -> Option<u32> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256)).ok()?;
        data.claims.sub.parse::<u32>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validator_accepts_a_token_it_issued_and_rejects_garbage() {
        let validator = JwtTokenValidator::new("test-secret".to_string());
        let claims = Claims { sub: "42".to_string(), exp: (Utc::now().timestamp() + 60) as usize };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();

        assert_eq!(validator.validate_token(&token).await, Some(42));
        assert_eq!(validator.validate_token("not-a-jwt").await, None);
    }

    #[tokio::test]
    async fn validator_rejects_a_token_signed_with_a_different_secret() {
        let validator = JwtTokenValidator::new("test-secret".to_string());
        let claims = Claims { sub: "1".to_string(), exp: (Utc::now().timestamp() + 60) as usize };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other-secret")).unwrap();

        assert_eq!(validator.validate_token(&token).await, None);
    }
}
