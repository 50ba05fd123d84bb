// src/auth.rs
use crate::error::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{Filter, Rejection};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

// Function to create a JWT token
pub fn create_token(
    user_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Returns the user id carried in the token's `sub` claim.
pub fn verify_token(token: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims.sub)
}

pub fn with_auth(
    secret: Arc<String>,
) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::any().map(move || secret.clone()))
        .and_then(authorize)
}

async fn authorize(header: Option<String>, secret: Arc<String>) -> Result<String, Rejection> {
    let header = header.ok_or_else(|| {
        warp::reject::custom(ApiError::Unauthorized(
            "Missing authorization header".to_string(),
        ))
    })?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            warp::reject::custom(ApiError::Unauthorized(
                "Authorization header must use the Bearer scheme".to_string(),
            ))
        })?;

    verify_token(token, &secret).map_err(|e| {
        log::warn!("Rejected bearer token: {}", e);
        warp::reject::custom(ApiError::Unauthorized(
            "Could not validate credentials".to_string(),
        ))
    })
}
