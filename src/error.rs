// src/error.rs
use serde_json::json;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("No valid holdings found in CSV file")]
    NoValidHoldings { errors: Vec<String> },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::NoValidHoldings { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::NoValidHoldings { errors } => json!({
                "detail": self.to_string(),
                "errors": errors,
            }),
            _ => json!({ "detail": self.to_string() }),
        }
    }
}

impl Reject for ApiError {}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("holding for {ticker} already exists")]
    Duplicate { ticker: String },
    #[error("malformed row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { ticker } => ApiError::BadRequest(format!(
                "You already have a holding for {}. Use PUT to update it.",
                ticker
            )),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, body) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "detail": "Not found" }))
    } else if let Some(e) = err.find::<ApiError>() {
        if let ApiError::Internal(message) = e {
            log::error!("Internal error: {}", message);
        }
        (e.status_code(), e.body())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "detail": e.to_string() }))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "detail": "Uploaded file is too large" }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "detail": "Method not allowed" }),
        )
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "detail": "Internal server error" }),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_store_error_becomes_bad_request() {
        let err: ApiError = StoreError::Duplicate {
            ticker: "AAPL".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "You already have a holding for AAPL. Use PUT to update it."
        );
    }

    #[test]
    fn database_error_is_internal() {
        let err: ApiError = StoreError::Database("timeout".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn no_valid_holdings_body_lists_errors() {
        let err = ApiError::NoValidHoldings {
            errors: vec!["Row 2: Invalid quantity for AAPL".to_string()],
        };
        let body = err.body();
        assert_eq!(body["detail"], "No valid holdings found in CSV file");
        assert_eq!(body["errors"][0], "Row 2: Invalid quantity for AAPL");
    }
}
