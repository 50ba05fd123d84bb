// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored position: at most one per (user_id, ticker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: String,
    pub user_id: String,
    pub ticker: String,
    pub quantity: f64,
    pub avg_cost_basis: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(user_id: &str, ticker: &str, quantity: f64, avg_cost_basis: f64) -> Self {
        let now = Utc::now();
        Holding {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            ticker: ticker.to_string(),
            quantity,
            avg_cost_basis,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HoldingCreate {
    pub ticker: String,
    pub quantity: f64,
    pub avg_cost_basis: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct HoldingUpdate {
    pub ticker: Option<String>,
    pub quantity: Option<f64>,
    pub avg_cost_basis: Option<f64>,
}

/// One consolidated line of an uploaded CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedHoldingRow {
    pub ticker: String,
    pub quantity: f64,
    pub avg_cost_basis: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    New,
    Update,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingImportItem {
    pub ticker: String,
    pub quantity: f64,
    pub avg_cost_basis: f64,
    pub status: ImportStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingImportPreview {
    pub holdings: Vec<HoldingImportItem>,
    pub errors: Vec<String>,
    pub total_new: usize,
    pub total_update: usize,
    pub total_skip: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HoldingImportResult {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}
