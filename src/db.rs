// src/db.rs
use crate::error::StoreError;
use crate::models::Holding;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use scylla::frame::response::result::{CqlValue, Row};
use scylla::{query::Query, Session, SessionBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait HoldingStore: Send + Sync {
    async fn list_holdings(&self, user_id: &str) -> Result<Vec<Holding>, StoreError>;

    async fn get_holding(&self, id: &str) -> Result<Option<Holding>, StoreError>;

    /// Fails with `StoreError::Duplicate` when the user already holds the ticker.
    async fn insert_holding(&self, holding: &Holding) -> Result<(), StoreError>;

    async fn update_holding(&self, holding: &Holding) -> Result<(), StoreError>;

    async fn delete_holding(&self, holding: &Holding) -> Result<(), StoreError>;
}

const HOLDING_COLUMNS: &str = "id, user_id, ticker, quantity, avg_cost_basis, created_at, updated_at";

pub struct ScyllaStore {
    session: Session,
}

impl ScyllaStore {
    pub async fn connect(node: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let session = SessionBuilder::new().known_node(node).build().await?;

        session.query("CREATE KEYSPACE IF NOT EXISTS holdings_tracker WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}", &[]).await?;
        session.query("CREATE TABLE IF NOT EXISTS holdings_tracker.holdings (user_id TEXT, ticker TEXT, id TEXT, quantity DOUBLE, avg_cost_basis DOUBLE, created_at TIMESTAMP, updated_at TIMESTAMP, PRIMARY KEY (user_id, ticker))", &[]).await?;
        session
            .query(
                "CREATE INDEX IF NOT EXISTS holdings_id_idx ON holdings_tracker.holdings (id)",
                &[],
            )
            .await?;

        info!("Successfully connected to ScyllaDB at {}.", node);
        Ok(ScyllaStore { session })
    }
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

fn text_at(row: &Row, idx: usize) -> Result<String, StoreError> {
    row.columns
        .get(idx)
        .and_then(|c| c.as_ref())
        .and_then(|v| v.as_text())
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::Corrupt(format!("column {} is not text", idx)))
}

fn double_at(row: &Row, idx: usize) -> Result<f64, StoreError> {
    row.columns
        .get(idx)
        .and_then(|c| c.as_ref())
        .and_then(|v| v.as_double())
        .ok_or_else(|| StoreError::Corrupt(format!("column {} is not a double", idx)))
}

fn timestamp_at(row: &Row, idx: usize) -> Result<DateTime<Utc>, StoreError> {
    match row.columns.get(idx).and_then(|c| c.as_ref()) {
        Some(CqlValue::Timestamp(ts)) => {
            DateTime::<Utc>::from_timestamp_millis(ts.num_milliseconds())
                .ok_or_else(|| StoreError::Corrupt(format!("column {} is out of range", idx)))
        }
        _ => Err(StoreError::Corrupt(format!(
            "column {} is not a timestamp",
            idx
        ))),
    }
}

fn holding_from_row(row: &Row) -> Result<Holding, StoreError> {
    Ok(Holding {
        id: text_at(row, 0)?,
        user_id: text_at(row, 1)?,
        ticker: text_at(row, 2)?,
        quantity: double_at(row, 3)?,
        avg_cost_basis: double_at(row, 4)?,
        created_at: timestamp_at(row, 5)?,
        updated_at: timestamp_at(row, 6)?,
    })
}

#[async_trait]
impl HoldingStore for ScyllaStore {
    async fn list_holdings(&self, user_id: &str) -> Result<Vec<Holding>, StoreError> {
        let query = Query::new(format!(
            "SELECT {} FROM holdings_tracker.holdings WHERE user_id = ?",
            HOLDING_COLUMNS
        ));
        let result = self.session.query(query, (user_id,)).await.map_err(db_err)?;
        result
            .rows
            .unwrap_or_default()
            .iter()
            .map(holding_from_row)
            .collect()
    }

    async fn get_holding(&self, id: &str) -> Result<Option<Holding>, StoreError> {
        let query = Query::new(format!(
            "SELECT {} FROM holdings_tracker.holdings WHERE id = ?",
            HOLDING_COLUMNS
        ));
        let result = self.session.query(query, (id,)).await.map_err(db_err)?;
        match result.rows.unwrap_or_default().first() {
            Some(row) => holding_from_row(row).map(Some),
            None => Ok(None),
        }
    }

    async fn insert_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        let query = Query::new("INSERT INTO holdings_tracker.holdings (user_id, ticker, id, quantity, avg_cost_basis, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS");
        let result = self
            .session
            .query(
                query,
                (
                    holding.user_id.as_str(),
                    holding.ticker.as_str(),
                    holding.id.as_str(),
                    holding.quantity,
                    holding.avg_cost_basis,
                    holding.created_at.timestamp_millis(),
                    holding.updated_at.timestamp_millis(),
                ),
            )
            .await
            .map_err(db_err)?;

        let rows = result.rows.unwrap_or_default();
        match rows.first().and_then(|row| row.columns.first()) {
            Some(Some(CqlValue::Boolean(false))) => Err(StoreError::Duplicate {
                ticker: holding.ticker.clone(),
            }),
            _ => Ok(()),
        }
    }

    async fn update_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        let query = Query::new("UPDATE holdings_tracker.holdings SET quantity = ?, avg_cost_basis = ?, updated_at = ? WHERE user_id = ? AND ticker = ?");
        self.session
            .query(
                query,
                (
                    holding.quantity,
                    holding.avg_cost_basis,
                    holding.updated_at.timestamp_millis(),
                    holding.user_id.as_str(),
                    holding.ticker.as_str(),
                ),
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        let query =
            Query::new("DELETE FROM holdings_tracker.holdings WHERE user_id = ? AND ticker = ?");
        self.session
            .query(query, (holding.user_id.as_str(), holding.ticker.as_str()))
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

/// Process-local store keyed like the Scylla table, by (user_id, ticker).
#[derive(Default)]
pub struct MemoryStore {
    holdings: RwLock<HashMap<(String, String), Holding>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(holding: &Holding) -> (String, String) {
    (holding.user_id.clone(), holding.ticker.clone())
}

#[async_trait]
impl HoldingStore for MemoryStore {
    async fn list_holdings(&self, user_id: &str) -> Result<Vec<Holding>, StoreError> {
        let holdings = self.holdings.read().await;
        let mut list: Vec<Holding> = holdings
            .values()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(list)
    }

    async fn get_holding(&self, id: &str) -> Result<Option<Holding>, StoreError> {
        let holdings = self.holdings.read().await;
        Ok(holdings.values().find(|h| h.id == id).cloned())
    }

    async fn insert_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        let mut holdings = self.holdings.write().await;
        if holdings.contains_key(&key(holding)) {
            return Err(StoreError::Duplicate {
                ticker: holding.ticker.clone(),
            });
        }
        holdings.insert(key(holding), holding.clone());
        Ok(())
    }

    async fn update_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        let mut holdings = self.holdings.write().await;
        match holdings.get_mut(&key(holding)) {
            Some(stored) => {
                *stored = holding.clone();
                Ok(())
            }
            None => Err(StoreError::Database(format!(
                "no holding for {} to update",
                holding.ticker
            ))),
        }
    }

    async fn delete_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        self.holdings.write().await.remove(&key(holding));
        Ok(())
    }
}
