// src/service.rs
use crate::db::HoldingStore;
use crate::error::ApiError;
use crate::importer::reconcile::{self, Action, ImportTally, PlannedRow};
use crate::importer::{self, ParsedHoldings};
use crate::models::{
    Holding, HoldingCreate, HoldingImportPreview, HoldingImportResult, HoldingUpdate,
    ImportStatus,
};
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;

pub struct HoldingService {
    store: Arc<dyn HoldingStore>,
}

impl HoldingService {
    pub fn new(store: Arc<dyn HoldingStore>) -> Self {
        HoldingService { store }
    }

    pub async fn create(&self, user_id: &str, data: HoldingCreate) -> Result<Holding, ApiError> {
        let holding = Holding::new(
            user_id,
            &data.ticker.trim().to_uppercase(),
            data.quantity,
            data.avg_cost_basis,
        );
        self.store.insert_holding(&holding).await?;
        info!("Created holding {} for user {}", holding.ticker, user_id);
        Ok(holding)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Holding>, ApiError> {
        Ok(self.store.list_holdings(user_id).await?)
    }

    /// Fetches a holding and checks that it belongs to `user_id`.
    pub async fn get(&self, user_id: &str, id: &str) -> Result<Holding, ApiError> {
        let holding = self
            .store
            .get_holding(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Holding not found".to_string()))?;
        if holding.user_id != user_id {
            return Err(ApiError::Forbidden(
                "Not authorized to access this holding".to_string(),
            ));
        }
        Ok(holding)
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        data: HoldingUpdate,
    ) -> Result<Holding, ApiError> {
        let current = self.get(user_id, id).await?;
        let mut updated = current.clone();
        if let Some(quantity) = data.quantity {
            updated.quantity = quantity;
        }
        if let Some(cost) = data.avg_cost_basis {
            updated.avg_cost_basis = cost;
        }
        updated.updated_at = Utc::now();

        match data.ticker.map(|t| t.trim().to_uppercase()) {
            // the ticker is part of the storage key, so a rename is insert + delete
            Some(ticker) if ticker != current.ticker => {
                updated.ticker = ticker;
                self.store.insert_holding(&updated).await?;
                if let Err(e) = self.store.delete_holding(&current).await {
                    // drop the new row so the id is not stored twice
                    if let Err(undo) = self.store.delete_holding(&updated).await {
                        error!(
                            "Rename of holding {} left rows for both {} and {}: {}",
                            current.id, current.ticker, updated.ticker, undo
                        );
                    }
                    return Err(e.into());
                }
            }
            _ => self.store.update_holding(&updated).await?,
        }
        Ok(updated)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), ApiError> {
        let holding = self.get(user_id, id).await?;
        self.store.delete_holding(&holding).await?;
        info!("Deleted holding {} for user {}", holding.ticker, user_id);
        Ok(())
    }

    pub async fn preview_import(
        &self,
        user_id: &str,
        content: &str,
    ) -> Result<HoldingImportPreview, ApiError> {
        let parsed = importer::parse_holdings(content);
        let existing = self.store.list_holdings(user_id).await?;
        let plan = reconcile::reconcile(&parsed.holdings, &existing);
        Ok(reconcile::preview(&plan, parsed.errors))
    }

    pub async fn apply_import(
        &self,
        user_id: &str,
        content: &str,
    ) -> Result<HoldingImportResult, ApiError> {
        let ParsedHoldings { holdings, errors } = importer::parse_holdings(content);
        if holdings.is_empty() {
            return Err(ApiError::NoValidHoldings { errors });
        }

        let existing = self.store.list_holdings(user_id).await?;
        let plan = reconcile::reconcile(&holdings, &existing);

        let mut tally = ImportTally::new(errors);
        for planned in &plan {
            let outcome = self.apply_row(user_id, planned).await;
            if let Err(e) = &outcome {
                warn!("Import of {} failed: {}", planned.row.ticker, e);
            }
            tally.record(&planned.row.ticker, outcome);
        }

        let result = tally.finish();
        info!(
            "Import for user {}: {} imported, {} updated, {} skipped, {} errors",
            user_id,
            result.imported,
            result.updated,
            result.skipped,
            result.errors.len()
        );
        Ok(result)
    }

    async fn apply_row(
        &self,
        user_id: &str,
        planned: &PlannedRow,
    ) -> Result<ImportStatus, crate::error::StoreError> {
        let row = &planned.row;
        match &planned.action {
            Action::Create => {
                let holding = Holding::new(user_id, &row.ticker, row.quantity, row.avg_cost_basis);
                self.store.insert_holding(&holding).await?;
            }
            Action::Update(existing) => {
                let mut holding = existing.clone();
                holding.quantity = row.quantity;
                holding.avg_cost_basis = row.avg_cost_basis;
                holding.updated_at = Utc::now();
                self.store.update_holding(&holding).await?;
            }
            Action::Skip(_) => {}
        }
        Ok(planned.status())
    }
}
