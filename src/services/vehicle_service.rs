use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::auth::Role;
use crate::db::{VehicleInput, VehicleRecord, VehicleStore};
use crate::importers::{write_batch, write_records, SheetBatch, SheetExtractor, SheetRow};
use crate::services::error::{ensure_can_write, ServiceError};
use crate::services::record_sync::{RecordSync, SyncReport};

#[derive(Clone)]
pub struct VehicleService {
    store: Arc<dyn VehicleStore>,
    extractor: Arc<SheetExtractor>,
    sync: RecordSync,
}

impl VehicleService {
    pub fn new(store: Arc<dyn VehicleStore>, extractor: SheetExtractor) -> Self {
        Self {
            sync: RecordSync::new(store.clone()),
            store,
            extractor: Arc::new(extractor),
        }
    }

    /// Inventory listing; blank filters list everything
    #[instrument(skip(self))]
    pub async fn list_records(&self, filter: Option<&str>) -> Result<Vec<VehicleRecord>, ServiceError> {
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        let records = self.store.list_all(filter).await?;
        debug!("Listing {} vehicles", records.len());
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn get_record(&self, frame_number: &str) -> Result<VehicleRecord, ServiceError> {
        self.store
            .get(frame_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(frame_number.to_string()))
    }

    /// Manual entry of a single vehicle
    #[instrument(skip(self, input), fields(role = %role))]
    pub async fn create_record(
        &self,
        role: Role,
        input: VehicleInput,
    ) -> Result<VehicleRecord, ServiceError> {
        ensure_can_write(role)?;

        let frame_number = input
            .frame_number()
            .ok_or_else(|| ServiceError::validation(None, "frame_number is required"))?;
        let details = input
            .into_details()
            .map_err(|e| ServiceError::invalid_field(Some(&frame_number), e))?;

        let record = VehicleRecord {
            frame_number,
            details,
        };
        self.store.insert(&record).await?;

        info!(frame_number = %record.frame_number, "Created vehicle");
        Ok(record)
    }

    /// Replace every non-key field of an existing vehicle
    ///
    /// The frame number is immutable; a body carrying a different one is
    /// rejected.
    #[instrument(skip(self, input), fields(role = %role))]
    pub async fn update_record(
        &self,
        role: Role,
        frame_number: &str,
        input: VehicleInput,
    ) -> Result<VehicleRecord, ServiceError> {
        ensure_can_write(role)?;

        if let Some(body_key) = input.frame_number() {
            if body_key != frame_number {
                return Err(ServiceError::validation(
                    Some(frame_number),
                    format!("frame_number cannot be changed (got {body_key})"),
                ));
            }
        }

        let details = input
            .into_details()
            .map_err(|e| ServiceError::invalid_field(Some(frame_number), e))?;
        self.store.update(frame_number, &details).await?;

        Ok(VehicleRecord {
            frame_number: frame_number.to_string(),
            details,
        })
    }

    #[instrument(skip(self), fields(role = %role))]
    pub async fn delete_record(&self, role: Role, frame_number: &str) -> Result<(), ServiceError> {
        ensure_can_write(role)?;
        self.store.delete(frame_number).await?;
        Ok(())
    }

    /// Parse an uploaded sheet without storing anything
    #[instrument(skip(self, bytes), fields(role = %role, size = bytes.len()))]
    pub async fn preview_import(&self, role: Role, bytes: Vec<u8>) -> Result<SheetBatch, ServiceError> {
        ensure_can_write(role)?;
        self.extract(bytes).await
    }

    /// Parse an uploaded sheet and store every vehicle in it
    #[instrument(skip(self, bytes), fields(role = %role, size = bytes.len()))]
    pub async fn import_batch(&self, role: Role, bytes: Vec<u8>) -> Result<SyncReport, ServiceError> {
        ensure_can_write(role)?;

        let batch = self.extract(bytes).await?;
        info!(
            "Importing {} vehicles (invoice {:?}, model {:?})",
            batch.len(),
            batch.invoice_ref,
            batch.model
        );

        let report = self.sync.sync(&batch).await?;
        Ok(report)
    }

    /// Whole inventory as an `.xlsx` table
    #[instrument(skip(self))]
    pub async fn export_all(&self) -> Result<Vec<u8>, ServiceError> {
        let records = self.store.list_all(None).await?;
        render_records(records).await
    }

    #[instrument(skip(self))]
    pub async fn export_record(&self, frame_number: &str) -> Result<Vec<u8>, ServiceError> {
        let record = self.get_record(frame_number).await?;
        render_records(vec![record]).await
    }

    /// Sample delivery sheet in the import layout
    pub async fn template(&self) -> Result<Vec<u8>, ServiceError> {
        let extractor = self.extractor.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            write_batch(extractor.layout(), &sample_batch())
        })
        .await??;
        Ok(bytes)
    }

    async fn extract(&self, bytes: Vec<u8>) -> Result<SheetBatch, ServiceError> {
        let extractor = self.extractor.clone();
        let batch = tokio::task::spawn_blocking(move || extractor.extract_bytes(&bytes))
            .await?
            .inspect_err(|e| warn!("Rejected upload: {}", e))?;

        debug!("Extracted {} rows", batch.len());
        Ok(batch)
    }
}

async fn render_records(records: Vec<VehicleRecord>) -> Result<Vec<u8>, ServiceError> {
    let bytes = tokio::task::spawn_blocking(move || write_records(&records)).await??;
    Ok(bytes)
}

fn sample_batch() -> SheetBatch {
    SheetBatch {
        invoice_ref: "FACT123".to_string(),
        model: "SPORT".to_string(),
        brand: "HONDA".to_string(),
        arrival_date: "15/03/2023".to_string(),
        rows: vec![
            SheetRow {
                frame_number: "FR001".to_string(),
                color: "Red".to_string(),
            },
            SheetRow {
                frame_number: "FR002".to_string(),
                color: "Blue".to_string(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_batch_round_trips_through_extractor() {
        let extractor = SheetExtractor::standard().unwrap();
        let bytes = write_batch(extractor.layout(), &sample_batch()).unwrap();

        let batch = extractor.extract_bytes(&bytes).unwrap();

        assert_eq!(batch, sample_batch());
    }
}
