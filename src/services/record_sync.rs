use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::db::{DbError, VehicleDetails, VehicleRecord, VehicleStore};
use crate::importers::SheetBatch;
use crate::utils::{non_blank, parse_display_date};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Row {position} of the batch has no frame number")]
    MissingFrameNumber { position: usize },

    #[error("Invalid arrival date {0:?}, expected DD/MM/YYYY")]
    InvalidArrivalDate(String),

    #[error(
        "Vehicle {frame_number} was rejected: {message} \
         ({committed} records were stored before the failure)"
    )]
    Constraint {
        frame_number: String,
        committed: usize,
        message: String,
    },

    #[error(
        "Failed to store vehicle {frame_number} \
         ({committed} records were stored before the failure): {source}"
    )]
    Store {
        frame_number: String,
        committed: usize,
        #[source]
        source: DbError,
    },
}

impl SyncError {
    /// Frame number of the record that stopped the sync, when there is one
    pub fn frame_number(&self) -> Option<&str> {
        match self {
            SyncError::Constraint { frame_number, .. } | SyncError::Store { frame_number, .. } => {
                Some(frame_number)
            }
            SyncError::MissingFrameNumber { .. } | SyncError::InvalidArrivalDate(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncReport {
    pub accepted_count: usize,
}

/// Persists extracted sheet batches, one insert per vehicle
///
/// Inserts are issued sequentially without a surrounding transaction. The sync
/// is fail-fast: the first rejected insert ends it, records stored before that
/// point stay stored, and nothing after it is attempted.
#[derive(Clone)]
pub struct RecordSync {
    store: Arc<dyn VehicleStore>,
}

impl RecordSync {
    pub fn new(store: Arc<dyn VehicleStore>) -> Self {
        Self { store }
    }

    /// Shape every row of the batch into a storable record
    ///
    /// Header values are shared by all rows, every other field is absent.
    /// Validation covers the whole batch before anything is written.
    pub fn build_records(batch: &SheetBatch) -> Result<Vec<VehicleRecord>, SyncError> {
        let arrival_date = if batch.arrival_date.trim().is_empty() {
            None
        } else {
            let date = parse_display_date(&batch.arrival_date)
                .ok_or_else(|| SyncError::InvalidArrivalDate(batch.arrival_date.clone()))?;
            Some(date)
        };

        let header = VehicleDetails {
            brand: non_blank(Some(batch.brand.clone())),
            model: non_blank(Some(batch.model.clone())),
            invoice_ref: non_blank(Some(batch.invoice_ref.clone())),
            arrival_date,
            ..VehicleDetails::default()
        };

        batch
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let frame_number = non_blank(Some(row.frame_number.clone()))
                    .ok_or(SyncError::MissingFrameNumber { position: idx + 1 })?;

                Ok(VehicleRecord {
                    frame_number,
                    details: VehicleDetails {
                        color: non_blank(Some(row.color.clone())),
                        ..header.clone()
                    },
                })
            })
            .collect()
    }

    #[instrument(skip(self, batch), fields(rows = batch.len(), invoice_ref = %batch.invoice_ref))]
    pub async fn sync(&self, batch: &SheetBatch) -> Result<SyncReport, SyncError> {
        let records = Self::build_records(batch)?;
        debug!("Built {} records from batch", records.len());

        let mut committed = 0;
        for record in &records {
            if let Err(e) = self.store.insert(record).await {
                error!(
                    frame_number = %record.frame_number,
                    committed,
                    error = %e,
                    "Batch sync stopped"
                );
                return Err(Self::classify(record, committed, e));
            }
            committed += 1;
        }

        info!("Stored {} vehicles from batch", committed);
        Ok(SyncReport {
            accepted_count: committed,
        })
    }

    fn classify(record: &VehicleRecord, committed: usize, err: DbError) -> SyncError {
        let frame_number = record.frame_number.clone();
        match err {
            DbError::Duplicate(_) => SyncError::Constraint {
                frame_number,
                committed,
                message: "frame number already exists".to_string(),
            },
            DbError::Rejected { message, .. } => SyncError::Constraint {
                frame_number,
                committed,
                message,
            },
            other => SyncError::Store {
                frame_number,
                committed,
                source: other,
            },
        }
    }
}
