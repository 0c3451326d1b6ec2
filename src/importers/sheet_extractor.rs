use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::sheet_layout::{CellRef, LayoutCell, LayoutError, SheetField, SheetLayout};
use crate::utils::{format_display_date, serial_to_date};

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    #[error("Workbook contains no sheets")]
    NoSheets,

    #[error("Failed to read first sheet: {0}")]
    SheetRead(String),

    #[error("Required cell {cell} ({field}) is empty")]
    MissingHeader { field: SheetField, cell: CellRef },
}

/// One vehicle line of a delivery sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SheetRow {
    pub frame_number: String,
    pub color: String,
}

/// Everything extracted from one delivery sheet
///
/// Header values are shared by every row. `arrival_date` is in display format
/// (`DD/MM/YYYY`) or empty when the sheet carries no usable serial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SheetBatch {
    pub invoice_ref: String,
    pub model: String,
    pub brand: String,
    pub arrival_date: String,
    pub rows: Vec<SheetRow>,
}

impl SheetBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads delivery sheets laid out by a [`SheetLayout`]
///
/// Only the first worksheet is read, whatever its name. Parsing is synchronous;
/// async callers should run it inside `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct SheetExtractor {
    layout: SheetLayout,
}

impl SheetExtractor {
    pub fn new(layout: SheetLayout) -> Self {
        Self { layout }
    }

    /// Extractor for the supplier delivery sheet coordinates
    pub fn standard() -> Result<Self, LayoutError> {
        Ok(Self::new(SheetLayout::standard()?))
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Extract a batch from an in-memory `.xlsx`/`.xls`/`.ods` file
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<SheetBatch, SheetError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| SheetError::WorkbookOpen(e.to_string()))?;
        let range = first_sheet(&mut workbook)?;
        self.extract_range(&range)
    }

    /// Extract a batch from a spreadsheet on disk
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn extract_path(&self, path: impl AsRef<Path>) -> Result<SheetBatch, SheetError> {
        let mut workbook =
            open_workbook_auto(path.as_ref()).map_err(|e| SheetError::WorkbookOpen(e.to_string()))?;
        let range = first_sheet(&mut workbook)?;
        self.extract_range(&range)
    }

    /// Extract a batch from an already loaded sheet
    ///
    /// # Sheet structure (standard layout):
    /// ```text
    /// B2: arrival date (spreadsheet serial number)
    /// B4: invoice reference | E4: model | F4: brand
    /// D7.. frame number     | E7.. color   (one vehicle per row)
    /// ```
    /// The row scan stops at the first row where a required cell is empty;
    /// that row and everything below it is ignored.
    pub fn extract_range(&self, range: &Range<Data>) -> Result<SheetBatch, SheetError> {
        let layout = &self.layout;

        let invoice_ref = header_text(range, SheetField::InvoiceRef, layout.invoice_ref)?;
        let model = header_text(range, SheetField::Model, layout.model)?;
        let brand = header_text(range, SheetField::Brand, layout.brand)?;
        let arrival_date = arrival_date(range, layout.arrival_date)?;

        let rows = self.extract_rows(range);

        info!(
            "Extracted {} vehicle rows (invoice={:?}, brand={:?}, model={:?}, arrival={:?})",
            rows.len(),
            invoice_ref,
            brand,
            model,
            arrival_date
        );

        Ok(SheetBatch {
            invoice_ref,
            model,
            brand,
            arrival_date,
            rows,
        })
    }

    fn extract_rows(&self, range: &Range<Data>) -> Vec<SheetRow> {
        let frame = self.layout.frame_number;
        let color = self.layout.color;
        let first_row = self.layout.first_data_row();

        let mut rows = Vec::new();

        // Nothing below the used range can hold data
        let Some((last_row, _)) = range.end() else {
            debug!("Sheet is empty, no rows to scan");
            return rows;
        };

        for row in first_row..=last_row {
            let offset = row - first_row;
            let frame_number = cell_text(range, frame.cell.below(offset));
            let color_value = cell_text(range, color.cell.below(offset));

            let incomplete = (frame.required && frame_number.is_none())
                || (color.required && color_value.is_none());
            if incomplete {
                debug!("Row {} is incomplete, stopping scan", row + 1);
                break;
            }

            rows.push(SheetRow {
                frame_number: frame_number.unwrap_or_default(),
                color: color_value.unwrap_or_default(),
            });
        }

        rows
    }
}

fn first_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> Result<Range<Data>, SheetError> {
    match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => Ok(range),
        Some(Err(e)) => Err(SheetError::SheetRead(e.to_string())),
        None => Err(SheetError::NoSheets),
    }
}

fn header_text(
    range: &Range<Data>,
    field: SheetField,
    layout_cell: LayoutCell,
) -> Result<String, SheetError> {
    match cell_text(range, layout_cell.cell) {
        Some(text) => Ok(text),
        None if layout_cell.required => Err(SheetError::MissingHeader {
            field,
            cell: layout_cell.cell,
        }),
        None => Ok(String::new()),
    }
}

fn arrival_date(range: &Range<Data>, layout_cell: LayoutCell) -> Result<String, SheetError> {
    let raw = range.get_value(layout_cell.cell.position());
    let date = raw.and_then(cell_serial).and_then(serial_to_date);

    match date {
        Some(date) => Ok(format_display_date(date)),
        None if layout_cell.required => Err(SheetError::MissingHeader {
            field: SheetField::ArrivalDate,
            cell: layout_cell.cell,
        }),
        None => {
            if let Some(value) = raw.filter(|d| !matches!(d, Data::Empty)) {
                warn!(
                    "Arrival date cell {} is not a serial number: {:?}",
                    layout_cell.cell, value
                );
            }
            Ok(String::new())
        }
    }
}

/// Text content of a cell, `None` when the cell is missing or blank
fn cell_text(range: &Range<Data>, cell: CellRef) -> Option<String> {
    let text = match range.get_value(cell.position())? {
        Data::Empty => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => float_text(dt.as_f64()),
        Data::Error(e) => e.to_string(),
    };
    Some(text)
}

/// Numeric value of a serial-date cell
fn cell_serial(data: &Data) -> Option<f64> {
    match data {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        Data::DateTime(dt) => Some(dt.as_f64()),
        _ => None,
    }
}

/// Whole numbers print without a trailing `.0` ("1001", not "1001.0")
fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}
