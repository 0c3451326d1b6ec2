//! Delivery-sheet import and spreadsheet export

pub mod sheet_extractor;
pub mod sheet_layout;
pub mod sheet_writer;

// Re-export commonly used items
pub use sheet_extractor::{SheetBatch, SheetError, SheetExtractor, SheetRow};
pub use sheet_layout::{CellRef, FieldSpec, LayoutError, SheetField, SheetLayout};
pub use sheet_writer::{write_batch, write_records, XLSX_CONTENT_TYPE};
