use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{debug, instrument};

use super::sheet_extractor::SheetBatch;
use super::sheet_layout::{CellRef, SheetLayout};
use crate::db::VehicleRecord;
use crate::utils::{date_to_serial, format_optional_date, parse_display_date};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Column headers of the inventory export, in column order
pub const EXPORT_COLUMNS: [&str; 18] = [
    "FrameNumber",
    "Marque",
    "DateArrivage",
    "MODELE",
    "NFacture",
    "Color",
    "revendeur",
    "client",
    "DateVenteRevendeur",
    "DateVenteClient",
    "cnie",
    "observation",
    "DateNaissance",
    "Sexe",
    "VilleVente",
    "ProvinceVente",
    "VilleAffectation",
    "ProvinceAffectation",
];

/// Write a batch back into the delivery-sheet layout
///
/// Labels go in the cell directly above each value. Re-extracting the result
/// with the same layout yields the same batch.
#[instrument(skip(layout, batch), fields(rows = batch.len()))]
pub fn write_batch(layout: &SheetLayout, batch: &SheetBatch) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Livraison")?;

    let label = Format::new().set_bold();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");

    write_label(worksheet, layout.arrival_date.cell, "Date Arrivage", &label)?;
    write_label(worksheet, layout.invoice_ref.cell, "N° Facture", &label)?;
    write_label(worksheet, layout.model.cell, "Modèle", &label)?;
    write_label(worksheet, layout.brand.cell, "Marque", &label)?;
    write_label(worksheet, layout.frame_number.cell, "N° Châssis", &label)?;
    write_label(worksheet, layout.color.cell, "Couleur", &label)?;

    let arrival = layout.arrival_date.cell;
    match parse_display_date(&batch.arrival_date) {
        Some(date) => {
            worksheet.write_number_with_format(
                arrival.row,
                arrival.col,
                date_to_serial(date),
                &date_format,
            )?;
        }
        None => write_text(worksheet, arrival, &batch.arrival_date)?,
    }

    write_text(worksheet, layout.invoice_ref.cell, &batch.invoice_ref)?;
    write_text(worksheet, layout.model.cell, &batch.model)?;
    write_text(worksheet, layout.brand.cell, &batch.brand)?;

    for (offset, row) in batch.rows.iter().enumerate() {
        let offset = offset as u32;
        write_row_cell(worksheet, layout.frame_number.cell.below(offset), &row.frame_number)?;
        write_row_cell(worksheet, layout.color.cell.below(offset), &row.color)?;
    }

    worksheet.set_column_width(layout.frame_number.cell.col, 22)?;

    let buffer = workbook.save_to_buffer()?;
    debug!("Wrote delivery sheet ({} bytes)", buffer.len());
    Ok(buffer)
}

/// Write inventory records as a flat table, one record per row
///
/// Dates are rendered as `DD/MM/YYYY` text; absent values leave the cell blank.
#[instrument(skip(records), fields(count = records.len()))]
pub fn write_records(records: &[VehicleRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Motorcycles")?;

    let header = Format::new().set_bold();
    for (col, name) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, value) in export_row(record).iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(row, col as u16, value)?;
            }
        }
    }

    worksheet.set_column_width(0, 22)?;

    let buffer = workbook.save_to_buffer()?;
    debug!("Wrote inventory export ({} bytes)", buffer.len());
    Ok(buffer)
}

/// Cell values of one export row, aligned with [`EXPORT_COLUMNS`]
pub fn export_row(record: &VehicleRecord) -> [String; 18] {
    let d = &record.details;
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        record.frame_number.clone(),
        text(&d.brand),
        format_optional_date(d.arrival_date),
        text(&d.model),
        text(&d.invoice_ref),
        text(&d.color),
        text(&d.dealer),
        text(&d.client),
        format_optional_date(d.dealer_sale_date),
        format_optional_date(d.client_sale_date),
        text(&d.national_id),
        text(&d.observation),
        format_optional_date(d.birth_date),
        text(&d.gender),
        text(&d.sale_city),
        text(&d.sale_province),
        text(&d.assignment_city),
        text(&d.assignment_province),
    ]
}

fn write_label(
    worksheet: &mut Worksheet,
    cell: CellRef,
    text: &str,
    format: &Format,
) -> Result<(), XlsxError> {
    if let Some(row) = cell.row.checked_sub(1) {
        worksheet.write_string_with_format(row, cell.col, text, format)?;
    }
    Ok(())
}

fn write_text(worksheet: &mut Worksheet, cell: CellRef, text: &str) -> Result<(), XlsxError> {
    if !text.is_empty() {
        worksheet.write_string(cell.row, cell.col, text)?;
    }
    Ok(())
}

/// Row cells are always present so the extractor's scan does not stop early.
/// Extraction trims values, so a single space reads back as "".
fn write_row_cell(worksheet: &mut Worksheet, cell: CellRef, text: &str) -> Result<(), XlsxError> {
    let text = if text.trim().is_empty() { " " } else { text };
    worksheet.write_string(cell.row, cell.col, text)?;
    Ok(())
}
