//! Shared date helpers for the inventory service
//!
//! Three date representations meet in this service:
//! - spreadsheet serial numbers (day counts read from delivery sheets)
//! - the display format `DD/MM/YYYY` used in sheets and exports
//! - `NaiveDate`, the storage format persisted in the `vehicles` table

use chrono::{Duration, NaiveDate};

/// Display format used for arrival dates in batches and for exported sheets
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Day 0 of the spreadsheet serial calendar.
///
/// The spreadsheet convention counts from 1900-01-01 as day 1 but also counts a
/// non-existent 1900-02-29, so every date after February 1900 lines up with an epoch
/// one day earlier than the nominal 1899-12-31.
pub fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("1899-12-30 is a valid date")
}

/// Convert a spreadsheet serial number into a calendar date
///
/// Only the whole-day part of the serial is used. Negative, NaN and
/// out-of-range serials yield `None`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use moto_inventory_service::utils::serial_to_date;
///
/// assert_eq!(serial_to_date(0.0), NaiveDate::from_ymd_opt(1899, 12, 30));
/// assert_eq!(serial_to_date(1.0), NaiveDate::from_ymd_opt(1899, 12, 31));
/// assert_eq!(serial_to_date(45000.75), NaiveDate::from_ymd_opt(2023, 3, 15));
/// assert_eq!(serial_to_date(-3.0), None);
/// ```
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > i32::MAX as f64 {
        return None;
    }
    let days = serial.floor() as i64;
    serial_epoch().checked_add_signed(Duration::days(days))
}

/// Inverse of [`serial_to_date`], used when writing sheets in the import layout
pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - serial_epoch()).num_days() as f64
}

/// Render a date as `DD/MM/YYYY`
///
/// ```
/// use chrono::NaiveDate;
/// use moto_inventory_service::utils::format_display_date;
///
/// let date = NaiveDate::from_ymd_opt(2023, 3, 5).unwrap();
/// assert_eq!(format_display_date(date), "05/03/2023");
/// ```
pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Render an optional date, absent dates become an empty string
pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_display_date).unwrap_or_default()
}

/// Parse a strict `DD/MM/YYYY` display date (four-digit year)
pub fn parse_display_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let (_, year) = trimmed.rsplit_once('/')?;
    if year.len() != 4 {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DISPLAY_DATE_FORMAT).ok()
}

/// Parse a date typed in an edit form
///
/// Accepts `DD/MM/YYYY`, `DD/MM/YY` and ISO `YYYY-MM-DD`. Blank input means the
/// field is cleared and yields `Ok(None)`; anything else is an error.
///
/// ```
/// use chrono::NaiveDate;
/// use moto_inventory_service::utils::parse_input_date;
///
/// let expected = NaiveDate::from_ymd_opt(2024, 7, 1);
/// assert_eq!(parse_input_date("01/07/2024").unwrap(), expected);
/// assert_eq!(parse_input_date("01/07/24").unwrap(), expected);
/// assert_eq!(parse_input_date("2024-07-01").unwrap(), expected);
/// assert_eq!(parse_input_date("  ").unwrap(), None);
/// assert!(parse_input_date("July 1st").is_err());
/// ```
pub fn parse_input_date(value: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some((_, year)) = trimmed.rsplit_once('/') {
        let format = if year.len() == 2 {
            "%d/%m/%y"
        } else {
            DISPLAY_DATE_FORMAT
        };
        return NaiveDate::parse_from_str(trimmed, format).map(Some);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(Some)
}

/// Normalize optional text at the storage boundary: blank strings become `None`
///
/// ```
/// use moto_inventory_service::utils::non_blank;
///
/// assert_eq!(non_blank(Some("  Rouge ".to_string())), Some("Rouge".to_string()));
/// assert_eq!(non_blank(Some("   ".to_string())), None);
/// assert_eq!(non_blank(None), None);
/// ```
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
