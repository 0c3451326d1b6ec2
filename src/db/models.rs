use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::utils::{non_blank, parse_input_date};

// Database entity models

/// One row of the `vehicles` table
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct VehicleRecord {
    /// Chassis number, the business key
    pub frame_number: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: VehicleDetails,
}

/// Every column of a vehicle except its frame number
///
/// Absent values are `None`, never empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct VehicleDetails {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub invoice_ref: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub dealer: Option<String>,
    pub client: Option<String>,
    pub dealer_sale_date: Option<NaiveDate>,
    pub client_sale_date: Option<NaiveDate>,
    pub national_id: Option<String>,
    pub observation: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub sale_city: Option<String>,
    pub sale_province: Option<String>,
    pub assignment_city: Option<String>,
    pub assignment_province: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    pub login: String,
    pub display_name: String,
    pub password_hash: String,
    /// Raw access right as stored, e.g. "admin" or "consul"
    pub droit: String,
}

// API request DTOs

/// Vehicle fields as submitted by the edit and manual-entry forms
///
/// Dates are free text (`DD/MM/YYYY`, `DD/MM/YY` or `YYYY-MM-DD`); blank
/// strings clear a field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct VehicleInput {
    pub frame_number: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub invoice_ref: Option<String>,
    pub arrival_date: Option<String>,
    pub dealer: Option<String>,
    pub client: Option<String>,
    pub dealer_sale_date: Option<String>,
    pub client_sale_date: Option<String>,
    pub national_id: Option<String>,
    pub observation: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub sale_city: Option<String>,
    pub sale_province: Option<String>,
    pub assignment_city: Option<String>,
    pub assignment_province: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value {value:?} for {field}")]
pub struct FieldError {
    pub field: &'static str,
    pub value: String,
}

impl VehicleInput {
    /// Normalized frame number, `None` when missing or blank
    pub fn frame_number(&self) -> Option<String> {
        non_blank(self.frame_number.clone())
    }

    /// Validate dates and normalize blank text into a storable [`VehicleDetails`]
    pub fn into_details(self) -> Result<VehicleDetails, FieldError> {
        Ok(VehicleDetails {
            brand: non_blank(self.brand),
            model: non_blank(self.model),
            color: non_blank(self.color),
            invoice_ref: non_blank(self.invoice_ref),
            arrival_date: input_date("arrival_date", self.arrival_date)?,
            dealer: non_blank(self.dealer),
            client: non_blank(self.client),
            dealer_sale_date: input_date("dealer_sale_date", self.dealer_sale_date)?,
            client_sale_date: input_date("client_sale_date", self.client_sale_date)?,
            national_id: non_blank(self.national_id),
            observation: non_blank(self.observation),
            birth_date: input_date("birth_date", self.birth_date)?,
            gender: non_blank(self.gender),
            sale_city: non_blank(self.sale_city),
            sale_province: non_blank(self.sale_province),
            assignment_city: non_blank(self.assignment_city),
            assignment_province: non_blank(self.assignment_province),
        })
    }
}

fn input_date(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, FieldError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_input_date(&raw).map_err(|_| FieldError { field, value: raw }),
    }
}
