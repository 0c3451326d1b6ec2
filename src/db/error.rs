#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("A record with key {0} already exists")]
    Duplicate(String),

    #[error("Record {key} was rejected by the database: {message}")]
    Rejected { key: String, message: String },

    #[error("No record found for key {0}")]
    NotFound(String),
}

impl DbError {
    /// Classify a write failure for the record identified by `key`
    ///
    /// Unique violations become [`DbError::Duplicate`], other database-side
    /// rejections (check, not-null, value too long) become [`DbError::Rejected`].
    pub fn from_write(key: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DbError::Duplicate(key.to_string());
            }
            if is_data_or_integrity_error(db_err.code()) {
                return DbError::Rejected {
                    key: key.to_string(),
                    message: db_err.message().to_string(),
                };
            }
        }
        DbError::SqlxError(err)
    }
}

/// SQLSTATE classes 22 (data exception) and 23 (integrity constraint violation)
fn is_data_or_integrity_error(code: Option<std::borrow::Cow<'_, str>>) -> bool {
    code.is_some_and(|c| c.starts_with("22") || c.starts_with("23"))
}
