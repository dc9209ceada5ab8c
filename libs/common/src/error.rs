//! Custom error types for the common library
//!
//! This module defines the storage error type shared by every service. Raw
//! driver errors stay inside it; callers only branch on the variant.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A unique constraint was violated; carries the offending field
    #[error("Duplicate value for {field}")]
    Conflict { field: String },

    /// A stored value could not be mapped back into a domain type
    #[error("Failed to decode stored value: {0}")]
    Decode(String),
}

impl DatabaseError {
    /// Build a conflict error for the given field
    pub fn conflict(field: impl Into<String>) -> Self {
        DatabaseError::Conflict {
            field: field.into(),
        }
    }

    /// Translate a query error, mapping unique violations to `Conflict`
    ///
    /// Constraint names follow the `<table>_<field>_key` convention used by
    /// the migrations, so the field can be recovered from the name.
    pub fn from_query(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = db_err
                    .constraint()
                    .map(field_from_constraint)
                    .unwrap_or_else(|| "unknown".to_string());
                return DatabaseError::Conflict { field };
            }
        }
        DatabaseError::Query(err)
    }

    /// Whether this error is a uniqueness conflict on `field`
    pub fn is_conflict_on(&self, field: &str) -> bool {
        matches!(self, DatabaseError::Conflict { field: f } if f == field)
    }
}

fn field_from_constraint(constraint: &str) -> String {
    match constraint {
        "accounts_username_key" => "username",
        "accounts_employee_id_key" => "employee_id",
        "employees_pkey" => "employee_id",
        "employees_email_key" => "email",
        "attendance_records_employee_date_key" => "work_date",
        "payroll_records_employee_period_key" => "pay_period",
        "sessions_token_hash_key" => "token_hash",
        other => other,
    }
    .to_string()
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_names_map_to_fields() {
        assert_eq!(field_from_constraint("accounts_username_key"), "username");
        assert_eq!(field_from_constraint("employees_email_key"), "email");
        assert_eq!(
            field_from_constraint("attendance_records_employee_date_key"),
            "work_date"
        );
        assert_eq!(field_from_constraint("something_else"), "something_else");
    }

    #[test]
    fn test_is_conflict_on() {
        let err = DatabaseError::conflict("username");
        assert!(err.is_conflict_on("username"));
        assert!(!err.is_conflict_on("email"));
        assert!(!DatabaseError::Decode("x".into()).is_conflict_on("username"));
    }
}
