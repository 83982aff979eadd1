//! Error types for cellcalc-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cellcalc-core
#[derive(Debug, Error)]
pub enum Error {
    /// Reference text that is empty or structurally malformed
    /// (missing cell part, stray `!` or `:`)
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Column letters or row digits that do not form a cell
    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Formula text could not be parsed
    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    /// Formula evaluation was aborted
    #[error("Formula evaluation error: {0}")]
    Evaluation(String),
}

impl Error {
    /// Whether the error comes from the coordinates of an address rather than its shape
    pub fn is_coordinate_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCellReference(_)
                | Error::RowOutOfBounds(..)
                | Error::ColumnOutOfBounds(..)
                | Error::SheetNotFound(_)
        )
    }
}
