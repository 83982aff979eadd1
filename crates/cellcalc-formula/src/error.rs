//! Formula error types
//!
//! Three layers fail in different ways:
//! - [`FormulaError`] aborts tokenizing, building or evaluating a whole formula
//! - [`ResolveError`] comes back from a [`Resolver`](crate::resolver::Resolver)
//! - [`FunctionError`] comes back from a [`FunctionLibrary`](crate::functions::FunctionLibrary)
//!
//! Only [`FormulaError`] ever reaches the caller of
//! [`Engine::evaluate`](crate::evaluator::Engine::evaluate); the other two are
//! turned into [`Value::Error`](crate::value::Value::Error) values while evaluating.
//! The exception is [`Engine::evaluate_cell`](crate::evaluator::Engine::evaluate_cell),
//! where a cell address that cannot be read is reported as [`FormulaError::Resolve`].

use thiserror::Error;

use crate::value::ErrorKind;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that abort a formula
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula text could not be split into tokens
    #[error("Tokenize error at offset {position}: {message}")]
    Tokenize { position: usize, message: String },

    /// Token stream could not be built into a tree
    #[error("Parse error: {0}")]
    Parse(String),

    /// A call names a function the library does not know
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// The operand stack was not balanced around a dispatch
    #[error("Operand stack imbalance: {0}")]
    StackImbalance(String),

    /// A cell asked for directly by address could not be read
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl FormulaError {
    /// The error kind used when this failure has to flow on as a value
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Tokenize { .. } | FormulaError::Parse(_) => ErrorKind::InvalidFormula,
            FormulaError::UnknownFunction(_) => ErrorKind::NameNotFound,
            FormulaError::StackImbalance(_) => ErrorKind::InternalStackImbalance,
            FormulaError::Resolve(err) => err.kind(),
        }
    }
}

/// Errors from reading or writing cells
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// Address text is empty or malformed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Address coordinates or sheet could not be found
    #[error("Address not found: {0}")]
    AddressNotFound(String),
}

impl ResolveError {
    /// The error kind a failed dereference turns into
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::InvalidAddress(_) => ErrorKind::InvalidAddress,
            ResolveError::AddressNotFound(_) => ErrorKind::AddressNotFound,
        }
    }
}

impl From<cellcalc_core::Error> for ResolveError {
    fn from(err: cellcalc_core::Error) -> Self {
        if err.is_coordinate_error() {
            ResolveError::AddressNotFound(err.to_string())
        } else {
            ResolveError::InvalidAddress(err.to_string())
        }
    }
}

/// Errors reported by a function implementation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    /// No function with this name
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// An argument has the wrong kind or is out of range
    #[error("Invalid argument: {0}")]
    Argument(String),
}
