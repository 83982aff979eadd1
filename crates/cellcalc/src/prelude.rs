//! Prelude module - common imports for cellcalc users
//!
//! ```rust
//! use cellcalc::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellAddress,
    CellRange,
    CellValue,
    // Evaluation types
    Engine,
    EngineOptions,
    // Error types
    Error,
    ErrorKind,
    ExecuteOptions,
    ExecutionReport,
    Formula,
    FormulaError,
    Resolver,
    Result,
    SheetReference,
    Value,
    // Main types
    Workbook,
    // Extension traits
    WorkbookEvaluationExt,
    Worksheet,
};
