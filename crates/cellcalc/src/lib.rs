//! # cellcalc
//!
//! A spreadsheet formula compiler and stack-based evaluator.
//!
//! Formula text is tokenized, built into a syntax tree that respects operator
//! precedence, and evaluated depth-first over an operand stack. Cell references
//! are read through a [`Resolver`]; a [`Workbook`] is the in-memory one.
//!
//! ## Features
//!
//! - Infix arithmetic and comparisons with n-ary operator nodes
//! - `IF` that only evaluates the branch it takes
//! - Cross-sheet references and ranges (`Discounts!A2:B6`)
//! - Formulas in referenced cells, with cycle and depth guards
//! - Built-in math, logical, lookup and statistical functions
//!
//! ## Example
//!
//! ```rust
//! use cellcalc::prelude::*;
//!
//! let mut workbook = Workbook::with_sheets(["Input", "Discounts"]).unwrap();
//! let discounts = workbook.worksheet_mut(1).unwrap();
//! discounts.set_cell_value("A1", 1.0).unwrap();
//! discounts.set_cell_value("B1", 0.5).unwrap();
//! discounts.set_cell_value("A2", 2.0).unwrap();
//! discounts.set_cell_value("B2", 1.5).unwrap();
//!
//! let value = workbook
//!     .evaluate_formula("=VLOOKUP(2, Discounts!A1:B2, 2, FALSE) * 2", "Input")
//!     .unwrap();
//! assert_eq!(value, Value::Number(3.0));
//! ```

pub mod evaluation;
pub mod prelude;

// Re-export evaluation types
pub use evaluation::{ExecuteOptions, ExecutionReport, WorkbookEvaluationExt};

// Re-export core types
pub use cellcalc_core::{
    CellAddress, CellRange, CellValue, Error, Result, SheetReference, Workbook, Worksheet,
    MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export formula types
pub use cellcalc_formula::{
    builtin, parse_formula, Engine, EngineOptions, ErrorKind, Formula, FormulaError,
    FormulaResult, FunctionLibrary, FunctionRegistry, Node, NodeKind, RawCell, RawRange,
    Resolver, Value,
};
