//! # cellcalc-core
//!
//! Cell addressing and workbook storage used by the cellcalc formula engine.
//!
//! This crate provides the storage side of evaluation:
//! - [`CellAddress`], [`CellRange`] and [`SheetReference`] - A1-style addressing, optionally sheet-qualified
//! - [`CellValue`] - What a cell holds (literal or formula text)
//! - [`Workbook`], [`Worksheet`] - Named sheets of sparse cells
//!
//! ## Example
//!
//! ```rust
//! use cellcalc_core::{CellValue, SheetReference, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", 42.0).unwrap();
//! sheet.set_cell_formula("B1", "=A1*2").unwrap();
//!
//! assert_eq!(sheet.get_value("A1").unwrap(), CellValue::Number(42.0));
//!
//! let reference = SheetReference::parse("Sheet1!A1:B1").unwrap();
//! assert_eq!(reference.sheet.as_deref(), Some("Sheet1"));
//! assert_eq!(reference.range.col_count(), 2);
//! ```

pub mod cell;
pub mod error;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellRange, CellValue, SheetReference};
pub use error::{Error, Result};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
