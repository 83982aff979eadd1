//! Cell-related types
//!
//! This module contains:
//! - [`CellValue`] - The content stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangular block of cells (e.g., "A1:B10")
//! - [`SheetReference`] - A range with an optional sheet qualifier (e.g., "Discounts!A2:B6")

mod address;
mod value;

pub use address::{CellAddress, CellRange, SheetReference};
pub use value::CellValue;
