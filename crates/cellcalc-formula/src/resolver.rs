//! Cell and range resolution
//!
//! The evaluator never touches worksheets directly; it asks a [`Resolver`] for
//! the raw contents behind an address. The sheet context is always passed in
//! explicitly, and a sheet-qualified address overrides it.

use cellcalc_core::{CellValue, SheetReference, Workbook};

use crate::error::ResolveError;

/// Raw contents of one cell
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    /// Name of the sheet the cell lives on
    pub sheet: String,
    /// Canonical A1 address without `$` markers
    pub address: String,
    /// Literal text; empty for formula cells and empty cells
    pub value: String,
    /// Formula text including the leading `=`, if the cell holds one
    pub formula: Option<String>,
}

impl RawCell {
    /// `Sheet!A1`, used to identify the cell across sheets
    pub fn qualified_address(&self) -> String {
        format!("{}!{}", self.sheet, self.address)
    }
}

/// A rectangular block of cells, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct RawRange {
    pub cells: Vec<RawCell>,
    pub row_count: usize,
    pub col_count: usize,
}

impl RawRange {
    /// Cells grouped by row
    pub fn rows(&self) -> impl Iterator<Item = &[RawCell]> {
        self.cells.chunks(self.col_count.max(1))
    }
}

/// Source of cell contents for evaluation
pub trait Resolver {
    /// Sheet used for unqualified addresses when the caller gives no context
    fn default_sheet(&self) -> String;

    /// Read one cell; a range address reads its top-left cell
    fn get_cell(&self, address: &str, sheet: &str) -> Result<RawCell, ResolveError>;

    /// Read a rectangular block
    fn get_range(&self, address: &str, sheet: &str) -> Result<RawRange, ResolveError>;

    /// Write raw text into a cell
    ///
    /// Text starting with `=` is stored as a formula.
    fn set_cell(&mut self, address: &str, sheet: &str, raw: &str) -> Result<(), ResolveError>;
}

impl Resolver for Workbook {
    fn default_sheet(&self) -> String {
        self.first_sheet_name().unwrap_or("Sheet1").to_string()
    }

    fn get_cell(&self, address: &str, sheet: &str) -> Result<RawCell, ResolveError> {
        let reference = SheetReference::parse(address)?;
        let (sheet_name, worksheet) = lookup_sheet(self, &reference, sheet)?;
        let cell = reference.first_cell();
        Ok(raw_cell(
            sheet_name,
            cell.to_a1_string(),
            worksheet.cell_at(cell.row, cell.col),
        ))
    }

    fn get_range(&self, address: &str, sheet: &str) -> Result<RawRange, ResolveError> {
        let reference = SheetReference::parse(address)?;
        let (sheet_name, worksheet) = lookup_sheet(self, &reference, sheet)?;
        let range = reference.range;
        let cells = range
            .cells()
            .map(|cell| {
                raw_cell(
                    sheet_name,
                    cell.to_a1_string(),
                    worksheet.cell_at(cell.row, cell.col),
                )
            })
            .collect();
        Ok(RawRange {
            cells,
            row_count: range.row_count() as usize,
            col_count: range.col_count() as usize,
        })
    }

    fn set_cell(&mut self, address: &str, sheet: &str, raw: &str) -> Result<(), ResolveError> {
        self.set_value_at_reference(address, sheet, CellValue::from_raw(raw))?;
        Ok(())
    }
}

fn lookup_sheet<'w>(
    workbook: &'w Workbook,
    reference: &SheetReference,
    context: &str,
) -> Result<(&'w str, &'w cellcalc_core::Worksheet), ResolveError> {
    let name = reference.sheet.as_deref().unwrap_or(context);
    let worksheet = workbook
        .worksheet_by_name(name)
        .ok_or_else(|| ResolveError::AddressNotFound(format!("sheet '{}' does not exist", name)))?;
    Ok((worksheet.name(), worksheet))
}

fn raw_cell(sheet: &str, address: String, value: Option<&CellValue>) -> RawCell {
    let (value, formula) = match value {
        Some(CellValue::Formula(text)) => (String::new(), Some(text.clone())),
        Some(other) => (other.raw_text().unwrap_or_default(), None),
        None => (String::new(), None),
    };
    RawCell {
        sheet: sheet.to_string(),
        address,
        value,
        formula,
    }
}
