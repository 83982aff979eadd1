//! Workbook type - an ordered set of named worksheets

use crate::cell::{CellValue, SheetReference};
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Characters a sheet name may not contain
const FORBIDDEN_SHEET_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']', '!'];

/// An ordered set of uniquely named worksheets
///
/// The first worksheet is the default sheet for unqualified references. Sheet
/// names compare case-insensitively.
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
}

impl Workbook {
    /// Workbook with one worksheet named "Sheet1"
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
        }
    }

    /// Workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
        }
    }

    /// Workbook with the given sheet names, in order
    pub fn with_sheets<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::empty(), |mut wb, name| {
            wb.add_worksheet_with_name(name.as_ref())?;
            Ok(wb)
        })
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn first_sheet_name(&self) -> Option<&str> {
        self.worksheets.first().map(Worksheet::name)
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets
            .iter()
            .find(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets
            .iter_mut()
            .find(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    /// Append a worksheet and return its index
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "'{}' must be 1 to {} characters",
                name, MAX_SHEET_NAME_LEN
            )));
        }
        if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "'{}' contains '{}'",
                name, c
            )));
        }
        if self.worksheet_by_name(name).is_some() {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    /// Write a value through a possibly sheet-qualified cell reference
    ///
    /// Unqualified references land on `default_sheet`. A range reference writes
    /// its top-left cell.
    pub fn set_value_at_reference<V: Into<CellValue>>(
        &mut self,
        reference: &str,
        default_sheet: &str,
        value: V,
    ) -> Result<()> {
        let parsed = SheetReference::parse(reference)?;
        let sheet_name = parsed.sheet.as_deref().unwrap_or(default_sheet);
        let cell = parsed.first_cell();
        self.worksheet_by_name_mut(sheet_name)
            .ok_or_else(|| Error::SheetNotFound(sheet_name.to_string()))?
            .set_cell_value_at(cell.row, cell.col, value)
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
