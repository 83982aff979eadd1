//! Cell address, range and sheet-qualified reference types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;

/// A cell address (e.g., "A1", "$B$2")
///
/// Columns use letters (A-XFD) and rows use 1-based numbers. The `$` markers are
/// accepted and remembered but carry no meaning for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use cellcalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    ///
    /// let addr = CellAddress::parse("$C$10").unwrap();
    /// assert_eq!((addr.row, addr.col), (9, 2));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let bad = |why: &str| Error::InvalidCellReference(format!("{} in '{}'", why, text));
        if text.is_empty() {
            return Err(Error::InvalidCellReference("empty cell reference".into()));
        }

        let (col_absolute, rest) = match text.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(split);
        if letters.is_empty() {
            return Err(bad("no column letters"));
        }
        let col = Self::letters_to_column(letters)?;

        let (row_absolute, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad("invalid row number"));
        }
        let row = match digits.parse::<u32>() {
            Ok(0) => return Err(bad("row number must be >= 1")),
            Ok(n) if n <= MAX_ROWS => n - 1,
            Ok(n) => return Err(Error::RowOutOfBounds(n - 1, MAX_ROWS - 1)),
            Err(_) => return Err(Error::RowOutOfBounds(u32::MAX, MAX_ROWS - 1)),
        };

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Column letters for a 0-based index (0 = A, 25 = Z, 26 = AA)
    pub fn column_to_letters(col: u16) -> String {
        let mut n = u32::from(col) + 1;
        let mut out = String::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            out.insert(0, char::from(b'A' + rem as u8));
            n = (n - 1) / 26;
        }
        out
    }

    /// 0-based index for column letters, case-insensitive
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidCellReference("empty column letters".into()));
        }

        letters
            .chars()
            .try_fold(0u32, |acc, c| {
                if !c.is_ascii_alphabetic() {
                    return Err(Error::InvalidCellReference(format!(
                        "invalid column letter '{}'",
                        c
                    )));
                }
                let next = acc * 26 + u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
                if next > u32::from(MAX_COLS) {
                    return Err(Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1));
                }
                Ok(next)
            })
            .map(|n| (n - 1) as u16)
    }

    /// Format as A1-style string (without `$` markers)
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollar = |absolute: bool| if absolute { "$" } else { "" };
        write!(
            f,
            "{}{}{}{}",
            dollar(self.col_absolute),
            Self::column_to_letters(self.col),
            dollar(self.row_absolute),
            self.row + 1
        )
    }
}

/// A rectangular block of cells, normalized so `start` is top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Range spanning two corners given in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Every address in the block, row-major
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> {
        let (start, end) = (self.start, self.end);
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellAddress::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.start.to_a1_string())?;
        if self.start != self.end {
            write!(f, ":{}", self.end.to_a1_string())?;
        }
        Ok(())
    }
}

/// A cell or range reference with an optional sheet qualifier
///
/// Grammar: `[Sheet!]CellRef` or `[Sheet!]CellRef:CellRef`. Sheet names that contain
/// spaces or punctuation may be single-quoted (`'My Sheet'!A1`), with `''` standing
/// for a literal quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetReference {
    /// Explicit sheet name, if the reference was qualified
    pub sheet: Option<String>,
    /// The referenced block; a single cell is a 1x1 range
    pub range: CellRange,
    /// Whether the text used the `A1:B2` range form
    pub is_range: bool,
}

impl SheetReference {
    /// Parse a reference
    ///
    /// Structural problems (empty text, empty sheet or cell part, more than one `:`)
    /// are [`Error::InvalidAddress`]; bad coordinates keep the error from
    /// [`CellAddress::parse`].
    ///
    /// ```
    /// use cellcalc_core::SheetReference;
    ///
    /// let r = SheetReference::parse("Discounts!A2:B6").unwrap();
    /// assert_eq!(r.sheet.as_deref(), Some("Discounts"));
    /// assert_eq!((r.range.row_count(), r.range.col_count()), (5, 2));
    ///
    /// let r = SheetReference::parse("'Q1 Data'!C3").unwrap();
    /// assert_eq!(r.sheet.as_deref(), Some("Q1 Data"));
    /// assert!(!r.is_range);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let structural = |why: &str| Error::InvalidAddress(format!("{} in '{}'", why, text));
        if text.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let (sheet, cells) = match text.rsplit_once('!') {
            Some((sheet, cells)) => {
                let sheet = Self::unquote_sheet(sheet).ok_or_else(|| structural("bad sheet name"))?;
                (Some(sheet), cells)
            }
            None => (None, text),
        };
        if cells.trim().is_empty() {
            return Err(structural("missing cell"));
        }

        let corners: Vec<&str> = cells.split(':').map(str::trim).collect();
        let (range, is_range) = match corners.as_slice() {
            [single] => (CellRange::single(CellAddress::parse(single)?), false),
            [a, b] if a.is_empty() || b.is_empty() => return Err(structural("incomplete range")),
            [a, b] => (
                CellRange::new(CellAddress::parse(a)?, CellAddress::parse(b)?),
                true,
            ),
            _ => return Err(structural("too many ':'")),
        };

        Ok(Self {
            sheet,
            range,
            is_range,
        })
    }

    /// Top-left cell of the reference
    pub fn first_cell(&self) -> CellAddress {
        self.range.start
    }

    fn unquote_sheet(raw: &str) -> Option<String> {
        let raw = raw.trim();
        let name = match raw.strip_prefix('\'') {
            Some(rest) => rest.strip_suffix('\'')?.replace("''", "'"),
            None => raw.to_string(),
        };
        (!name.is_empty() && !name.contains('!')).then_some(name)
    }
}

impl fmt::Display for SheetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            let plain = sheet
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
            if plain {
                write!(f, "{}!", sheet)?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        if self.is_range {
            write!(
                f,
                "{}:{}",
                self.range.start.to_a1_string(),
                self.range.end.to_a1_string()
            )
        } else {
            f.write_str(&self.range.start.to_a1_string())
        }
    }
}
