#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::DocumentError;

/// Last row of a worksheet.
pub const MAX_ROW: u32 = 1_048_576;
/// Last column of a worksheet (`XFD`).
pub const MAX_COL: u32 = 16_384;

/// Converts a 1-based column index into its spreadsheet letters (`1` -> `A`,
/// `28` -> `AB`).
pub fn column_letter(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts column letters into a 1-based column index. Returns `None` for
/// anything that is not a run of ASCII letters.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        c.is_ascii_alphabetic()
            .then(|| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
/// A single cell coordinate, 1-based in both axes.
pub struct CellAddress {
    /// Row number (ordered first so addresses sort row-major).
    pub row: u32,
    /// Column index.
    pub col: u32,
}

impl CellAddress {
    /// Creates an address from a 1-based column index and row number.
    pub fn new(col: u32, row: u32) -> Self {
        Self { row, col }
    }

    /// Column letters of this address.
    pub fn column_letter(&self) -> String {
        column_letter(self.col)
    }
}

impl FromStr for CellAddress {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| DocumentError::InvalidAddress(s.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);
        let row = digits
            .parse::<u32>()
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| DocumentError::InvalidAddress(s.to_string()))?;
        let col =
            column_index(letters).ok_or_else(|| DocumentError::InvalidAddress(s.to_string()))?;
        Ok(Self::new(col, row))
    }
}

impl TryFrom<String> for CellAddress {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellAddress> for String {
    fn from(value: CellAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.col), self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
/// A rectangular block of cells; `start` is the top-left corner.
pub struct CellRange {
    /// Top-left corner.
    pub start: CellAddress,
    /// Bottom-right corner.
    pub end:   CellAddress,
}

impl CellRange {
    /// Creates a normalized range from two corners given in any order.
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.col.min(b.col), a.row.min(b.row)),
            end:   CellAddress::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    /// Whether `addr` falls inside this range.
    pub fn contains(&self, addr: &CellAddress) -> bool {
        (self.start.col..=self.end.col).contains(&addr.col)
            && (self.start.row..=self.end.row).contains(&addr.row)
    }

    /// Whether `other` lies entirely inside this range.
    pub fn covers(&self, other: &CellRange) -> bool {
        self.contains(&other.start) && self.contains(&other.end)
    }

    /// Iterates all addresses row by row, left to right.
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| CellAddress::new(col, row))
        })
    }

    /// Parses a space separated `sqref` list such as `F6:F35 H6:H35`. Pieces
    /// that do not parse are skipped.
    pub fn parse_list(sqref: &str) -> Vec<CellRange> {
        sqref
            .split_whitespace()
            .filter_map(|piece| piece.parse().ok())
            .collect()
    }
}

impl FromStr for CellRange {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Sheet-qualified refs (`Datos!$C$5:$K$35`) keep only the coordinates.
        let coords = s.rsplit_once('!').map_or(s, |(_, c)| c);
        match coords.split_once(':') {
            Some((a, b)) => {
                // `F:F` spans every row, `6:6` every column
                if let (Some(first), Some(last)) = (column_only(a), column_only(b)) {
                    return Ok(Self::new(
                        CellAddress::new(first, 1),
                        CellAddress::new(last, MAX_ROW),
                    ));
                }
                if let (Some(first), Some(last)) = (row_only(a), row_only(b)) {
                    return Ok(Self::new(
                        CellAddress::new(1, first),
                        CellAddress::new(MAX_COL, last),
                    ));
                }
                Ok(Self::new(a.parse()?, b.parse()?))
            }
            None => {
                let single: CellAddress = coords.parse()?;
                Ok(Self::new(single, single))
            }
        }
    }
}

/// Column index of a bare column reference such as `$F`.
fn column_only(piece: &str) -> Option<u32> {
    column_index(piece.trim().trim_start_matches('$')).filter(|c| *c <= MAX_COL)
}

/// Row number of a bare row reference such as `$6`.
fn row_only(piece: &str) -> Option<u32> {
    piece
        .trim()
        .trim_start_matches('$')
        .parse::<u32>()
        .ok()
        .filter(|r| (1..=MAX_ROW).contains(r))
}

impl TryFrom<String> for CellRange {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellRange> for String {
    fn from(value: CellRange) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.row == 1 && self.end.row == MAX_ROW {
            write!(f, "{}:{}", column_letter(self.start.col), column_letter(self.end.col))
        } else if self.start.col == 1 && self.end.col == MAX_COL {
            write!(f, "{}:{}", self.start.row, self.end.row)
        } else if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
