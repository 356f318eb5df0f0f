#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Read-only model of a spreadsheet document.
//!
//! A [`Workbook`] is loaded once per submission with [`Workbook::open`] and
//! dropped when that submission is done. Every read is total: asking for a
//! cell that was never written returns an empty, unstyled cell.

/// Cell and range coordinates.
pub mod address;
/// Document loading errors.
mod error;
/// `styles.xml` decoding.
mod styles;
/// xlsx container decoding.
mod xlsx;

use std::{collections::BTreeMap, fmt, path::Path};

use serde::{Deserialize, Serialize};

pub use self::{
    address::{CellAddress, CellRange, column_index, column_letter},
    error::{DocumentError, DocumentResult},
};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
/// The cached value of a cell, typed the way the document stored it.
pub enum CellValue {
    /// Nothing stored.
    #[default]
    Empty,
    /// A plain number.
    Number(f64),
    /// Text, including formula string results.
    Text(String),
    /// A boolean.
    Bool(bool),
    /// A serial date: a number whose number format is a date format.
    Date(f64),
    /// An error literal such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    /// Whether the cell holds nothing, or only whitespace text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(t) => t.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the value. Numeric text (`" 30 "`, `"27,5"`) is
    /// accepted; booleans and errors are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) | CellValue::Date(n) => Some(*n),
            CellValue::Text(t) => {
                let t = t.trim();
                t.parse::<f64>()
                    .ok()
                    .or_else(|| t.replace(',', ".").parse::<f64>().ok())
                    .filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Text view of the value, as a person would read it in the cell.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) | CellValue::Date(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(t) => write!(f, "{t}"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

/// Formats a number without a trailing `.0` for whole values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Horizontal alignment as stored in SpreadsheetML.
pub enum HorizontalAlignment {
    /// No explicit alignment.
    #[default]
    General,
    /// Left
    Left,
    /// Center
    Center,
    /// Right
    Right,
    /// Fill
    Fill,
    /// Justify
    Justify,
    /// Center across selection.
    CenterContinuous,
    /// Distributed
    Distributed,
}

impl HorizontalAlignment {
    /// Parses the `horizontal` attribute of an `<alignment>` element.
    pub fn from_xml(value: &str) -> Option<Self> {
        Some(match value {
            "general" => Self::General,
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            "fill" => Self::Fill,
            "justify" => Self::Justify,
            "centerContinuous" => Self::CenterContinuous,
            "distributed" => Self::Distributed,
            _ => return None,
        })
    }
}

impl fmt::Display for HorizontalAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::General => "general",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Fill => "fill",
            Self::Justify => "justify",
            Self::CenterContinuous => "centerContinuous",
            Self::Distributed => "distributed",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Vertical alignment as stored in SpreadsheetML.
pub enum VerticalAlignment {
    /// Top
    Top,
    /// Center
    Center,
    /// Bottom, which is also what an unstyled cell reports.
    #[default]
    Bottom,
    /// Justify
    Justify,
    /// Distributed
    Distributed,
}

impl VerticalAlignment {
    /// Parses the `vertical` attribute of an `<alignment>` element.
    pub fn from_xml(value: &str) -> Option<Self> {
        Some(match value {
            "top" => Self::Top,
            "center" => Self::Center,
            "bottom" => Self::Bottom,
            "justify" => Self::Justify,
            "distributed" => Self::Distributed,
            _ => return None,
        })
    }
}

impl fmt::Display for VerticalAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
            Self::Justify => "justify",
            Self::Distributed => "distributed",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
/// Cell alignment pair.
pub struct Alignment {
    /// Horizontal alignment.
    pub horizontal: HorizontalAlignment,
    /// Vertical alignment.
    pub vertical:   VerticalAlignment,
}

impl Alignment {
    /// Centered on both axes.
    pub const CENTERED: Alignment = Alignment {
        horizontal: HorizontalAlignment::Center,
        vertical:   VerticalAlignment::Center,
    };

    /// Alignment of a cell that carries no style.
    pub const DEFAULT: Alignment = Alignment {
        horizontal: HorizontalAlignment::General,
        vertical:   VerticalAlignment::Bottom,
    };

    /// Whether both axes are centered.
    pub fn is_centered(&self) -> bool {
        *self == Self::CENTERED
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
/// A single cell: cached value plus the style facets the grader inspects.
pub struct Cell {
    /// Cached value.
    pub value:         CellValue,
    /// Number format code; `None` means `General`.
    pub number_format: Option<String>,
    /// Alignment.
    pub alignment:     Alignment,
    /// Font color as ARGB hex (`FFFF0000`), when an explicit RGB is set.
    pub font_color:    Option<String>,
    /// Literal formula text without the leading `=`.
    pub formula:       Option<String>,
}

/// The cell returned for addresses that hold nothing.
static EMPTY_CELL: Cell = Cell {
    value:         CellValue::Empty,
    number_format: None,
    alignment:     Alignment::DEFAULT,
    font_color:    None,
    formula:       None,
};

impl Cell {
    /// Creates an unstyled cell holding `value`.
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Sets the alignment.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the number format code.
    pub fn with_number_format(mut self, code: impl Into<String>) -> Self {
        self.number_format = Some(code.into());
        self
    }

    /// Sets the font color (ARGB hex).
    pub fn with_font_color(mut self, argb: impl Into<String>) -> Self {
        self.font_color = Some(argb.into());
        self
    }

    /// Sets the literal formula text; a leading `=` is dropped.
    pub fn with_formula(mut self, formula: impl AsRef<str>) -> Self {
        let formula = formula.as_ref();
        self.formula = Some(formula.strip_prefix('=').unwrap_or(formula).to_string());
        self
    }

    /// Number format code, `General` when unset.
    pub fn number_format(&self) -> &str {
        self.number_format.as_deref().unwrap_or("General")
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A declared table ("Format as Table").
pub struct TableRange {
    /// Display name of the table.
    pub name:      String,
    /// Reference exactly as declared, e.g. `C5:K35`.
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
/// A conditional-formatting rule together with the ranges it applies to.
pub struct ConditionalRule {
    /// Target ranges (`sqref`).
    pub ranges:     Vec<CellRange>,
    /// Rule type, e.g. `cellIs` or `expression`.
    pub rule_type:  String,
    /// Operator for `cellIs` rules, e.g. `lessThan`.
    pub operator:   Option<String>,
    /// Formula operands in document order.
    pub formulas:   Vec<String>,
    /// Font color of the differential style applied when the rule holds.
    pub font_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Plot type of an embedded chart.
pub enum ChartKind {
    /// Bar or column chart (either orientation).
    Bar,
    /// Line (and stock) chart.
    Line,
    /// Scatter (XY) chart.
    Scatter,
    /// Pie, doughnut and bar-of-pie charts.
    Pie,
    /// Area chart.
    Area,
    /// Anything else, tagged with its plot element name.
    Other(String),
}

impl ChartKind {
    /// Maps a DrawingML plot element name (`barChart`, `scatterChart`, ...)
    /// to a chart kind. Returns `None` for names that are not plots.
    pub fn from_plot_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "barChart" | "bar3DChart" => ChartKind::Bar,
            "lineChart" | "line3DChart" | "stockChart" => ChartKind::Line,
            "scatterChart" => ChartKind::Scatter,
            "pieChart" | "pie3DChart" | "doughnutChart" | "ofPieChart" => ChartKind::Pie,
            "areaChart" | "area3DChart" => ChartKind::Area,
            other if other.ends_with("Chart") => ChartKind::Other(other.to_string()),
            _ => return None,
        })
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Line => write!(f, "line"),
            ChartKind::Scatter => write!(f, "scatter"),
            ChartKind::Pie => write!(f, "pie"),
            ChartKind::Area => write!(f, "area"),
            ChartKind::Other(tag) => write!(f, "{tag}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// An embedded chart. Only its plot type is tracked.
pub struct Chart {
    /// Plot type.
    pub kind:  ChartKind,
    /// Name of the sheet hosting the chart.
    pub sheet: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A `<col>` declaration covering `min..=max`.
struct ColumnSpan {
    /// First column.
    min:   u32,
    /// Last column.
    max:   u32,
    /// Declared width in character units.
    width: f64,
}

#[derive(Debug, Clone, Default)]
/// A named sheet and everything the grader can observe on it.
pub struct Sheet {
    /// Sheet name as declared.
    name:              String,
    /// Cells keyed by address, row-major.
    cells:             BTreeMap<CellAddress, Cell>,
    /// Declared column widths.
    columns:           Vec<ColumnSpan>,
    /// Declared tables.
    tables:            Vec<TableRange>,
    /// Auto-filter range, if any.
    auto_filter:       Option<String>,
    /// Conditional-formatting rules.
    conditional_rules: Vec<ConditionalRule>,
    /// Embedded charts.
    charts:            Vec<Chart>,
}

impl Sheet {
    /// Creates an empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sheet name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cell at `addr`; an empty unstyled cell if nothing was stored.
    pub fn cell(&self, addr: CellAddress) -> &Cell {
        self.cells.get(&addr).unwrap_or(&EMPTY_CELL)
    }

    /// The cached value at `addr`.
    pub fn value(&self, addr: CellAddress) -> &CellValue {
        &self.cell(addr).value
    }

    /// Stores `cell` at `addr`, replacing what was there.
    pub fn set_cell(&mut self, addr: CellAddress, cell: Cell) -> &mut Self {
        self.cells.insert(addr, cell);
        self
    }

    /// Mutable access to the cell at `addr`, creating an empty one if needed.
    pub fn cell_mut(&mut self, addr: CellAddress) -> &mut Cell {
        self.cells.entry(addr).or_default()
    }

    /// Iterates stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&CellAddress, &Cell)> {
        self.cells.iter()
    }

    /// Declared width of column `col`, if the document declares one.
    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.columns
            .iter()
            .rev()
            .find(|span| (span.min..=span.max).contains(&col))
            .map(|span| span.width)
    }

    /// Declares a width for a single column.
    pub fn set_column_width(&mut self, col: u32, width: f64) -> &mut Self {
        self.set_column_span_width(col, col, width)
    }

    /// Declares a width for `min..=max`.
    pub fn set_column_span_width(&mut self, min: u32, max: u32, width: f64) -> &mut Self {
        self.columns.push(ColumnSpan { min, max, width });
        self
    }

    /// Declared tables.
    pub fn tables(&self) -> &[TableRange] {
        &self.tables
    }

    /// Declares a table over `reference`.
    pub fn add_table(&mut self, name: impl Into<String>, reference: impl Into<String>) -> &mut Self {
        self.tables.push(TableRange {
            name:      name.into(),
            reference: reference.into(),
        });
        self
    }

    /// Auto-filter reference, if any.
    pub fn auto_filter(&self) -> Option<&str> {
        self.auto_filter.as_deref()
    }

    /// Declares an auto-filter over `reference`.
    pub fn set_auto_filter(&mut self, reference: impl Into<String>) -> &mut Self {
        self.auto_filter = Some(reference.into());
        self
    }

    /// Conditional-formatting rules in document order.
    pub fn conditional_rules(&self) -> &[ConditionalRule] {
        &self.conditional_rules
    }

    /// Adds a conditional-formatting rule.
    pub fn add_conditional_rule(&mut self, rule: ConditionalRule) -> &mut Self {
        self.conditional_rules.push(rule);
        self
    }

    /// Embedded charts.
    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    /// Embeds a chart of `kind` on this sheet.
    pub fn add_chart(&mut self, kind: ChartKind) -> &mut Self {
        let sheet = self.name.clone();
        self.charts.push(Chart { kind, sheet });
        self
    }
}

#[derive(Debug, Clone, Default)]
/// An opened spreadsheet document.
pub struct Workbook {
    /// Sheets in tab order.
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Creates an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an xlsx/xlsm document.
    ///
    /// Fails with [`DocumentError::NotFound`] when `path` does not exist and
    /// with [`DocumentError::Corrupt`] when the container cannot be decoded.
    pub fn open(path: impl AsRef<Path>) -> DocumentResult<Self> {
        xlsx::read_file(path.as_ref())
    }

    /// Appends a sheet and returns it for further setup.
    pub fn add_sheet(&mut self, sheet: Sheet) -> &mut Sheet {
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    /// Looks a sheet up by name, ignoring surrounding whitespace.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        let name = name.trim();
        self.sheets.iter().find(|s| s.name.trim() == name)
    }

    /// Mutable lookup by name, ignoring surrounding whitespace.
    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        let name = name.trim();
        self.sheets.iter_mut().find(|s| s.name.trim() == name)
    }

    /// Sheets in tab order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Sheet names in tab order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    /// Every chart on every sheet.
    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.sheets.iter().flat_map(|s| s.charts.iter())
    }
}
