#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::workbook::{CellAddress, CellRange, ChartKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// How two texts are compared.
pub enum CaseMode {
    /// Exact match after trimming.
    Sensitive,
    /// Match after trimming and lowercasing.
    #[default]
    Insensitive,
}

impl CaseMode {
    /// Compares `a` and `b` (both trimmed) under this mode.
    pub fn matches(self, a: &str, b: &str) -> bool {
        let (a, b) = (a.trim(), b.trim());
        match self {
            CaseMode::Sensitive => a == b,
            CaseMode::Insensitive => a.to_lowercase() == b.to_lowercase(),
        }
    }
}

/// Default tolerance applied to non-integer expected values.
pub const DEFAULT_FLOAT_TOLERANCE: f64 = 0.01;

/// Smallest column width a participant may leave.
fn default_min_width() -> f64 {
    8.0
}

/// Share of the reference width a column must keep.
fn default_min_ratio() -> f64 {
    0.9
}

/// Operator of the conditional-format predicate.
fn default_operator() -> String {
    "lessThan".into()
}

/// Red, as ARGB.
fn default_red() -> String {
    "FFFF0000".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
/// What a rule checks, with the parameters of that check. Columns are named by
/// their semantic field and resolved through the layout.
pub enum RuleKind {
    /// A numeric answer cell must equal `expected` within `tolerance`.
    NumericAnswer {
        /// Where the participant writes the answer.
        answer:    CellAddress,
        /// Expected value.
        expected:  f64,
        /// Allowed absolute deviation; defaults to 0 for whole expected values
        /// and to [`DEFAULT_FLOAT_TOLERANCE`] otherwise.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tolerance: Option<f64>,
    },
    /// A text answer cell must equal `expected`, ignoring case and surrounding
    /// whitespace.
    TextAnswer {
        /// Where the participant writes the answer.
        answer:   CellAddress,
        /// Expected text.
        expected: String,
    },
    /// The header cell of `field` must read exactly `expected`.
    ColumnRename {
        /// Renamed field.
        field:    String,
        /// Label the header must carry.
        expected: String,
    },
    /// Every cell of `range`, except those in `exclude`, must be centered on
    /// both axes.
    CellAlignmentRange {
        /// Region to inspect.
        range:   CellRange,
        /// Carve-outs, e.g. an irregular summary row.
        #[serde(default)]
        exclude: Vec<CellRange>,
    },
    /// Every mapped column must be declared at least `min_width` wide and at
    /// least `min_ratio` of the reference document's width.
    ColumnWidthRange {
        /// Absolute floor.
        #[serde(default = "default_min_width")]
        min_width: f64,
        /// Relative floor against the reference.
        #[serde(default = "default_min_ratio")]
        min_ratio: f64,
    },
    /// A table must be declared over exactly `reference`, or an auto-filter
    /// must start at one of the mapped columns.
    TableOrFilterPresence {
        /// Expected table reference, e.g. `C5:K35`.
        reference: String,
    },
    /// Number of data rows whose `field` equals `label`.
    CategoricalCount {
        /// Column to scan.
        field:    String,
        /// Label to count (case-sensitive, trimmed).
        label:    String,
        /// Expected count.
        expected: u32,
        /// Where the participant writes the count, if anywhere.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer:   Option<CellAddress>,
    },
    /// A literal formula over the full data range of `field`, plus its rounded
    /// result.
    FormulaAndRoundedResult {
        /// Column the formula aggregates.
        field:     String,
        /// Cell holding the formula.
        formula:   CellAddress,
        /// Accepted function names, e.g. `AVERAGE` and `PROMEDIO`.
        functions: Vec<String>,
        /// Where the participant writes the result.
        answer:    CellAddress,
        /// Expected result after rounding to the nearest integer.
        expected:  i64,
    },
    /// `field` must be sorted from highest to lowest and its maximum must be
    /// `expected`.
    SortedOrderAndExtremum {
        /// Numeric column.
        field:    String,
        /// Expected maximum.
        expected: f64,
        /// Where the participant writes the maximum, if anywhere.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer:   Option<CellAddress>,
    },
    /// Number of data rows whose `field` equals the column maximum.
    CountAtExtremum {
        /// Numeric column.
        field:    String,
        /// Expected count.
        expected: u32,
        /// Where the participant writes the count, if anywhere.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer:   Option<CellAddress>,
    },
    /// The `value_field` of the row whose `key_field` is `key`.
    LookupByKey {
        /// Column holding keys.
        key_field:   String,
        /// Key to find.
        key:         String,
        /// Column holding the looked-up value.
        value_field: String,
        /// Expected value.
        expected:    String,
        /// How values are compared.
        #[serde(default)]
        case:        CaseMode,
        /// Where the participant writes the value, if anywhere.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer:      Option<CellAddress>,
    },
    /// A conditional format over the data of `field` coloring values below
    /// `threshold` with `font_color`.
    ConditionalFormatRule {
        /// Target column.
        field:      String,
        /// `cellIs` operator.
        #[serde(default = "default_operator")]
        operator:   String,
        /// Threshold literal, e.g. `5`.
        threshold:  String,
        /// Font color as ARGB.
        #[serde(default = "default_red")]
        font_color: String,
    },
    /// Some sheet embeds a chart of one of the `accepted` kinds.
    ChartPresence {
        /// Accepted plot types.
        accepted: Vec<ChartKind>,
    },
    /// Every data cell of `field` is a date shown with `format`.
    NumberFormatRange {
        /// Date column.
        field:  String,
        /// Expected number format code, e.g. `dd/mm/yyyy`.
        format: String,
    },
}

impl RuleKind {
    /// Kebab-case name of the kind, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::NumericAnswer { .. } => "numeric-answer",
            RuleKind::TextAnswer { .. } => "text-answer",
            RuleKind::ColumnRename { .. } => "column-rename",
            RuleKind::CellAlignmentRange { .. } => "cell-alignment-range",
            RuleKind::ColumnWidthRange { .. } => "column-width-range",
            RuleKind::TableOrFilterPresence { .. } => "table-or-filter-presence",
            RuleKind::CategoricalCount { .. } => "categorical-count",
            RuleKind::FormulaAndRoundedResult { .. } => "formula-and-rounded-result",
            RuleKind::SortedOrderAndExtremum { .. } => "sorted-order-and-extremum",
            RuleKind::CountAtExtremum { .. } => "count-at-extremum",
            RuleKind::LookupByKey { .. } => "lookup-by-key",
            RuleKind::ConditionalFormatRule { .. } => "conditional-format-rule",
            RuleKind::ChartPresence { .. } => "chart-presence",
            RuleKind::NumberFormatRange { .. } => "number-format-range",
        }
    }

    /// Semantic fields this rule reads.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            RuleKind::ColumnRename { field, .. }
            | RuleKind::CategoricalCount { field, .. }
            | RuleKind::FormulaAndRoundedResult { field, .. }
            | RuleKind::SortedOrderAndExtremum { field, .. }
            | RuleKind::CountAtExtremum { field, .. }
            | RuleKind::ConditionalFormatRule { field, .. }
            | RuleKind::NumberFormatRange { field, .. } => vec![field.as_str()],
            RuleKind::LookupByKey {
                key_field,
                value_field,
                ..
            } => vec![key_field.as_str(), value_field.as_str()],
            RuleKind::NumericAnswer { .. }
            | RuleKind::TextAnswer { .. }
            | RuleKind::CellAlignmentRange { .. }
            | RuleKind::ColumnWidthRange { .. }
            | RuleKind::TableOrFilterPresence { .. }
            | RuleKind::ChartPresence { .. } => Vec::new(),
        }
    }

    /// Fixed address of the participant's answer, if this rule reads one.
    pub fn answer_cell(&self) -> Option<CellAddress> {
        match self {
            RuleKind::NumericAnswer { answer, .. }
            | RuleKind::TextAnswer { answer, .. }
            | RuleKind::FormulaAndRoundedResult { answer, .. } => Some(*answer),
            RuleKind::CategoricalCount { answer, .. }
            | RuleKind::SortedOrderAndExtremum { answer, .. }
            | RuleKind::CountAtExtremum { answer, .. }
            | RuleKind::LookupByKey { answer, .. } => *answer,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
/// One gradable question.
pub struct Rule {
    /// Question number; unique and increasing within a catalog.
    pub id:     u32,
    /// Topic label, e.g. `Fórmulas`.
    #[builder(setter(into))]
    pub topic:  String,
    /// Question text shown in the report.
    #[builder(setter(into))]
    pub prompt: String,
    /// The check itself.
    #[serde(flatten)]
    pub kind:   RuleKind,
}
