use std::path::PathBuf;

use thiserror::Error;

use crate::workbook::DocumentError;

/// Conditions checked before any submission is processed.
#[derive(Debug, Error)]
pub enum PreflightError {
    /// The submissions directory does not exist.
    #[error(
        "submissions directory `{}` not found; create it and put the participants' files in it",
        .0.display()
    )]
    MissingDirectory(PathBuf),

    /// The submissions directory holds no `.xlsx`/`.xlsm` file.
    #[error("no .xlsx or .xlsm files found in `{}`", .0.display())]
    NoSubmissions(PathBuf),

    /// A reference document (template or expected answers) is absent.
    #[error("reference document `{}` not found", .0.display())]
    MissingReference(PathBuf),

    /// A reference document exists but cannot be opened.
    #[error("reference document `{}` cannot be read: {source}", .path.display())]
    UnreadableReference {
        /// Path of the document.
        path:   PathBuf,
        /// What went wrong.
        #[source]
        source: DocumentError,
    },
}

impl PreflightError {
    /// Whether the run must abort. A missing or empty submissions directory
    /// only ends the run early without a report.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PreflightError::MissingReference(_) | PreflightError::UnreadableReference { .. }
        )
    }
}

/// Layout defects that prevent a submission from being graded at all.
#[derive(Debug, Error, PartialEq)]
pub enum StructuralError {
    /// A required sheet is absent.
    #[error("sheet `{missing}` not found; available sheets: {available}")]
    MissingSheet {
        /// Name of the required sheet.
        missing:   String,
        /// Comma separated list of the sheets that do exist.
        available: String,
    },

    /// One or more mapped columns do not carry their label in the header row.
    #[error("missing or misnamed columns: {missing}. Columns found: {found}")]
    MissingColumns {
        /// Comma separated list of the missing labels.
        missing: String,
        /// `label: found` pairs for every mapped column.
        found:   String,
    },
}

/// A fault while evaluating one rule. Always recovered into an Error outcome.
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    /// The answer cell is blank.
    #[error("answer not found in {0}")]
    MissingAnswer(String),

    /// The answer cell holds something that is not a number.
    #[error("answer is not a number: `{0}`")]
    NotANumber(String),

    /// The rule refers to a field that the column mapping does not define.
    #[error("column `{0}` is not part of the column mapping")]
    UnknownColumn(String),

    /// A sheet the rule reads is absent.
    #[error("sheet `{0}` not found")]
    MissingSheet(String),

    /// A numeric column holds text.
    #[error("non-numeric value `{value}` at {cell}")]
    NonNumericData {
        /// Offending cell.
        cell:  String,
        /// What it holds.
        value: String,
    },

    /// A column that must hold data is empty.
    #[error("column `{0}` holds no data")]
    EmptyColumn(String),

    /// A configured address cannot be used.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The evaluator panicked.
    #[error("unexpected failure while evaluating: {0}")]
    Panicked(String),
}

/// Problems with a rule catalog definition.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two rules share an id.
    #[error("rule id {0} is used more than once")]
    DuplicateId(u32),

    /// Ids must grow strictly in catalog order.
    #[error("rule id {current} follows {previous}; ids must be strictly increasing")]
    NotIncreasing {
        /// Id of the earlier rule.
        previous: u32,
        /// Id of the later rule.
        current:  u32,
    },

    /// A rule names a field the column mapping does not define.
    #[error("rule {id} refers to unknown column `{field}`")]
    UnknownField {
        /// Rule id.
        id:    u32,
        /// Unknown field name.
        field: String,
    },

    /// The catalog is empty.
    #[error("the rule catalog is empty")]
    Empty,

    /// The JSON definition cannot be decoded.
    #[error("invalid catalog definition: {0}")]
    Json(#[from] serde_json::Error),
}
