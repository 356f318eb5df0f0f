#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    grade::{Catalog, CatalogError, Rule},
    workbook::{CellAddress, CellRange, Sheet, column_index},
};

/// Environment variable overriding the submissions directory.
pub const ENV_SUBMISSIONS_DIR: &str = "XLGRADE_SUBMISSIONS_DIR";
/// Environment variable overriding the template document path.
pub const ENV_TEMPLATE: &str = "XLGRADE_TEMPLATE";
/// Environment variable overriding the expected-answers document path.
pub const ENV_EXPECTED: &str = "XLGRADE_EXPECTED";
/// Environment variable overriding the report output path.
pub const ENV_OUTPUT: &str = "XLGRADE_OUTPUT";
/// Environment variable overriding the header row.
pub const ENV_HEADER_ROW: &str = "XLGRADE_HEADER_ROW";
/// Environment variable overriding the data sheet name.
pub const ENV_DATA_SHEET: &str = "XLGRADE_DATA_SHEET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Binds a semantic field name to a physical column.
pub struct ColumnBinding {
    /// Header label, e.g. `Puntuación`.
    pub field:  String,
    /// Column letters, e.g. `F`.
    pub letter: String,
}

impl ColumnBinding {
    /// Creates a binding.
    pub fn new(field: impl Into<String>, letter: impl Into<String>) -> Self {
        Self {
            field:  field.into(),
            letter: letter.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
/// Where participants write their answers.
pub enum AnswerMode {
    /// Each rule's answer sits at its own fixed address on the data sheet.
    #[default]
    FixedCell,
    /// Answers sit on a separate sheet, one per row: the answer to question
    /// `id` is at row `id + row_offset` of `column`.
    AnswerSheet {
        /// Name of the answer sheet.
        sheet:      String,
        /// Column letters holding the answers.
        column:     String,
        /// Added to the question id to get the row.
        row_offset: u32,
    },
}

impl AnswerMode {
    /// The answer-sheet layout of the original exercise: sheet `Respuestas`,
    /// answers in column `B`, question 1 on row 2.
    pub fn answer_sheet() -> Self {
        AnswerMode::AnswerSheet {
            sheet:      "Respuestas".into(),
            column:     "B".into(),
            row_offset: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
#[serde(default)]
/// Physical layout of the exercise workbook.
pub struct Layout {
    /// Sheet holding the data table.
    #[builder(default = "Datos".to_string())]
    pub data_sheet:     String,
    /// Row holding the column labels.
    #[builder(default = 5)]
    pub header_row:     u32,
    /// First data row.
    #[builder(default = 6)]
    pub data_start_row: u32,
    /// Last data row; when absent, data runs until the key column is blank.
    #[builder(default = Some(35))]
    pub data_end_row:   Option<u32>,
    /// Field whose blank cell ends the data when no last row is configured.
    #[builder(default = "ID".to_string())]
    pub key_field:      String,
    /// Semantic field to column bindings, left to right.
    #[builder(default = default_columns())]
    pub columns:        Vec<ColumnBinding>,
    /// Where answers are read from.
    #[builder(default)]
    pub answers:        AnswerMode,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::builder().build()
    }
}

/// Column mapping of the call-center exercise.
pub fn default_columns() -> Vec<ColumnBinding> {
    [
        ("ID", "C"),
        ("Nombre del Cliente", "D"),
        ("Sentimiento", "E"),
        ("Puntuación", "F"),
        ("Fecha", "G"),
        ("Motivo", "H"),
        ("Ciudad", "I"),
        ("Canal", "J"),
        ("Duración Llamada (Minutos)", "K"),
    ]
    .into_iter()
    .map(|(field, letter)| ColumnBinding::new(field, letter))
    .collect()
}

impl Layout {
    /// Column index bound to `field`, if the mapping defines it and its letters
    /// are valid.
    pub fn column(&self, field: &str) -> Option<u32> {
        self.columns
            .iter()
            .find(|b| b.field == field)
            .and_then(|b| column_index(&b.letter))
    }

    /// Mapped column indices paired with their field names, in mapping order.
    pub fn mapped_columns(&self) -> impl Iterator<Item = (&str, Option<u32>)> {
        self.columns
            .iter()
            .map(|b| (b.field.as_str(), column_index(&b.letter)))
    }

    /// Header cell of `field`.
    pub fn header_cell(&self, field: &str) -> Option<CellAddress> {
        self.column(field)
            .map(|col| CellAddress::new(col, self.header_row))
    }

    /// Data rows of `sheet`: the configured span, or from the first data row
    /// until the key column turns blank.
    pub fn data_rows(&self, sheet: &Sheet) -> RangeInclusive<u32> {
        let start = self.data_start_row;
        if let Some(end) = self.data_end_row {
            return start..=end;
        }
        let Some(key_col) = self.column(&self.key_field) else {
            // no key column: an empty range
            return start..=start.saturating_sub(1);
        };
        let mut end = start.saturating_sub(1);
        while !sheet.value(CellAddress::new(key_col, end + 1)).is_blank() {
            end += 1;
        }
        start..=end
    }

    /// The data range of `field` on `sheet`, e.g. `F6:F35`.
    pub fn data_range(&self, field: &str, sheet: &Sheet) -> Option<CellRange> {
        let col = self.column(field)?;
        let rows = self.data_rows(sheet);
        if rows.is_empty() {
            return None;
        }
        Some(CellRange::new(
            CellAddress::new(col, *rows.start()),
            CellAddress::new(col, *rows.end()),
        ))
    }

    /// Moves the header to `row`, shifting the data rows by the same amount.
    /// Row `0` is ignored.
    pub fn move_header_to(&mut self, row: u32) {
        if row == 0 || row == self.header_row {
            return;
        }
        let shift = i64::from(row) - i64::from(self.header_row);
        let move_row = |r: u32| (i64::from(r) + shift).max(1) as u32;
        self.data_start_row = move_row(self.data_start_row);
        self.data_end_row = self.data_end_row.map(move_row);
        self.header_row = row;
    }

    /// Applies `XLGRADE_HEADER_ROW` and `XLGRADE_DATA_SHEET`.
    fn apply_env(&mut self) {
        if let Some(sheet) = env_string(ENV_DATA_SHEET) {
            self.data_sheet = sheet;
        }
        if let Some(row) = env_string(ENV_HEADER_ROW).and_then(|v| v.parse::<u32>().ok()) {
            self.move_header_to(row);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
#[serde(default)]
/// Input and output locations.
pub struct Paths {
    /// Directory scanned for submissions.
    #[builder(default = PathBuf::from("user_submissions"))]
    pub submissions_dir: PathBuf,
    /// Blank exercise template.
    #[builder(default = PathBuf::from("data/base_datos_original.xlsx"))]
    pub template:        PathBuf,
    /// Solved reference document.
    #[builder(default = PathBuf::from("data/respuestas_esperadas.xlsx"))]
    pub expected:        PathBuf,
    /// Report written after a run.
    #[builder(default = PathBuf::from("evaluation_results.xlsx"))]
    pub output:          PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths::builder().build()
    }
}

impl Paths {
    /// Applies the path environment overrides.
    fn apply_env(&mut self) {
        if let Some(dir) = env_string(ENV_SUBMISSIONS_DIR) {
            self.submissions_dir = dir.into();
        }
        if let Some(path) = env_string(ENV_TEMPLATE) {
            self.template = path.into();
        }
        if let Some(path) = env_string(ENV_EXPECTED) {
            self.expected = path.into();
        }
        if let Some(path) = env_string(ENV_OUTPUT) {
            self.output = path.into();
        }
    }
}

/// A non-empty, trimmed environment value.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Shape of a JSON configuration file. Every section is optional.
struct ConfigFile {
    /// Layout override.
    layout: Option<Layout>,
    /// Paths override.
    paths:  Option<Paths>,
    /// Catalog override.
    rules:  Option<Vec<Rule>>,
}

#[derive(Debug, Clone)]
/// Everything a grading run needs.
pub struct GradingConfig {
    /// Workbook layout.
    pub layout:  Layout,
    /// Inputs and outputs.
    pub paths:   Paths,
    /// Rules to apply.
    pub catalog: Catalog,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            layout:  Layout::default(),
            paths:   Paths::default(),
            catalog: Catalog::standard(),
        }
    }
}

impl GradingConfig {
    /// Built-in defaults, then the optional JSON file, then environment
    /// overrides. Without a `rules` section the built-in catalog is laid out
    /// by the final layout.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let parsed = match file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Could not read config file {}", path.display()))?;
                serde_json::from_str::<ConfigFile>(&text)
                    .map_err(CatalogError::from)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => ConfigFile::default(),
        };

        let mut layout = parsed.layout.unwrap_or_default();
        let mut paths = parsed.paths.unwrap_or_default();
        layout.apply_env();
        paths.apply_env();

        let config =
            Self::assemble(layout, paths, parsed.rules).context("Invalid rule catalog")?;
        config
            .catalog
            .validate_fields(&config.layout)
            .context("Rule catalog does not match the column mapping")?;
        Ok(config)
    }

    /// Parses a JSON configuration; absent sections keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let file: ConfigFile = serde_json::from_str(text)?;
        Self::assemble(
            file.layout.unwrap_or_default(),
            file.paths.unwrap_or_default(),
            file.rules,
        )
    }

    /// Pairs a layout with its catalog: the given rules, or the built-in
    /// exercise laid out by `layout`.
    fn assemble(
        layout: Layout,
        paths: Paths,
        rules: Option<Vec<Rule>>,
    ) -> Result<Self, CatalogError> {
        let catalog = match rules {
            Some(rules) => Catalog::new(rules)?,
            None => Catalog::standard_for(&layout),
        };
        Ok(Self {
            layout,
            paths,
            catalog,
        })
    }
}
