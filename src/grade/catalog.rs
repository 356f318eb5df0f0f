#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::HashSet;

use serde::Serialize;
use tabled::Tabled;

use super::{
    CatalogError,
    rules::{CaseMode, Rule, RuleKind},
};
use crate::{
    config::Layout,
    workbook::{CellAddress, CellRange, ChartKind},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
/// Ordered, validated list of rules.
pub struct Catalog {
    /// Rules in evaluation order.
    rules: Vec<Rule>,
}

impl Catalog {
    /// Builds a catalog; ids must be unique and strictly increasing.
    pub fn new(rules: Vec<Rule>) -> Result<Self, CatalogError> {
        if rules.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id) {
                return Err(CatalogError::DuplicateId(rule.id));
            }
        }
        for pair in rules.windows(2) {
            if pair[1].id <= pair[0].id {
                return Err(CatalogError::NotIncreasing {
                    previous: pair[0].id,
                    current:  pair[1].id,
                });
            }
        }
        Ok(Self { rules })
    }

    /// Parses a JSON array of rules.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let rules: Vec<Rule> = serde_json::from_str(text)?;
        Self::new(rules)
    }

    /// Checks that every field a rule names is part of `layout`'s mapping.
    pub fn validate_fields(&self, layout: &Layout) -> Result<(), CatalogError> {
        for rule in &self.rules {
            if let Some(field) = rule
                .kind
                .fields()
                .into_iter()
                .find(|f| layout.column(f).is_none())
            {
                return Err(CatalogError::UnknownField {
                    id:    rule.id,
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rows for the `catalog` command table.
    pub fn summary(&self) -> Vec<CatalogRow> {
        self.rules
            .iter()
            .map(|r| CatalogRow {
                id:     r.id,
                topic:  r.topic.clone(),
                kind:   r.kind.name(),
                prompt: r.prompt.clone(),
            })
            .collect()
    }

    /// The call-center exercise: fifteen questions answered on the `Datos`
    /// sheet, answers in column `M`.
    pub fn standard() -> Self {
        Self::standard_for(&Layout::default())
    }

    /// The call-center exercise laid out by `layout`. The centered region,
    /// the table reference and the average's cell follow the header row,
    /// the data rows and the column mapping; the answer cells stay in
    /// column `M`.
    pub fn standard_for(layout: &Layout) -> Self {
        Self {
            rules: standard_rules(&TableShape::of(layout)),
        }
    }
}

#[derive(Tabled, Debug, Clone)]
/// One line of the catalog listing.
pub struct CatalogRow {
    #[tabled(rename = "No.")]
    /// Question number.
    pub id:     u32,
    #[tabled(rename = "Topic")]
    /// Topic label.
    pub topic:  String,
    #[tabled(rename = "Kind")]
    /// Rule kind.
    pub kind:   &'static str,
    #[tabled(rename = "Question")]
    /// Question text.
    pub prompt: String,
}

/// Builds an address from known-good literals.
fn at(col: u32, row: u32) -> CellAddress {
    CellAddress::new(col, row)
}

/// Column `M`, where the exercise collects answers.
const ANSWER_COL: u32 = 13;

/// Calls in the exercise's data table.
const EXERCISE_RECORDS: u32 = 30;

/// Field aggregated by the average of question 8.
const DURATION_FIELD: &str = "Duración Llamada (Minutos)";

/// Where the exercise's table sits under a given layout.
#[derive(Debug, Clone, Copy)]
struct TableShape {
    /// Header row.
    header:   u32,
    /// Last data row; the summary row follows it.
    last_row: u32,
    /// Leftmost mapped column.
    first:    u32,
    /// Rightmost mapped column.
    last:     u32,
    /// Column holding the call durations.
    duration: u32,
}

impl TableShape {
    /// Reads the shape off `layout`. Open-ended data is assumed to hold the
    /// exercise's thirty calls.
    fn of(layout: &Layout) -> Self {
        let columns: Vec<u32> = layout.mapped_columns().filter_map(|(_, c)| c).collect();
        let first = columns.iter().copied().min().unwrap_or(3);
        let last = columns.iter().copied().max().unwrap_or(11);
        Self {
            header: layout.header_row,
            last_row: layout
                .data_end_row
                .unwrap_or(layout.data_start_row + EXERCISE_RECORDS - 1),
            first,
            last,
            duration: layout.column(DURATION_FIELD).unwrap_or(last),
        }
    }

    /// Row under the data holding the average and its label.
    fn summary_row(&self) -> u32 {
        self.last_row + 1
    }

    /// Header and data, e.g. `C5:K35`.
    fn table(&self) -> CellRange {
        CellRange::new(at(self.first, self.header), at(self.last, self.last_row))
    }
}

/// The fifteen rules of the call-center exercise.
fn standard_rules(shape: &TableShape) -> Vec<Rule> {
    let formulas = "Fórmulas";
    vec![
        Rule::builder()
            .id(1)
            .topic("Cálculo")
            .prompt("¿Cuantos ID tiene la base de datos?")
            .kind(RuleKind::NumericAnswer {
                answer:    at(ANSWER_COL, 6),
                expected:  30.0,
                tolerance: None,
            })
            .build(),
        Rule::builder()
            .id(2)
            .topic("Edición y formato")
            .prompt("Cambia el nombre de la columna 'Seguimiento' por 'Sentimiento'")
            .kind(RuleKind::ColumnRename {
                field:    "Sentimiento".into(),
                expected: "Sentimiento".into(),
            })
            .build(),
        Rule::builder()
            .id(3)
            .topic("Edición y formato")
            .prompt("Centrar el contenido de todas las celdas")
            .kind(RuleKind::CellAlignmentRange {
                range:   CellRange::new(
                    at(shape.first, shape.header),
                    at(shape.last, shape.summary_row()),
                ),
                // only the label and the average of the summary row
                exclude: vec![CellRange::new(
                    at(shape.first, shape.summary_row()),
                    at(shape.last.saturating_sub(2).max(shape.first), shape.summary_row()),
                )],
            })
            .build(),
        Rule::builder()
            .id(4)
            .topic("Edición y formato")
            .prompt("Ajusta el ancho de las columnas")
            .kind(RuleKind::ColumnWidthRange {
                min_width: 8.0,
                min_ratio: 0.9,
            })
            .build(),
        Rule::builder()
            .id(5)
            .topic(formulas)
            .prompt("Calcula el número total de llamadas registradas")
            .kind(RuleKind::NumericAnswer {
                answer:    at(ANSWER_COL, 10),
                expected:  30.0,
                tolerance: None,
            })
            .build(),
        Rule::builder()
            .id(6)
            .topic(formulas)
            .prompt("Utiliza la función 'Dar formato como tabla'")
            .kind(RuleKind::TableOrFilterPresence {
                reference: shape.table().to_string(),
            })
            .build(),
        Rule::builder()
            .id(7)
            .topic(formulas)
            .prompt("Cuántas llamadas tuvieron un Sentimiento 'Very Positive'")
            .kind(RuleKind::CategoricalCount {
                field:    "Sentimiento".into(),
                label:    "Very Positive".into(),
                expected: 3,
                answer:   Some(at(ANSWER_COL, 12)),
            })
            .build(),
        Rule::builder()
            .id(8)
            .topic(formulas)
            .prompt("Calcula la duración promedio de las llamadas")
            .kind(RuleKind::FormulaAndRoundedResult {
                field:     DURATION_FIELD.into(),
                formula:   at(shape.duration, shape.summary_row()),
                functions: vec!["AVERAGE".into(), "PROMEDIO".into()],
                answer:    at(ANSWER_COL, 13),
                expected:  27,
            })
            .build(),
        Rule::builder()
            .id(9)
            .topic(formulas)
            .prompt("Ajusta el formato fecha a 'dd/mm/yyyy'")
            .kind(RuleKind::NumberFormatRange {
                field:  "Fecha".into(),
                format: "dd/mm/yyyy".into(),
            })
            .build(),
        Rule::builder()
            .id(10)
            .topic(formulas)
            .prompt("Ordena la tabla por 'Puntuación' de mayor a menor y puntaje máximo")
            .kind(RuleKind::SortedOrderAndExtremum {
                field:    "Puntuación".into(),
                expected: 10.0,
                answer:   Some(at(ANSWER_COL, 15)),
            })
            .build(),
        Rule::builder()
            .id(11)
            .topic(formulas)
            .prompt("Cuantas llamadas hay con ese puntaje Máximo")
            .kind(RuleKind::CountAtExtremum {
                field:    "Puntuación".into(),
                expected: 2,
                answer:   Some(at(ANSWER_COL, 16)),
            })
            .build(),
        Rule::builder()
            .id(12)
            .topic(formulas)
            .prompt(
                "Si el 'ID' de un cliente es PJL-11752230. Dime cual es el nombre y apellido al \
                 que corresponde",
            )
            .kind(RuleKind::LookupByKey {
                key_field:   "ID".into(),
                key:         "PJL-11752230".into(),
                value_field: "Nombre del Cliente".into(),
                expected:    "Linda Lopez".into(),
                case:        CaseMode::Insensitive,
                answer:      Some(at(ANSWER_COL, 17)),
            })
            .build(),
        Rule::builder()
            .id(13)
            .topic(formulas)
            .prompt(
                "Resalta en Rojo las celdas de la columna 'Puntuación' que sean inferiores a 5 \
                 (<5)",
            )
            .kind(RuleKind::ConditionalFormatRule {
                field:      "Puntuación".into(),
                operator:   "lessThan".into(),
                threshold:  "5".into(),
                font_color: "FFFF0000".into(),
            })
            .build(),
        Rule::builder()
            .id(14)
            .topic("Gráficos")
            .prompt("Crea un gráfico de barras (Nombre del cliente vs Puntuación)")
            .kind(RuleKind::ChartPresence {
                accepted: vec![ChartKind::Bar],
            })
            .build(),
        Rule::builder()
            .id(15)
            .topic("Gráficos")
            .prompt("Crea un gráfico (Duración de la Llamada vs Puntuación)")
            .kind(RuleKind::ChartPresence {
                accepted: vec![ChartKind::Scatter, ChartKind::Line, ChartKind::Bar],
            })
            .build(),
    ]
}
