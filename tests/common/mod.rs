#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{
    Chart, ChartType, Color, ConditionalFormatCell, ConditionalFormatCellRule, Format, FormatAlign,
    Formula, Table, TableColumn, Workbook as XlsxWorkbook,
};
use uuid::Uuid;
use xlgrade::{
    config::default_columns,
    workbook::{
        Alignment, Cell, CellAddress, CellValue, ChartKind, ConditionalRule, Sheet, Workbook,
    },
};

/// First data row of the exercise.
pub const FIRST_ROW: u32 = 6;
/// Last data row of the exercise.
pub const LAST_ROW: u32 = 35;
/// Serial date of 2024-01-01.
pub const FIRST_DATE: f64 = 45292.0;

/// One call record.
#[derive(Debug, Clone)]
pub struct CallRow {
    pub id:        String,
    pub name:      String,
    pub sentiment: &'static str,
    pub score:     f64,
    pub date:      f64,
    pub motive:    &'static str,
    pub city:      &'static str,
    pub channel:   &'static str,
    pub duration:  f64,
}

impl CallRow {
    /// Values in column order C..K.
    fn values(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.id.clone()),
            CellValue::Text(self.name.clone()),
            CellValue::Text(self.sentiment.into()),
            CellValue::Number(self.score),
            CellValue::Date(self.date),
            CellValue::Text(self.motive.into()),
            CellValue::Text(self.city.into()),
            CellValue::Text(self.channel.into()),
            CellValue::Number(self.duration),
        ]
    }
}

/// Thirty calls sorted by score, highest first: two tens, three
/// "Very Positive", PJL-11752230 belongs to Linda Lopez, and the durations
/// average 27.
pub fn call_rows() -> Vec<CallRow> {
    (0..30u32)
        .map(|i| CallRow {
            id:        if i == 7 {
                "PJL-11752230".to_string()
            } else {
                format!("CLI-{}", 10_000_000 + i)
            },
            name:      if i == 7 {
                "Linda Lopez".to_string()
            } else {
                format!("Cliente {i}")
            },
            sentiment: if i < 3 {
                "Very Positive"
            } else {
                ["Positive", "Neutral", "Negative"][(i % 3) as usize]
            },
            score:     match i {
                0 | 1 => 10.0,
                _ => f64::from(9 - (i - 2) / 4),
            },
            date:      FIRST_DATE + f64::from(i),
            motive:    ["Soporte", "Facturación", "Ventas"][(i % 3) as usize],
            city:      ["Lima", "Quito", "Bogotá"][(i % 3) as usize],
            channel:   ["Teléfono", "Chat"][(i % 2) as usize],
            duration:  f64::from(20 + i % 15),
        })
        .collect()
}

/// Answers of the solved exercise, keyed by row of column `M`.
pub fn answers() -> Vec<(u32, CellValue)> {
    vec![
        (6, CellValue::Number(30.0)),
        (10, CellValue::Number(30.0)),
        (12, CellValue::Number(3.0)),
        (13, CellValue::Number(27.0)),
        (15, CellValue::Number(10.0)),
        (16, CellValue::Number(2.0)),
        (17, CellValue::Text("Linda Lopez".into())),
    ]
}

/// Header labels in column order; `sentiment` names column `E`.
pub fn headers(sentiment: &str) -> Vec<String> {
    default_columns()
        .into_iter()
        .map(|b| {
            if b.field == "Sentimiento" {
                sentiment.to_string()
            } else {
                b.field
            }
        })
        .collect()
}

/// Column `M`.
pub const ANSWER_COL: u32 = 13;

/// Address helper.
pub fn at(col: u32, row: u32) -> CellAddress {
    CellAddress::new(col, row)
}

/// Header row of the exercise.
pub const HEADER_ROW: u32 = 5;

/// Data sheet with headers on `header_row` and records below, unstyled.
fn data_sheet(sentiment_header: &str, header_row: u32) -> Sheet {
    let mut sheet = Sheet::new("Datos");
    for (i, header) in headers(sentiment_header).into_iter().enumerate() {
        sheet.set_cell(at(3 + i as u32, header_row), Cell::new(header));
    }
    for (offset, row) in call_rows().iter().enumerate() {
        for (i, value) in row.values().into_iter().enumerate() {
            sheet.set_cell(at(3 + i as u32, header_row + 1 + offset as u32), Cell::new(value));
        }
    }
    sheet
}

/// The blank exercise as handed out: header `Seguimiento`, nothing styled.
pub fn template_workbook() -> Workbook {
    template_workbook_at(HEADER_ROW)
}

/// The blank exercise with its header on `header_row`.
pub fn template_workbook_at(header_row: u32) -> Workbook {
    let mut workbook = Workbook::new();
    workbook.add_sheet(data_sheet("Seguimiento", header_row));
    workbook
}

/// The exercise with every question solved.
pub fn solved_workbook() -> Workbook {
    solved_workbook_at(HEADER_ROW)
}

/// The solved exercise with its table moved so the header sits on
/// `header_row`. Answers stay in column `M` on their usual rows.
pub fn solved_workbook_at(header_row: u32) -> Workbook {
    let shift = header_row - HEADER_ROW;
    let last_row = LAST_ROW + shift;
    let summary_row = last_row + 1;
    let mut sheet = data_sheet("Sentimiento", header_row);

    for row in header_row..=last_row {
        for col in 3..=11 {
            sheet.cell_mut(at(col, row)).alignment = Alignment::CENTERED;
        }
    }
    for row in header_row + 1..=last_row {
        sheet.cell_mut(at(7, row)).number_format = Some("dd/mm/yyyy".into());
    }
    sheet.set_cell(
        at(10, summary_row),
        Cell::new("Promedio").with_alignment(Alignment::CENTERED),
    );
    sheet.set_cell(
        at(11, summary_row),
        Cell::new(27.0)
            .with_formula(format!("=AVERAGE(K{}:K{last_row})", header_row + 1))
            .with_alignment(Alignment::CENTERED),
    );
    for (row, value) in answers() {
        sheet.set_cell(at(ANSWER_COL, row), Cell::new(value));
    }

    sheet.set_column_span_width(3, 11, 16.0);
    sheet.add_table("Llamadas", format!("C{header_row}:K{last_row}"));
    sheet.add_conditional_rule(ConditionalRule {
        ranges:     vec![format!("F{}:F{last_row}", header_row + 1).parse().expect("range")],
        rule_type:  "cellIs".into(),
        operator:   Some("lessThan".into()),
        formulas:   vec!["5".into()],
        font_color: Some("FFFF0000".into()),
    });
    sheet.add_chart(ChartKind::Bar);
    sheet.add_chart(ChartKind::Scatter);

    let mut workbook = Workbook::new();
    workbook.add_sheet(sheet);
    workbook
}

/// The solved exercise with one change applied to its data sheet.
pub fn solved_with(change: impl FnOnce(&mut Sheet)) -> Workbook {
    let mut workbook = solved_workbook();
    change(workbook.sheet_mut("Datos").expect("data sheet"));
    workbook
}

/// A fresh directory under the system temp dir.
pub fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// How much of the exercise an xlsx fixture solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    /// Blank template.
    Template,
    /// Every question answered.
    Solved,
}

/// Writes the exercise to `path` as a real xlsx file.
pub fn write_exercise(path: &Path, fixture: Fixture) {
    let solved = fixture == Fixture::Solved;
    let mut workbook = XlsxWorkbook::new();
    let sheet = workbook.add_worksheet().set_name("Datos").expect("name sheet");

    let plain = Format::new();
    let centered = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let cell_format = if solved { &centered } else { &plain };
    let date_format = if solved {
        centered.clone().set_num_format("dd/mm/yyyy")
    } else {
        Format::new().set_num_format("yyyy-mm-dd")
    };

    let header = headers(if solved { "Sentimiento" } else { "Seguimiento" });
    let rows = call_rows();
    // row/col are zero-based in the writer
    for (i, label) in header.iter().enumerate() {
        sheet
            .write_string_with_format(4, 2 + i as u16, label, cell_format)
            .expect("header");
    }
    for (offset, call) in rows.iter().enumerate() {
        let r = FIRST_ROW - 1 + offset as u32;
        sheet.write_string_with_format(r, 2, &call.id, cell_format).expect("id");
        sheet.write_string_with_format(r, 3, &call.name, cell_format).expect("name");
        sheet
            .write_string_with_format(r, 4, call.sentiment, cell_format)
            .expect("sentiment");
        sheet.write_number_with_format(r, 5, call.score, cell_format).expect("score");
        sheet.write_number_with_format(r, 6, call.date, &date_format).expect("date");
        sheet.write_string_with_format(r, 7, call.motive, cell_format).expect("motive");
        sheet.write_string_with_format(r, 8, call.city, cell_format).expect("city");
        sheet.write_string_with_format(r, 9, call.channel, cell_format).expect("channel");
        sheet
            .write_number_with_format(r, 10, call.duration, cell_format)
            .expect("duration");
    }

    if solved {
        sheet.write_string_with_format(35, 9, "Promedio", &centered).expect("label");
        sheet
            .write_formula_with_format(35, 10, Formula::new("=AVERAGE(K6:K35)").set_result("27"), &centered)
            .expect("formula");
        for (row, value) in answers() {
            let written = match value {
                CellValue::Number(n) => sheet.write_number(row - 1, 12, n),
                other => sheet.write_string(row - 1, 12, other.as_text()),
            };
            written.expect("answer");
        }
        for col in 2..=10u16 {
            sheet.set_column_width(col, 16).expect("width");
        }

        let columns: Vec<TableColumn> = header
            .iter()
            .map(|label| {
                TableColumn::new()
                    .set_header(label)
                    .set_header_format(centered.clone())
            })
            .collect();
        let table = Table::new().set_name("Llamadas").set_columns(&columns);
        sheet.add_table(4, 2, 34, 10, &table).expect("table");

        let red = ConditionalFormatCell::new()
            .set_rule(ConditionalFormatCellRule::LessThan(5))
            .set_format(Format::new().set_font_color(Color::Red));
        sheet.add_conditional_format(5, 5, 34, 5, &red).expect("conditional format");

        let mut bar = Chart::new(ChartType::Bar);
        bar.add_series()
            .set_categories(("Datos", 5, 3, 34, 3))
            .set_values(("Datos", 5, 5, 34, 5));
        sheet.insert_chart(2, 14, &bar).expect("bar chart");

        let mut scatter = Chart::new(ChartType::Scatter);
        scatter
            .add_series()
            .set_categories(("Datos", 5, 10, 34, 10))
            .set_values(("Datos", 5, 5, 34, 5));
        sheet.insert_chart(20, 14, &scatter).expect("scatter chart");
    }

    workbook.save(path).expect("save fixture");
}
