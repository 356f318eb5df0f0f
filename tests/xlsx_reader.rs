mod common;

use common::*;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{Chart, ChartType, Workbook as XlsxWorkbook};
use xlgrade::{
    config::Layout,
    grade::{Catalog, EvalContext, evaluate},
    workbook::{CellValue, ChartKind, DocumentError, Workbook},
};

fn solved_file() -> (std::path::PathBuf, Workbook) {
    let dir = temp_dir("xlgrade-reader");
    let path = dir.join("solved.xlsx");
    write_exercise(&path, Fixture::Solved);
    let workbook = Workbook::open(&path).expect("open fixture");
    (dir, workbook)
}

#[test]
fn values_and_types_are_read_back() {
    let (dir, workbook) = solved_file();
    assert_eq!(workbook.sheet_names(), vec!["Datos"]);
    let sheet = workbook.sheet("Datos").expect("data sheet");

    assert_eq!(sheet.value(at(3, 5)), &CellValue::Text("ID".into()));
    assert_eq!(sheet.value(at(5, 5)), &CellValue::Text("Sentimiento".into()));
    assert_eq!(sheet.value(at(3, 13)), &CellValue::Text("PJL-11752230".into()));
    assert_eq!(sheet.value(at(4, 13)), &CellValue::Text("Linda Lopez".into()));
    assert_eq!(sheet.value(at(6, 6)), &CellValue::Number(10.0));
    assert_eq!(sheet.value(at(ANSWER_COL, 6)), &CellValue::Number(30.0));
    assert_eq!(
        sheet.value(at(ANSWER_COL, 17)),
        &CellValue::Text("Linda Lopez".into())
    );
    assert!(sheet.value(at(1, 1)).is_blank());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn dates_keep_their_format() {
    let (dir, workbook) = solved_file();
    let sheet = workbook.sheet("Datos").expect("data sheet");
    let cell = sheet.cell(at(7, 6));
    assert_eq!(cell.value, CellValue::Date(FIRST_DATE));
    assert_eq!(cell.number_format(), "dd/mm/yyyy");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn styles_and_formulas_are_read_back() {
    let (dir, workbook) = solved_file();
    let sheet = workbook.sheet("Datos").expect("data sheet");

    assert!(sheet.cell(at(6, 20)).alignment.is_centered());
    assert!(!sheet.cell(at(ANSWER_COL, 6)).alignment.is_centered());

    let average = sheet.cell(at(11, 36));
    assert_eq!(average.formula.as_deref(), Some("AVERAGE(K6:K35)"));
    assert!(average.alignment.is_centered());

    let width = sheet.column_width(6).expect("declared width");
    assert!(width >= 16.0, "{width}");
    assert_eq!(sheet.column_width(20), None);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn tables_conditional_formats_and_charts_are_found() {
    let (dir, workbook) = solved_file();
    let sheet = workbook.sheet("Datos").expect("data sheet");

    let tables = sheet.tables();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "Llamadas");
    assert_eq!(tables[0].reference, "C5:K35");

    let rules = sheet.conditional_rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].ranges[0].to_string(), "F6:F35");
    assert_eq!(rules[0].rule_type, "cellIs");
    assert_eq!(rules[0].operator.as_deref(), Some("lessThan"));
    assert_eq!(rules[0].formulas, vec!["5".to_string()]);
    assert_eq!(rules[0].font_color.as_deref(), Some("FFFF0000"));

    let kinds: Vec<ChartKind> = workbook.charts().map(|c| c.kind.clone()).collect();
    assert_eq!(kinds, vec![ChartKind::Bar, ChartKind::Scatter]);
    assert!(workbook.charts().all(|c| c.sheet == "Datos"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn charts_moved_to_their_own_sheet_are_found() {
    let dir = temp_dir("xlgrade-reader");
    let path = dir.join("chartsheet.xlsx");

    let mut book = XlsxWorkbook::new();
    let data = book.add_worksheet().set_name("Datos").expect("name sheet");
    for (offset, call) in call_rows().iter().enumerate() {
        let row = offset as u32;
        data.write_string(row, 3, &call.name).expect("name");
        data.write_number(row, 5, call.score).expect("score");
    }
    let mut bar = Chart::new(ChartType::Bar);
    bar.add_series()
        .set_categories(("Datos", 0, 3, 29, 3))
        .set_values(("Datos", 0, 5, 29, 5));
    book.add_chartsheet()
        .set_name("Grafico1")
        .expect("name chart sheet")
        .insert_chart(0, 0, &bar)
        .expect("chart");
    book.save(&path).expect("save");

    let workbook = Workbook::open(&path).expect("open");
    assert_eq!(workbook.sheet_names(), vec!["Datos", "Grafico1"]);
    let charts: Vec<(String, ChartKind)> = workbook
        .charts()
        .map(|c| (c.sheet.clone(), c.kind.clone()))
        .collect();
    assert_eq!(charts, vec![("Grafico1".to_string(), ChartKind::Bar)]);

    let layout = Layout::default();
    let ctx = EvalContext::new(&layout, &workbook, &workbook);
    let catalog = Catalog::standard();
    for rule in catalog.rules().iter().filter(|r| r.id >= 14) {
        let verdict = evaluate(&ctx, rule).expect("evaluates");
        assert!(verdict.passed, "rule {}: {}", rule.id, verdict.observation);
    }

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn template_has_none_of_the_solution() {
    let dir = temp_dir("xlgrade-reader");
    let path = dir.join("template.xlsx");
    write_exercise(&path, Fixture::Template);
    let workbook = Workbook::open(&path).expect("open template");
    let sheet = workbook.sheet("Datos").expect("data sheet");

    assert_eq!(sheet.value(at(5, 5)), &CellValue::Text("Seguimiento".into()));
    assert!(sheet.tables().is_empty());
    assert!(sheet.conditional_rules().is_empty());
    assert_eq!(workbook.charts().count(), 0);
    assert!(sheet.value(at(ANSWER_COL, 6)).is_blank());
    assert!(matches!(sheet.value(at(7, 6)), CellValue::Date(_)));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_and_corrupt_files() {
    let dir = temp_dir("xlgrade-reader");

    let missing = Workbook::open(dir.join("absent.xlsx")).expect_err("absent");
    assert!(matches!(missing, DocumentError::NotFound(_)));

    let garbage = dir.join("garbage.xlsx");
    std::fs::write(&garbage, b"PK but not really").expect("write garbage");
    let corrupt = Workbook::open(&garbage).expect_err("garbage");
    assert!(matches!(corrupt, DocumentError::Corrupt(_)), "{corrupt}");

    let _ = std::fs::remove_dir_all(dir);
}
