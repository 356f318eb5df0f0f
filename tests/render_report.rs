mod common;

use common::*;
use pretty_assertions::assert_eq;
use xlgrade::{
    config::GradingConfig,
    grade::{Outcome, References, Report, Runner, Status, SubmissionSection},
    render,
    workbook::{Cell, CellValue, Workbook},
};

fn sample_report() -> Report {
    let config = GradingConfig::default();
    let references = References {
        template: template_workbook(),
        expected: solved_workbook(),
    };
    let runner = Runner::new(&config, &references);

    let mut report = Report::new();
    report.append(runner.grade_workbook("ana_evaluacion.xlsx", &solved_workbook()));
    report.append(runner.grade_workbook(
        "beto_evaluacion.xlsx",
        &solved_with(|s| {
            s.set_cell(at(ANSWER_COL, 6), Cell::new(29.0));
        }),
    ));
    let mut failed = SubmissionSection::new("carla_evaluacion.xlsx");
    failed.push(Outcome::submission_failure("carla_evaluacion.xlsx", "not a zip"));
    report.append(failed);
    report
}

#[test]
fn summaries_follow_submission_order() {
    let report = sample_report();
    let summary: Vec<(String, usize, usize, usize)> = report
        .submissions()
        .iter()
        .map(|s| (s.file.clone(), s.correct, s.incorrect, s.error))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("ana_evaluacion.xlsx".to_string(), 15, 0, 0),
            ("beto_evaluacion.xlsx".to_string(), 14, 1, 0),
            ("carla_evaluacion.xlsx".to_string(), 0, 0, 1),
        ]
    );
    let counts = report.counts();
    assert_eq!((counts.correct, counts.incorrect, counts.error), (29, 1, 1));
}

#[test]
fn widths_track_the_longest_text_and_are_capped() {
    let mut report = Report::new();
    let mut section = SubmissionSection::new("a.xlsx");
    section.push(Outcome::submission_failure("a.xlsx", "x".repeat(500)));
    report.append(section);

    let widths = render::column_widths(&report);
    // "No." is the longest text in the first column
    assert!((widths[0] - 6.0).abs() < 1e-9, "{}", widths[0]);
    assert_eq!(widths[4], 100.0);
    // "--- Evaluating: a.xlsx ---" is 26 characters
    assert!((widths[2] - 33.6).abs() < 1e-9, "{}", widths[2]);
}

#[test]
fn json_report_carries_rows_and_totals() {
    let report = sample_report();
    let json: serde_json::Value =
        serde_json::from_str(&render::to_json(&report).expect("serialize")).expect("valid json");

    assert_eq!(json["counts"]["correct"], 29);
    assert_eq!(json["submissions"].as_array().map(Vec::len), Some(3));
    let rows = json["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), report.rows().len());
    assert_eq!(rows[0]["status"], serde_json::Value::Null);
    assert_eq!(rows[1]["id"], 1);
    assert_eq!(rows[1]["status"], "Correct");
}

#[test]
fn xlsx_report_is_readable() {
    let report = sample_report();
    let dir = temp_dir("xlgrade-render");
    let path = dir.join("evaluation_results.xlsx");
    render::write_xlsx(&report, &path).expect("write report");

    let written = Workbook::open(&path).expect("open report");
    let sheet = written.sheet(render::REPORT_SHEET).expect("report sheet");
    let text = |col, row| sheet.value(at(col, row)).as_text();

    assert_eq!(
        (1..=5).map(|c| text(c, 1)).collect::<Vec<_>>(),
        vec!["No.", "Topic", "Question", "Status", "Observation"]
    );
    assert_eq!(text(3, 2), "--- Evaluating: ana_evaluacion.xlsx ---");
    assert_eq!(sheet.value(at(1, 3)), &CellValue::Number(1.0));
    assert_eq!(text(4, 3), "Correct");
    assert_eq!(text(5, 20), "Expected: 30, got: 29");
    assert_eq!(text(4, 20), "Incorrect");
    assert!(sheet.column_width(3).is_some());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn console_tables_mention_every_submission() {
    let report = sample_report();
    let table = render::report_table(&report);
    assert!(table.contains("Evaluation Report"));
    assert!(table.contains("Observation"));

    let summary = render::summary_table(&report);
    for name in ["ana_evaluacion.xlsx", "beto_evaluacion.xlsx", "carla_evaluacion.xlsx"] {
        assert!(summary.contains(name), "{summary}");
    }
    assert!(summary.contains("Correct: 29  Incorrect: 1  Error: 1"));
    assert!(!Status::Error.to_string().is_empty());
}
