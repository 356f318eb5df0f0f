mod common;

use common::*;
use pretty_assertions::assert_eq;
use xlgrade::{
    config::{AnswerMode, ColumnBinding, GradingConfig, Layout, Paths},
    grade::{Catalog, CatalogError, CaseMode, RuleKind, rules::Rule},
    workbook::{Cell, CellValue, Sheet},
};

fn numeric(id: u32) -> Rule {
    Rule::builder()
        .id(id)
        .topic("Cálculo")
        .prompt(format!("Pregunta {id}"))
        .kind(RuleKind::NumericAnswer {
            answer:    at(ANSWER_COL, 5 + id),
            expected:  1.0,
            tolerance: None,
        })
        .build()
}

#[test]
fn standard_catalog_is_well_formed() {
    let catalog = Catalog::standard();
    assert_eq!(catalog.len(), 15);
    let ids: Vec<u32> = catalog.rules().iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=15).collect::<Vec<_>>());
    catalog
        .validate_fields(&Layout::default())
        .expect("every field is mapped");

    let rebuilt = Catalog::new(catalog.rules().to_vec()).expect("valid catalog");
    assert_eq!(rebuilt, catalog);
}

fn kind_of(catalog: &Catalog, id: u32) -> &RuleKind {
    &catalog
        .rules()
        .iter()
        .find(|r| r.id == id)
        .expect("rule present")
        .kind
}

#[test]
fn standard_catalog_follows_the_header_row() {
    let catalog = Catalog::standard();
    assert_eq!(
        kind_of(&catalog, 3),
        &RuleKind::CellAlignmentRange {
            range:   "C5:K36".parse().expect("range"),
            exclude: vec!["C36:I36".parse().expect("range")],
        }
    );

    let mut layout = Layout::default();
    layout.move_header_to(6);
    assert_eq!((layout.data_start_row, layout.data_end_row), (7, Some(36)));

    let moved = Catalog::standard_for(&layout);
    assert_eq!(
        kind_of(&moved, 3),
        &RuleKind::CellAlignmentRange {
            range:   "C6:K37".parse().expect("range"),
            exclude: vec!["C37:I37".parse().expect("range")],
        }
    );
    assert_eq!(
        kind_of(&moved, 6),
        &RuleKind::TableOrFilterPresence {
            reference: "C6:K36".into(),
        }
    );
    match kind_of(&moved, 8) {
        RuleKind::FormulaAndRoundedResult {
            formula, answer, ..
        } => {
            assert_eq!(*formula, at(11, 37));
            assert_eq!(*answer, at(ANSWER_COL, 13));
        }
        other => panic!("unexpected kind {other:?}"),
    }
    assert_eq!(moved.rules()[0].kind.answer_cell(), Some(at(ANSWER_COL, 6)));
}

#[test]
fn configured_layout_shapes_the_built_in_catalog() {
    let json = r#"{"layout": {"header_row": 6, "data_start_row": 7, "data_end_row": 36}}"#;
    let config = GradingConfig::from_json(json).expect("valid config");
    assert_eq!(config.catalog, Catalog::standard_for(&config.layout));
    assert_ne!(config.catalog, Catalog::standard());
}

#[test]
fn catalog_rejects_bad_ids() {
    assert!(matches!(
        Catalog::new(vec![numeric(1), numeric(1)]),
        Err(CatalogError::DuplicateId(1))
    ));
    assert!(matches!(
        Catalog::new(vec![numeric(2), numeric(1)]),
        Err(CatalogError::NotIncreasing {
            previous: 2,
            current:  1,
        })
    ));
    assert!(matches!(Catalog::new(Vec::new()), Err(CatalogError::Empty)));
}

#[test]
fn catalog_round_trips_through_json() {
    let json = serde_json::to_string(Catalog::standard().rules()).expect("serialize");
    let parsed = Catalog::from_json(&json).expect("parse");
    assert_eq!(parsed, Catalog::standard());
}

#[test]
fn rules_are_written_by_hand_in_kebab_case() {
    let json = r#"[
        {"id": 1, "topic": "Cálculo", "prompt": "Registros", "kind": "numeric-answer",
         "answer": "M6", "expected": 30},
        {"id": 4, "topic": "Fórmulas", "prompt": "Cliente", "kind": "lookup-by-key",
         "key_field": "ID", "key": "PJL-11752230", "value_field": "Nombre del Cliente",
         "expected": "Linda Lopez"},
        {"id": 9, "topic": "Gráficos", "prompt": "Barras", "kind": "chart-presence",
         "accepted": ["bar", "line"]}
    ]"#;
    let catalog = Catalog::from_json(json).expect("parse");
    let rules = catalog.rules();
    assert_eq!(rules.len(), 3);
    assert_eq!(rules[0].kind.answer_cell(), Some(at(ANSWER_COL, 6)));
    match &rules[1].kind {
        RuleKind::LookupByKey { case, answer, .. } => {
            assert_eq!(*case, CaseMode::Insensitive);
            assert_eq!(*answer, None);
        }
        other => panic!("unexpected kind {other:?}"),
    }
    assert_eq!(rules[2].kind.name(), "chart-presence");
}

#[test]
fn malformed_rules_are_rejected() {
    let bad_address = r#"[{"id": 1, "topic": "t", "prompt": "p", "kind": "numeric-answer",
        "answer": "6M", "expected": 1}]"#;
    assert!(matches!(Catalog::from_json(bad_address), Err(CatalogError::Json(_))));

    let bad_kind = r#"[{"id": 1, "topic": "t", "prompt": "p", "kind": "pivot-table"}]"#;
    assert!(matches!(Catalog::from_json(bad_kind), Err(CatalogError::Json(_))));
}

#[test]
fn fields_must_be_mapped() {
    let layout = Layout::builder()
        .columns(vec![ColumnBinding::new("ID", "C")])
        .build();
    let error = Catalog::standard()
        .validate_fields(&layout)
        .expect_err("Sentimiento is not mapped");
    assert_eq!(
        error.to_string(),
        "rule 2 refers to unknown column `Sentimiento`"
    );
}

#[test]
fn default_layout_matches_the_exercise() {
    let layout = Layout::default();
    assert_eq!(layout.data_sheet, "Datos");
    assert_eq!(layout.header_row, 5);
    assert_eq!(layout.column("ID"), Some(3));
    assert_eq!(layout.column("Duración Llamada (Minutos)"), Some(11));
    assert_eq!(layout.column("Seguimiento"), None);
    assert_eq!(layout.header_cell("Fecha"), Some(at(7, 5)));
    assert_eq!(layout.answers, AnswerMode::FixedCell);

    let sheet = Sheet::new("Datos");
    assert_eq!(
        layout.data_range("Puntuación", &sheet).map(|r| r.to_string()),
        Some("F6:F35".to_string())
    );
}

#[test]
fn open_ended_data_stops_at_the_first_blank_key() {
    let layout = Layout::builder().data_end_row(None::<u32>).build();
    let mut sheet = Sheet::new("Datos");
    for row in 6..=12 {
        sheet.set_cell(at(3, row), Cell::new(format!("K-{row}")));
    }
    sheet.set_cell(at(3, 14), Cell::new("after the gap"));
    assert_eq!(layout.data_rows(&sheet), 6..=12);

    sheet.set_cell(at(3, 6), Cell::new(CellValue::Empty));
    assert!(layout.data_rows(&sheet).is_empty());
    assert_eq!(layout.data_range("ID", &sheet), None);
}

#[test]
fn config_file_overrides_only_what_it_names() {
    let json = r#"{
        "layout": {"data_sheet": "Llamadas", "answers": {"mode": "answer-sheet",
                   "sheet": "Respuestas", "column": "B", "row_offset": 1}},
        "paths": {"submissions_dir": "entregas"}
    }"#;
    let config = GradingConfig::from_json(json).expect("valid config");
    assert_eq!(config.layout.data_sheet, "Llamadas");
    assert_eq!(config.layout.header_row, 5);
    assert_eq!(config.layout.answers, AnswerMode::answer_sheet());
    assert_eq!(config.paths.submissions_dir.to_str(), Some("entregas"));
    assert_eq!(config.paths.output, Paths::default().output);
    assert_eq!(config.catalog, Catalog::standard());
}

#[test]
fn unknown_config_sections_are_rejected() {
    assert!(GradingConfig::from_json(r#"{"reglas": []}"#).is_err());
}

#[test]
fn config_file_is_loaded_from_disk() {
    let dir = temp_dir("xlgrade-config");
    let path = dir.join("xlgrade.json");
    std::fs::write(
        &path,
        r#"{"rules": [{"id": 1, "topic": "Cálculo", "prompt": "Registros",
            "kind": "numeric-answer", "answer": "M6", "expected": 30}]}"#,
    )
    .expect("write config");

    let config = GradingConfig::load(Some(path.as_path())).expect("load");
    assert_eq!(config.catalog.len(), 1);

    let missing = GradingConfig::load(Some(dir.join("absent.json").as_path()));
    assert!(missing.is_err());

    let _ = std::fs::remove_dir_all(dir);
}
