mod common;

use common::*;
use xlgrade::{
    provision::{DEFAULT_SUBMISSION_NAME, provision, submission_file_name},
    workbook::Workbook,
};

#[test]
fn copy_is_named_after_the_participant() {
    assert_eq!(submission_file_name(Some("ana")), "ana_evaluacion.xlsx");
    assert_eq!(submission_file_name(Some("  ")), DEFAULT_SUBMISSION_NAME);
    assert_eq!(submission_file_name(None), "user_evaluacion.xlsx");
}

#[test]
fn template_is_copied_into_a_new_directory() {
    let root = temp_dir("xlgrade-provision");
    let template = root.join("base_datos_original.xlsx");
    write_exercise(&template, Fixture::Template);
    let submissions = root.join("user_submissions");

    let copy = provision(&template, &submissions, Some("ana")).expect("provision");
    assert_eq!(copy, submissions.join("ana_evaluacion.xlsx"));
    let workbook = Workbook::open(&copy).expect("copy opens");
    assert!(workbook.sheet("Datos").is_some());

    let again = provision(&template, &submissions, Some("ana"));
    assert!(again.is_err(), "an existing copy is kept");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn missing_template_or_bad_name_fails() {
    let root = temp_dir("xlgrade-provision");
    let submissions = root.join("user_submissions");

    let error = provision(&root.join("absent.xlsx"), &submissions, None).expect_err("no template");
    assert!(error.to_string().contains("Template document not found"));
    assert!(!submissions.exists());

    let template = root.join("base.xlsx");
    write_exercise(&template, Fixture::Template);
    assert!(provision(&template, &submissions, Some("../ana")).is_err());

    let _ = std::fs::remove_dir_all(root);
}
