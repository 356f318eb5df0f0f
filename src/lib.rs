//! # xlgrade
//!
//! Grades spreadsheet exercise submissions against a solved reference
//! workbook and writes a styled evaluation report.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Layout, paths and rule catalog of a grading run
pub mod config;
/// For all things related to grading
pub mod grade;
/// Hands a blank copy of the exercise to a participant
pub mod provision;
/// Report output in xlsx, JSON and console tables
pub mod render;
/// Read-only spreadsheet documents
pub mod workbook;
