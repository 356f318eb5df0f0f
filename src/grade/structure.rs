#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use itertools::Itertools;

use super::StructuralError;
use crate::{
    config::{AnswerMode, Layout},
    workbook::{CellAddress, Workbook},
};

/// Checks that `submission` can be graded at all: the data sheet (and the
/// answer sheet, in answer-sheet mode) exists and every mapped column carries
/// its label in the header row.
///
/// A header that still reads as in `template` is accepted so that a column the
/// participant was asked to rename is judged by its own rule instead of
/// rejecting the whole submission.
pub fn check(
    layout: &Layout,
    submission: &Workbook,
    template: Option<&Workbook>,
) -> Result<(), StructuralError> {
    let available = || submission.sheet_names().iter().map(|n| format!("'{n}'")).join(", ");

    let Some(sheet) = submission.sheet(&layout.data_sheet) else {
        return Err(StructuralError::MissingSheet {
            missing:   layout.data_sheet.clone(),
            available: available(),
        });
    };
    if let AnswerMode::AnswerSheet { sheet: answers, .. } = &layout.answers {
        if submission.sheet(answers).is_none() {
            return Err(StructuralError::MissingSheet {
                missing:   answers.clone(),
                available: available(),
            });
        }
    }

    let template_sheet = template.and_then(|t| t.sheet(&layout.data_sheet));
    let mut missing = Vec::new();
    let mut found = Vec::new();
    for (field, col) in layout.mapped_columns() {
        let Some(col) = col else {
            missing.push(field.to_string());
            found.push(format!("{field}: <invalid column>"));
            continue;
        };
        let addr = CellAddress::new(col, layout.header_row);
        let header = sheet.value(addr).as_text();
        let header = header.trim();
        let original = template_sheet.map(|t| t.value(addr).as_text());
        let original = original.as_deref().map(str::trim).filter(|o| !o.is_empty());

        if header != field && Some(header) != original {
            missing.push(field.to_string());
        }
        found.push(format!("{field}: '{header}'"));
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StructuralError::MissingColumns {
            missing: missing.join(", "),
            found:   found.join(", "),
        })
    }
}
