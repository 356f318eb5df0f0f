#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! One evaluation function per rule kind.
//!
//! Every function reads the submission through an [`EvalContext`] and returns
//! a [`Verdict`]. A rule that does not hold is a `Verdict` with
//! `passed == false`; only conditions that make the rule impossible to judge
//! (blank answer, text in a numeric column, unknown field) are [`RuleError`]s.

use itertools::Itertools;

use super::{
    RuleError,
    results::Verdict,
    rules::{CaseMode, Rule, RuleKind},
};
use crate::{
    config::{AnswerMode, Layout},
    workbook::{
        Cell, CellAddress, CellRange, CellValue, ChartKind, Sheet, Workbook, column_index,
        column_letter, format_number,
    },
};

/// Tolerance for comparing values read back from a document.
const EPSILON: f64 = 1e-9;

/// Everything an evaluator may look at.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Workbook layout.
    pub layout:     &'a Layout,
    /// The document being graded.
    pub submission: &'a Workbook,
    /// The solved reference document.
    pub reference:  &'a Workbook,
}

impl<'a> EvalContext<'a> {
    /// Creates a context.
    pub fn new(layout: &'a Layout, submission: &'a Workbook, reference: &'a Workbook) -> Self {
        Self {
            layout,
            submission,
            reference,
        }
    }

    /// The submission's data sheet.
    fn data_sheet(&self) -> Result<&'a Sheet, RuleError> {
        self.submission
            .sheet(&self.layout.data_sheet)
            .ok_or_else(|| RuleError::MissingSheet(self.layout.data_sheet.clone()))
    }

    /// Column bound to `field`.
    fn column(&self, field: &str) -> Result<u32, RuleError> {
        self.layout
            .column(field)
            .ok_or_else(|| RuleError::UnknownColumn(field.to_string()))
    }

    /// The participant's answer to question `id`, with a label naming where
    /// it was read. `fixed` is used in fixed-cell mode.
    fn answer(&self, id: u32, fixed: CellAddress) -> Result<(&'a Cell, String), RuleError> {
        match &self.layout.answers {
            AnswerMode::FixedCell => Ok((self.data_sheet()?.cell(fixed), fixed.to_string())),
            AnswerMode::AnswerSheet {
                sheet,
                column,
                row_offset,
            } => {
                let answers = self
                    .submission
                    .sheet(sheet)
                    .ok_or_else(|| RuleError::MissingSheet(sheet.clone()))?;
                let col = column_index(column)
                    .ok_or_else(|| RuleError::InvalidAddress(format!("answer column `{column}`")))?;
                let addr = CellAddress::new(col, id + row_offset);
                Ok((answers.cell(addr), format!("{sheet}!{addr}")))
            }
        }
    }

    /// Numeric answer to question `id`. Blank is [`RuleError::MissingAnswer`],
    /// text that is not a number is [`RuleError::NotANumber`].
    fn numeric_answer(&self, id: u32, fixed: CellAddress) -> Result<f64, RuleError> {
        let (cell, label) = self.answer(id, fixed)?;
        if cell.value.is_blank() {
            return Err(RuleError::MissingAnswer(label));
        }
        cell.value
            .as_number()
            .ok_or_else(|| RuleError::NotANumber(cell.value.as_text()))
    }

    /// Text answer to question `id`; blank is [`RuleError::MissingAnswer`].
    fn text_answer(&self, id: u32, fixed: CellAddress) -> Result<String, RuleError> {
        let (cell, label) = self.answer(id, fixed)?;
        if cell.value.is_blank() {
            return Err(RuleError::MissingAnswer(label));
        }
        Ok(cell.value.as_text())
    }

    /// Numeric values of `field` over the data rows, blanks skipped.
    fn numeric_column(&self, field: &str) -> Result<Vec<(CellAddress, f64)>, RuleError> {
        let sheet = self.data_sheet()?;
        let col = self.column(field)?;
        let mut values = Vec::new();
        for row in self.layout.data_rows(sheet) {
            let addr = CellAddress::new(col, row);
            let value = sheet.value(addr);
            if value.is_blank() {
                continue;
            }
            let n = value.as_number().ok_or_else(|| RuleError::NonNumericData {
                cell:  addr.to_string(),
                value: value.as_text(),
            })?;
            values.push((addr, n));
        }
        if values.is_empty() {
            return Err(RuleError::EmptyColumn(field.to_string()));
        }
        Ok(values)
    }

    /// Trimmed text of `field` over the data rows.
    fn text_column(&self, field: &str) -> Result<Vec<(u32, String)>, RuleError> {
        let sheet = self.data_sheet()?;
        let col = self.column(field)?;
        Ok(self
            .layout
            .data_rows(sheet)
            .map(|row| {
                let text = sheet.value(CellAddress::new(col, row)).as_text();
                (row, text.trim().to_string())
            })
            .collect())
    }
}

/// Applies `rule` to the submission in `ctx`.
pub fn evaluate(ctx: &EvalContext<'_>, rule: &Rule) -> Result<Verdict, RuleError> {
    let id = rule.id;
    match &rule.kind {
        RuleKind::NumericAnswer {
            answer,
            expected,
            tolerance,
        } => numeric_answer(ctx, id, *answer, *expected, *tolerance),
        RuleKind::TextAnswer { answer, expected } => text_answer(ctx, id, *answer, expected),
        RuleKind::ColumnRename { field, expected } => column_rename(ctx, field, expected),
        RuleKind::CellAlignmentRange { range, exclude } => cell_alignment(ctx, range, exclude),
        RuleKind::ColumnWidthRange {
            min_width,
            min_ratio,
        } => column_widths(ctx, *min_width, *min_ratio),
        RuleKind::TableOrFilterPresence { reference } => table_or_filter(ctx, reference),
        RuleKind::CategoricalCount {
            field,
            label,
            expected,
            answer,
        } => categorical_count(ctx, id, field, label, *expected, *answer),
        RuleKind::FormulaAndRoundedResult {
            field,
            formula,
            functions,
            answer,
            expected,
        } => formula_and_result(ctx, id, field, *formula, functions, *answer, *expected),
        RuleKind::SortedOrderAndExtremum {
            field,
            expected,
            answer,
        } => sorted_and_max(ctx, id, field, *expected, *answer),
        RuleKind::CountAtExtremum {
            field,
            expected,
            answer,
        } => count_at_max(ctx, id, field, *expected, *answer),
        RuleKind::LookupByKey {
            key_field,
            key,
            value_field,
            expected,
            case,
            answer,
        } => lookup_by_key(ctx, id, key_field, key, value_field, expected, *case, *answer),
        RuleKind::ConditionalFormatRule {
            field,
            operator,
            threshold,
            font_color,
        } => conditional_format(ctx, field, operator, threshold, font_color),
        RuleKind::ChartPresence { accepted } => chart_presence(ctx, accepted),
        RuleKind::NumberFormatRange { field, format } => number_format(ctx, field, format),
    }
}

/// Tolerance used when a numeric rule does not configure one.
pub fn default_tolerance(expected: f64) -> f64 {
    if expected.fract() == 0.0 {
        0.0
    } else {
        super::rules::DEFAULT_FLOAT_TOLERANCE
    }
}

/// `|actual - expected| <= tolerance`, forgiving float noise at the boundary.
fn within(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance + EPSILON
}

/// Standard expected/got wording.
fn expected_got(expected: impl std::fmt::Display, got: impl std::fmt::Display) -> String {
    format!("Expected: {expected}, got: {got}")
}

/// Compares an optional numeric answer against `expected`. Returns `None`
/// when the rule has no answer cell.
fn check_numeric_answer(
    ctx: &EvalContext<'_>,
    id: u32,
    answer: Option<CellAddress>,
    expected: f64,
) -> Result<Option<(bool, String)>, RuleError> {
    let Some(addr) = answer else {
        return Ok(None);
    };
    let actual = ctx.numeric_answer(id, addr)?;
    let passed = within(actual, expected, default_tolerance(expected));
    Ok(Some((
        passed,
        format!("answer: {}", expected_got(format_number(expected), format_number(actual))),
    )))
}

/// Folds sub-checks into one verdict; every observation is kept.
fn combine(checks: impl IntoIterator<Item = (bool, String)>) -> Verdict {
    let (passed, notes): (Vec<bool>, Vec<String>) = checks.into_iter().unzip();
    Verdict::from_check(passed.iter().all(|p| *p), notes.join("; "))
}

/// numeric-answer
fn numeric_answer(
    ctx: &EvalContext<'_>,
    id: u32,
    answer: CellAddress,
    expected: f64,
    tolerance: Option<f64>,
) -> Result<Verdict, RuleError> {
    let actual = ctx.numeric_answer(id, answer)?;
    let tolerance = tolerance.unwrap_or_else(|| default_tolerance(expected));
    Ok(Verdict::from_check(
        within(actual, expected, tolerance),
        expected_got(format_number(expected), format_number(actual)),
    ))
}

/// text-answer
fn text_answer(
    ctx: &EvalContext<'_>,
    id: u32,
    answer: CellAddress,
    expected: &str,
) -> Result<Verdict, RuleError> {
    let actual = ctx.text_answer(id, answer)?;
    Ok(Verdict::from_check(
        CaseMode::Insensitive.matches(&actual, expected),
        expected_got(expected, actual.trim()),
    ))
}

/// column-rename
fn column_rename(ctx: &EvalContext<'_>, field: &str, expected: &str) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;
    let addr = CellAddress::new(ctx.column(field)?, ctx.layout.header_row);
    let found = sheet.value(addr).as_text();
    Ok(Verdict::from_check(
        found == expected,
        format!("Header {addr}: {}", expected_got(format!("'{expected}'"), format!("'{found}'"))),
    ))
}

/// cell-alignment-range
fn cell_alignment(
    ctx: &EvalContext<'_>,
    range: &CellRange,
    exclude: &[CellRange],
) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;
    let offender = range
        .cells()
        .filter(|addr| !exclude.iter().any(|ex| ex.contains(addr)))
        .find(|addr| !sheet.cell(*addr).alignment.is_centered());

    Ok(match offender {
        None => Verdict::correct(format!("Every cell in {range} is centered")),
        Some(addr) => {
            let alignment = sheet.cell(addr).alignment;
            Verdict::incorrect(format!(
                "Cell {addr} is not centered (horizontal: {}, vertical: {})",
                alignment.horizontal, alignment.vertical
            ))
        }
    })
}

/// column-width-range
fn column_widths(
    ctx: &EvalContext<'_>,
    min_width: f64,
    min_ratio: f64,
) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;
    let reference = ctx.reference.sheet(&ctx.layout.data_sheet);

    let mut problems = Vec::new();
    for (field, col) in ctx.layout.mapped_columns() {
        let col = col.ok_or_else(|| RuleError::UnknownColumn(field.to_string()))?;
        let letter = column_letter(col);
        let Some(width) = sheet.column_width(col) else {
            problems.push(format!("{letter}: width not set"));
            continue;
        };
        if width + EPSILON < min_width {
            problems.push(format!(
                "{letter}: {} < {}",
                format_number(width),
                format_number(min_width)
            ));
            continue;
        }
        if let Some(expected) = reference.and_then(|r| r.column_width(col)) {
            let floor = expected * min_ratio;
            if width + EPSILON < floor {
                problems.push(format!(
                    "{letter}: {} < {:.0}% of {}",
                    format_number(width),
                    min_ratio * 100.0,
                    format_number(expected)
                ));
            }
        }
    }

    Ok(if problems.is_empty() {
        Verdict::correct("Every mapped column is wide enough")
    } else {
        Verdict::incorrect(format!("Columns too narrow: {}", problems.join(", ")))
    })
}

/// table-or-filter-presence
fn table_or_filter(ctx: &EvalContext<'_>, reference: &str) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;

    if let Some(table) = sheet.tables().iter().find(|t| t.reference == reference) {
        return Ok(Verdict::correct(format!(
            "Table `{}` declared over {}",
            table.name, table.reference
        )));
    }

    let mapped: Vec<u32> = ctx.layout.mapped_columns().filter_map(|(_, c)| c).collect();
    if let Some(filter) = sheet.auto_filter() {
        let starts_at_mapped = filter
            .parse::<CellRange>()
            .map(|r| mapped.contains(&r.start.col))
            .unwrap_or(false);
        if starts_at_mapped {
            return Ok(Verdict::correct(format!("Auto-filter declared over {filter}")));
        }
    }

    let found = sheet
        .tables()
        .iter()
        .map(|t| t.reference.as_str())
        .chain(sheet.auto_filter())
        .join(", ");
    Ok(Verdict::incorrect(if found.is_empty() {
        format!("No table over {reference} and no auto-filter")
    } else {
        format!("No table over {reference}; ranges found: {found}")
    }))
}

/// categorical-count
fn categorical_count(
    ctx: &EvalContext<'_>,
    id: u32,
    field: &str,
    label: &str,
    expected: u32,
    answer: Option<CellAddress>,
) -> Result<Verdict, RuleError> {
    let count = ctx
        .text_column(field)?
        .iter()
        .filter(|(_, text)| text == label)
        .count();
    let mut checks = vec![(
        count == expected as usize,
        format!("rows with '{label}': {}", expected_got(expected, count)),
    )];
    checks.extend(check_numeric_answer(ctx, id, answer, f64::from(expected))?);
    Ok(combine(checks))
}

/// Canonical spelling of a formula for comparison: no `=`, `$` or spaces,
/// uppercase.
fn normalize_formula(formula: &str) -> String {
    formula
        .trim()
        .trim_start_matches('=')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect::<String>()
        .to_uppercase()
}

/// formula-and-rounded-result
fn formula_and_result(
    ctx: &EvalContext<'_>,
    id: u32,
    field: &str,
    formula_cell: CellAddress,
    functions: &[String],
    answer: CellAddress,
    expected: i64,
) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;
    ctx.column(field)?;
    let range = ctx
        .layout
        .data_range(field, sheet)
        .ok_or_else(|| RuleError::EmptyColumn(field.to_string()))?;

    let accepted: Vec<String> = functions
        .iter()
        .map(|f| format!("{}({range})", f.trim().to_uppercase()))
        .collect();
    let found = sheet.cell(formula_cell).formula.as_deref();
    let formula_ok = found
        .map(normalize_formula)
        .is_some_and(|f| accepted.contains(&f));
    let formula_note = match found {
        Some(f) if formula_ok => format!("formula in {formula_cell}: ={f}"),
        Some(f) => format!(
            "formula in {formula_cell} should be {}, found: ={f}",
            accepted.iter().map(|a| format!("={a}")).join(" or ")
        ),
        None => format!("no formula in {formula_cell}"),
    };

    let actual = ctx.numeric_answer(id, answer)?;
    let rounded = actual.round() as i64;
    let result_ok = rounded == expected;
    let result_note = if format_number(actual) == rounded.to_string() {
        format!("result: {}", expected_got(expected, rounded))
    } else {
        format!("result: {} ({} rounded)", expected_got(expected, rounded), format_number(actual))
    };

    Ok(combine([(formula_ok, formula_note), (result_ok, result_note)]))
}

/// sorted-order-and-extremum
fn sorted_and_max(
    ctx: &EvalContext<'_>,
    id: u32,
    field: &str,
    expected: f64,
    answer: Option<CellAddress>,
) -> Result<Verdict, RuleError> {
    let values = ctx.numeric_column(field)?;

    let break_point = values
        .iter()
        .tuple_windows()
        .find(|((_, a), (_, b))| b > a);
    let order_note = match break_point {
        None => "sorted from highest to lowest".to_string(),
        Some(((a_addr, a), (b_addr, b))) => format!(
            "not sorted from highest to lowest: {a_addr} ({}) is followed by {b_addr} ({})",
            format_number(*a),
            format_number(*b)
        ),
    };

    let max = values.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let mut checks = vec![
        (break_point.is_none(), order_note),
        (
            within(max, expected, EPSILON),
            format!("maximum: {}", expected_got(format_number(expected), format_number(max))),
        ),
    ];
    checks.extend(check_numeric_answer(ctx, id, answer, expected)?);
    Ok(combine(checks))
}

/// count-at-extremum
fn count_at_max(
    ctx: &EvalContext<'_>,
    id: u32,
    field: &str,
    expected: u32,
    answer: Option<CellAddress>,
) -> Result<Verdict, RuleError> {
    let values = ctx.numeric_column(field)?;
    let max = values.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let count = values.iter().filter(|(_, v)| within(*v, max, EPSILON)).count();

    let mut checks = vec![(
        count == expected as usize,
        format!(
            "rows at the maximum ({}): {}",
            format_number(max),
            expected_got(expected, count)
        ),
    )];
    checks.extend(check_numeric_answer(ctx, id, answer, f64::from(expected))?);
    Ok(combine(checks))
}

/// lookup-by-key
#[allow(clippy::too_many_arguments)]
fn lookup_by_key(
    ctx: &EvalContext<'_>,
    id: u32,
    key_field: &str,
    key: &str,
    value_field: &str,
    expected: &str,
    case: CaseMode,
    answer: Option<CellAddress>,
) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;
    let value_col = ctx.column(value_field)?;
    let key = key.trim();
    let rows: Vec<u32> = ctx
        .text_column(key_field)?
        .into_iter()
        .filter(|(_, text)| text == key)
        .map(|(row, _)| row)
        .collect();

    let row = match rows.as_slice() {
        [] => return Ok(Verdict::incorrect(format!("Key {key} not found"))),
        [row] => *row,
        many => {
            return Ok(Verdict::incorrect(format!(
                "Key {key} appears in rows {}; the lookup is ambiguous",
                many.iter().join(", ")
            )));
        }
    };

    let found = sheet.value(CellAddress::new(value_col, row)).as_text();
    let mut checks = vec![(
        case.matches(&found, expected),
        format!("{key} in row {row}: {}", expected_got(expected, found.trim())),
    )];
    if let Some(addr) = answer {
        let given = ctx.text_answer(id, addr)?;
        checks.push((
            case.matches(&given, expected),
            format!("answer: {}", expected_got(expected, given.trim())),
        ));
    }
    Ok(combine(checks))
}

/// `FF0000` and `ff0000` both mean opaque red.
fn normalize_argb(color: &str) -> String {
    let color = color.trim().trim_start_matches('#').to_ascii_uppercase();
    if color.len() == 6 {
        format!("FF{color}")
    } else {
        color
    }
}

/// Whether a rule operand equals the configured threshold literal.
fn same_threshold(operand: &str, threshold: &str) -> bool {
    let operand = operand.trim().trim_matches('"');
    let threshold = threshold.trim().trim_matches('"');
    match (operand.parse::<f64>(), threshold.parse::<f64>()) {
        (Ok(a), Ok(b)) => within(a, b, EPSILON),
        _ => operand.eq_ignore_ascii_case(threshold),
    }
}

/// conditional-format-rule
fn conditional_format(
    ctx: &EvalContext<'_>,
    field: &str,
    operator: &str,
    threshold: &str,
    font_color: &str,
) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;
    ctx.column(field)?;
    let target = ctx
        .layout
        .data_range(field, sheet)
        .ok_or_else(|| RuleError::EmptyColumn(field.to_string()))?;
    let color = normalize_argb(font_color);

    let candidates: Vec<_> = sheet
        .conditional_rules()
        .iter()
        .filter(|r| r.ranges.iter().any(|range| range.covers(&target)))
        .collect();
    if candidates.is_empty() {
        return Ok(Verdict::incorrect(format!("No conditional format covers {target}")));
    }

    let mut closest: Option<Vec<String>> = None;
    for rule in candidates {
        let mut misses = Vec::new();
        let predicate_ok = rule.rule_type == "cellIs"
            && rule
                .operator
                .as_deref()
                .is_some_and(|op| op.eq_ignore_ascii_case(operator));
        if !predicate_ok {
            misses.push(format!(
                "predicate is {} {} instead of cellIs {operator}",
                rule.rule_type,
                rule.operator.as_deref().unwrap_or("-")
            ));
        }
        match rule.formulas.first() {
            Some(f) if same_threshold(f, threshold) => {}
            Some(f) => misses.push(format!("threshold is {f} instead of {threshold}")),
            None => misses.push("no threshold".to_string()),
        }
        match rule.font_color.as_deref().map(normalize_argb) {
            Some(c) if c == color => {}
            Some(c) => misses.push(format!("font color is {c} instead of {color}")),
            None => misses.push("no font color".to_string()),
        }

        if misses.is_empty() {
            return Ok(Verdict::correct(format!(
                "Values {operator} {threshold} in {target} are shown in {color}"
            )));
        }
        if closest.as_ref().is_none_or(|c| misses.len() < c.len()) {
            closest = Some(misses);
        }
    }

    Ok(Verdict::incorrect(format!(
        "Conditional format on {target}: {}",
        closest.unwrap_or_default().join(", ")
    )))
}

/// chart-presence
fn chart_presence(ctx: &EvalContext<'_>, accepted: &[ChartKind]) -> Result<Verdict, RuleError> {
    let wanted = accepted.iter().join("/");
    if let Some(chart) = ctx.submission.charts().find(|c| accepted.contains(&c.kind)) {
        return Ok(Verdict::correct(format!(
            "Found a {} chart on sheet {}",
            chart.kind, chart.sheet
        )));
    }
    let found = ctx.submission.charts().map(|c| c.kind.to_string()).join(", ");
    Ok(Verdict::incorrect(if found.is_empty() {
        format!("No {wanted} chart found; the workbook has no charts")
    } else {
        format!("No {wanted} chart found; charts present: {found}")
    }))
}

/// number-format-range
fn number_format(ctx: &EvalContext<'_>, field: &str, format: &str) -> Result<Verdict, RuleError> {
    let sheet = ctx.data_sheet()?;
    let col = ctx.column(field)?;
    let rows = ctx.layout.data_rows(sheet);
    if rows.is_empty() {
        return Err(RuleError::EmptyColumn(field.to_string()));
    }

    for row in rows {
        let addr = CellAddress::new(col, row);
        let cell = sheet.cell(addr);
        if !matches!(cell.value, CellValue::Date(_)) {
            return Ok(Verdict::incorrect(format!(
                "{addr} is not a date (holds '{}')",
                cell.value
            )));
        }
        if !cell.number_format().eq_ignore_ascii_case(format) {
            return Ok(Verdict::incorrect(format!(
                "{addr} is shown as '{}' instead of '{format}'",
                cell.number_format()
            )));
        }
    }
    Ok(Verdict::correct(format!(
        "Every date in column {} uses '{format}'",
        column_letter(col)
    )))
}
