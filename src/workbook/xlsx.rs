//! Decoding of the xlsx container: shared strings, styles, worksheets and the
//! table/drawing/chart parts hanging off each worksheet.

use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use quick_xml::{events::Event, reader::Reader};
use tracing::debug;

use super::{
    CellAddress, CellRange, CellValue, ChartKind, ConditionalRule, DocumentError, DocumentResult,
    Sheet, Workbook,
    styles::{ParsedStyles, attr, is_date_format, read_styles_xml},
};

/// Relationship type suffixes the reader follows.
const REL_WORKSHEET: &str = "/worksheet";
/// Chart sheet relationship; such a sheet holds a single drawing.
const REL_CHARTSHEET: &str = "/chartsheet";
/// Table part relationship.
const REL_TABLE: &str = "/table";
/// Drawing part relationship.
const REL_DRAWING: &str = "/drawing";
/// Chart part relationship.
const REL_CHART: &str = "/chart";

/// A `<Relationship>` entry with its target already resolved to a part name.
#[derive(Debug, Clone)]
struct Relationship {
    /// `Id` attribute.
    id:       String,
    /// `Type` attribute.
    rel_type: String,
    /// Part name inside the archive, without a leading `/`.
    target:   String,
}

/// Opens `path` and decodes it into a [`Workbook`].
pub(crate) fn read_file(path: &Path) -> DocumentResult<Workbook> {
    if !path.exists() {
        return Err(DocumentError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    read(BufReader::new(file)).map_err(|e| match e {
        DocumentError::Io(_) | DocumentError::NotFound(_) => e,
        other => DocumentError::Corrupt(format!("{}: {other}", path.display())),
    })
}

/// Decodes a workbook from any seekable reader.
pub(crate) fn read<R: Read + Seek>(reader: R) -> DocumentResult<Workbook> {
    let mut archive = zip::ZipArchive::new(reader)?;

    if archive.by_name("[Content_Types].xml").is_err() {
        return Err(DocumentError::MissingPart("[Content_Types].xml".into()));
    }

    let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => read_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let styles = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => read_styles_xml(&xml)?,
        None => ParsedStyles::default(),
    };

    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| DocumentError::MissingPart("xl/workbook.xml".into()))?;
    let sheet_entries = read_sheet_entries(&workbook_xml)?;
    let workbook_rels = read_rels(&mut archive, "xl/workbook.xml")?;

    let mut workbook = Workbook::new();
    for (name, r_id) in sheet_entries {
        // dialog and macro sheets are skipped
        let Some(rel) = workbook_rels.iter().find(|r| {
            r.id == r_id
                && (r.rel_type.ends_with(REL_WORKSHEET) || r.rel_type.ends_with(REL_CHARTSHEET))
        }) else {
            continue;
        };
        let xml = read_part(&mut archive, &rel.target)?
            .ok_or_else(|| DocumentError::MissingPart(rel.target.clone()))?;

        let mut sheet = Sheet::new(name);
        if rel.rel_type.ends_with(REL_WORKSHEET) {
            read_worksheet(&xml, &mut sheet, &shared_strings, &styles)?;
        }
        read_worksheet_parts(&mut archive, &rel.target, &mut sheet)?;
        debug!(
            "read sheet `{}` ({} cells, {} charts)",
            sheet.name(),
            sheet.cells().count(),
            sheet.charts().len()
        );
        workbook.add_sheet(sheet);
    }

    Ok(workbook)
}

/// Reads a part as UTF-8 text; `None` when the archive does not contain it.
fn read_part<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> DocumentResult<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship `target` against the directory of `part`.
fn resolve_target(part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for piece in target.split('/') {
        match piece {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Reads the relationships of `part`; an absent rels file means none.
fn read_rels<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    part: &str,
) -> DocumentResult<Vec<Relationship>> {
    let Some(xml) = read_part(archive, &rels_path(part))? else {
        return Ok(Vec::new());
    };

    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                // external links (hyperlinks) have no part behind them
                if attr(&e, b"TargetMode").as_deref() == Some("External") {
                    continue;
                }
                if let (Some(id), Some(rel_type), Some(target)) =
                    (attr(&e, b"Id"), attr(&e, b"Type"), attr(&e, b"Target"))
                {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target: resolve_target(part, &target),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Decodes Excel's `_xHHHH_` escapes (`_x000d_` is a carriage return).
fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Reads the shared string table, concatenating rich-text runs and skipping
/// phonetic hints.
fn read_shared_strings(xml: &str) -> DocumentResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_t = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(decode_excel_escapes(&current)),
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Text(t) if in_t => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// Sheet names and relationship ids from `xl/workbook.xml`, in tab order.
fn read_sheet_entries(xml: &str) -> DocumentResult<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                // `r:id` is the only attribute whose local name is `id`
                if let (Some(name), Some(r_id)) = (attr(&e, b"name"), attr(&e, b"id")) {
                    sheets.push((name, r_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Element whose text content is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// Text is ignored.
    None,
    /// `<v>` of a cell.
    Value,
    /// `<f>` of a cell.
    Formula,
    /// `<t>` inside an inline string.
    InlineText,
    /// `<formula>` of a conditional-format rule.
    CfFormula,
}

/// A `<c>` element being assembled.
#[derive(Debug, Default)]
struct PendingCell {
    /// Resolved address.
    addr:       Option<CellAddress>,
    /// `t` attribute.
    cell_type:  Option<String>,
    /// `s` attribute.
    style:      Option<usize>,
    /// `<v>` text.
    value:      Option<String>,
    /// `<f>` text.
    formula:    Option<String>,
    /// `<is>` text.
    inline:     String,
}

/// Decodes one worksheet part into `sheet`.
fn read_worksheet(
    xml: &str,
    sheet: &mut Sheet,
    shared_strings: &[String],
    styles: &ParsedStyles,
) -> DocumentResult<()> {
    let mut reader = Reader::from_str(xml);

    let mut capture = Capture::None;
    let mut row: u32 = 0;
    let mut last_col: u32 = 0;
    let mut cell: Option<PendingCell> = None;
    let mut cf_sqref: Option<Vec<CellRange>> = None;
    let mut cf_rule: Option<ConditionalRule> = None;

    loop {
        let event = reader.read_event()?;
        let (e, is_empty) = match event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::Text(t) => {
                let text = t.unescape()?;
                match capture {
                    Capture::Value => {
                        if let Some(c) = cell.as_mut() {
                            c.value.get_or_insert_with(String::new).push_str(&text);
                        }
                    }
                    Capture::Formula => {
                        if let Some(c) = cell.as_mut() {
                            c.formula.get_or_insert_with(String::new).push_str(&text);
                        }
                    }
                    Capture::InlineText => {
                        if let Some(c) = cell.as_mut() {
                            c.inline.push_str(&text);
                        }
                    }
                    Capture::CfFormula => {
                        if let Some(rule) = cf_rule.as_mut() {
                            if let Some(last) = rule.formulas.last_mut() {
                                last.push_str(&text);
                            }
                        }
                    }
                    Capture::None => {}
                }
                continue;
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"v" | b"f" | b"t" | b"formula" => capture = Capture::None,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            store_cell(sheet, pending, shared_strings, styles);
                        }
                    }
                    b"cfRule" => {
                        if let (Some(rule), Some(ranges)) = (cf_rule.take(), cf_sqref.as_ref()) {
                            sheet.add_conditional_rule(ConditionalRule {
                                ranges: ranges.clone(),
                                ..rule
                            });
                        }
                    }
                    b"conditionalFormatting" => cf_sqref = None,
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"col" => {
                let min = attr(&e, b"min").and_then(|v| v.parse::<u32>().ok());
                let max = attr(&e, b"max").and_then(|v| v.parse::<u32>().ok());
                let width = attr(&e, b"width").and_then(|v| v.parse::<f64>().ok());
                if let (Some(min), Some(max), Some(width)) = (min, max, width) {
                    sheet.set_column_span_width(min, max, width);
                }
            }
            b"row" => {
                row = attr(&e, b"r")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(row + 1);
                last_col = 0;
            }
            b"c" => {
                let addr = match attr(&e, b"r") {
                    Some(r) => r.parse::<CellAddress>()?,
                    None => CellAddress::new(last_col + 1, row.max(1)),
                };
                last_col = addr.col;
                let pending = PendingCell {
                    addr: Some(addr),
                    cell_type: attr(&e, b"t"),
                    style: attr(&e, b"s").and_then(|v| v.parse().ok()),
                    ..PendingCell::default()
                };
                if is_empty {
                    store_cell(sheet, pending, shared_strings, styles);
                } else {
                    cell = Some(pending);
                }
            }
            b"v" if cell.is_some() && !is_empty => capture = Capture::Value,
            b"f" if cell.is_some() && !is_empty => capture = Capture::Formula,
            b"t" if cell.is_some() && !is_empty => capture = Capture::InlineText,
            b"autoFilter" => {
                if let Some(reference) = attr(&e, b"ref") {
                    sheet.set_auto_filter(reference);
                }
            }
            b"conditionalFormatting" if !is_empty => {
                cf_sqref = Some(
                    attr(&e, b"sqref")
                        .map(|s| CellRange::parse_list(&s))
                        .unwrap_or_default(),
                );
            }
            b"cfRule" if cf_sqref.is_some() => {
                let rule = ConditionalRule {
                    ranges:     Vec::new(),
                    rule_type:  attr(&e, b"type").unwrap_or_default(),
                    operator:   attr(&e, b"operator"),
                    formulas:   Vec::new(),
                    font_color: attr(&e, b"dxfId")
                        .and_then(|v| v.parse::<usize>().ok())
                        .and_then(|id| styles.dxf_colors.get(id).cloned().flatten()),
                };
                if is_empty {
                    if let Some(ranges) = cf_sqref.as_ref() {
                        sheet.add_conditional_rule(ConditionalRule {
                            ranges: ranges.clone(),
                            ..rule
                        });
                    }
                } else {
                    cf_rule = Some(rule);
                }
            }
            b"formula" if cf_rule.is_some() && !is_empty => {
                if let Some(rule) = cf_rule.as_mut() {
                    rule.formulas.push(String::new());
                }
                capture = Capture::CfFormula;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Converts an assembled `<c>` into a [`super::Cell`] and stores it. Empty
/// cells are only kept when they carry a style or a formula.
fn store_cell(
    sheet: &mut Sheet,
    pending: PendingCell,
    shared_strings: &[String],
    styles: &ParsedStyles,
) {
    let Some(addr) = pending.addr else {
        return;
    };
    let format = styles.cell_format(pending.style);

    let value = match (pending.cell_type.as_deref(), pending.value) {
        (Some("inlineStr"), _) => CellValue::Text(decode_excel_escapes(&pending.inline)),
        (_, None) => CellValue::Empty,
        (Some("s"), Some(v)) => v
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i))
            .map(|s| CellValue::Text(s.clone()))
            .unwrap_or_default(),
        (Some("str"), Some(v)) => CellValue::Text(decode_excel_escapes(&v)),
        (Some("b"), Some(v)) => CellValue::Bool(v.trim() == "1"),
        (Some("e"), Some(v)) => CellValue::Error(v),
        (Some("d"), Some(v)) => CellValue::Text(v),
        (_, Some(v)) => match v.trim().parse::<f64>() {
            Ok(n) if format.number_format.as_deref().is_some_and(is_date_format) => {
                CellValue::Date(n)
            }
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(v),
        },
    };

    if value == CellValue::Empty && pending.style.is_none() && pending.formula.is_none() {
        return;
    }

    let target = sheet.cell_mut(addr);
    target.value = value;
    target.number_format = format.number_format;
    target.alignment = format.alignment;
    target.font_color = format.font_color;
    target.formula = pending
        .formula
        .filter(|f| !f.trim().is_empty())
        .map(|f| f.strip_prefix('=').map(str::to_string).unwrap_or(f));
}

/// Follows a worksheet's or chart sheet's relationships to its tables and
/// charts.
fn read_worksheet_parts<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    sheet_part: &str,
    sheet: &mut Sheet,
) -> DocumentResult<()> {
    let rels = read_rels(archive, sheet_part)?;

    for rel in rels.iter().filter(|r| r.rel_type.ends_with(REL_TABLE)) {
        if let Some(xml) = read_part(archive, &rel.target)? {
            if let Some((name, reference)) = read_table(&xml)? {
                sheet.add_table(name, reference);
            }
        }
    }

    let mut kinds: Vec<ChartKind> = Vec::new();
    for drawing in rels.iter().filter(|r| r.rel_type.ends_with(REL_DRAWING)) {
        let drawing_rels = read_rels(archive, &drawing.target)?;
        for chart in drawing_rels.iter().filter(|r| r.rel_type.ends_with(REL_CHART)) {
            if let Some(xml) = read_part(archive, &chart.target)? {
                kinds.extend(read_chart_kinds(&xml)?);
            }
        }
    }
    for kind in kinds {
        sheet.add_chart(kind);
    }

    Ok(())
}

/// Name and `ref` of a table part.
fn read_table(xml: &str) -> DocumentResult<Option<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"table" => {
                let name = attr(&e, b"displayName")
                    .or_else(|| attr(&e, b"name"))
                    .unwrap_or_default();
                return Ok(attr(&e, b"ref").map(|reference| (name, reference)));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Plot kinds declared by a chart part. A combination chart yields one entry
/// per distinct plot type.
fn read_chart_kinds(xml: &str) -> DocumentResult<Vec<ChartKind>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut kinds = Vec::new();
    let mut in_plot_area = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let local = e.local_name();
                let tag = String::from_utf8_lossy(local.as_ref());
                if tag == "plotArea" {
                    in_plot_area = true;
                } else if in_plot_area {
                    if let Some(kind) = ChartKind::from_plot_tag(&tag) {
                        if !kinds.contains(&kind) {
                            kinds.push(kind);
                        }
                    }
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"plotArea" => in_plot_area = false,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rels_live_next_to_their_part() {
        assert_eq!(rels_path("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_path("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn targets_resolve_relative_to_the_owner() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "/xl/tables/table1.xml"),
            "xl/tables/table1.xml"
        );
    }

    #[test]
    fn escapes_decode_only_when_well_formed() {
        assert_eq!(decode_excel_escapes("a_x000D_b"), "a\rb");
        assert_eq!(decode_excel_escapes("_x005F_x000D_"), "_x000D_");
        assert_eq!(decode_excel_escapes("tax_xyz"), "tax_xyz");
        assert_eq!(decode_excel_escapes("plain"), "plain");
    }

    #[test]
    fn shared_strings_join_runs_and_skip_phonetics() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<si><t>Sentimiento</t></si>
<si><r><t>Linda </t></r><r><t>Lopez</t></r><rPh><t>x</t></rPh></si>
<si/>
</sst>"#;
        let strings = read_shared_strings(xml).expect("parse");
        assert_eq!(strings, vec!["Sentimiento", "Linda Lopez", ""]);
    }

    #[test]
    fn charts_report_each_plot_type_once() {
        let xml = r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea>
<c:barChart><c:barDir val="col"/></c:barChart>
<c:lineChart/><c:lineChart/>
<c:valAx/></c:plotArea></c:chart></c:chartSpace>"#;
        assert_eq!(
            read_chart_kinds(xml).expect("parse"),
            vec![ChartKind::Bar, ChartKind::Line]
        );
    }
}
