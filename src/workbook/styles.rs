//! `styles.xml` decoding: only the facets the grader inspects (number formats,
//! alignment, font color, differential font color).

use std::collections::HashMap;

use quick_xml::{
    events::{BytesStart, Event},
    reader::Reader,
};

use super::{Alignment, DocumentResult, HorizontalAlignment, VerticalAlignment};

/// Resolved `cellXfs` entry.
#[derive(Debug, Clone, Default)]
pub(crate) struct CellFormat {
    pub(crate) number_format: Option<String>,
    pub(crate) alignment:     Alignment,
    pub(crate) font_color:    Option<String>,
}

/// What the worksheet reader needs from `styles.xml`.
#[derive(Debug, Default)]
pub(crate) struct ParsedStyles {
    /// Indexed by the `s` attribute of a cell.
    pub(crate) cell_formats: Vec<CellFormat>,
    /// Font color of each `<dxf>`, indexed by `dxfId`.
    pub(crate) dxf_colors:   Vec<Option<String>>,
}

impl ParsedStyles {
    /// The format for style index `s`, or the default one.
    pub(crate) fn cell_format(&self, index: Option<usize>) -> CellFormat {
        index
            .and_then(|i| self.cell_formats.get(i))
            .cloned()
            .unwrap_or_default()
    }
}

/// Raw `<xf>` ids before resolution.
#[derive(Debug, Default)]
struct RawXf {
    /// `numFmtId` attribute.
    num_fmt_id: u32,
    /// `fontId` attribute.
    font_id:    usize,
    /// Nested `<alignment>`.
    alignment:  Alignment,
}

/// Top-level collection currently being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Between collections.
    None,
    /// `fonts`
    Fonts,
    /// `cellXfs`
    CellXfs,
    /// `dxfs`, the differential formats used by conditional formatting.
    Dxfs,
    /// `cellStyleXfs`, `fills`, `borders`, ...: children are ignored.
    Other,
}

/// Returns the unescaped value of attribute `key` (matched on local name).
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Code for a built-in number format id.
pub(crate) fn builtin_number_format(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

/// Whether a number format code renders dates or times.
///
/// Quoted literals, bracketed sections (`[Red]`, `[$-409]`) and escaped
/// characters are ignored before looking for date tokens.
pub(crate) fn is_date_format(code: &str) -> bool {
    let mut stripped = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '[' => {
                let mut inner = String::new();
                for q in chars.by_ref() {
                    if q == ']' {
                        break;
                    }
                    inner.push(q);
                }
                // elapsed-time sections such as [h] still mean a time
                if matches!(inner.to_ascii_lowercase().as_str(), "h" | "hh" | "m" | "mm" | "s" | "ss")
                {
                    stripped.push('h');
                }
            }
            '\\' => {
                chars.next();
            }
            other => stripped.push(other.to_ascii_lowercase()),
        }
    }
    if stripped == "general" {
        return false;
    }
    stripped.chars().any(|c| matches!(c, 'd' | 'm' | 'y' | 'h' | 's'))
}

/// Parses `xl/styles.xml`.
pub(crate) fn read_styles_xml(xml: &str) -> DocumentResult<ParsedStyles> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut num_fmts: HashMap<u32, String> = HashMap::new();
    let mut font_colors: Vec<Option<String>> = Vec::new();
    let mut raw_xfs: Vec<RawXf> = Vec::new();
    let mut dxf_colors: Vec<Option<String>> = Vec::new();

    let mut section = Section::None;
    let mut in_font = false;
    let mut in_xf = false;
    let mut in_dxf_font = false;

    loop {
        let (e, is_empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"fonts" | b"cellXfs" | b"dxfs" | b"cellStyleXfs" | b"fills" | b"borders"
                    | b"cellStyles" | b"colors" | b"extLst" => section = Section::None,
                    b"font" => {
                        in_font = false;
                        in_dxf_font = false;
                    }
                    b"xf" => in_xf = false,
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match (section, e.local_name().as_ref()) {
            (_, b"numFmt") => {
                let id = attr(&e, b"numFmtId").and_then(|v| v.parse::<u32>().ok());
                if let (Some(id), Some(code)) = (id, attr(&e, b"formatCode")) {
                    num_fmts.insert(id, code);
                }
            }
            (Section::None, b"fonts") if !is_empty => section = Section::Fonts,
            (Section::None, b"cellXfs") if !is_empty => section = Section::CellXfs,
            (Section::None, b"dxfs") if !is_empty => section = Section::Dxfs,
            (Section::None, b"cellStyleXfs" | b"fills" | b"borders" | b"cellStyles" | b"colors")
                if !is_empty =>
            {
                section = Section::Other
            }
            (Section::Fonts, b"font") => {
                font_colors.push(None);
                in_font = !is_empty;
            }
            (Section::Fonts, b"color") if in_font => {
                if let Some(last) = font_colors.last_mut() {
                    *last = attr(&e, b"rgb").map(|c| c.to_ascii_uppercase());
                }
            }
            (Section::CellXfs, b"xf") => {
                raw_xfs.push(RawXf {
                    num_fmt_id: attr(&e, b"numFmtId")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0),
                    font_id:    attr(&e, b"fontId").and_then(|v| v.parse().ok()).unwrap_or(0),
                    alignment:  Alignment::DEFAULT,
                });
                in_xf = !is_empty;
            }
            (Section::CellXfs, b"alignment") if in_xf => {
                if let Some(xf) = raw_xfs.last_mut() {
                    if let Some(h) = attr(&e, b"horizontal").and_then(|v| HorizontalAlignment::from_xml(&v))
                    {
                        xf.alignment.horizontal = h;
                    }
                    if let Some(v) = attr(&e, b"vertical").and_then(|v| VerticalAlignment::from_xml(&v))
                    {
                        xf.alignment.vertical = v;
                    }
                }
            }
            (Section::Dxfs, b"dxf") => dxf_colors.push(None),
            (Section::Dxfs, b"font") => in_dxf_font = !is_empty,
            (Section::Dxfs, b"color") if in_dxf_font => {
                if let Some(last) = dxf_colors.last_mut() {
                    *last = attr(&e, b"rgb").map(|c| c.to_ascii_uppercase());
                }
            }
            _ => {}
        }
    }

    let cell_formats = raw_xfs
        .into_iter()
        .map(|xf| CellFormat {
            number_format: num_fmts
                .get(&xf.num_fmt_id)
                .cloned()
                .or_else(|| builtin_number_format(xf.num_fmt_id).map(str::to_string))
                .filter(|code| code != "General"),
            alignment:     xf.alignment,
            font_color:    font_colors.get(xf.font_id).cloned().flatten(),
        })
        .collect();

    Ok(ParsedStyles {
        cell_formats,
        dxf_colors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_tokens_ignore_literals_and_colors() {
        assert!(is_date_format("dd/mm/yyyy"));
        assert!(is_date_format("[$-409]d-mmm-yy;@"));
        assert!(is_date_format("[h]:mm:ss"));
        assert!(!is_date_format("General"));
        assert!(!is_date_format("0.00"));
        assert!(!is_date_format("#,##0;[Red]#,##0"));
        assert!(!is_date_format("0 \"days\""));
    }

    #[test]
    fn resolves_cell_xfs_and_dxfs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><sz val="11"/><color rgb="ffff0000"/><name val="Calibri"/></font>
  </fonts>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" xfId="0" applyAlignment="1">
      <alignment horizontal="center" vertical="center"/>
    </xf>
    <xf numFmtId="14" fontId="0" xfId="0"/>
  </cellXfs>
  <dxfs count="1"><dxf><font><color rgb="FFFF0000"/></font></dxf></dxfs>
</styleSheet>"#;

        let styles = read_styles_xml(xml).expect("parse styles");
        assert_eq!(styles.cell_formats.len(), 3);
        assert_eq!(styles.cell_formats[0].number_format, None);

        let centered = &styles.cell_formats[1];
        assert!(centered.alignment.is_centered());
        assert_eq!(centered.number_format.as_deref(), Some("dd/mm/yyyy"));
        assert_eq!(centered.font_color.as_deref(), Some("FFFF0000"));

        assert_eq!(styles.cell_formats[2].number_format.as_deref(), Some("mm-dd-yy"));
        assert_eq!(styles.dxf_colors, vec![Some("FFFF0000".to_string())]);
    }
}
