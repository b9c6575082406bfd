//! Format-aware normalization of raw document bytes.
//!
//! Turns vendor uploads into one of two shapes the extraction strategies
//! consume: an ordered list of [`RowRecord`]s for tabular sources, or a
//! best-effort plain-text rendering for everything else. No vendor
//! knowledge lives here; strategies decide what the rows or text mean.
//!
//! Spreadsheets are read sheet by sheet and concatenated: all sheets, in
//! workbook order, preserving row order within and across sheets. Each
//! sheet's first non-empty row supplies the column headers for the rows
//! below it.

use std::io::Read;

/// Declared or inferred shape of a submitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Spreadsheet,
    Pdf,
    WordDocument,
    LegacyWord,
    PlainText,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Spreadsheet => "spreadsheet",
            ContentKind::Pdf => "pdf",
            ContentKind::WordDocument => "word",
            ContentKind::LegacyWord => "legacy-word",
            ContentKind::PlainText => "text",
        }
    }

    /// Parse a stored kind string or a user-supplied `--kind` value.
    pub fn parse(s: &str) -> Option<ContentKind> {
        match s.to_lowercase().as_str() {
            "spreadsheet" | "xlsx" | "xls" | "excel" => Some(ContentKind::Spreadsheet),
            "pdf" => Some(ContentKind::Pdf),
            "word" | "docx" => Some(ContentKind::WordDocument),
            "legacy-word" | "doc" => Some(ContentKind::LegacyWord),
            "text" | "txt" | "plain" => Some(ContentKind::PlainText),
            _ => None,
        }
    }

    /// Best-effort kind from a file extension; plain text when unknown.
    pub fn infer_from_path(path: &std::path::Path) -> ContentKind {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xls" | "xlsm" => ContentKind::Spreadsheet,
            "pdf" => ContentKind::Pdf,
            "docx" => ContentKind::WordDocument,
            "doc" => ContentKind::LegacyWord,
            _ => ContentKind::PlainText,
        }
    }
}

/// Whether normalized content is tabular or free text. Strategies declare
/// which shapes they handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    Rows,
    Text,
}

/// One row of a tabular source: ordered `(header, value)` cells.
///
/// Headers come from the owning sheet's first non-empty row; positions
/// without a header get a synthesized `colN` name so values stay
/// addressable by position.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub cells: Vec<(String, String)>,
}

impl RowRecord {
    /// Value under a header, matched case-insensitively. Empty values
    /// count as absent.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h.trim().eq_ignore_ascii_case(header))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value under any of the given exact headers.
    pub fn get_any(&self, headers: &[&str]) -> Option<&str> {
        headers.iter().find_map(|h| self.get(h))
    }

    /// Index of the first cell whose header contains any needle
    /// (case-insensitive substring).
    pub fn find_containing(&self, needles: &[&str]) -> Option<usize> {
        self.cells.iter().position(|(h, _)| {
            let h = h.to_lowercase();
            needles.iter().any(|n| h.contains(n))
        })
    }

    /// Trimmed non-empty value at a cell position.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.cells
            .get(index)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// All trimmed values, including empty ones, in cell order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, v)| v.trim())
    }
}

/// Output of normalization: rows for tabular sources, text for the rest.
#[derive(Debug, Clone)]
pub enum NormalizedContent {
    Rows(Vec<RowRecord>),
    Text(String),
}

impl NormalizedContent {
    pub fn shape(&self) -> ContentShape {
        match self {
            NormalizedContent::Rows(_) => ContentShape::Rows,
            NormalizedContent::Text(_) => ContentShape::Text,
        }
    }
}

/// Maximum sheets to process in one workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Normalization error. `UnsupportedFormat` and `EmptyContent` are fatal
/// for the processing run.
#[derive(Debug)]
pub enum NormalizeError {
    UnsupportedFormat(String),
    EmptyContent,
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeError::UnsupportedFormat(kind) => {
                write!(f, "unsupported document format: {}", kind)
            }
            NormalizeError::EmptyContent => write!(f, "no extractable rows or text in document"),
            NormalizeError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            NormalizeError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Normalize raw bytes for the declared kind. Rows for spreadsheets, text
/// for everything readable; errors for formats with no reader or with
/// nothing to extract.
pub fn normalize(bytes: &[u8], kind: ContentKind) -> Result<NormalizedContent, NormalizeError> {
    match kind {
        ContentKind::Spreadsheet => {
            let rows = workbook_rows(bytes)?;
            if rows.is_empty() {
                return Err(NormalizeError::EmptyContent);
            }
            Ok(NormalizedContent::Rows(rows))
        }
        ContentKind::Pdf => text_content(extract_pdf(bytes)?),
        ContentKind::WordDocument => text_content(extract_docx(bytes)?),
        ContentKind::PlainText => text_content(String::from_utf8_lossy(bytes).into_owned()),
        ContentKind::LegacyWord => Err(NormalizeError::UnsupportedFormat(
            "legacy binary .doc (convert to .docx)".to_string(),
        )),
    }
}

fn text_content(text: String) -> Result<NormalizedContent, NormalizeError> {
    if text.trim().is_empty() {
        return Err(NormalizeError::EmptyContent);
    }
    Ok(NormalizedContent::Text(text))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, NormalizeError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| NormalizeError::Pdf(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, NormalizeError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| NormalizeError::Ooxml(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| NormalizeError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(NormalizeError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

// ============ docx ============

fn extract_docx(bytes: &[u8]) -> Result<String, NormalizeError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| NormalizeError::Ooxml(e.to_string()))?;
    if archive.by_name("word/document.xml").is_err() {
        return Err(NormalizeError::Ooxml(
            "word/document.xml not found".to_string(),
        ));
    }
    let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    extract_w_t_elements(&doc_xml)
}

/// Collect `w:t` run text, inserting a newline at each paragraph end so
/// line-oriented instruction sets see the document's visual rows.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, NormalizeError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_t = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"p" => {
                    if !out.ends_with('\n') && !out.is_empty() {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(NormalizeError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

// ============ xlsx ============

#[derive(Clone, Copy, PartialEq)]
enum CellType {
    Value,
    SharedString,
    InlineString,
    Boolean,
}

/// All rows from all sheets, in workbook order, each sheet keyed by its
/// own first non-empty row.
fn workbook_rows(bytes: &[u8]) -> Result<Vec<RowRecord>, NormalizeError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| NormalizeError::Ooxml(e.to_string()))?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_names = list_worksheet_names(&mut archive)?;
    if sheet_names.is_empty() {
        return Err(NormalizeError::Ooxml("workbook has no worksheets".to_string()));
    }

    let mut records = Vec::new();
    for name in sheet_names.into_iter().take(XLSX_MAX_SHEETS) {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let grid = parse_sheet_grid(&sheet_xml, &shared_strings)?;
        records.extend(grid_to_records(grid));
    }
    Ok(records)
}

fn list_worksheet_names(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, NormalizeError> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    Ok(names)
}

/// Shared strings, one entry per `<si>` with all its `<t>` runs joined.
/// A workbook without the part (all-numeric sheets) yields an empty table.
fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, NormalizeError> {
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(NormalizeError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Walk one sheet's `<row>`/`<c>`/`<v>` structure into a dense grid of
/// cell strings. Shared-string and inline-string cells resolve to text;
/// numeric cells keep their raw representation.
fn parse_sheet_grid(
    xml: &[u8],
    shared_strings: &[String],
) -> Result<Vec<Vec<String>>, NormalizeError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut current: Vec<String> = Vec::new();
    let mut in_row = false;
    let mut in_v = false;
    let mut in_inline_t = false;
    let mut cell_col: usize = 0;
    let mut next_col: usize = 0;
    let mut cell_type = CellType::Value;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    current.clear();
                    next_col = 0;
                }
                b"c" if in_row => {
                    cell_type = CellType::Value;
                    cell_col = next_col;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                if let Some(col) = column_index(attr.value.as_ref()) {
                                    cell_col = col;
                                }
                            }
                            b"t" => {
                                cell_type = match attr.value.as_ref() {
                                    b"s" => CellType::SharedString,
                                    b"inlineStr" => CellType::InlineString,
                                    b"b" => CellType::Boolean,
                                    _ => CellType::Value,
                                };
                            }
                            _ => {}
                        }
                    }
                    next_col = cell_col + 1;
                }
                b"v" => in_v = true,
                b"t" if cell_type == CellType::InlineString => in_inline_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_v || in_inline_t => {
                let raw = te.unescape().unwrap_or_default().into_owned();
                let value = if in_inline_t {
                    raw
                } else {
                    match cell_type {
                        CellType::SharedString => raw
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared_strings.get(i).cloned())
                            .unwrap_or_default(),
                        CellType::Boolean => {
                            if raw.trim() == "1" {
                                "TRUE".to_string()
                            } else {
                                "FALSE".to_string()
                            }
                        }
                        _ => raw,
                    }
                };
                set_cell(&mut current, cell_col, value);
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = false;
                    rows.push(std::mem::take(&mut current));
                }
                b"v" => in_v = false,
                b"t" => in_inline_t = false,
                b"c" => {
                    in_v = false;
                    in_inline_t = false;
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(NormalizeError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn set_cell(row: &mut Vec<String>, col: usize, value: String) {
    if row.len() <= col {
        row.resize(col + 1, String::new());
    }
    row[col] = value;
}

/// 0-based column index from an A1-style cell reference ("B12" -> 1).
fn column_index(cell_ref: &[u8]) -> Option<usize> {
    let mut col: usize = 0;
    let mut seen_letter = false;
    for &b in cell_ref {
        if b.is_ascii_alphabetic() {
            seen_letter = true;
            col = col * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize;
        } else {
            break;
        }
    }
    if seen_letter {
        Some(col - 1)
    } else {
        None
    }
}

/// Key a sheet's rows by its first non-empty row. Positions past the
/// header row keep a synthesized `colN` name.
fn grid_to_records(grid: Vec<Vec<String>>) -> Vec<RowRecord> {
    let mut rows = grid
        .into_iter()
        .skip_while(|r| r.iter().all(|v| v.trim().is_empty()));

    let headers: Vec<String> = match rows.next() {
        Some(h) => h,
        None => return Vec::new(),
    };

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let cells = row
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let header = headers
                    .get(i)
                    .map(|h| h.trim())
                    .filter(|h| !h.is_empty())
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| format!("col{}", i + 1));
                (header, value)
            })
            .collect();
        records.push(RowRecord { cells });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_xlsx(sheets: &[&str], shared: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let opts = zip::write::SimpleFileOptions::default();
            if !shared.is_empty() {
                zip.start_file("xl/sharedStrings.xml", opts).unwrap();
                let mut sst = String::from("<?xml version=\"1.0\"?><sst>");
                for s in shared {
                    sst.push_str(&format!("<si><t>{}</t></si>", s));
                }
                sst.push_str("</sst>");
                zip.write_all(sst.as_bytes()).unwrap();
            }
            for (i, body) in sheets.iter().enumerate() {
                zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), opts)
                    .unwrap();
                let xml = format!(
                    "<?xml version=\"1.0\"?><worksheet><sheetData>{}</sheetData></worksheet>",
                    body
                );
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn build_docx(phrases: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            let paras: String = phrases
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                paras
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn legacy_word_is_unsupported() {
        let err = normalize(b"\xd0\xcf\x11\xe0", ContentKind::LegacyWord).unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_text_is_empty_content() {
        let err = normalize(b"   \n\t ", ContentKind::PlainText).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyContent));
    }

    #[test]
    fn plain_text_passes_through() {
        let content = normalize(b"PO 123\nWidget x5", ContentKind::PlainText).unwrap();
        match content {
            NormalizedContent::Text(t) => assert!(t.contains("Widget x5")),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = normalize(b"not a pdf", ContentKind::Pdf).unwrap_err();
        assert!(matches!(err, NormalizeError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_spreadsheet() {
        let err = normalize(b"not a zip", ContentKind::Spreadsheet).unwrap_err();
        assert!(matches!(err, NormalizeError::Ooxml(_)));
    }

    #[test]
    fn docx_text_keeps_paragraph_lines() {
        let bytes = build_docx(&["PO Number: 42", "Widget 100g x5"]);
        let content = normalize(&bytes, ContentKind::WordDocument).unwrap();
        match content {
            NormalizedContent::Text(t) => {
                assert!(t.contains("PO Number: 42\n"));
                assert!(t.contains("Widget 100g x5"));
            }
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn xlsx_rows_keyed_by_header() {
        let sheet = concat!(
            "<row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c><c r=\"B1\" t=\"s\"><v>1</v></c><c r=\"C1\" t=\"s\"><v>2</v></c></row>",
            "<row r=\"2\"><c r=\"A2\" t=\"s\"><v>3</v></c><c r=\"B2\" t=\"s\"><v>4</v></c><c r=\"C2\"><v>5</v></c></row>",
        );
        let bytes = build_xlsx(&[sheet], &["Item Code", "Product Name", "Qty", "A1", "Widget"]);
        let content = normalize(&bytes, ContentKind::Spreadsheet).unwrap();
        let rows = match content {
            NormalizedContent::Rows(r) => r,
            _ => panic!("expected rows"),
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("item code"), Some("A1"));
        assert_eq!(rows[0].get("Product Name"), Some("Widget"));
        assert_eq!(rows[0].get("Qty"), Some("5"));
    }

    #[test]
    fn xlsx_all_sheets_concatenated_in_order() {
        let sheet1 = concat!(
            "<row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c></row>",
            "<row r=\"2\"><c r=\"A2\" t=\"s\"><v>1</v></c></row>",
        );
        let sheet2 = concat!(
            "<row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c></row>",
            "<row r=\"2\"><c r=\"A2\" t=\"s\"><v>2</v></c></row>",
        );
        let bytes = build_xlsx(&[sheet1, sheet2], &["SKU", "first", "second"]);
        let content = normalize(&bytes, ContentKind::Spreadsheet).unwrap();
        let rows = match content {
            NormalizedContent::Rows(r) => r,
            _ => panic!("expected rows"),
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("SKU"), Some("first"));
        assert_eq!(rows[1].get("SKU"), Some("second"));
    }

    #[test]
    fn xlsx_with_only_headers_is_empty_content() {
        let sheet = "<row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c></row>";
        let bytes = build_xlsx(&[sheet], &["SKU"]);
        let err = normalize(&bytes, ContentKind::Spreadsheet).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyContent));
    }

    #[test]
    fn xlsx_gap_columns_fall_back_to_positional_names() {
        // Value in column D with only a two-column header row.
        let sheet = concat!(
            "<row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c><c r=\"B1\" t=\"s\"><v>1</v></c></row>",
            "<row r=\"2\"><c r=\"A2\" t=\"s\"><v>2</v></c><c r=\"D2\"><v>9</v></c></row>",
        );
        let bytes = build_xlsx(&[sheet], &["Code", "Name", "X1"]);
        let content = normalize(&bytes, ContentKind::Spreadsheet).unwrap();
        let rows = match content {
            NormalizedContent::Rows(r) => r,
            _ => panic!("expected rows"),
        };
        assert_eq!(rows[0].get("Code"), Some("X1"));
        assert_eq!(rows[0].get("col4"), Some("9"));
    }

    #[test]
    fn column_index_parses_references() {
        assert_eq!(column_index(b"A1"), Some(0));
        assert_eq!(column_index(b"D12"), Some(3));
        assert_eq!(column_index(b"AA3"), Some(26));
        assert_eq!(column_index(b"12"), None);
    }
}
