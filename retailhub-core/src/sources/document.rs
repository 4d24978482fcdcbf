//! Tabular data embedded in a PDF document.
//!
//! Text runs are positioned by following the text matrix through the content
//! stream. Runs sharing a baseline form one row. The first row of the
//! document is the header, and each later run lands in the header column
//! whose horizontal span contains it, so blank cells stay blank. Copies of
//! the header at the top of later pages are skipped.

use super::{Locator, SourceAdapter, SourceError, SourceKind};
use crate::record::{RawRecord, RecordSet};
use lopdf::content::Content;
use lopdf::{Document, Object};
use tracing::{debug, info};

/// Runs whose baselines differ by less than this share a row.
const BASELINE_TOLERANCE: f32 = 2.0;

/// Runs starting this far left of a header still fall in its column.
const COLUMN_TOLERANCE: f32 = 2.0;

#[derive(Debug, Clone)]
struct TextRun {
    x: f32,
    y: f32,
    seq: usize,
    text: String,
}

/// Text-positioning state for one content stream.
#[derive(Debug, Default)]
struct TextState {
    line_x: f32,
    line_y: f32,
    leading: f32,
}

impl TextState {
    fn begin(&mut self) {
        self.line_x = 0.0;
        self.line_y = 0.0;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx;
        self.line_y += ty;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }
}

fn operand_f32(operands: &[Object], idx: usize) -> Option<f32> {
    operands.get(idx).and_then(|o| o.as_float().ok())
}

/// Decode a PDF string object: UTF-16BE with BOM, otherwise Latin-1.
fn decode_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let units: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            } else {
                Some(bytes.iter().map(|&b| b as char).collect())
            }
        }
        Object::Array(items) => {
            let joined: String = items.iter().filter_map(decode_string).collect();
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

fn page_runs(content: &Content) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut state = TextState::default();

    for (seq, op) in content.operations.iter().enumerate() {
        let shown = match op.operator.as_str() {
            "BT" => {
                state.begin();
                None
            }
            "Tm" => {
                if let (Some(e), Some(f)) = (operand_f32(&op.operands, 4), operand_f32(&op.operands, 5)) {
                    state.line_x = e;
                    state.line_y = f;
                }
                None
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (operand_f32(&op.operands, 0), operand_f32(&op.operands, 1)) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
                None
            }
            "TL" => {
                if let Some(l) = operand_f32(&op.operands, 0) {
                    state.leading = l;
                }
                None
            }
            "T*" => {
                state.next_line();
                None
            }
            "Tj" | "TJ" => op.operands.first().and_then(decode_string),
            "'" => {
                state.next_line();
                op.operands.first().and_then(decode_string)
            }
            "\"" => {
                state.next_line();
                op.operands.get(2).and_then(decode_string)
            }
            _ => None,
        };

        if let Some(text) = shown {
            let text = text.trim().to_string();
            if !text.is_empty() {
                runs.push(TextRun {
                    x: state.line_x,
                    y: state.line_y,
                    seq,
                    text,
                });
            }
        }
    }
    runs
}

/// Group runs into rows, top of page first, runs left to right.
fn group_rows(mut runs: Vec<TextRun>) -> Vec<Vec<TextRun>> {
    runs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.seq.cmp(&b.seq)));

    let mut rows: Vec<(f32, Vec<TextRun>)> = Vec::new();
    for run in runs {
        match rows.last_mut() {
            Some((baseline, cells)) if (*baseline - run.y).abs() < BASELINE_TOLERANCE => {
                cells.push(run)
            }
            _ => rows.push((run.y, vec![run])),
        }
    }

    rows.into_iter()
        .map(|(_, mut cells)| {
            cells.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.seq.cmp(&b.seq)));
            cells
        })
        .collect()
}

/// A header cell and the x position where its column starts.
#[derive(Debug, Clone)]
struct HeaderColumn {
    name: String,
    x: f32,
}

/// Index of the column whose span `[x, next column's x)` holds `x`.
/// Anything left of the first column belongs to it.
fn column_for(header: &[HeaderColumn], x: f32) -> usize {
    header
        .iter()
        .rposition(|h| x + COLUMN_TOLERANCE >= h.x)
        .unwrap_or(0)
}

/// Place each run under the header column it sits in. Runs sharing a column
/// are joined with a space; columns with no run are null.
fn to_record(header: &[HeaderColumn], cells: Vec<TextRun>) -> RawRecord {
    let mut parts: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    for cell in cells {
        if let Some(slot) = parts.get_mut(column_for(header, cell.x)) {
            slot.push(cell.text);
        }
    }
    let mut record = RawRecord::new();
    for (column, texts) in header.iter().zip(parts) {
        let joined = texts.join(" ");
        record.insert(column.name.as_str(), (!joined.is_empty()).then_some(joined));
    }
    record
}

fn is_header_copy(header: &[HeaderColumn], cells: &[TextRun]) -> bool {
    header.len() == cells.len() && header.iter().zip(cells).all(|(h, c)| h.name == c.text)
}

/// Extract the table spanning every page of a PDF, pages concatenated in order.
pub fn parse_pdf_table(bytes: &[u8]) -> Result<RecordSet, SourceError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| SourceError::Parse(format!("unreadable PDF: {e}")))?;
    if doc.is_encrypted() {
        return Err(SourceError::Parse("PDF is encrypted".into()));
    }

    let mut header: Option<Vec<HeaderColumn>> = None;
    let mut set = RecordSet::new();

    for (page_num, page_id) in doc.get_pages() {
        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| SourceError::Parse(format!("page {page_num}: {e}")))?;
        let content = Content::decode(&raw)
            .map_err(|e| SourceError::Parse(format!("page {page_num}: {e}")))?;
        let rows = group_rows(page_runs(&content));
        debug!(page = page_num, rows = rows.len(), "decoded PDF page");

        for cells in rows {
            match &header {
                None => {
                    let columns: Vec<HeaderColumn> = cells
                        .into_iter()
                        .map(|run| HeaderColumn {
                            name: run.text,
                            x: run.x,
                        })
                        .collect();
                    set = RecordSet::with_columns(columns.iter().map(|c| c.name.clone()).collect());
                    header = Some(columns);
                }
                Some(h) if is_header_copy(h, &cells) => {}
                Some(h) => set.push(to_record(h, cells)),
            }
        }
    }

    if header.is_none() {
        return Err(SourceError::Parse("document contains no tabular text".into()));
    }
    Ok(set)
}

/// A PDF document at a URL or local path.
pub struct DocumentAdapter {
    locator: Locator,
}

impl DocumentAdapter {
    pub fn new(locator: &str) -> Result<Self, SourceError> {
        Ok(Self {
            locator: Locator::parse(locator)?,
        })
    }
}

impl SourceAdapter for DocumentAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Document
    }

    fn describe(&self) -> String {
        format!("document {}", self.locator)
    }

    fn extract(&self) -> Result<RecordSet, SourceError> {
        let bytes = self.locator.fetch()?;
        let set = parse_pdf_table(&bytes)?;
        info!(locator = %self.locator, rows = set.len(), "read document table");
        Ok(set)
    }
}
