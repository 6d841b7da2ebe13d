use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;
use zip::read::ZipArchive;

use crate::model::ProductDetail;

/// A pick-list row needs product number, qty, serial number and notes.
const MIN_ROW_CELLS: usize = 4;

#[derive(Debug, Default)]
pub(crate) struct WordExtraction {
    pub details: Vec<ProductDetail>,
    pub rows_dropped: usize,
    pub warnings: Vec<String>,
}

/// Extracts the product rows of the first table in a Word pick-list. Errors
/// from the container or XML surface as `Err`; the caller treats them as a
/// zero-row document rather than failing the batch.
pub(crate) fn extract_word_product_details(docx_path: &Path) -> Result<WordExtraction> {
    let xml = read_document_xml(docx_path)?;
    let rows = parse_first_table(&xml)?;

    if rows.is_empty() {
        let mut extraction = WordExtraction::default();
        let message = format!("no tables found in {}", docx_path.display());
        warn!(source = %docx_path.display(), "no tables found in Word document");
        extraction.warnings.push(message);
        return Ok(extraction);
    }

    Ok(clean_product_rows(&rows, &docx_path.display().to_string()))
}

fn read_document_xml(docx_path: &Path) -> Result<String> {
    let file = File::open(docx_path)
        .with_context(|| format!("failed to open {}", docx_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read docx container {}", docx_path.display()))?;

    let mut entry = archive
        .by_name("word/document.xml")
        .with_context(|| format!("missing word/document.xml in {}", docx_path.display()))?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .with_context(|| format!("failed to read word/document.xml in {}", docx_path.display()))?;

    Ok(xml)
}

/// Segments the first `w:tbl` of a WordprocessingML body into rows of cell
/// text. Nested tables are flattened into their containing cell.
pub(crate) fn parse_first_table(xml: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_str(xml);

    let mut rows = Vec::<Vec<String>>::new();
    let mut current_row = Vec::<String>::new();
    let mut current_cell = String::new();

    let mut table_depth = 0usize;
    let mut in_row = false;
    let mut in_cell = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth == 1 => {
                    current_row = Vec::new();
                    in_row = true;
                }
                b"w:tc" if table_depth == 1 && in_row => {
                    current_cell = String::new();
                    in_cell = true;
                }
                b"w:t" if in_cell => in_text = true,
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => {
                if let Ok(decoded) = text.unescape() {
                    current_cell.push_str(&decoded);
                }
            }
            Ok(Event::End(element)) => match element.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:tc" if table_depth == 1 && in_cell => {
                    current_row.push(std::mem::take(&mut current_cell));
                    in_cell = false;
                }
                b"w:tr" if table_depth == 1 && in_row => {
                    rows.push(std::mem::take(&mut current_row));
                    in_row = false;
                }
                b"w:tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        return Ok(rows);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => bail!("malformed document.xml: {error}"),
            _ => {}
        }
    }

    Ok(rows)
}

/// Skips the header row, drops rows with too few cells, trims the rest. A
/// short row is skipped whole, never stored as a partial detail.
pub(crate) fn clean_product_rows(rows: &[Vec<String>], source: &str) -> WordExtraction {
    let mut extraction = WordExtraction::default();

    for (index, row) in rows.iter().skip(1).enumerate() {
        if row.len() < MIN_ROW_CELLS {
            let message = format!(
                "row {} in {source} has insufficient cells ({} < {MIN_ROW_CELLS})",
                index + 1,
                row.len()
            );
            warn!(row = index + 1, source = %source, cells = row.len(), "row has insufficient cells");
            extraction.warnings.push(message);
            extraction.rows_dropped += 1;
            continue;
        }

        extraction.details.push(ProductDetail {
            product_number: row[0].trim().to_string(),
            qty: row[1].trim().to_string(),
            serial_number: row[2].trim().to_string(),
            notes: row[3].trim().to_string(),
        });
    }

    extraction
}
