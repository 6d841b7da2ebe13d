use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::warn;

use crate::model::LineItem;

/// Items equal to this sentinel are shipping cost lines, never components.
pub(crate) const SHIPPING_CHARGE_SENTINEL: &str = "Forwarding Charge";

const REQUIRED_COLUMNS: [&str; 3] = ["Item", "Ordered", "Description"];

/// One table as emitted by the external segmentation command (tabula-style
/// JSON: an array of tables, each a grid of cells carrying text).
#[derive(Debug, Deserialize)]
pub(crate) struct SegmentedTable {
    #[serde(default)]
    pub page_number: Option<usize>,
    #[serde(default)]
    pub data: Vec<Vec<SegmentedCell>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SegmentedCell {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default)]
pub(crate) struct PdfExtraction {
    pub line_items: Vec<LineItem>,
    pub pages_skipped: usize,
    pub warnings: Vec<String>,
}

/// Extracts the cleaned `(item, ordered)` pairs of a work-order PDF. Errors
/// from the external tool surface as `Err`; the caller treats them as a
/// zero-row document rather than failing the batch.
pub(crate) fn extract_pdf_line_items(
    extractor_cmd: &str,
    pdf_path: &Path,
) -> Result<PdfExtraction> {
    let tables = run_segmentation_command(extractor_cmd, pdf_path)?;
    let pages = first_table_per_page(tables);
    Ok(clean_page_tables(&pages, &pdf_path.display().to_string()))
}

pub(crate) fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

fn run_segmentation_command(extractor_cmd: &str, pdf_path: &Path) -> Result<Vec<SegmentedTable>> {
    let output = Command::new(extractor_cmd)
        .arg("--pages")
        .arg("all")
        .arg("--format")
        .arg("JSON")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to execute {extractor_cmd} for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{extractor_cmd} returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    serde_json::from_slice(&output.stdout)
        .with_context(|| format!("failed to parse {extractor_cmd} output for {}", pdf_path.display()))
}

/// Keeps only the first table reported for each page, in page order. Tables
/// without a page number inherit their position in the output stream; those
/// positional fallbacks never suppress (or get suppressed by) a table with a
/// declared page number.
pub(crate) fn first_table_per_page(tables: Vec<SegmentedTable>) -> Vec<(usize, Vec<Vec<String>>)> {
    let mut seen_pages = HashSet::<(bool, usize)>::new();
    let mut pages = Vec::<(usize, Vec<Vec<String>>)>::new();

    for (index, table) in tables.into_iter().enumerate() {
        let declared = table.page_number.is_some();
        let page_number = table.page_number.unwrap_or(index + 1);
        if !seen_pages.insert((declared, page_number)) {
            continue;
        }

        let rows = table
            .data
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.text).collect())
            .collect();
        pages.push((page_number, rows));
    }

    pages.sort_by_key(|(page_number, _)| *page_number);
    pages
}

/// Validates and cleans per-page row grids: header schema check, blank
/// description filter, cross-page dedup, shipping sentinel removal. Filters
/// only remove rows; nothing not present in the source is emitted.
pub(crate) fn clean_page_tables(
    pages: &[(usize, Vec<Vec<String>>)],
    source: &str,
) -> PdfExtraction {
    let mut extraction = PdfExtraction::default();
    let mut tagged_rows = Vec::<(usize, LineItem)>::new();

    for (page_number, rows) in pages {
        if rows.len() < 2 {
            let message = format!("no valid table found on page {page_number} of {source}");
            warn!(page = *page_number, source = %source, "no valid table on page");
            extraction.warnings.push(message);
            extraction.pages_skipped += 1;
            continue;
        }

        let header = &rows[0];
        let Some(columns) = resolve_required_columns(header) else {
            let missing = missing_columns(header).join(", ");
            let message =
                format!("missing expected columns [{missing}] on page {page_number} of {source}");
            warn!(
                page = *page_number,
                source = %source,
                missing = %missing,
                "missing expected table columns"
            );
            extraction.warnings.push(message);
            extraction.pages_skipped += 1;
            continue;
        };

        for row in &rows[1..] {
            let description = cell_at(row, columns.description);
            if description.trim().is_empty() {
                continue;
            }

            tagged_rows.push((
                *page_number,
                LineItem {
                    item: cell_at(row, columns.item).trim().to_string(),
                    ordered_qty: cell_at(row, columns.ordered).trim().to_string(),
                },
            ));
        }
    }

    let mut seen = HashSet::<LineItem>::new();
    for (_page, line_item) in tagged_rows {
        if line_item.item == SHIPPING_CHARGE_SENTINEL {
            continue;
        }
        if seen.insert(line_item.clone()) {
            extraction.line_items.push(line_item);
        }
    }

    extraction
}

/// Serializes line items for storage, one tab-joined pair per line. Pairs
/// with an empty item or quantity are not stored.
pub(crate) fn serialize_line_items(line_items: &[LineItem]) -> String {
    line_items
        .iter()
        .filter(|pair| !pair.item.is_empty() && !pair.ordered_qty.is_empty())
        .map(|pair| format!("{}\t{}", pair.item, pair.ordered_qty))
        .collect::<Vec<String>>()
        .join("\n")
}

struct RequiredColumns {
    item: usize,
    ordered: usize,
    description: usize,
}

/// The header must be a superset of the required column set; extra columns
/// are ignored.
fn resolve_required_columns(header: &[String]) -> Option<RequiredColumns> {
    let position = |name: &str| {
        header
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(name))
    };

    Some(RequiredColumns {
        item: position("Item")?,
        ordered: position("Ordered")?,
        description: position("Description")?,
    })
}

fn missing_columns(header: &[String]) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .into_iter()
        .filter(|name| {
            !header
                .iter()
                .any(|cell| cell.trim().eq_ignore_ascii_case(name))
        })
        .collect()
}

fn cell_at(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}
