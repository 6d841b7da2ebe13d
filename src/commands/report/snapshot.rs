use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::model::{InventoryLine, SalesOrderLine};
use crate::util::read_to_string_with_fallback;

/// Marker prefix of aggregate rows in the sales-order export. Kept out of
/// the normalized table, otherwise sums would double-count.
const AGGREGATE_PREFIX: &str = "total";

const FORWARDING_MARKER: &str = "forwarding charge";

/// Loads and normalizes the open-sales-order snapshot. The component and
/// work-order columns are carried down from the last non-blank value by an
/// explicit state scan; an aggregate row clears the component state.
pub(crate) fn load_sales_orders(path: &Path) -> Result<Vec<SalesOrderLine>> {
    let text = read_to_string_with_fallback(path)
        .with_context(|| format!("failed to load sales-order snapshot {}", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read headers of {}", path.display()))?
        .clone();
    let wo_column = find_column(&headers, &["Num"]).unwrap_or(1);
    let qty_column = find_column(&headers, &["Qty"]).unwrap_or(2);

    let mut lines = Vec::<SalesOrderLine>::new();
    let mut component_state: Option<String> = None;
    let mut wo_state: Option<String> = None;

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unparseable csv row");
                continue;
            }
        };

        let leading = record.get(0).unwrap_or("").trim();
        if !leading.is_empty() {
            if leading.to_lowercase().starts_with(AGGREGATE_PREFIX) {
                component_state = None;
            } else {
                component_state = Some(leading.to_string());
            }
        }

        let raw_wo = record.get(wo_column).unwrap_or("").trim();
        if !raw_wo.is_empty() {
            wo_state = Some(raw_wo.to_string());
        }

        let Some(component_raw) = component_state.as_deref() else {
            continue;
        };
        let Some(wo_raw) = wo_state.as_deref() else {
            continue;
        };

        let component = component_raw.trim().to_lowercase();
        if component.contains(FORWARDING_MARKER) {
            continue;
        }

        let wo_number = wo_raw
            .strip_prefix("SO-")
            .unwrap_or(wo_raw)
            .trim()
            .to_string();

        let Some(required_qty) = parse_quantity(record.get(qty_column).unwrap_or("")) else {
            continue;
        };

        lines.push(SalesOrderLine {
            component,
            wo_number,
            required_qty,
        });
    }

    info!(
        path = %path.display(),
        lines = lines.len(),
        "loaded sales-order snapshot"
    );

    Ok(lines)
}

/// Loads the on-hand inventory snapshot: part numbers normalized the same
/// way as sales-order components, unparseable quantities discarded.
pub(crate) fn load_inventory(path: &Path) -> Result<Vec<InventoryLine>> {
    let text = read_to_string_with_fallback(path)
        .with_context(|| format!("failed to load inventory snapshot {}", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read headers of {}", path.display()))?
        .clone();
    let qty_column = find_column(&headers, &["On Hand", "OnHandQty"]).unwrap_or(1);

    let mut lines = Vec::<InventoryLine>::new();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unparseable csv row");
                continue;
            }
        };

        let part_number = record.get(0).unwrap_or("").trim().to_lowercase();
        if part_number.is_empty() {
            continue;
        }

        let Some(on_hand_qty) = parse_quantity(record.get(qty_column).unwrap_or("")) else {
            continue;
        };

        lines.push(InventoryLine {
            part_number,
            on_hand_qty,
        });
    }

    info!(
        path = %path.display(),
        lines = lines.len(),
        "loaded inventory snapshot"
    );

    Ok(lines)
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        names
            .iter()
            .any(|name| header.trim().eq_ignore_ascii_case(name))
    })
}

/// QuickBooks exports quantities with thousands separators.
pub(crate) fn parse_quantity(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
