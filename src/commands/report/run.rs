use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReportArgs;
use crate::model::WorkOrderNode;
use crate::store::Store;

use super::reconcile::{build_report, filter_report};
use super::snapshot::{load_inventory, load_sales_orders};

pub fn run(args: ReportArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("wotrack.sqlite"));

    // Both snapshots are loaded before any computation starts; a snapshot
    // failure is the one error class that prevents a report entirely.
    let sales = load_sales_orders(&args.sales_orders)?;
    let inventory = load_inventory(&args.inventory)?;

    let store = Store::open(&db_path)?;
    let picked_wos = store.picked_wo_numbers()?;

    let report = build_report(&sales, &inventory, &picked_wos);
    let report = filter_report(report, args.filter.as_deref().unwrap_or(""));

    info!(
        work_orders = report.len(),
        picked = picked_wos.len(),
        "reconciliation completed"
    );

    if args.json {
        write_json_report(&report)
    } else {
        write_text_report(&report)
    }
}

fn write_json_report(report: &[WorkOrderNode]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize report json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_report(report: &[WorkOrderNode]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    if report.is_empty() {
        writeln!(output, "No inventory data found for this work order.")?;
        output.flush()?;
        return Ok(());
    }

    for node in report {
        writeln!(output, "Work Order {}", node.wo_number)?;
        for row in &node.components {
            let stock = row
                .stock_available
                .map(|value| format!("{value}"))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                output,
                "  \u{2514} {}\trequired={} stock={} status={} missing={} picked={} net={}",
                row.component,
                row.required_qty,
                stock,
                row.status.as_str(),
                row.missing_qty,
                row.picked_qty,
                row.net_available,
            )?;
        }
    }

    output.flush()?;
    Ok(())
}
