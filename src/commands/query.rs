use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::QueryArgs;
use crate::commands::report::reconcile::{build_report, filter_report};
use crate::commands::report::snapshot::{load_inventory, load_sales_orders};
use crate::model::{DocumentRecord, ProductRecord, WorkOrderNode};
use crate::store::Store;

#[derive(Debug, Serialize)]
struct QueryResponse {
    filter: String,
    documents: Vec<DocumentRecord>,
    products: Vec<ProductRecord>,
    work_orders: Option<Vec<WorkOrderNode>>,
    marked_picked: usize,
}

pub fn run(args: QueryArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("wotrack.sqlite"));

    let store = Store::open(&db_path)?;

    let documents = store.list_documents(&args.filter)?;
    let listed_products = store.list_products(&args.filter)?;

    // Listing is pure; consumption is its own explicit operation, requested
    // by the caller for exactly the rows this listing returned.
    let marked_picked = if args.mark_picked {
        let ids = listed_products
            .iter()
            .map(|product| product.id)
            .collect::<Vec<i64>>();
        store.mark_picked(&ids)?
    } else {
        0
    };

    let work_orders = match (&args.sales_orders, &args.inventory) {
        (Some(sales_path), Some(inventory_path)) => {
            let sales = load_sales_orders(sales_path)?;
            let inventory = load_inventory(inventory_path)?;
            let picked_wos = store.picked_wo_numbers()?;
            let report = build_report(&sales, &inventory, &picked_wos);
            Some(filter_report(report, &args.filter))
        }
        _ => None,
    };

    info!(
        filter = %args.filter,
        documents = documents.len(),
        products = listed_products.len(),
        marked_picked,
        "query completed"
    );

    let response = QueryResponse {
        filter: args.filter.clone(),
        documents,
        products: listed_products
            .into_iter()
            .map(|product| product.record)
            .collect(),
        work_orders,
        marked_picked,
    };

    if args.json {
        write_json_response(&response)
    } else {
        write_text_response(&response)
    }
}

fn write_json_response(response: &QueryResponse) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, response)
        .context("failed to serialize query json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(response: &QueryResponse) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Documents: {}", response.documents.len())?;
    for document in &response.documents {
        writeln!(
            output,
            "  {}\t{}\t{}",
            document.order_id, document.file_name, document.file_path
        )?;
    }

    writeln!(output, "Products: {}", response.products.len())?;
    for product in &response.products {
        writeln!(
            output,
            "  {}\t{}\t{}",
            product.order_id,
            product.file_name,
            product.status.as_str()
        )?;
        for detail in &product.details {
            writeln!(
                output,
                "    {}\tqty={}\tsn={}\t{}",
                detail.product_number, detail.qty, detail.serial_number, detail.notes
            )?;
        }
    }

    if let Some(work_orders) = &response.work_orders {
        writeln!(output, "Work orders: {}", work_orders.len())?;
        for node in work_orders {
            writeln!(output, "  Work Order {}", node.wo_number)?;
            for row in &node.components {
                let stock = row
                    .stock_available
                    .map(|value| format!("{value}"))
                    .unwrap_or_else(|| "n/a".to_string());
                writeln!(
                    output,
                    "    \u{2514} {}\trequired={} stock={} status={} missing={} picked={} net={}",
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
    }

    if response.marked_picked > 0 {
        writeln!(output, "Marked picked: {}", response.marked_picked)?;
    }

    output.flush()?;
    Ok(())
}
