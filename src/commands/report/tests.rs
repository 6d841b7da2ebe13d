use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use super::reconcile::{build_report, filter_report};
use super::snapshot::{load_inventory, load_sales_orders, parse_quantity};
use crate::model::{ComponentStatus, InventoryLine, SalesOrderLine};

fn write_snapshot(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("snapshot written");
    path
}

fn sales_line(component: &str, wo_number: &str, required_qty: f64) -> SalesOrderLine {
    SalesOrderLine {
        component: component.to_string(),
        wo_number: wo_number.to_string(),
        required_qty,
    }
}

fn inventory_line(part_number: &str, on_hand_qty: f64) -> InventoryLine {
    InventoryLine {
        part_number: part_number.to_string(),
        on_hand_qty,
    }
}

fn picked(wo_numbers: &[&str]) -> HashSet<String> {
    wo_numbers.iter().map(|wo| wo.to_string()).collect()
}

#[test]
fn load_sales_orders_carries_components_down_and_drops_aggregates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_snapshot(
        &dir,
        "open_sales_orders.csv",
        b",Num,Qty\n\
          Widget-A,,\n\
          ,SO-1001,10\n\
          ,SO-1002,5\n\
          Total Widget-A,,15\n\
          ,SO-1003,7\n\
          Chassis-7,,\n\
          ,1003,2\n",
    );

    let lines = load_sales_orders(&path).expect("snapshot loads");

    // The aggregate row clears the carry-down state, so the SO-1003 row
    // between the two blocks has no component and is discarded.
    assert_eq!(
        lines,
        vec![
            sales_line("widget-a", "1001", 10.0),
            sales_line("widget-a", "1002", 5.0),
            sales_line("chassis-7", "1003", 2.0),
        ]
    );
}

#[test]
fn load_sales_orders_discards_forwarding_and_unparseable_quantities() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_snapshot(
        &dir,
        "open_sales_orders.csv",
        b",Num,Qty\n\
          Forwarding Charge,,\n\
          ,SO-1001,1\n\
          Widget-A,,\n\
          ,SO-1001,ten\n\
          ,SO-1002,\"1,500\"\n\
          ,SO-1004,3\n",
    );

    let lines = load_sales_orders(&path).expect("snapshot loads");

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], sales_line("widget-a", "1002", 1500.0));
    assert_eq!(lines[1], sales_line("widget-a", "1004", 3.0));
}

#[test]
fn load_inventory_normalizes_part_numbers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_snapshot(
        &dir,
        "wh01s.csv",
        b",On Hand\n\
          \x20Widget-A ,6\n\
          CHASSIS-7,12\n\
          ,9\n\
          Fan-12,lots\n",
    );

    let lines = load_inventory(&path).expect("snapshot loads");

    assert_eq!(
        lines,
        vec![
            inventory_line("widget-a", 6.0),
            inventory_line("chassis-7", 12.0),
        ]
    );
}

#[test]
fn snapshots_fall_back_to_windows_1252_decoding() {
    let dir = tempfile::tempdir().expect("tempdir");
    // 0xE9 is "é" in Windows-1252 and invalid UTF-8 on its own.
    let path = write_snapshot(
        &dir,
        "open_sales_orders.csv",
        b",Num,Qty\nR\xE9sistor,,\n,SO-1001,4\n",
    );

    let lines = load_sales_orders(&path).expect("fallback decoding succeeds");

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].component, "r\u{e9}sistor");
    assert_eq!(lines[0].required_qty, 4.0);
}

#[test]
fn parse_quantity_strips_thousands_separators() {
    assert_eq!(parse_quantity("1,500"), Some(1500.0));
    assert_eq!(parse_quantity(" 7 "), Some(7.0));
    assert_eq!(parse_quantity(""), None);
    assert_eq!(parse_quantity("n/a"), None);
}

#[test]
fn shortage_missing_qty_is_required_minus_stock() {
    let report = build_report(
        &[sales_line("widget-a", "1001", 10.0)],
        &[inventory_line("widget-a", 6.0)],
        &picked(&[]),
    );

    assert_eq!(report.len(), 1);
    let row = &report[0].components[0];
    assert_eq!(row.status, ComponentStatus::Shortage);
    assert_eq!(row.missing_qty, 4.0);
    assert_eq!(row.stock_available, Some(6.0));
}

#[test]
fn available_components_carry_zero_missing_qty() {
    let report = build_report(
        &[sales_line("widget-a", "1001", 4.0)],
        &[inventory_line("widget-a", 6.0)],
        &picked(&[]),
    );

    let row = &report[0].components[0];
    assert_eq!(row.status, ComponentStatus::Available);
    assert_eq!(row.missing_qty, 0.0);
}

#[test]
fn unmatched_components_are_kept_with_stock_absent_and_forced_shortage() {
    let report = build_report(
        &[sales_line("mystery-part", "1001", 3.0)],
        &[inventory_line("widget-a", 6.0)],
        &picked(&[]),
    );

    let row = &report[0].components[0];
    assert_eq!(row.stock_available, None);
    assert_eq!(row.status, ComponentStatus::Shortage);
    assert_eq!(row.missing_qty, 3.0);
}

#[test]
fn picked_qty_is_a_global_drawdown_across_picked_work_orders() {
    let sales = vec![
        sales_line("widget-a", "1001", 10.0),
        sales_line("widget-a", "1002", 5.0),
        sales_line("widget-a", "1003", 2.0),
    ];
    let inventory = vec![inventory_line("widget-a", 20.0)];

    let report = build_report(&sales, &inventory, &picked(&["1001", "1003"]));

    // Every row referencing the component carries the same component-level
    // picked and net values, regardless of which work order it sits under.
    for node in &report {
        for row in &node.components {
            assert_eq!(row.picked_qty, 12.0);
            assert_eq!(row.net_available, 8.0);
        }
    }
}

#[test]
fn net_available_is_on_hand_minus_picked_even_without_inventory_match() {
    let sales = vec![
        sales_line("mystery-part", "1001", 4.0),
        sales_line("mystery-part", "1002", 1.0),
    ];

    let report = build_report(&sales, &[], &picked(&["1001"]));

    for node in &report {
        for row in &node.components {
            assert_eq!(row.picked_qty, 4.0);
            assert_eq!(row.net_available, -4.0);
        }
    }
}

#[test]
fn work_orders_group_in_first_seen_order_with_repeats_kept_distinct() {
    let sales = vec![
        sales_line("widget-a", "1002", 1.0),
        sales_line("chassis-7", "1001", 2.0),
        sales_line("widget-a", "1002", 1.0),
        sales_line("fan-12", "1001", 3.0),
    ];

    let report = build_report(&sales, &[], &picked(&[]));

    assert_eq!(report.len(), 2);
    assert_eq!(report[0].wo_number, "1002");
    assert_eq!(report[0].components.len(), 2);
    assert_eq!(report[1].wo_number, "1001");
    assert_eq!(report[1].components.len(), 2);
    // A repeated legitimate line item is not auto-merged.
    assert_eq!(report[0].components[0], report[0].components[1]);
}

#[test]
fn filter_report_matches_wo_numbers_case_insensitively() {
    let report = build_report(
        &[
            sales_line("widget-a", "1001", 1.0),
            sales_line("widget-a", "2002", 1.0),
        ],
        &[],
        &picked(&[]),
    );

    let filtered = filter_report(report.clone(), "100");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].wo_number, "1001");

    let unfiltered = filter_report(report, "");
    assert_eq!(unfiltered.len(), 2);
}
