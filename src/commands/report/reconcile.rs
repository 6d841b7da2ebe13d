use std::collections::{HashMap, HashSet};

use crate::model::{ComponentRow, ComponentStatus, InventoryLine, SalesOrderLine, WorkOrderNode};

/// Joins the normalized snapshots with the picked-status signal into the
/// hierarchical availability report.
///
/// Picking is a global draw-down against shared stock: `picked_qty` for a
/// component sums required quantities across every picked work order, and
/// `net_available = on_hand - picked_qty` is a component-level value attached
/// to each row referencing that component. Repeated line items within one
/// work order stay distinct rows.
pub(crate) fn build_report(
    sales: &[SalesOrderLine],
    inventory: &[InventoryLine],
    picked_wos: &HashSet<String>,
) -> Vec<WorkOrderNode> {
    let mut stock_by_part = HashMap::<&str, f64>::new();
    for line in inventory {
        stock_by_part.insert(line.part_number.as_str(), line.on_hand_qty);
    }

    let mut picked_by_component = HashMap::<&str, f64>::new();
    for line in sales {
        if picked_wos.contains(&line.wo_number) {
            *picked_by_component.entry(line.component.as_str()).or_insert(0.0) +=
                line.required_qty;
        }
    }

    let mut wo_order = Vec::<String>::new();
    let mut nodes_by_wo = HashMap::<String, Vec<ComponentRow>>::new();

    for line in sales {
        let stock_available = stock_by_part.get(line.component.as_str()).copied();
        let stock_value = stock_available.unwrap_or(0.0);

        // A component with no inventory match keeps its row, stock treated
        // as absent and status forced to Shortage.
        let status = match stock_available {
            Some(stock) if stock >= line.required_qty => ComponentStatus::Available,
            _ => ComponentStatus::Shortage,
        };
        let missing_qty = match status {
            ComponentStatus::Shortage => (line.required_qty - stock_value).max(0.0),
            ComponentStatus::Available => 0.0,
        };

        let picked_qty = picked_by_component
            .get(line.component.as_str())
            .copied()
            .unwrap_or(0.0);
        let net_available = stock_value - picked_qty;

        if !nodes_by_wo.contains_key(&line.wo_number) {
            wo_order.push(line.wo_number.clone());
        }
        nodes_by_wo
            .entry(line.wo_number.clone())
            .or_default()
            .push(ComponentRow {
                component: line.component.clone(),
                required_qty: line.required_qty,
                stock_available,
                status,
                missing_qty,
                picked_qty,
                net_available,
            });
    }

    wo_order
        .into_iter()
        .map(|wo_number| {
            let components = nodes_by_wo.remove(&wo_number).unwrap_or_default();
            WorkOrderNode {
                wo_number,
                components,
            }
        })
        .collect()
}

/// Case-insensitive substring filter on work-order numbers; an empty filter
/// keeps the whole report.
pub(crate) fn filter_report(report: Vec<WorkOrderNode>, filter: &str) -> Vec<WorkOrderNode> {
    if filter.is_empty() {
        return report;
    }

    let needle = filter.to_lowercase();
    report
        .into_iter()
        .filter(|node| node.wo_number.to_lowercase().contains(&needle))
        .collect()
}
