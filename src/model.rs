use serde::{Deserialize, Serialize};

/// One cleaned `(item, ordered quantity)` pair from a work-order PDF table.
/// Quantities stay as document text; they are never arithmetic inputs here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItem {
    pub item: String,
    pub ordered_qty: String,
}

/// One pick-list row from the first table of a Word document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product_number: String,
    pub qty: String,
    pub serial_number: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickStatus {
    NotPicked,
    Picked,
}

impl PickStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotPicked => "Not Picked",
            Self::Picked => "Picked",
        }
    }

    pub fn from_str(value: &str) -> Self {
        if value == "Picked" {
            Self::Picked
        } else {
            Self::NotPicked
        }
    }
}

/// A PDF work order as stored: unique per (order_id, file_name), line items
/// serialized one tab-joined `item\tqty` pair per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub order_id: String,
    pub file_name: String,
    pub file_path: String,
    pub sha256: String,
    pub extracted_data: String,
}

/// A Word pick-list as stored: unique per (order_id, file_name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub order_id: String,
    pub file_name: String,
    pub file_path: String,
    pub details: Vec<ProductDetail>,
    pub status: PickStatus,
}

/// A normalized open-sales-order line: component trimmed and lower-cased,
/// `SO-` prefix stripped from the work-order number, aggregate rows removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub component: String,
    pub wo_number: String,
    pub required_qty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub part_number: String,
    pub on_hand_qty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentStatus {
    Available,
    Shortage,
}

impl ComponentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Shortage => "Shortage",
        }
    }
}

/// One component requirement under a work order. `stock_available` is None
/// when the component has no inventory match (status is forced to Shortage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRow {
    pub component: String,
    pub required_qty: f64,
    pub stock_available: Option<f64>,
    pub status: ComponentStatus,
    pub missing_qty: f64,
    pub picked_qty: f64,
    pub net_available: f64,
}

/// Explicit report hierarchy: a work order owns its component rows directly,
/// never by positional adjacency in a flat sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderNode {
    pub wo_number: String,
    pub components: Vec<ComponentRow>,
}

/// Typed availability of a configured source directory.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDirStatus {
    pub path: String,
    pub kind: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub db_path: String,
    pub run_summary_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub pdf_files_seen: usize,
    pub word_files_seen: usize,
    pub documents_inserted: usize,
    pub documents_skipped_duplicate: usize,
    pub products_inserted: usize,
    pub products_skipped_duplicate: usize,
    pub line_items_extracted: usize,
    pub product_rows_extracted: usize,
    pub product_rows_dropped: usize,
    pub pages_skipped: usize,
    pub unreadable_documents: usize,
    pub store_write_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunSummary {
    pub summary_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub paths: IngestPaths,
    pub sources: Vec<SourceDirStatus>,
    pub counts: IngestCounts,
    pub warnings: Vec<String>,
}
