use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store::Store;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("wotrack.sqlite"));

    info!(cache_root = %args.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let store = Store::open(&db_path)?;
    let documents = store.document_count()?;
    let products = store.product_count()?;
    let picked = store.picked_product_count()?;

    info!(
        path = %db_path.display(),
        documents,
        products,
        picked,
        "store status"
    );

    Ok(())
}
