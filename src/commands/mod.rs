pub mod ingest;
pub mod query;
pub mod report;
pub mod status;
