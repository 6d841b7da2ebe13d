use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::cli::IngestArgs;
use crate::model::{
    DocumentRecord, IngestCounts, IngestPaths, IngestRunSummary, PickStatus, ProductRecord,
    SourceDirStatus,
};
use crate::store::{InsertOutcome, Store};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

use super::pdf_tables::{self, command_available, extract_pdf_line_items, serialize_line_items};
use super::word_tables::extract_word_product_details;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join("wotrack.sqlite"));
    let run_summary_path = args.run_summary_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("ingest_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting ingest");

    let mut warnings = Vec::<String>::new();
    let mut counts = IngestCounts::default();

    let pdf_sources = check_source_dirs(&args.pdf_dirs, "pdf");
    let word_sources = check_source_dirs(&args.word_dirs, "word");

    let pdf_paths = discover_documents(&pdf_sources, "pdf", &mut warnings);
    let word_paths = discover_documents(&word_sources, "docx", &mut warnings);
    counts.pdf_files_seen = pdf_paths.len();
    counts.word_files_seen = word_paths.len();

    let extractor_available = command_available(&args.pdf_extractor_cmd);
    if !extractor_available && !pdf_paths.is_empty() {
        let message = format!(
            "pdf extractor command '{}' is unavailable; {} documents registered without line items",
            args.pdf_extractor_cmd,
            pdf_paths.len()
        );
        warn!(command = %args.pdf_extractor_cmd, "pdf extractor command unavailable");
        warnings.push(message);
    }

    let mut store = Store::open(&db_path)?;
    let batch = store.batch()?;

    for pdf_path in &pdf_paths {
        let Some((order_id, file_name)) = order_identity(pdf_path) else {
            warn!(path = %pdf_path.display(), "skipping document with non-UTF-8 name");
            continue;
        };
        info!(file = %file_name, "processing PDF file");

        let extraction = if extractor_available {
            match extract_pdf_line_items(&args.pdf_extractor_cmd, pdf_path) {
                Ok(extraction) => extraction,
                Err(err) => {
                    warn!(
                        path = %pdf_path.display(),
                        error = %err,
                        "document unreadable, registering with zero rows"
                    );
                    warnings.push(format!("unreadable document {}: {err}", pdf_path.display()));
                    counts.unreadable_documents += 1;
                    pdf_tables::PdfExtraction::default()
                }
            }
        } else {
            pdf_tables::PdfExtraction::default()
        };

        counts.pages_skipped += extraction.pages_skipped;
        counts.line_items_extracted += extraction.line_items.len();
        warnings.extend(extraction.warnings);

        let record = DocumentRecord {
            order_id,
            file_name,
            file_path: pdf_path.display().to_string(),
            sha256: hash_or_empty(pdf_path),
            extracted_data: serialize_line_items(&extraction.line_items),
        };

        match batch.insert_document_if_absent(&record) {
            Ok(InsertOutcome::Inserted) => counts.documents_inserted += 1,
            Ok(InsertOutcome::SkippedDuplicate) => counts.documents_skipped_duplicate += 1,
            Err(err) => {
                error!(
                    order_id = %record.order_id,
                    file_name = %record.file_name,
                    error = %err,
                    "store rejected document record"
                );
                counts.store_write_failures += 1;
            }
        }
    }

    for word_path in &word_paths {
        let Some((order_id, file_name)) = order_identity(word_path) else {
            warn!(path = %word_path.display(), "skipping document with non-UTF-8 name");
            continue;
        };
        info!(file = %file_name, "processing Word file");

        let extraction = match extract_word_product_details(word_path) {
            Ok(extraction) => extraction,
            Err(err) => {
                warn!(
                    path = %word_path.display(),
                    error = %err,
                    "document unreadable, registering with zero rows"
                );
                warnings.push(format!("unreadable document {}: {err}", word_path.display()));
                counts.unreadable_documents += 1;
                super::word_tables::WordExtraction::default()
            }
        };

        counts.product_rows_extracted += extraction.details.len();
        counts.product_rows_dropped += extraction.rows_dropped;
        warnings.extend(extraction.warnings);

        let record = ProductRecord {
            order_id,
            file_name,
            file_path: word_path.display().to_string(),
            details: extraction.details,
            status: PickStatus::NotPicked,
        };

        match batch.insert_product_if_absent(&record) {
            Ok(InsertOutcome::Inserted) => counts.products_inserted += 1,
            Ok(InsertOutcome::SkippedDuplicate) => counts.products_skipped_duplicate += 1,
            Err(err) => {
                error!(
                    order_id = %record.order_id,
                    file_name = %record.file_name,
                    error = %err,
                    "store rejected product record"
                );
                counts.store_write_failures += 1;
            }
        }
    }

    batch.commit()?;

    let summary = IngestRunSummary {
        summary_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_ingest_command(&args),
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            db_path: db_path.display().to_string(),
            run_summary_path: run_summary_path.display().to_string(),
        },
        sources: pdf_sources.into_iter().chain(word_sources).collect(),
        counts,
        warnings,
    };

    write_json_pretty(&run_summary_path, &summary)?;

    info!(path = %run_summary_path.display(), "wrote ingest run summary");
    info!(
        documents = summary.counts.documents_inserted,
        duplicates = summary.counts.documents_skipped_duplicate,
        products = summary.counts.products_inserted,
        "ingest completed"
    );

    Ok(())
}

/// Explicit availability check for every configured source root; a missing
/// root is reported and skipped, never silently assumed.
pub(crate) fn check_source_dirs(dirs: &[PathBuf], kind: &str) -> Vec<SourceDirStatus> {
    dirs.iter()
        .map(|dir| {
            let available = dir.is_dir();
            if available {
                info!(path = %dir.display(), kind, "valid source directory");
            } else {
                warn!(path = %dir.display(), kind, "source directory does not exist");
            }
            SourceDirStatus {
                path: dir.display().to_string(),
                kind: kind.to_string(),
                available,
            }
        })
        .collect()
}

fn discover_documents(
    sources: &[SourceDirStatus],
    extension: &str,
    warnings: &mut Vec<String>,
) -> Vec<PathBuf> {
    let mut paths = Vec::<PathBuf>::new();

    for source in sources.iter().filter(|source| source.available) {
        walk_directory(Path::new(&source.path), extension, &mut paths, warnings);
    }

    paths.sort();
    paths
}

fn walk_directory(
    dir: &Path,
    extension: &str,
    paths: &mut Vec<PathBuf>,
    warnings: &mut Vec<String>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "failed to read source directory");
            warnings.push(format!("failed to read {}: {err}", dir.display()));
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            walk_directory(&path, extension, paths, warnings);
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        // Office lock/temp files (~RF....TMP, ~$...) are watcher noise.
        if file_name.starts_with('~') {
            continue;
        }

        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);

        if matches_extension {
            paths.push(path);
        }
    }
}

/// Order identity is the file stem; the stored file name keeps its extension.
pub(crate) fn order_identity(path: &Path) -> Option<(String, String)> {
    let order_id = path.file_stem()?.to_str()?.to_string();
    let file_name = path.file_name()?.to_str()?.to_string();
    Some((order_id, file_name))
}

fn hash_or_empty(path: &Path) -> String {
    match sha256_file(path) {
        Ok(digest) => digest,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to hash source file");
            String::new()
        }
    }
}

fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = vec![
        "wotrack".to_string(),
        "ingest".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    for dir in &args.pdf_dirs {
        command.push("--pdf-dir".to_string());
        command.push(dir.display().to_string());
    }
    for dir in &args.word_dirs {
        command.push("--word-dir".to_string());
        command.push(dir.display().to_string());
    }
    if args.pdf_extractor_cmd != "tabula" {
        command.push("--pdf-extractor-cmd".to_string());
        command.push(args.pdf_extractor_cmd.clone());
    }
    if let Some(path) = &args.run_summary_path {
        command.push("--run-summary-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}
