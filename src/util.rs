use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use encoding_rs::WINDOWS_1252;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Reads a snapshot export as text. The warehouse exports are UTF-8 on newer
/// machines and Windows-1252 on the older ones; a file undecodable as both is
/// a fatal snapshot error.
pub fn read_to_string_with_fallback(path: &Path) -> Result<String> {
    let raw =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    if let Ok(text) = String::from_utf8(raw.clone()) {
        return Ok(text);
    }

    let (text, _, had_errors) = WINDOWS_1252.decode(&raw);
    if had_errors {
        bail!(
            "snapshot {} is not decodable as UTF-8 or Windows-1252",
            path.display()
        );
    }

    Ok(text.into_owned())
}

static WO_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+)-").expect("valid work-order number pattern"));

/// Work-order number extraction rule: the numeric token between the first
/// and second hyphen of an order identifier, e.g. "WO-1001-A" -> "1001".
pub fn wo_number_from_order_id(order_id: &str) -> Option<String> {
    WO_NUMBER_PATTERN
        .captures(order_id)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().to_string())
}
