//! JSONL loaders for the pedido/recurso tables
//!
//! Tables are loaded once at process start and treated as immutable for the
//! serving lifetime. Rows whose canonical sentence would be blank are skipped
//! before embedding, with a warning naming the record.

use super::{sentence_is_blank, AppealRecord, RequestRecord};
use crate::errors::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Load pedido rows from a JSON Lines file
pub fn load_requests(path: impl AsRef<Path>) -> Result<Vec<RequestRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let mut row: RequestRecord = serde_json::from_str(&line)?;
        row.ensure_sentence();

        if sentence_is_blank(&row.sentence) {
            warn!(
                protocol = %row.protocol,
                line = line_no + 1,
                "Skipping pedido with no embeddable text"
            );
            skipped += 1;
            continue;
        }

        rows.push(row);
    }

    info!(
        path = %path.display(),
        loaded = rows.len(),
        skipped = skipped,
        "Loaded pedidos"
    );

    Ok(rows)
}

/// Load recurso rows from a JSON Lines file
pub fn load_appeals(path: impl AsRef<Path>) -> Result<Vec<AppealRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let mut row: AppealRecord = serde_json::from_str(&line)?;
        row.ensure_sentence();

        if sentence_is_blank(&row.sentence) {
            warn!(
                appeal_id = row.appeal_id,
                line = line_no + 1,
                "Skipping recurso with no embeddable text"
            );
            skipped += 1;
            continue;
        }

        rows.push(row);
    }

    info!(
        path = %path.display(),
        loaded = rows.len(),
        skipped = skipped,
        "Loaded recursos"
    );

    Ok(rows)
}
