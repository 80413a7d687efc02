//! CLI command implementations.

pub mod deps;
pub mod ls;
pub mod resolve;
pub mod show;

use std::sync::Arc;

use anyhow::{Context, Result};
use strata_db::{Database, Pad, RecordKind, SharedRecord, PRIMARY_ALT};

use crate::GlobalOptions;

/// Open the project database and spawn a pad.
pub fn open_pad(global: &GlobalOptions) -> Result<(Arc<Database>, Pad)> {
    let db = Arc::new(
        Database::open(global.project.clone())
            .with_context(|| format!("failed to open project at {}", global.project.display()))?,
    );
    let pad = db.new_pad();
    Ok((db, pad))
}

/// The alternative to load records in: the `--alt` flag, else the
/// configured primary, else the primary sentinel.
pub fn effective_alt(db: &Database, global: &GlobalOptions) -> String {
    if let Some(alt) = &global.alt {
        return alt.clone();
    }
    db.config()
        .alternatives
        .primary_alternative()
        .unwrap_or(PRIMARY_ALT)
        .to_string()
}

/// Short display name for a record kind.
pub fn kind_name(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Page => "page",
        RecordKind::Attachment => "attachment",
        RecordKind::Image => "image",
    }
}

/// The JSON representation of a record used by `show` and `resolve`.
pub fn record_json(pad: &Pad, record: &SharedRecord) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "path": record.path(),
        "alt": record.alt(),
        "kind": kind_name(record.kind()),
        "model": record.model_name(),
        "label": record.record_label(pad),
        "url_path": record.url_path(pad)?,
        "hidden": record.is_hidden(pad)?,
        "fields": record.to_dict(),
    }))
}
