//! `strata ls` - list the children and attachments of a content path.

use anyhow::Result;
use clap::Args;

use super::{effective_alt, kind_name, open_pad};
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Content path to list
    #[arg(default_value = "/")]
    pub path: String,

    /// Include hidden records
    #[arg(long)]
    pub hidden: bool,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: LsArgs, global: GlobalOptions) -> Result<()> {
    let (db, pad) = open_pad(&global)?;
    let alt = effective_alt(&db, &global);

    let mut query = pad.query_alt(&args.path, &alt).include_attachments(true);
    if !args.hidden {
        query = query.visible_only();
    }
    let records = query.all(&pad)?;

    if args.json {
        let items: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id(),
                    "path": r.path(),
                    "kind": kind_name(r.kind()),
                    "model": r.model_name(),
                    "label": r.record_label(&pad),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for record in &records {
            println!(
                "{:<12} {:<16} {}",
                kind_name(record.kind()),
                record.model_name(),
                record.path()
            );
        }
        eprintln!("{} record(s)", records.len());
    }
    Ok(())
}
