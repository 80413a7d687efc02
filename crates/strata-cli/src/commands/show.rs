//! `strata show` - dump a record's fields and derived properties.

use anyhow::{bail, Result};
use clap::Args;

use super::{effective_alt, open_pad, record_json};
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Content path of the record
    pub path: String,
}

pub fn execute(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let (db, pad) = open_pad(&global)?;
    let alt = effective_alt(&db, &global);

    let Some(record) = pad.get_alt(&args.path, &alt)? else {
        bail!("no record at {} (alt {})", args.path, alt);
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&record_json(&pad, &record)?)?
    );
    Ok(())
}
