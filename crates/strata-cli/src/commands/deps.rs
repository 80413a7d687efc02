//! `strata deps` - show the files a record's content depends on.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use strata_db::{CollectedDependencies, Database};

use super::effective_alt;
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Content path of the record
    pub path: String,
}

pub fn execute(args: DepsArgs, global: GlobalOptions) -> Result<()> {
    let db = Arc::new(
        Database::open(global.project.clone())
            .with_context(|| format!("failed to open project at {}", global.project.display()))?,
    );
    let sink = Arc::new(CollectedDependencies::new());
    let pad = db.new_pad().with_dependency_sink(sink.clone());
    let alt = effective_alt(&db, &global);

    if pad.get_alt(&args.path, &alt)?.is_none() {
        bail!("no record at {} (alt {})", args.path, alt);
    }
    for path in sink.paths() {
        println!("{}", path.display());
    }
    Ok(())
}
