//! `strata resolve` - resolve a URL path to a record or asset.

use anyhow::{bail, Result};
use clap::Args;

use strata_db::ResolvedUrl;

use super::{open_pad, record_json};
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// URL path to resolve, e.g. `/de/blog/first-post/`
    pub url: String,

    /// Resolve hidden records too
    #[arg(long)]
    pub hidden: bool,

    /// Skip the asset-tree fallback
    #[arg(long)]
    pub no_assets: bool,
}

pub fn execute(args: ResolveArgs, global: GlobalOptions) -> Result<()> {
    let (_db, pad) = open_pad(&global)?;

    match pad.resolve_url_path(&args.url, args.hidden, !args.no_assets)? {
        Some(ResolvedUrl::Record(record)) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&record_json(&pad, &record)?)?
            );
        }
        Some(ResolvedUrl::Asset(asset)) => {
            let rv = serde_json::json!({
                "asset": asset.name(),
                "source": asset.source_filename(),
                "directory": asset.is_directory(),
            });
            println!("{}", serde_json::to_string_pretty(&rv)?);
        }
        None => bail!("{} does not resolve", args.url),
    }
    Ok(())
}
