/// aggregate: collect the raw channels of every shot in a store into one
/// JSON checkpoint, resuming from an existing one.
///
/// Checkpoint layout:
///   { "<shot>": { "<channel>": { "signal": [...], "time": [...] }, ... }, ... }
///
/// Shots already present are skipped; the file is rewritten atomically after
/// each new shot.
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use tracing_subscriber::EnvFilter;

use reprep::adapter::JsonRecordReader;
use reprep::batch::run_aggregate;
use reprep::shot::parse_channel_list;
use reprep::store::{LocalDirStore, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "aggregate", about = "Collect raw shot channels into a JSON checkpoint")]
struct Args {
    /// Directory holding the shot files
    #[arg(long, value_hint = ValueHint::DirPath)]
    store: PathBuf,

    /// Checkpoint path
    #[arg(short, long, default_value = "aggregate.json", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Channels, comma separated
    #[arg(long, default_value = "SSXcore,IPLA,IP,DAO_EDG7,DAI_EDG7,WMHD,RNT,ECE_PF")]
    channels: String,

    /// Only files whose name contains this tag
    #[arg(long, default_value = "JET")]
    tag: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let channels = parse_channel_list(&args.channels)?;
    let cfg = StoreConfig { machine_tag: args.tag.clone(), ..StoreConfig::new(&args.store) };
    let store = LocalDirStore::open(cfg)
        .with_context(|| format!("opening store {}", args.store.display()))?;

    let report = run_aggregate(&store, &JsonRecordReader, &channels, &args.output)
        .with_context(|| format!("updating {}", args.output.display()))?;

    println!(
        "added {} · already present {} · failed {}",
        report.processed,
        report.skipped,
        report.failed.len()
    );
    Ok(())
}
