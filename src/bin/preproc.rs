use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reprep::adapter::JsonRecordReader;
use reprep::batch::{audit_metadata, run_batch};
use reprep::dataset::{export_dataset, load_dataset};
use reprep::io::OutputLayout;
use reprep::label::load_shot_list;
use reprep::shot::parse_channel_list;
use reprep::store::{LocalDirStore, StoreConfig};
use reprep::{
    DatasetConfig, GridSpec, MissingChannelPolicy, PipelineConfig, ReCatalogue, ResampleMode,
    WindowPolicy,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runaway-electron shot preprocessing", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resample, label and write features/targets CSVs for every shot
    Run(RunArgs),
    /// Report shots lacking disruption time or ramp intervals
    Audit(StoreArgs),
    /// Build the windowed, normalised dataset from written CSVs
    Dataset(DatasetArgs),
}

#[derive(Parser, Debug)]
struct StoreArgs {
    /// Directory holding the shot files
    #[arg(long, value_hint = ValueHint::DirPath)]
    store: PathBuf,

    /// Only files whose name contains this tag
    #[arg(long, default_value = "JET")]
    tag: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WindowOpt {
    Disruption,
    Discharge,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeOpt {
    Interpolate,
    BinMean,
    BinMedian,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Output root (features/ and targets/ are created below it)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    out: PathBuf,

    /// JSON pipeline configuration; flags below override it
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// CSV of known RE windows (`shot,start,end`); absent → all negative
    #[arg(long, value_hint = ValueHint::FilePath)]
    re_windows: Option<PathBuf>,

    /// Channels, comma separated
    #[arg(long)]
    channels: Option<String>,

    /// Window anchor
    #[arg(long, value_enum)]
    window: Option<WindowOpt>,

    /// Seconds before the disruption time (default 1)
    #[arg(long)]
    before: Option<f64>,

    /// Seconds after the disruption time (default 5)
    #[arg(long)]
    after: Option<f64>,

    /// Grid step in seconds
    #[arg(long, conflicts_with = "length")]
    step: Option<f64>,

    /// Fixed number of grid points
    #[arg(long)]
    length: Option<usize>,

    /// Resampling algorithm
    #[arg(long, value_enum)]
    mode: Option<ModeOpt>,

    /// Gaussian sigma in grid samples for `interpolate` (0 disables; default 2)
    #[arg(long)]
    sigma: Option<f64>,

    /// Zero-fill missing channels instead of omitting them
    #[arg(long, action = ArgAction::SetTrue)]
    zero_fill: bool,
}

#[derive(Parser, Debug)]
struct DatasetArgs {
    /// Root holding features/ and targets/
    #[arg(long, value_hint = ValueHint::DirPath)]
    data: PathBuf,

    /// Output safetensors path
    #[arg(short, long, default_value = "dataset.safetensors", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Restrict to the shots listed in this file (one per line)
    #[arg(long, value_hint = ValueHint::FilePath)]
    shots: Option<PathBuf>,

    #[arg(long, default_value_t = 6000)]
    seq_length: usize,

    #[arg(long, default_value_t = 30)]
    window: usize,

    #[arg(long, default_value_t = 10)]
    stride: usize,

    /// Keep shots with NaN/inf features (they are reported either way)
    #[arg(long, action = ArgAction::SetTrue)]
    keep_non_finite: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Audit(args) => handle_audit(args),
        Command::Dataset(args) => handle_dataset(args),
    }
}

fn open_store(args: &StoreArgs) -> Result<LocalDirStore> {
    let cfg = StoreConfig { machine_tag: args.tag.clone(), ..StoreConfig::new(&args.store) };
    LocalDirStore::open(cfg).with_context(|| format!("opening store {}", args.store.display()))
}

fn pipeline_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut cfg = match &args.config {
        Some(p) => PipelineConfig::from_json_file(p)
            .with_context(|| format!("reading config {}", p.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(list) = &args.channels {
        cfg.channels = parse_channel_list(list)?;
    }
    match args.window {
        Some(WindowOpt::Disruption) if !matches!(cfg.window, WindowPolicy::Disruption { .. }) => {
            cfg.window = WindowPolicy::default()
        }
        Some(WindowOpt::Discharge) => cfg.window = WindowPolicy::Discharge,
        _ => {}
    }
    match &mut cfg.window {
        WindowPolicy::Disruption { before, after } => {
            *before = args.before.unwrap_or(*before);
            *after = args.after.unwrap_or(*after);
        }
        WindowPolicy::Discharge if args.before.is_some() || args.after.is_some() => {
            bail!("--before/--after only apply to the disruption window");
        }
        WindowPolicy::Discharge => {}
    }
    if let Some(step) = args.step {
        cfg.grid = GridSpec::Step(step);
    }
    if let Some(n) = args.length {
        cfg.grid = GridSpec::Length(n);
    }
    match args.mode {
        Some(ModeOpt::Interpolate) if !matches!(cfg.mode, ResampleMode::Interpolate { .. }) => {
            cfg.mode = ResampleMode::default()
        }
        Some(ModeOpt::BinMean) => cfg.mode = ResampleMode::BinMean,
        Some(ModeOpt::BinMedian) => cfg.mode = ResampleMode::BinMedian,
        _ => {}
    }
    if let Some(sigma) = args.sigma {
        match &mut cfg.mode {
            ResampleMode::Interpolate { smoothing } => *smoothing = (sigma > 0.0).then_some(sigma),
            _ => bail!("--sigma only applies to the interpolate mode"),
        }
    }
    if args.zero_fill {
        cfg.missing_channels = MissingChannelPolicy::ZeroFill;
    }
    if cfg.channels.is_empty() {
        bail!("no channels selected");
    }
    Ok(cfg)
}

fn handle_run(args: RunArgs) -> Result<()> {
    let cfg = pipeline_config(&args)?;
    let catalogue = match &args.re_windows {
        Some(p) => ReCatalogue::from_csv(p).with_context(|| format!("reading {}", p.display()))?,
        None => ReCatalogue::default(),
    };
    info!(?cfg, positives = catalogue.len(), "configuration");

    let store = open_store(&args.store)?;
    let layout = OutputLayout::new(&args.out);
    let report = run_batch(&store, &JsonRecordReader, &layout, &cfg, &catalogue)?;

    println!(
        "processed {} · skipped {} · failed {}",
        report.processed,
        report.skipped,
        report.failed.len()
    );
    for (name, reason) in &report.failed {
        println!("  {name}: {reason}");
    }
    Ok(())
}

fn handle_audit(args: StoreArgs) -> Result<()> {
    let store = open_store(&args)?;
    let audit = audit_metadata(&store, &JsonRecordReader)?;

    println!("shots:                    {}", audit.shots);
    println!("complete:                 {}", audit.complete());
    println!("missing disruption time:  {}", audit.missing_disruption_time.len());
    println!("missing ramp-up:          {}", audit.missing_ramp_up.len());
    println!("missing flat-top:         {}", audit.missing_flat_top.len());
    println!("missing ramp-down:        {}", audit.missing_ramp_down.len());
    println!("unreadable:               {}", audit.unreadable.len());
    Ok(())
}

fn handle_dataset(args: DatasetArgs) -> Result<()> {
    let cfg = DatasetConfig {
        seq_length: args.seq_length,
        window: args.window,
        stride: args.stride,
        drop_non_finite: !args.keep_non_finite,
        ..DatasetConfig::default()
    };
    let only: Option<BTreeSet<_>> = match &args.shots {
        Some(p) => Some(load_shot_list(p).with_context(|| format!("reading {}", p.display()))?),
        None => None,
    };

    let layout = OutputLayout::new(&args.data);
    let (samples, report) = load_dataset(&layout, &cfg, only.as_ref())?;
    if samples.is_empty() {
        bail!("no usable shots under {}", args.data.display());
    }
    for nf in &report.non_finite {
        println!("{}: {} NaN, {} inf", nf.shot, nf.nans, nf.infs);
    }

    let summary = export_dataset(&samples, &cfg, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!(
        "{} shots → {} windows → {}",
        samples.len(),
        summary.n_windows,
        args.output.display()
    );
    if let Some(w) = summary.pos_weight {
        println!("pos_weight = {w:.3}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_config(argv: &[&str]) -> Result<PipelineConfig> {
        let mut full = vec!["preproc", "run", "--store", "db", "--out", "out"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full)?.command {
            Command::Run(args) => pipeline_config(&args),
            other => bail!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn defaults_without_flags() {
        assert_eq!(run_config(&[]).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn window_offsets_apply_to_default_policy() {
        let cfg = run_config(&["--before", "2"]).unwrap();
        assert_eq!(cfg.window, WindowPolicy::Disruption { before: 2.0, after: 5.0 });

        let cfg = run_config(&["--window", "disruption", "--after", "3"]).unwrap();
        assert_eq!(cfg.window, WindowPolicy::Disruption { before: 1.0, after: 3.0 });

        assert!(run_config(&["--window", "discharge", "--before", "2"]).is_err());
    }

    #[test]
    fn sigma_applies_to_default_mode() {
        let cfg = run_config(&["--sigma", "3"]).unwrap();
        assert_eq!(cfg.mode, ResampleMode::Interpolate { smoothing: Some(3.0) });

        let cfg = run_config(&["--sigma", "0"]).unwrap();
        assert_eq!(cfg.mode, ResampleMode::Interpolate { smoothing: None });

        assert!(run_config(&["--mode", "bin-mean", "--sigma", "3"]).is_err());
    }
}
