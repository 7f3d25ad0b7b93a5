use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use generator::profile::{build_granules, build_lvis, GeneratorConfig};
use std::path::PathBuf;
use std::sync::Arc;
use workflow::config::WorkflowConfig;
use workflow::inputs::{GranuleSet, LvisInputs};
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Instrument {
    Gedi,
    Lvis,
}

#[derive(Parser)]
#[command(author, version, about = "NMBIM waveform workflow driver")]
struct Args {
    #[arg(long, value_enum, default_value_t = Instrument::Gedi)]
    instrument: Instrument,
    /// Load a workflow config from YAML; the instrument's built-in biomass workflow otherwise
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// L1B granule dumped to JSON
    #[arg(long, requires = "l2a", conflicts_with = "lvis_l1")]
    l1b: Option<PathBuf>,
    #[arg(long, requires = "l1b")]
    l2a: Option<PathBuf>,
    #[arg(long, requires = "l1b")]
    l4a: Option<PathBuf>,
    /// LVIS L1B granule dumped to JSON
    #[arg(long, requires = "lvis_l2")]
    lvis_l1: Option<PathBuf>,
    /// LVIS L2 text table
    #[arg(long, requires = "lvis_l1")]
    lvis_l2: Option<PathBuf>,
    /// Process generated granules instead of files
    #[arg(long, default_value_t = false, conflicts_with_all = ["l1b", "lvis_l1"])]
    synthetic: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 32)]
    shots: usize,
    /// Process GEDI beams concurrently
    #[arg(long, default_value_t = false)]
    parallel: bool,
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Write the JSON report here instead of printing a summary only
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = match (&args.workflow, args.instrument) {
        (Some(path), _) => WorkflowConfig::load(path)?,
        (None, Instrument::Gedi) => WorkflowConfig::builtin()?,
        (None, Instrument::Lvis) => WorkflowConfig::builtin_lvis()?,
    };
    let generator = GeneratorConfig {
        seed: args.seed,
        shots_per_beam: args.shots,
        ..GeneratorConfig::default()
    };
    let runner = Runner::new(workflow_config).context("preparing workflow")?;

    let report = match args.instrument {
        Instrument::Gedi => {
            let granules = match (&args.l1b, &args.l2a) {
                (Some(l1b), Some(l2a)) => GranuleSet::load(l1b, l2a, args.l4a.as_deref())?,
                _ if args.synthetic => build_granules(&generator).context("generating synthetic granules")?,
                _ => bail!("pass --l1b and --l2a, or --synthetic"),
            };
            if args.parallel {
                Arc::new(runner).execute_parallel(Arc::new(granules), args.workers)?
            } else {
                runner.execute(&granules)?
            }
        }
        Instrument::Lvis => {
            let inputs = match (&args.lvis_l1, &args.lvis_l2) {
                (Some(l1), Some(l2)) => LvisInputs::load(l1, l2)?,
                _ if args.synthetic => build_lvis(&generator)
                    .and_then(|products| products.into_inputs())
                    .context("generating synthetic LVIS line")?,
                _ => bail!("pass --lvis-l1 and --lvis-l2, or --synthetic"),
            };
            if args.parallel {
                log::warn!("--parallel applies to GEDI beams; LVIS groups run in turn");
            }
            runner.execute_lvis(&inputs)?
        }
    };

    println!(
        "Processed {} waveforms over {} beams -> built {}, filtered {}, errors {}",
        report.waveform_count(),
        report.beams.len(),
        report.metrics.built,
        report.metrics.filtered,
        report.metrics.errors
    );
    if let Some(path) = &args.output {
        report.write(path)?;
        log::info!("report written to {}", path.display());
    }

    Ok(())
}
