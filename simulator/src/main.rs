use anyhow::{bail, Context};
use clap::Parser;
use generator::profile::build_iq_cube;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::{Overrides, WorkflowConfig};
use workflow::report::{summarize, write_report};
use workflow::runner::{collect_captures, run_batch, Runner};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline radar cube processing driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Process a single IQ capture
    #[arg(long)]
    input: Option<PathBuf>,
    /// Process every *.iqc capture in a directory
    #[arg(long)]
    batch: Option<PathBuf>,
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Synthesize a capture from the workflow scenario and process it
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Write the synthesized capture to this path
    #[arg(long)]
    save_cube: Option<PathBuf>,
    /// Report destination; `.csv` writes CSV, anything else JSON
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    range_bins: Option<usize>,
    #[arg(long)]
    doppler_bins: Option<usize>,
    #[arg(long)]
    angle_bins: Option<usize>,
    #[arg(long)]
    guard: Option<usize>,
    #[arg(long)]
    training: Option<usize>,
    #[arg(long)]
    pfa: Option<f64>,
    #[arg(long)]
    margin: Option<f32>,
    /// Leading range bins to ignore
    #[arg(long)]
    blanking: Option<usize>,
    /// Merge detections closer than this many bins
    #[arg(long)]
    cluster: Option<usize>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            range_bins: self.range_bins,
            doppler_bins: self.doppler_bins,
            angle_bins: self.angle_bins,
            guard: self.guard,
            training: self.training,
            pfa: self.pfa,
            margin: self.margin,
            blanking: self.blanking,
            cluster: self.cluster,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.synthetic && args.input.is_none() && args.batch.is_none() {
        bail!("nothing to do: pass --synthetic, --input or --batch");
    }

    let mut workflow_config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    workflow_config.apply(&args.overrides());

    let runner = Arc::new(Runner::new(workflow_config.pipeline.clone()));
    let mut reports = Vec::new();

    if args.synthetic {
        let cube = build_iq_cube(&workflow_config.pipeline.radar, &workflow_config.scenario)?;
        info!(
            "synthesized {}x{}x{} capture with {} targets",
            cube.channels(),
            cube.pulses(),
            cube.samples(),
            workflow_config.scenario.targets.len()
        );
        if let Some(path) = &args.save_cube {
            cube.save(path)
                .with_context(|| format!("saving capture {}", path.display()))?;
        }
        reports.push(runner.execute("synthetic", &cube)?);
    }

    if let Some(path) = &args.input {
        reports.push(runner.execute_file(path)?);
    }

    if let Some(dir) = &args.batch {
        let paths = collect_captures(dir)?;
        info!("processing {} captures from {}", paths.len(), dir.display());
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating batch runtime")?;
        reports.extend(runtime.block_on(run_batch(runner.clone(), paths, args.workers))?);
    }

    for report in &reports {
        println!("{}", summarize(report));
    }
    let metrics = runner.metrics();
    println!(
        "processed {} cubes ({} failed), {} detections, {} degenerate cells",
        metrics.cubes_processed, metrics.cubes_failed, metrics.detections, metrics.degenerate_cells
    );

    if let Some(path) = &args.output {
        write_report(path, &reports, metrics)?;
        info!("report written to {}", path.display());
    }

    Ok(())
}
