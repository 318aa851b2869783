use anyhow::Context;
use clap::Parser;
use dataset::loader::load_dataset;
use generator::profile::build_default_chunk;
use gui_bridge::bridge::GuiBridge;
use gui_bridge::model::VisualizationModel;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod dataset;
mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline driver for the probe-aiming workflow")]
struct Args {
    /// Run a single offline aiming pass and emit a ranked summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Dataset directory (psd_chunk.json, freq.json, meta.txt);
    /// a synthetic chunk is generated when absent
    #[arg(long)]
    dataset: Option<PathBuf>,
    #[arg(long, default_value_t = 0.98)]
    percentile: f64,
    #[arg(long, default_value_t = 1.5)]
    eps: f64,
    #[arg(long, default_value_t = 5)]
    min_samples: usize,
    /// Keep the GUI bridge alive for incoming scan requests
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.percentile, args.eps, args.min_samples)
    };
    if args.dataset.is_some() {
        workflow_config.dataset = args.dataset.clone();
    }

    let runner = Runner::new(workflow_config.clone());
    let gui_bridge = GuiBridge::new(Arc::new(runner.clone()));

    if args.offline {
        let chunk = match &workflow_config.dataset {
            Some(path) => load_dataset(path, workflow_config.rotate_90d)?,
            None => build_default_chunk()?,
        };
        let result = runner.execute(&chunk)?;

        println!(
            "Offline run -> chunk {}, humps {}, clusters {}",
            chunk.id(),
            result.hump_count,
            result.aim_points.len()
        );
        for (rank, point) in result.aim_points.iter().enumerate() {
            println!(
                "  #{} grid ({:.2}, {:.2}) -> ({:.4}, {:.4}) mm, confidence {:.3}, members {}",
                rank + 1,
                point.grid_xy.0,
                point.grid_xy.1,
                point.mm_xy.0,
                point.mm_xy.1,
                point.confidence,
                point.members
            );
        }

        let model = VisualizationModel::from_result(&result);
        gui_bridge.publish(&model)?;
        gui_bridge.publish_status("Offline aiming results ready.");

        let metrics = runner.metrics_snapshot();
        let mut report = format!(
            "chunk={} humps={} clusters={} completed={} failed={}\n",
            chunk.id(),
            result.hump_count,
            result.aim_points.len(),
            metrics.completed,
            metrics.failed
        );
        for point in &result.aim_points {
            report.push_str(&format!(
                "aim x_mm={:.4} y_mm={:.4} confidence={:.4}\n",
                point.mm_xy.0, point.mm_xy.1, point.confidence
            ));
        }
        let report_path = PathBuf::from("tools/data/aim_report.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report_path)?;
        file.write_all(report.as_bytes())?;
    }
    if args.serve {
        gui_bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
