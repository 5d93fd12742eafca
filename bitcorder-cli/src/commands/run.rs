//! Default command - build the graph and run it until interrupted

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bitcorder_core::config::ConfigFile;
use bitcorder_core::pipeline::BusOutcome;
use bitcorder_core::{Arguments, OptionGroup, Pipeline, PlanRecorder};
use tokio::signal;
use tracing::{info, warn};

/// Time allowed for muxers to finish after Ctrl+C
const EOS_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the run command takes from the command line
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    /// Group switches in command line order
    pub groups: Vec<(OptionGroup, String)>,
}

/// Config-file defaults, then every switch in order, then finalize
fn resolve(args: &RunArgs) -> Result<Arguments> {
    let file = match args.config {
        Some(ref path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let mut resolved = Arguments::default();
    file.apply_to(&mut resolved);
    for (group, value) in &args.groups {
        resolved
            .apply(*group, value)
            .with_context(|| format!("Invalid value for {}", group))?;
    }
    Ok(resolved.finalize()?)
}

fn print_plan(arguments: &Arguments) -> Result<()> {
    let mut plan = PlanRecorder::new();
    let summary = bitcorder_core::topology::build(arguments, &mut plan)
        .context("Failed to plan pipeline")?;

    println!("Sources: {}", summary.sources.join(", "));
    if let Some(format) = summary.audio_format {
        println!("Audio:   {} @ {} bit/s", format, summary.audio_bitrate);
    }
    if let Some(kbps) = summary.video_bitrate {
        println!("Video:   H.264 @ {} kbit/s", kbps);
    }
    if let Some(ref location) = summary.rtmp_location {
        println!("RTMP:    {}", location);
    }
    println!();
    print!("{}", plan.describe());
    Ok(())
}

/// Build the pipeline and keep it playing until Ctrl+C, EOS or an error
pub async fn run(args: RunArgs) -> Result<()> {
    let arguments = resolve(&args)?;

    if args.dry_run {
        return print_plan(&arguments);
    }

    let mut pipeline = Pipeline::build(&arguments).context("Failed to create pipeline")?;
    let watcher = pipeline.bus_watcher()?;
    pipeline.play().context("Failed to start pipeline")?;

    println!("Sources: {}", pipeline.summary().sources.join(", "));
    println!("Press Ctrl+C to stop...\n");

    let mut bus_task = {
        let watcher = watcher.clone();
        tokio::task::spawn_blocking(move || watcher.wait(None))
    };

    let outcome = tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            println!("\nReceived interrupt signal...");
            if let Err(e) = pipeline.send_eos() {
                warn!("{}", e);
            }
            match tokio::time::timeout(EOS_TIMEOUT, &mut bus_task).await {
                Ok(joined) => match joined.context("Bus watcher panicked")? {
                    Ok(BusOutcome::Eos) => info!("Outputs finalized"),
                    Ok(_) => {}
                    Err(e) => warn!("Error while draining pipeline: {}", e),
                },
                Err(_) => warn!("EOS timeout reached, forcing pipeline shutdown"),
            }
            Ok(())
        }
        result = &mut bus_task => {
            result.context("Bus watcher panicked")?.map(|_| ())
        }
    };

    watcher.cancel();
    println!("Stopping...");
    pipeline.stop()?;
    outcome.context("Pipeline failed")
}
