//! Bitcorder CLI
//!
//! Capture windows, cameras and images, composite them on the GPU and
//! stream or record the result.
//!
//! # Usage
//!
//! ```bash
//! # Preview the root window
//! bitcorder
//!
//! # Window plus camera overlay, streamed to YouTube and saved
//! bitcorder --win framerate=30 --cam device=/dev/video0,scale_width=320,scale_height=240,xpos=16,ypos=16,zorder=1 \
//!     --rtmp service=youtube,url=rtmp://a.rtmp.youtube.com/live2,key=XXXX --save filename=out.mkv
//!
//! # Print the planned graph without starting it
//! bitcorder --dry-run --rtp host=192.168.1.2
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bitcorder_core::OptionGroup;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Bitcorder - composite, encode and stream with GStreamer
#[derive(Parser)]
#[command(name = "bitcorder")]
#[command(version)]
#[command(about = "Composite desktop capture and stream it over RTP, RTMP or to a file", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Print the planned graph and exit without starting it
    #[arg(long)]
    dry_run: bool,

    /// Window capture: xid,xname,display,framerate,show-pointer + composite keys
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    win: Vec<String>,

    /// Camera capture: device,width,height,framerate,fourcc + composite keys
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    cam: Vec<String>,

    /// Still image: filename + composite keys
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    img: Vec<String>,

    /// Output stage: framerate,monitor_sink,scale_width,scale_height,effect
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    out: Vec<String>,

    /// Video bitrate in kbit/s
    #[arg(long = "vid_rate", value_name = "KBPS", action = clap::ArgAction::Append)]
    vid_rate: Vec<String>,

    /// Audio bitrate in bit/s
    #[arg(long = "aud_rate", value_name = "BPS", action = clap::ArgAction::Append)]
    aud_rate: Vec<String>,

    /// Capture audio: format=aac|mp3
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    audio: Vec<String>,

    /// Stream MPEG-TS over RTP: host,port
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    rtp: Vec<String>,

    /// Stream FLV over RTMP: service=youtube|twitch,url,key,test
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    rtmp: Vec<String>,

    /// Record to Matroska: filename
    #[arg(long, value_name = "OPTS", action = clap::ArgAction::Append, num_args = 0..=1, default_missing_value = "")]
    save: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

const GROUPS: [OptionGroup; 10] = [
    OptionGroup::Window,
    OptionGroup::Camera,
    OptionGroup::Image,
    OptionGroup::Output,
    OptionGroup::VideoBitrate,
    OptionGroup::AudioBitrate,
    OptionGroup::Audio,
    OptionGroup::Rtp,
    OptionGroup::Rtmp,
    OptionGroup::Save,
];

/// Every group occurrence, in command line order
fn ordered_groups(matches: &ArgMatches) -> Vec<(OptionGroup, String)> {
    let mut occurrences = Vec::new();
    for group in GROUPS {
        let id = group.switch();
        let (Some(values), Some(indices)) =
            (matches.get_many::<String>(id), matches.indices_of(id))
        else {
            continue;
        };
        for (index, value) in indices.zip(values) {
            occurrences.push((index, group, value.clone()));
        }
    }
    occurrences.sort_by_key(|(index, _, _)| *index);
    occurrences
        .into_iter()
        .map(|(_, group, value)| (group, value))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).context("Failed to read command line")?;

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("bitcorder_core={}", level).parse()?)
        .add_directive(format!("bitcorder={}", level).parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Some(Commands::Config(args)) => commands::config(args, cli.config).await,
        None => {
            let run = commands::RunArgs {
                config: cli.config,
                dry_run: cli.dry_run,
                groups: ordered_groups(&matches),
            };
            commands::run(run).await
        }
    };

    if let Err(ref e) = result {
        if let Some(hint) = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<bitcorder_core::BitcorderError>())
            .and_then(|e| e.user_hint())
        {
            eprintln!("hint: {}", hint);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(argv: &[&str]) -> Vec<(OptionGroup, String)> {
        let matches = Cli::command().try_get_matches_from(argv).unwrap();
        ordered_groups(&matches)
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_groups_keep_command_line_order() {
        let parsed = groups(&[
            "bitcorder",
            "--rtmp",
            "service=twitch",
            "--win",
            "xid=0x1234",
            "--rtmp",
            "key=abc",
            "--vid_rate",
            "2500",
        ]);
        assert_eq!(
            parsed,
            vec![
                (OptionGroup::Rtmp, "service=twitch".to_string()),
                (OptionGroup::Window, "xid=0x1234".to_string()),
                (OptionGroup::Rtmp, "key=abc".to_string()),
                (OptionGroup::VideoBitrate, "2500".to_string()),
            ]
        );
    }

    #[test]
    fn test_equals_form_and_bare_switch() {
        let parsed = groups(&["bitcorder", "--save=filename=a.mkv", "--audio"]);
        assert_eq!(
            parsed,
            vec![
                (OptionGroup::Save, "filename=a.mkv".to_string()),
                (OptionGroup::Audio, String::new()),
            ]
        );
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::try_parse_from(["bitcorder", "config", "path"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config(_))));
    }

    #[test]
    fn test_bitrate_needs_value() {
        assert!(Cli::try_parse_from(["bitcorder", "--vid_rate"]).is_err());
    }
}
