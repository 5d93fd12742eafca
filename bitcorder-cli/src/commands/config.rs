//! Config command - manage configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use bitcorder_core::config::{sample_config, ConfigFile};
use bitcorder_core::Arguments;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the current configuration
    Show,

    /// Check that the file parses and show the defaults it produces
    Check,

    /// Generate a default config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(ConfigFile::default_path);
    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            if !path.exists() {
                println!("No configuration file found at: {}", path.display());
                println!();
                println!("Using default settings. Create a config file with:");
                println!("  bitcorder config init");
                return Ok(());
            }

            let content = std::fs::read_to_string(&path).context("Failed to read config file")?;

            println!("Configuration file: {}\n", path.display());
            println!("{}", content);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!();
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).context("Failed to create config directory")?;
                }
            }

            // Write sample config
            std::fs::write(&path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
            println!();
            println!("Edit this file to change bitrates, destinations and the preview sink.");
        }
        ConfigCommand::Check => {
            let file = ConfigFile::load_from(&path)?;
            let mut defaults = Arguments::default();
            file.apply_to(&mut defaults);

            println!("Configuration file: {}\n", path.display());
            let video = match defaults.video_bitrate {
                0 => "encoder default".to_string(),
                kbps => format!("{} kbit/s", kbps),
            };
            let service = defaults
                .rtmp
                .service
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(no service)".to_string());

            println!("  Video bitrate: {}", video);
            println!(
                "  Audio:         {} @ {} bit/s",
                defaults.audio.resolved_format(),
                defaults.effective_audio_bitrate()
            );
            println!("  RTP:           {}:{}", defaults.rtp.host, defaults.rtp.port);
            println!("  RTMP:          {} {}", service, defaults.rtmp.url);
            if defaults.use_monitor {
                println!("  Preview:       {}", defaults.output.monitor_sink);
            } else {
                println!("  Preview:       disabled");
            }
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}
