//! User configuration file
//!
//! Defaults read from TOML before the command line is applied.

mod file;

pub use file::{
    sample_config, AudioSettings, ConfigFile, OutputSettings, RtmpSettings, RtpSettings,
    VideoSettings, WindowSettings,
};
