//! Configuration file loading
//!
//! Loads user defaults from `~/.config/bitcorder/config.toml`. Values here
//! only seed [`Arguments`]; they never enable a sink on their own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{BitcorderError, Result, ResultExt};
use crate::options::{Arguments, AudioFormat, RtmpService};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Video encoder settings
    #[serde(default)]
    pub video: VideoSettings,

    /// Audio encoder settings
    #[serde(default)]
    pub audio: AudioSettings,

    /// RTP destination
    #[serde(default)]
    pub rtp: RtpSettings,

    /// RTMP service and credentials
    #[serde(default)]
    pub rtmp: RtmpSettings,

    /// Composite output settings
    #[serde(default)]
    pub output: OutputSettings,

    /// Window capture settings
    #[serde(default)]
    pub window: WindowSettings,
}

/// Video encoder settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Bitrate in kbit/s (0 = encoder default)
    #[serde(default)]
    pub bitrate: u32,
}

/// Audio encoder settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// aac or mp3
    #[serde(default)]
    pub format: Option<String>,

    /// Bitrate in bit/s (0 = 128000)
    #[serde(default)]
    pub bitrate: u32,
}

/// RTP destination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RtpSettings {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

/// RTMP service and credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RtmpSettings {
    /// youtube or twitch
    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Stream key, kept here so it stays out of shell history
    #[serde(default)]
    pub key: Option<String>,
}

/// Composite output settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Output framerate cap (0 = unconstrained)
    #[serde(default)]
    pub framerate: u32,

    /// Preview sink element, or "none"
    #[serde(default)]
    pub monitor_sink: Option<String>,
}

/// Window capture settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    /// X display name
    #[serde(default)]
    pub display: Option<String>,

    /// Capture framerate
    #[serde(default)]
    pub framerate: Option<u32>,

    #[serde(default)]
    pub show_pointer: bool,
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("bitcorder").join("config.toml")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".config").join("bitcorder").join("config.toml")
        } else {
            PathBuf::from("/etc/bitcorder/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific path, defaults if the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(BitcorderError::from)
            .context(format!("Failed to read config file {:?}", path))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| BitcorderError::config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Seed `args` with the file's values
    pub fn apply_to(&self, args: &mut Arguments) {
        if self.video.bitrate > 0 {
            args.video_bitrate = self.video.bitrate;
        }
        if self.audio.bitrate > 0 {
            args.audio_bitrate = self.audio.bitrate;
        }
        if let Some(ref name) = self.audio.format {
            match AudioFormat::from_name(name) {
                Some(format) => args.audio.format = Some(format),
                None => warn!("config.toml: unknown audio format '{}'", name),
            }
        }

        if let Some(ref host) = self.rtp.host {
            args.rtp.host = host.clone();
        }
        if let Some(port) = self.rtp.port {
            args.rtp.port = port;
        }

        if let Some(ref name) = self.rtmp.service {
            match RtmpService::from_name(name) {
                Some(service) => args.rtmp.service = Some(service),
                None => warn!("config.toml: unknown rtmp service '{}'", name),
            }
        }
        if let Some(ref url) = self.rtmp.url {
            args.rtmp.url = url.clone();
        }
        if let Some(ref key) = self.rtmp.key {
            args.rtmp.key = key.clone();
        }

        if self.output.framerate > 0 {
            args.output.framerate = self.output.framerate;
        }
        if let Some(ref sink) = self.output.monitor_sink {
            args.use_monitor = !sink.eq_ignore_ascii_case("none");
            if args.use_monitor {
                args.output.monitor_sink = sink.clone();
            }
        }

        if let Some(ref display) = self.window.display {
            args.window.display = display.clone();
        }
        if let Some(framerate) = self.window.framerate {
            args.window.framerate = framerate;
        }
        args.window.show_pointer |= self.window.show_pointer;
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# bitcorder configuration
# Command line switches override everything here.

[video]
# H.264 bitrate in kbit/s (0 = encoder default)
bitrate = 0

[audio]
# Audio format: aac, mp3
format = "aac"

# Audio bitrate in bit/s (0 = 128000)
bitrate = 0

[rtp]
host = "localhost"
port = 6970

[rtmp]
# Service: youtube, twitch
service = "youtube"
url = "rtmp://a.rtmp.youtube.com/live2"
key = "XXXX-XXXX-XXXX-XXXX"

[output]
# Output framerate cap (0 = unconstrained)
framerate = 0

# Preview sink: gtksink, glimagesink, xvimagesink, none
monitor_sink = "gtksink"

[window]
# X display to capture from (empty = $DISPLAY)
display = ""
framerate = 30
show_pointer = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_changes_nothing() {
        let mut args = Arguments::default();
        ConfigFile::default().apply_to(&mut args);
        assert_eq!(args, Arguments::default());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
        assert_eq!(config.rtp.port, Some(6970));
        assert_eq!(config.rtmp.service.as_deref(), Some("youtube"));
    }

    #[test]
    fn test_config_never_enables_sinks() {
        let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
        let mut args = Arguments::default();
        config.apply_to(&mut args);
        assert!(!args.any_sink());
        assert!(!args.use_audio);
        assert_eq!(args.rtmp.service, Some(RtmpService::YouTube));
        assert_eq!(args.rtmp.url, "rtmp://a.rtmp.youtube.com/live2");
    }
}
