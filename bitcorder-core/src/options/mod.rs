//! Configuration model
//!
//! One [`Arguments`] value is created with defaults at startup, mutated by
//! the option parser (and config-file defaults), finalized once, and then
//! only read by the topology builder.

mod parse;
mod subopt;

pub use parse::OptionGroup;
pub use subopt::{parse_alpha, parse_number, SubKey, SubOption, SubOptions};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BitcorderError, Result};

/// Default RTP destination host
pub const DEFAULT_RTP_HOST: &str = "localhost";
/// Default RTP destination port (IETF recommends 6970..6999)
pub const DEFAULT_RTP_PORT: u16 = 6970;
/// Default RTMP ingest URL
pub const DEFAULT_RTMP_URL: &str = "http://example.com/app";
/// Placeholder stream key
pub const DEFAULT_STREAM_KEY: &str = "XXXX-XXXX-XXXX-XXXX";
/// Client version string embedded in RTMP locations
pub const FLASH_VERSION: &str = "FME/3.0%20(compatible;%20FMSc%201.0)";
/// Audio bitrate in bit/s when none is configured
pub const DEFAULT_AUDIO_BITRATE: u32 = 128_000;
/// Window capture framerate
pub const DEFAULT_WINDOW_FRAMERATE: u32 = 30;
/// Largest width, height or framerate that fits a caps int
pub const MAX_CAPS_INT: u32 = i32::MAX as u32;
/// Preview sink factory
pub const DEFAULT_MONITOR_SINK: &str = "gtksink";

/// Audio encoding format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// AAC via avenc_aac
    #[default]
    Aac,
    /// MP3 via lamemp3enc
    Mp3,
}

impl AudioFormat {
    /// Case-insensitive lookup in the format name table
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "aac" => Some(Self::Aac),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    /// Value for the encoder's `bitrate`/`target` property.
    ///
    /// avenc_aac takes bit/s, lamemp3enc takes kbit/s.
    pub fn encoder_bitrate(&self, bits_per_second: u32) -> u32 {
        match self {
            Self::Aac => bits_per_second,
            Self::Mp3 => bits_per_second / 1000,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aac => write!(f, "aac"),
            Self::Mp3 => write!(f, "mp3"),
        }
    }
}

/// RTMP distribution service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtmpService {
    /// YouTube Live
    YouTube,
    /// Twitch
    Twitch,
}

impl RtmpService {
    /// Case-insensitive lookup in the service name table
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "youtube" => Some(Self::YouTube),
            "twitch" => Some(Self::Twitch),
            _ => None,
        }
    }
}

impl std::fmt::Display for RtmpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YouTube => write!(f, "youtube"),
            Self::Twitch => write!(f, "twitch"),
        }
    }
}

/// Crop rectangle, in pixels removed from each edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crop {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Where and how a source is placed in the composite image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub xpos: i32,
    pub ypos: i32,
    pub zorder: u32,
    pub alpha: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            xpos: 0,
            ypos: 0,
            zorder: 0,
            alpha: 1.0,
        }
    }
}

/// Crop, scale, placement and effect settings shared by every visual source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeOptions {
    pub use_crop: bool,
    pub crop: Crop,
    pub scale_width: i32,
    pub scale_height: i32,
    pub placement: Placement,
    /// gleffects effect id, 0 = none
    pub effect: u32,
}

impl CompositeOptions {
    /// Scaling applies only once both dimensions are positive
    pub fn use_scale(&self) -> bool {
        self.scale_width > 0 && self.scale_height > 0
    }

    /// Scale target when scaling applies
    pub fn scale(&self) -> Option<(i32, i32)> {
        self.use_scale()
            .then_some((self.scale_width, self.scale_height))
    }

    /// Crop rectangle when cropping was requested
    pub fn crop(&self) -> Option<Crop> {
        self.use_crop.then_some(self.crop)
    }

    fn has_partial_scale(&self) -> bool {
        (self.scale_width > 0) != (self.scale_height > 0)
    }
}

/// X11 window capture
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    /// Set once `--win` was given
    pub requested: bool,
    /// X window id, 0 captures the root window
    pub xid: u64,
    pub xname: String,
    pub display: String,
    pub framerate: u32,
    pub show_pointer: bool,
    pub composite: CompositeOptions,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            requested: false,
            xid: 0,
            xname: String::new(),
            display: String::new(),
            framerate: DEFAULT_WINDOW_FRAMERATE,
            show_pointer: false,
            composite: CompositeOptions::default(),
        }
    }
}

/// V4L2 camera capture
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraOptions {
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub framerate: Option<u32>,
    pub fourcc: Option<String>,
    pub composite: CompositeOptions,
}

impl CameraOptions {
    /// Whether any capture format constraint was given
    pub fn has_format(&self) -> bool {
        self.width.is_some()
            || self.height.is_some()
            || self.framerate.is_some()
            || self.fourcc.is_some()
    }
}

/// Still image source (png/jpeg, decoder autodetected)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageOptions {
    pub filename: Option<String>,
    pub composite: CompositeOptions,
}

/// Settings applied to the composite output before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    /// 0 leaves the framerate unconstrained
    pub framerate: u32,
    /// Preview sink factory name
    pub monitor_sink: String,
    pub composite: CompositeOptions,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            framerate: 0,
            monitor_sink: DEFAULT_MONITOR_SINK.to_string(),
            composite: CompositeOptions::default(),
        }
    }
}

/// Audio encoding settings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioOptions {
    /// None until a recognized format is given
    pub format: Option<AudioFormat>,
}

impl AudioOptions {
    /// Configured format, AAC when unset
    pub fn resolved_format(&self) -> AudioFormat {
        self.format.unwrap_or_default()
    }
}

/// RTP (MPEG-TS over UDP) delivery
#[derive(Debug, Clone, PartialEq)]
pub struct RtpOptions {
    pub host: String,
    pub port: u16,
}

impl Default for RtpOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_RTP_HOST.to_string(),
            port: DEFAULT_RTP_PORT,
        }
    }
}

/// RTMP delivery to a streaming service
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpOptions {
    /// None until a recognized service is given
    pub service: Option<RtmpService>,
    pub url: String,
    pub key: String,
    /// Twitch bandwidth test mode
    pub test: bool,
}

impl Default for RtmpOptions {
    fn default() -> Self {
        Self {
            service: None,
            url: DEFAULT_RTMP_URL.to_string(),
            key: DEFAULT_STREAM_KEY.to_string(),
            test: false,
        }
    }
}

/// Local file recording
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveOptions {
    pub filename: String,
}

/// Root configuration aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    pub use_monitor: bool,
    pub use_rtmp: bool,
    pub use_rtp: bool,
    pub use_save: bool,
    pub use_audio: bool,
    /// Video bitrate in kbit/s, 0 keeps the encoder default
    pub video_bitrate: u32,
    /// Audio bitrate in bit/s, 0 uses [`DEFAULT_AUDIO_BITRATE`]
    pub audio_bitrate: u32,
    pub window: WindowOptions,
    pub camera: CameraOptions,
    pub image: ImageOptions,
    pub output: OutputOptions,
    pub audio: AudioOptions,
    pub rtp: RtpOptions,
    pub rtmp: RtmpOptions,
    pub save: SaveOptions,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            use_monitor: true,
            use_rtmp: false,
            use_rtp: false,
            use_save: false,
            use_audio: false,
            video_bitrate: 0,
            audio_bitrate: 0,
            window: WindowOptions::default(),
            camera: CameraOptions::default(),
            image: ImageOptions::default(),
            output: OutputOptions::default(),
            audio: AudioOptions::default(),
            rtp: RtpOptions::default(),
            rtmp: RtmpOptions::default(),
            save: SaveOptions::default(),
        }
    }
}

impl Arguments {
    /// Whether any delivery sink needs the encoded streams
    pub fn any_sink(&self) -> bool {
        self.use_rtp || self.use_rtmp || self.use_save
    }

    /// Window capture is built when asked for, or when nothing else would feed the mixer
    pub fn captures_window(&self) -> bool {
        self.window.requested || (self.camera.device.is_none() && self.image.filename.is_none())
    }

    /// Audio bitrate in bit/s after applying the default
    pub fn effective_audio_bitrate(&self) -> u32 {
        if self.audio_bitrate == 0 {
            DEFAULT_AUDIO_BITRATE
        } else {
            self.audio_bitrate
        }
    }

    /// Check cross-field constraints once every option group has been applied
    pub fn finalize(self) -> Result<Self> {
        let sources: [(&str, &CompositeOptions); 4] = [
            ("win", &self.window.composite),
            ("cam", &self.camera.composite),
            ("img", &self.image.composite),
            ("out", &self.output.composite),
        ];
        for (group, composite) in sources {
            if composite.has_partial_scale() {
                warn!(
                    "--{} needs both scale_width and scale_height, scaling disabled",
                    group
                );
            }
        }

        // config.toml framerates bypass the parser's range check
        let framerates = [
            ("win", self.window.framerate),
            ("out", self.output.framerate),
        ];
        for (group, framerate) in framerates {
            if framerate > MAX_CAPS_INT {
                return Err(BitcorderError::config(format!(
                    "--{} framerate={} is out of range",
                    group, framerate
                )));
            }
        }

        if self.use_rtmp && self.rtmp.service.is_none() {
            return Err(BitcorderError::config(
                "--rtmp requires service=youtube or service=twitch",
            ));
        }

        if !self.use_monitor && !self.any_sink() {
            return Err(BitcorderError::config(
                "Nothing to do: preview disabled (monitor_sink=none) and no --rtp, --rtmp or --save given",
            ));
        }

        Ok(self)
    }
}

/// A source feeding the compositor, or the compositor output itself
///
/// Each variant decides which composite settings it can honor.
pub trait VisualSource {
    /// Short group name used in log messages
    fn group(&self) -> &'static str;

    /// Composite settings for this source
    fn composite(&self) -> &CompositeOptions;

    /// Mutable composite settings for the parser
    fn composite_mut(&mut self) -> &mut CompositeOptions;

    /// Crop applied as a separate videocrop stage
    fn crop_stage(&self) -> Option<Crop> {
        self.composite().crop()
    }

    /// Whether crop keys mean anything for this source
    fn accepts_crop(&self) -> bool {
        true
    }

    /// Whether xpos/ypos/zorder/alpha mean anything for this source
    fn accepts_placement(&self) -> bool {
        true
    }

    /// Scale target when scaling applies
    fn scale(&self) -> Option<(i32, i32)> {
        self.composite().scale()
    }

    /// gleffects id when an effect is requested
    fn effect(&self) -> Option<u32> {
        let effect = self.composite().effect;
        (effect > 0).then_some(effect)
    }

    /// Mixer pad settings
    fn placement(&self) -> Placement {
        self.composite().placement
    }
}

impl VisualSource for WindowOptions {
    fn group(&self) -> &'static str {
        "win"
    }

    fn composite(&self) -> &CompositeOptions {
        &self.composite
    }

    fn composite_mut(&mut self) -> &mut CompositeOptions {
        &mut self.composite
    }

    /// ximagesrc crops at the source through startx/starty/endx/endy
    fn crop_stage(&self) -> Option<Crop> {
        None
    }
}

impl VisualSource for CameraOptions {
    fn group(&self) -> &'static str {
        "cam"
    }

    fn composite(&self) -> &CompositeOptions {
        &self.composite
    }

    fn composite_mut(&mut self) -> &mut CompositeOptions {
        &mut self.composite
    }
}

impl VisualSource for ImageOptions {
    fn group(&self) -> &'static str {
        "img"
    }

    fn composite(&self) -> &CompositeOptions {
        &self.composite
    }

    fn composite_mut(&mut self) -> &mut CompositeOptions {
        &mut self.composite
    }
}

impl VisualSource for OutputOptions {
    fn group(&self) -> &'static str {
        "out"
    }

    fn composite(&self) -> &CompositeOptions {
        &self.composite
    }

    fn composite_mut(&mut self) -> &mut CompositeOptions {
        &mut self.composite
    }

    fn crop_stage(&self) -> Option<Crop> {
        None
    }

    fn accepts_crop(&self) -> bool {
        false
    }

    fn accepts_placement(&self) -> bool {
        false
    }

    fn placement(&self) -> Placement {
        Placement::default()
    }
}
