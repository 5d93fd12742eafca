//! Option parser
//!
//! Applies one top-level group's value string to [`Arguments`].

use tracing::{debug, warn};

use super::subopt::{parse_alpha, parse_number, SubKey, SubOption, SubOptions};
use super::{Arguments, AudioFormat, RtmpService, VisualSource, MAX_CAPS_INT};
use crate::error::{BitcorderError, Result};

/// Top-level option groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionGroup {
    Window,
    Camera,
    Image,
    Output,
    Audio,
    VideoBitrate,
    AudioBitrate,
    Rtp,
    Rtmp,
    Save,
}

impl OptionGroup {
    /// Command line switch name, without the leading dashes
    pub fn switch(&self) -> &'static str {
        match self {
            Self::Window => "win",
            Self::Camera => "cam",
            Self::Image => "img",
            Self::Output => "out",
            Self::Audio => "audio",
            Self::VideoBitrate => "vid_rate",
            Self::AudioBitrate => "aud_rate",
            Self::Rtp => "rtp",
            Self::Rtmp => "rtmp",
            Self::Save => "save",
        }
    }
}

impl std::fmt::Display for OptionGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--{}", self.switch())
    }
}

/// Convert a parsed integer into the field's type, naming the offending key on failure
fn number<T: TryFrom<i64>>(group: OptionGroup, name: &str, value: &str) -> Result<T> {
    let raw = parse_number(value)
        .map_err(|e| e.with_context(format!("{} {}", group, name)))?;
    T::try_from(raw).map_err(|_| {
        BitcorderError::config(format!("{} {}={} is out of range", group, name, value))
    })
}

/// Like [`number`], bounded to what a caps int or fraction can hold
fn caps_number(group: OptionGroup, name: &str, value: &str) -> Result<u32> {
    let parsed: u32 = number(group, name, value)?;
    if parsed > MAX_CAPS_INT {
        return Err(BitcorderError::config(format!(
            "{} {}={} is out of range",
            group, name, value
        )));
    }
    Ok(parsed)
}

fn ignore(group: OptionGroup, opt: &SubOption<'_>) {
    warn!("{} does not understand '{}', ignoring", group, opt.name);
}

/// Value of a key that needs one, or None after logging
fn required<'a>(group: OptionGroup, opt: &SubOption<'a>) -> Option<&'a str> {
    if opt.value.is_none() {
        warn!("{} {} needs a value, ignoring", group, opt.name);
    }
    opt.value
}

/// Crop, scale, placement and effect handling shared by the visual groups
fn apply_composite<S: VisualSource>(
    group: OptionGroup,
    source: &mut S,
    key: SubKey,
    opt: &SubOption<'_>,
) -> Result<()> {
    let Some(value) = required(group, opt) else {
        return Ok(());
    };

    let is_crop = matches!(key, SubKey::Left | SubKey::Top | SubKey::Right | SubKey::Bottom);
    let is_placement = matches!(key, SubKey::Xpos | SubKey::Ypos | SubKey::Zorder | SubKey::Alpha);
    if (is_crop && !source.accepts_crop()) || (is_placement && !source.accepts_placement()) {
        warn!("{} ignores {}, it only applies to composited inputs", group, opt.name);
        return Ok(());
    }

    let composite = source.composite_mut();
    match key {
        SubKey::Left => {
            composite.use_crop = true;
            composite.crop.left = number(group, opt.name, value)?;
        }
        SubKey::Top => {
            composite.use_crop = true;
            composite.crop.top = number(group, opt.name, value)?;
        }
        SubKey::Right => {
            composite.use_crop = true;
            composite.crop.right = number(group, opt.name, value)?;
        }
        SubKey::Bottom => {
            composite.use_crop = true;
            composite.crop.bottom = number(group, opt.name, value)?;
        }
        SubKey::ScaleWidth => composite.scale_width = number(group, opt.name, value)?,
        SubKey::ScaleHeight => composite.scale_height = number(group, opt.name, value)?,
        SubKey::Xpos => composite.placement.xpos = number(group, opt.name, value)?,
        SubKey::Ypos => composite.placement.ypos = number(group, opt.name, value)?,
        SubKey::Zorder => composite.placement.zorder = number(group, opt.name, value)?,
        SubKey::Alpha => {
            composite.placement.alpha = parse_alpha(value)
                .map_err(|e| e.with_context(format!("{} {}", group, opt.name)))?;
        }
        SubKey::Effect => composite.effect = number(group, opt.name, value)?,
        _ => ignore(group, opt),
    }
    debug!("{} {}={}", group, opt.name, value);
    Ok(())
}

impl Arguments {
    /// Parse a full argument list of `(group, value)` pairs into a finalized model
    pub fn from_groups<'a, I>(groups: I) -> Result<Self>
    where
        I: IntoIterator<Item = (OptionGroup, &'a str)>,
    {
        let mut args = Self::default();
        for (group, value) in groups {
            args.apply(group, value)?;
        }
        args.finalize()
    }

    /// Apply one occurrence of a top-level switch
    ///
    /// Unknown keys are logged and skipped; malformed numbers are errors.
    pub fn apply(&mut self, group: OptionGroup, value: &str) -> Result<()> {
        debug!("{} {}", group, value);
        match group {
            OptionGroup::VideoBitrate => {
                self.video_bitrate = number(group, "bitrate", value)?;
                return Ok(());
            }
            OptionGroup::AudioBitrate => {
                self.audio_bitrate = number(group, "bitrate", value)?;
                return Ok(());
            }
            OptionGroup::Window => self.window.requested = true,
            OptionGroup::Audio => self.use_audio = true,
            OptionGroup::Rtp => {
                self.use_rtp = true;
                self.use_audio = true;
            }
            OptionGroup::Rtmp => {
                self.use_rtmp = true;
                self.use_audio = true;
            }
            _ => {}
        }

        for opt in SubOptions::new(value) {
            let Some(key) = opt.key else {
                ignore(group, &opt);
                continue;
            };
            match group {
                OptionGroup::Window => self.apply_window(key, &opt)?,
                OptionGroup::Camera => self.apply_camera(key, &opt)?,
                OptionGroup::Image => self.apply_image(key, &opt)?,
                OptionGroup::Output => self.apply_output(key, &opt)?,
                OptionGroup::Audio => self.apply_audio(key, &opt),
                OptionGroup::Rtp => self.apply_rtp(key, &opt)?,
                OptionGroup::Rtmp => self.apply_rtmp(key, &opt),
                OptionGroup::Save => self.apply_save(key, &opt),
                OptionGroup::VideoBitrate | OptionGroup::AudioBitrate => {}
            }
        }
        Ok(())
    }

    fn apply_window(&mut self, key: SubKey, opt: &SubOption<'_>) -> Result<()> {
        const GROUP: OptionGroup = OptionGroup::Window;
        if key.is_composite() {
            return apply_composite(GROUP, &mut self.window, key, opt);
        }
        match key {
            SubKey::ShowPointer => self.window.show_pointer = true,
            SubKey::Xid => {
                if let Some(value) = required(GROUP, opt) {
                    self.window.xid = number(GROUP, opt.name, value)?;
                }
            }
            SubKey::Xname => {
                if let Some(value) = required(GROUP, opt) {
                    self.window.xname = value.to_string();
                }
            }
            SubKey::Display => {
                if let Some(value) = required(GROUP, opt) {
                    self.window.display = value.to_string();
                }
            }
            SubKey::Framerate => {
                if let Some(value) = required(GROUP, opt) {
                    self.window.framerate = caps_number(GROUP, opt.name, value)?;
                }
            }
            _ => ignore(GROUP, opt),
        }
        Ok(())
    }

    fn apply_camera(&mut self, key: SubKey, opt: &SubOption<'_>) -> Result<()> {
        const GROUP: OptionGroup = OptionGroup::Camera;
        if key.is_composite() {
            return apply_composite(GROUP, &mut self.camera, key, opt);
        }
        let known = matches!(
            key,
            SubKey::Device | SubKey::Width | SubKey::Height | SubKey::Framerate | SubKey::Fourcc
        );
        if !known {
            ignore(GROUP, opt);
            return Ok(());
        }
        let Some(value) = required(GROUP, opt) else {
            return Ok(());
        };
        match key {
            SubKey::Device => self.camera.device = Some(value.to_string()),
            SubKey::Width => self.camera.width = Some(caps_number(GROUP, opt.name, value)?),
            SubKey::Height => self.camera.height = Some(caps_number(GROUP, opt.name, value)?),
            SubKey::Framerate => {
                self.camera.framerate = Some(caps_number(GROUP, opt.name, value)?)
            }
            _ => self.camera.fourcc = Some(value.to_string()),
        }
        Ok(())
    }

    fn apply_image(&mut self, key: SubKey, opt: &SubOption<'_>) -> Result<()> {
        const GROUP: OptionGroup = OptionGroup::Image;
        if key.is_composite() {
            return apply_composite(GROUP, &mut self.image, key, opt);
        }
        match key {
            SubKey::Filename => {
                if let Some(value) = required(GROUP, opt) {
                    self.image.filename = Some(value.to_string());
                }
            }
            _ => ignore(GROUP, opt),
        }
        Ok(())
    }

    fn apply_output(&mut self, key: SubKey, opt: &SubOption<'_>) -> Result<()> {
        const GROUP: OptionGroup = OptionGroup::Output;
        if key.is_composite() {
            return apply_composite(GROUP, &mut self.output, key, opt);
        }
        match key {
            SubKey::Framerate => {
                if let Some(value) = required(GROUP, opt) {
                    self.output.framerate = caps_number(GROUP, opt.name, value)?;
                }
            }
            SubKey::MonitorSink => {
                if let Some(value) = required(GROUP, opt) {
                    self.use_monitor = !value.eq_ignore_ascii_case("none");
                    if self.use_monitor {
                        self.output.monitor_sink = value.to_string();
                    }
                }
            }
            _ => ignore(GROUP, opt),
        }
        Ok(())
    }

    fn apply_audio(&mut self, key: SubKey, opt: &SubOption<'_>) {
        const GROUP: OptionGroup = OptionGroup::Audio;
        match key {
            SubKey::Format => {
                let Some(value) = required(GROUP, opt) else {
                    return;
                };
                match AudioFormat::from_name(value) {
                    Some(format) => self.audio.format = Some(format),
                    None => warn!("{} unknown format '{}', expected aac or mp3", GROUP, value),
                }
            }
            _ => ignore(GROUP, opt),
        }
    }

    fn apply_rtp(&mut self, key: SubKey, opt: &SubOption<'_>) -> Result<()> {
        const GROUP: OptionGroup = OptionGroup::Rtp;
        match key {
            SubKey::Host => {
                if let Some(value) = required(GROUP, opt) {
                    self.rtp.host = value.to_string();
                }
            }
            SubKey::Port => {
                if let Some(value) = required(GROUP, opt) {
                    self.rtp.port = number(GROUP, opt.name, value)?;
                }
            }
            _ => ignore(GROUP, opt),
        }
        Ok(())
    }

    fn apply_rtmp(&mut self, key: SubKey, opt: &SubOption<'_>) {
        const GROUP: OptionGroup = OptionGroup::Rtmp;
        match key {
            SubKey::Test => self.rtmp.test = true,
            SubKey::Service => {
                let Some(value) = required(GROUP, opt) else {
                    return;
                };
                // An unknown name also drops any service seeded from config.toml
                self.rtmp.service = RtmpService::from_name(value);
                if self.rtmp.service.is_none() {
                    warn!(
                        "{} unknown service '{}', expected youtube or twitch",
                        GROUP, value
                    );
                }
            }
            SubKey::Url => {
                if let Some(value) = required(GROUP, opt) {
                    self.rtmp.url = value.to_string();
                }
            }
            SubKey::StreamKey => {
                if let Some(value) = required(GROUP, opt) {
                    self.rtmp.key = value.to_string();
                }
            }
            _ => ignore(GROUP, opt),
        }
    }

    fn apply_save(&mut self, key: SubKey, opt: &SubOption<'_>) {
        const GROUP: OptionGroup = OptionGroup::Save;
        match key {
            SubKey::Filename => {
                if let Some(value) = required(GROUP, opt) {
                    self.use_save = true;
                    self.use_audio = true;
                    self.save.filename = value.to_string();
                }
            }
            _ => ignore(GROUP, opt),
        }
    }
}
