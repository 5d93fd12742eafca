//! Sub-option grammar
//!
//! Every option group takes a comma separated list of `key=value` or bare
//! `key` tokens, looked up in one shared name table.

use crate::error::{BitcorderError, Result};

/// Sub-option names understood by at least one group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubKey {
    Xid,
    Xname,
    Display,
    Framerate,
    ShowPointer,
    ChooseWindow,
    MonitorSink,
    ChooseDevice,
    Host,
    Port,
    Service,
    Url,
    StreamKey,
    Test,
    Filename,
    Device,
    Fourcc,
    Width,
    Height,
    Left,
    Top,
    Right,
    Bottom,
    ScaleWidth,
    ScaleHeight,
    Xpos,
    Ypos,
    Zorder,
    Alpha,
    Effect,
    Format,
}

impl SubKey {
    /// Exact (case-sensitive) lookup in the name table
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "xid" => Self::Xid,
            "xname" => Self::Xname,
            "display" => Self::Display,
            "framerate" => Self::Framerate,
            "show-pointer" | "show_pointer" => Self::ShowPointer,
            "choose_window" => Self::ChooseWindow,
            "monitor_sink" => Self::MonitorSink,
            "choose_device" => Self::ChooseDevice,
            "host" => Self::Host,
            "port" => Self::Port,
            "service" => Self::Service,
            "url" => Self::Url,
            "key" => Self::StreamKey,
            "test" => Self::Test,
            "filename" => Self::Filename,
            "device" => Self::Device,
            "fourcc" => Self::Fourcc,
            "width" => Self::Width,
            "height" => Self::Height,
            "left" => Self::Left,
            "top" => Self::Top,
            "right" => Self::Right,
            "bottom" => Self::Bottom,
            "scale_width" => Self::ScaleWidth,
            "scale_height" => Self::ScaleHeight,
            "xpos" => Self::Xpos,
            "ypos" => Self::Ypos,
            "zorder" => Self::Zorder,
            "alpha" => Self::Alpha,
            "effect" => Self::Effect,
            "format" => Self::Format,
            _ => return None,
        };
        Some(key)
    }

    /// Crop, scale, placement and effect keys shared by win/cam/img/out
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::Left
                | Self::Top
                | Self::Right
                | Self::Bottom
                | Self::ScaleWidth
                | Self::ScaleHeight
                | Self::Xpos
                | Self::Ypos
                | Self::Zorder
                | Self::Alpha
                | Self::Effect
        )
    }
}

/// One `key[=value]` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubOption<'a> {
    /// Raw key as written
    pub name: &'a str,
    /// Name table entry, None for unknown keys
    pub key: Option<SubKey>,
    /// Text after the first `=`, None for bare keys
    pub value: Option<&'a str>,
}

/// Iterator over the tokens of a sub-option string
pub struct SubOptions<'a> {
    rest: &'a str,
}

impl<'a> SubOptions<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl<'a> Iterator for SubOptions<'a> {
    type Item = SubOption<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }
            let (token, rest) = match self.rest.split_once(',') {
                Some((token, rest)) => (token, rest),
                None => (self.rest, ""),
            };
            self.rest = rest;
            if token.is_empty() {
                continue;
            }
            let (name, value) = match token.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (token, None),
            };
            return Some(SubOption {
                name,
                key: SubKey::from_name(name),
                value,
            });
        }
    }
}

/// Parse an integer the way C's `strtol(s, NULL, 0)` chooses its base:
/// `0x` hex, leading `0` octal, decimal otherwise.
pub fn parse_number(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (radix, body) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    if body.is_empty() || body.starts_with(['+', '-']) {
        return Err(BitcorderError::config(format!("'{}' is not a number", text)));
    }

    let magnitude = i64::from_str_radix(body, radix)
        .map_err(|e| BitcorderError::config(format!("'{}' is not a number: {}", text, e)))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Parse the floating point alpha blend value
pub fn parse_alpha(text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| BitcorderError::config(format!("'{}' is not a number: {}", text, e)))
}
