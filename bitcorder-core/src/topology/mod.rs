//! Graph topology
//!
//! Turns a finalized [`Arguments`](crate::options::Arguments) into element
//! instantiations, links and property assignments. The builder only talks to
//! a [`GraphBackend`], so the same decisions drive the real GStreamer
//! pipeline and the [`PlanRecorder`] used for `--dry-run` and tests.
//!
//! ```text
//! ximagesrc ─┐
//! v4l2src  ──┼─▶ chains ─▶ mix ─▶ [scale/caps] ─▶ download ─▶ vid_raw_tee ─┬─▶ preview
//! image    ──┘                                                             └─▶ h264 ─▶ videnctee ─┐
//! pulsesrc ─▶ aac/mp3 ─▶ audiotee ───────────────────────────────────────────────────────────────┤
//!                                                           rtp (mpegts) / rtmp (flv) / save (mkv)
//! ```

mod builder;
mod plan;
mod rtmp;

pub use builder::{build, BuildSummary};
pub use plan::{PlanLink, PlanRecorder, PlannedElement};
pub use rtmp::{rtmp_location, service_app};

use crate::error::Result;
use crate::options::Placement;

/// A property value, applied by deserializing its string form against the
/// property's declared type
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
    /// Enum nick or name
    Enum(&'static str),
    Caps(CapsSpec),
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
            Self::Enum(v) => write!(f, "{}", v),
            Self::Caps(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        Self::UInt(v.into())
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<CapsSpec> for PropertyValue {
    fn from(v: CapsSpec) -> Self {
        Self::Caps(v)
    }
}

/// Typed caps field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsField {
    Int(i32),
    Fraction(i32, i32),
    Str(String),
}

impl std::fmt::Display for CapsField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "(int){}", v),
            Self::Fraction(n, d) => write!(f, "(fraction){}/{}", n, d),
            Self::Str(v) => write!(f, "(string){}", v),
        }
    }
}

/// Single-structure caps, rendered in GStreamer's caps string syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapsSpec {
    pub media_type: &'static str,
    pub features: Option<&'static str>,
    pub fields: Vec<(&'static str, CapsField)>,
}

/// GL texture memory feature used between the gl* elements
pub const GL_MEMORY: &str = "memory:GLMemory";

impl CapsSpec {
    pub fn new(media_type: &'static str) -> Self {
        Self {
            media_type,
            features: None,
            fields: Vec::new(),
        }
    }

    /// `video/x-raw`
    pub fn raw_video() -> Self {
        Self::new("video/x-raw")
    }

    /// `video/x-raw(memory:GLMemory)`
    pub fn gl_video() -> Self {
        Self::raw_video().features(GL_MEMORY)
    }

    pub fn features(mut self, features: &'static str) -> Self {
        self.features = Some(features);
        self
    }

    pub fn field(mut self, name: &'static str, value: CapsField) -> Self {
        self.fields.push((name, value));
        self
    }

    pub fn int(self, name: &'static str, value: i32) -> Self {
        self.field(name, CapsField::Int(value))
    }

    pub fn framerate(self, fps: i32) -> Self {
        self.field("framerate", CapsField::Fraction(fps, 1))
    }

    pub fn string(self, name: &'static str, value: impl Into<String>) -> Self {
        self.field(name, CapsField::Str(value.into()))
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&CapsField> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

impl std::fmt::Display for CapsSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.media_type)?;
        if let Some(features) = self.features {
            write!(f, "({})", features)?;
        }
        for (name, value) in &self.fields {
            write!(f, ", {}={}", name, value)?;
        }
        Ok(())
    }
}

/// Primitives the topology builder needs from a pipeline runtime
pub trait GraphBackend {
    /// Handle to an element added to the graph
    type Element: Clone;

    /// Instantiate `factory` and add it to the graph
    fn element(&mut self, factory: &str, name: Option<&str>) -> Result<Self::Element>;

    /// Set a property on an element
    fn set(&mut self, element: &Self::Element, property: &str, value: PropertyValue)
        -> Result<()>;

    /// Read back an unsigned integer property
    fn get_u32(&self, element: &Self::Element, property: &str) -> Result<u32>;

    /// Link `src` to `sink` over compatible pads
    fn link(&mut self, src: &Self::Element, sink: &Self::Element) -> Result<()>;

    /// Link through a caps constraint
    fn link_filtered(
        &mut self,
        src: &Self::Element,
        sink: &Self::Element,
        caps: &CapsSpec,
    ) -> Result<()>;

    /// Link once `src` exposes a pad at runtime (decodebin)
    fn link_dynamic(&mut self, src: &Self::Element, sink: &Self::Element) -> Result<()>;

    /// Link into a new mixer sink pad and place the input on it
    fn link_mixer(
        &mut self,
        src: &Self::Element,
        mixer: &Self::Element,
        placement: &Placement,
    ) -> Result<()>;

    /// Strip fixed width/height from caps query answers seen on `element`'s
    /// src pad, so a downstream size constraint scales instead of crops
    fn filter_fixed_size_caps(&mut self, element: &Self::Element) -> Result<()>;

    /// Link each element to the next
    fn chain(&mut self, elements: &[&Self::Element]) -> Result<()> {
        for pair in elements.windows(2) {
            self.link(pair[0], pair[1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_string() {
        let caps = CapsSpec::gl_video().int("width", 640).int("height", 480);
        assert_eq!(
            caps.to_string(),
            "video/x-raw(memory:GLMemory), width=(int)640, height=(int)480"
        );

        let caps = CapsSpec::raw_video().framerate(30);
        assert_eq!(caps.to_string(), "video/x-raw, framerate=(fraction)30/1");

        let caps = CapsSpec::new("audio/mpeg")
            .int("mpegversion", 4)
            .string("stream-format", "raw");
        assert_eq!(
            caps.to_string(),
            "audio/mpeg, mpegversion=(int)4, stream-format=(string)raw"
        );
    }

    #[test]
    fn test_property_strings() {
        assert_eq!(PropertyValue::from(true).to_string(), "true");
        assert_eq!(PropertyValue::from(-3i32).to_string(), "-3");
        assert_eq!(PropertyValue::from(0.5f64).to_string(), "0.5");
        assert_eq!(PropertyValue::Enum("low-power").to_string(), "low-power");
    }
}
