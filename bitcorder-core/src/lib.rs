//! Bitcorder Core Library
//!
//! Desktop capture, compositing and live streaming on stock GStreamer
//! elements.
//!
//! This library provides:
//! - The nested `--group key=value,...` option grammar and its parser
//! - Config-file defaults for bitrates, RTP/RTMP destinations and preview
//! - A backend-agnostic topology builder, with a GStreamer backend and a
//!   recording backend for dry runs and tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌──────────────┐   ┌────────────────┐
//! │ window/cam/  │──▶│ GL mixer │──▶│ H.264 encode │──▶│ RTP/RTMP/file  │
//! │ image chains │   │ + output │   │ (vaapi)      │   │ (tee branches) │
//! └──────────────┘   └──────────┘   └──────────────┘   └────────────────┘
//!                          │             pulsesrc ─▶ AAC/MP3 ─▶ muxers
//!                          └──▶ monitor
//! ```

pub mod config;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod topology;

pub use config::ConfigFile;
pub use error::{BitcorderError, Result};
pub use options::{Arguments, OptionGroup};
pub use pipeline::{BusOutcome, Pipeline, PipelineState};
pub use topology::{BuildSummary, GraphBackend, PlanRecorder};
