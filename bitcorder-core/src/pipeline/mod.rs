//! Running GStreamer graph
//!
//! Builds the topology on a real `gst::Pipeline`, drives it through
//! Paused and Playing, and shuts it down with an end-of-stream so the
//! muxers can finish their files.

mod backend;
mod caps;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, info, warn};

pub use backend::GstBackend;
pub use caps::strip_fixed_size;

use crate::error::{BitcorderError, Result, ResultExt};
use crate::options::Arguments;
use crate::topology::{self, BuildSummary};

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Graph built, not started
    Constructed,
    /// Running
    Playing,
    /// Torn down
    Stopped,
}

impl PipelineState {
    /// Move to `next`; the lifecycle only goes forward
    pub fn advance(self, next: PipelineState) -> Result<PipelineState> {
        match (self, next) {
            (Self::Constructed, Self::Playing)
            | (Self::Constructed, Self::Stopped)
            | (Self::Playing, Self::Stopped)
            | (Self::Stopped, Self::Stopped) => Ok(next),
            _ => Err(BitcorderError::gstreamer(format!(
                "cannot go from {:?} to {:?}",
                self, next
            ))),
        }
    }
}

/// How a bus wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOutcome {
    /// End-of-stream reached the pipeline
    Eos,
    /// Nothing conclusive before the timeout
    Timeout,
    /// [`BusWatcher::cancel`] was called
    Cancelled,
}

/// Granularity at which a waiting watcher notices cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Blocking reader of the pipeline bus, usable from another thread
///
/// Clones share the cancellation flag.
#[derive(Debug, Clone)]
pub struct BusWatcher {
    bus: gst::Bus,
    cancelled: Arc<AtomicBool>,
}

impl BusWatcher {
    /// Make every pending and future [`wait`](Self::wait) return
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Block until EOS, an error, cancellation or `timeout` (None waits forever)
    pub fn wait(&self, timeout: Option<Duration>) -> Result<BusOutcome> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return Ok(BusOutcome::Cancelled);
            }
            let slice = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Ok(BusOutcome::Timeout);
                    }
                    left.min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            let pop = gst::ClockTime::from_nseconds(slice.as_nanos() as u64);
            if let Some(msg) = self.bus.timed_pop(pop) {
                if let Some(outcome) = handle_message(&msg)? {
                    return Ok(outcome);
                }
            }
        }
    }
}

fn handle_message(msg: &gst::Message) -> Result<Option<BusOutcome>> {
    use gst::MessageView;
    match msg.view() {
        MessageView::Eos(..) => {
            info!("End of stream");
            return Ok(Some(BusOutcome::Eos));
        }
        MessageView::Error(err) => {
            let source = err
                .src()
                .map(|s| s.path_string().to_string())
                .unwrap_or_else(|| "pipeline".to_string());
            return Err(BitcorderError::gstreamer(format!(
                "{}: {} ({})",
                source,
                err.error(),
                err.debug().map(|d| d.to_string()).unwrap_or_default()
            )));
        }
        MessageView::Warning(w) => {
            warn!(
                "{}: {}",
                w.src().map(|s| s.name().to_string()).unwrap_or_default(),
                w.error()
            );
        }
        MessageView::StateChanged(change) => {
            if change
                .src()
                .map(|s| s.type_() == gst::Pipeline::static_type())
                .unwrap_or(false)
            {
                debug!(
                    "Pipeline state changed: {:?} -> {:?}",
                    change.old(),
                    change.current()
                );
            }
        }
        _ => {}
    }
    Ok(None)
}

/// A built capture graph
pub struct Pipeline {
    pipeline: gst::Pipeline,
    state: PipelineState,
    summary: BuildSummary,
}

impl Pipeline {
    /// Initialise GStreamer and build the graph for `args`
    pub fn build(args: &Arguments) -> Result<Self> {
        gst::init()
            .map_err(BitcorderError::from)
            .context("Failed to initialise GStreamer")?;

        let pipeline = gst::Pipeline::with_name("bitcorder");
        let mut backend = GstBackend::new(&pipeline);
        let summary = topology::build(args, &mut backend)?;

        info!("Pipeline built with sources: {}", summary.sources.join(", "));
        Ok(Self {
            pipeline,
            state: PipelineState::Constructed,
            summary,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    /// Bus reader for waiting on another thread
    pub fn bus_watcher(&self) -> Result<BusWatcher> {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| BitcorderError::gstreamer("pipeline has no bus"))?;
        Ok(BusWatcher {
            bus,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start on the realtime system clock, going through Paused
    pub fn play(&mut self) -> Result<()> {
        let next = self.state.advance(PipelineState::Playing)?;

        let clock = gst::SystemClock::obtain();
        clock.set_property("clock-type", gst::ClockType::Realtime);
        self.pipeline.use_clock(Some(&clock));

        self.pipeline
            .set_state(gst::State::Paused)
            .map_err(BitcorderError::from)
            .context("Failed to pause pipeline")?;
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(BitcorderError::from)
            .context("Failed to start pipeline")?;

        self.state = next;
        info!("Pipeline playing");
        Ok(())
    }

    /// Ask every source to finish; muxers close their output on EOS
    pub fn send_eos(&self) -> Result<()> {
        if self.state != PipelineState::Playing {
            return Ok(());
        }
        info!("Sending EOS to pipeline...");
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            return Err(BitcorderError::gstreamer("EOS event was not handled"));
        }
        Ok(())
    }

    /// Tear the graph down
    pub fn stop(&mut self) -> Result<()> {
        let next = self.state.advance(PipelineState::Stopped)?;
        if self.state != PipelineState::Stopped {
            self.pipeline
                .set_state(gst::State::Null)
                .map_err(BitcorderError::from)
                .context("Failed to stop pipeline")?;
            info!("Pipeline stopped");
        }
        self.state = next;
        Ok(())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.state == PipelineState::Playing {
            let _ = self.pipeline.set_state(gst::State::Null);
        }
    }
}
