//! Configuration to graph decisions

use tracing::{debug, info};

use super::{rtmp_location, CapsSpec, GraphBackend, PropertyValue};
use crate::error::{BitcorderError, Result, ResultExt};
use crate::options::{Arguments, AudioFormat, CameraOptions, VisualSource};

/// What the builder decided, for logging and the dry-run listing
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    /// Inputs linked into the compositor
    pub sources: Vec<&'static str>,
    /// Audio format, when audio is captured
    pub audio_format: Option<AudioFormat>,
    /// Audio bitrate in bit/s
    pub audio_bitrate: u32,
    /// Video bitrate in kbit/s (configured, or the encoder default)
    pub video_bitrate: Option<u32>,
    /// rtmpsink location, when streaming over RTMP
    pub rtmp_location: Option<String>,
}

/// Encoded streams shared by the delivery sinks
struct Tees<E> {
    video: E,
    audio: E,
}

struct Builder<'a, B: GraphBackend> {
    args: &'a Arguments,
    backend: &'a mut B,
}

/// Build the whole graph for `args` on `backend`
pub fn build<B: GraphBackend>(args: &Arguments, backend: &mut B) -> Result<BuildSummary> {
    Builder { args, backend }.build()
}

impl<B: GraphBackend> Builder<'_, B> {
    fn make(&mut self, factory: &str) -> Result<B::Element> {
        self.backend.element(factory, None)
    }

    fn named(&mut self, factory: &str, name: &str) -> Result<B::Element> {
        self.backend.element(factory, Some(name))
    }

    fn set(
        &mut self,
        element: &B::Element,
        property: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        self.backend.set(element, property, value.into())
    }

    fn build(mut self) -> Result<BuildSummary> {
        let args = self.args;
        let mixer = self.named("glvideomixerelement", "mix")?;
        let raw_tee = self.output_stage(&mixer).context("Failed to build output stage")?;

        if args.use_monitor {
            let queue = self.make("queue")?;
            let sink = self.named(&args.output.monitor_sink, "monitor")?;
            self.backend.chain(&[&raw_tee, &queue, &sink])?;
        }

        let mut sources = Vec::new();
        if args.captures_window() {
            self.window_source(&mixer).context("Failed to build window capture")?;
            sources.push("window");
        }
        if let Some(ref device) = args.camera.device {
            self.camera_source(&mixer, device).context("Failed to build camera capture")?;
            sources.push("camera");
        }
        if let Some(ref filename) = args.image.filename {
            self.image_source(&mixer, filename).context("Failed to build image source")?;
            sources.push("image");
        }
        info!("Compositing {}", sources.join(" + "));

        let use_audio = args.use_audio || args.any_sink();
        let audio_tee = if use_audio {
            Some(self.audio_path().context("Failed to build audio encoder")?)
        } else {
            None
        };

        let mut summary = BuildSummary {
            sources,
            audio_format: use_audio.then(|| args.audio.resolved_format()),
            audio_bitrate: args.effective_audio_bitrate(),
            video_bitrate: None,
            rtmp_location: None,
        };

        if !args.any_sink() {
            info!("No delivery sink enabled, preview only");
            return Ok(summary);
        }

        let (video_tee, video_bitrate) = self
            .video_path(&raw_tee)
            .context("Failed to build video encoder")?;
        summary.video_bitrate = Some(video_bitrate);

        let Some(audio) = audio_tee else {
            return Err(BitcorderError::config("delivery sinks need the audio encoder"));
        };
        let tees = Tees {
            video: video_tee,
            audio,
        };

        if args.use_rtp {
            self.rtp_sink(&tees).context("Failed to build RTP sink")?;
        }
        if args.use_rtmp {
            let location = self
                .rtmp_sink(&tees, video_bitrate)
                .context("Failed to build RTMP sink")?;
            summary.rtmp_location = Some(location);
        }
        if args.use_save {
            self.save_sink(&tees).context("Failed to build file sink")?;
        }

        Ok(summary)
    }

    /// Mixer output: optional scale/rate constraint and effect, then download into `vid_raw_tee`
    fn output_stage(&mut self, mixer: &B::Element) -> Result<B::Element> {
        let output = &self.args.output;
        let mut last = mixer.clone();

        let scale = output.scale();
        if output.framerate > 0 || scale.is_some() {
            let mut caps = CapsSpec::gl_video();
            if output.framerate > 0 {
                debug!("Output framerate {}", output.framerate);
                caps = caps.framerate(output.framerate as i32);
            }
            if let Some((width, height)) = scale {
                debug!("Output scale {}x{}", width, height);
                // Without this the mixer answers the fixed size and crops.
                self.backend.filter_fixed_size_caps(mixer)?;
                let out_scale = self.make("glcolorscale")?;
                self.backend.link(&last, &out_scale)?;
                last = out_scale;
                caps = caps.int("width", width).int("height", height);
            }
            let filter = self.make("capsfilter")?;
            self.set(&filter, "caps", caps)?;
            self.backend.link(&last, &filter)?;
            last = filter;
        }

        if let Some(effect) = output.effect() {
            let gleffect = self.make("gleffects")?;
            self.set(&gleffect, "effect", effect)?;
            self.backend.link(&last, &gleffect)?;
            last = gleffect;
        }

        let convert = self.named("glcolorconvert", "glcc")?;
        let download = self.make("gldownload")?;
        let queue = self.make("queue")?;
        let tee = self.named("tee", "vid_raw_tee")?;
        self.backend.chain(&[&last, &convert, &download, &queue, &tee])?;
        Ok(tee)
    }

    /// queue, crop, GL upload, scale and effect for one input; returns the head queue
    fn composite_chain<S: VisualSource>(
        &mut self,
        source: &S,
        mixer: &B::Element,
    ) -> Result<B::Element> {
        let head = self.make("queue")?;
        let mut last = head.clone();

        if let Some(crop) = source.crop_stage() {
            let videocrop = self.make("videocrop")?;
            self.set(&videocrop, "left", crop.left)?;
            self.set(&videocrop, "top", crop.top)?;
            self.set(&videocrop, "right", crop.right)?;
            self.set(&videocrop, "bottom", crop.bottom)?;
            self.backend.link(&last, &videocrop)?;
            last = videocrop;
        }

        let upload = self.make("glupload")?;
        let convert = self.make("glcolorconvert")?;
        self.backend.chain(&[&last, &upload, &convert])?;
        last = convert;

        if let Some((width, height)) = source.scale() {
            debug!("Scaling {} to {}x{}", source.group(), width, height);
            let scale = self.make("glcolorscale")?;
            let filter = self.make("capsfilter")?;
            let caps = CapsSpec::gl_video().int("width", width).int("height", height);
            self.set(&filter, "caps", caps)?;
            self.backend.chain(&[&last, &scale, &filter])?;
            last = filter;
        }

        if let Some(effect) = source.effect() {
            let gleffect = self.make("gleffects")?;
            self.set(&gleffect, "effect", effect)?;
            self.backend.link(&last, &gleffect)?;
            last = gleffect;
        }

        self.backend.link_mixer(&last, mixer, &source.placement())?;
        Ok(head)
    }

    fn window_source(&mut self, mixer: &B::Element) -> Result<()> {
        let window = &self.args.window;
        let head = self.composite_chain(window, mixer)?;

        let src = self.named("ximagesrc", "window_el")?;
        self.set(&src, "use-damage", false)?;
        if !window.display.is_empty() {
            self.set(&src, "display-name", window.display.as_str())?;
        }
        if !window.xname.is_empty() {
            self.set(&src, "xname", window.xname.as_str())?;
        }
        self.set(&src, "show-pointer", window.show_pointer)?;
        self.set(&src, "xid", window.xid)?;
        if let Some(crop) = window.composite.crop() {
            self.set(&src, "startx", crop.left)?;
            self.set(&src, "starty", crop.top)?;
            self.set(&src, "endx", crop.right)?;
            self.set(&src, "endy", crop.bottom)?;
        }

        let caps = CapsSpec::raw_video().framerate(window.framerate as i32);
        self.backend.link_filtered(&src, &head, &caps)
    }

    fn camera_source(&mut self, mixer: &B::Element, device: &str) -> Result<()> {
        let camera = &self.args.camera;
        let head = self.composite_chain(camera, mixer)?;

        let src = self.make("v4l2src")?;
        self.set(&src, "device", device)?;
        match camera_caps(camera) {
            Some(caps) => self.backend.link_filtered(&src, &head, &caps),
            None => self.backend.link(&src, &head),
        }
    }

    fn image_source(&mut self, mixer: &B::Element, filename: &str) -> Result<()> {
        let args = self.args;
        let head = self.composite_chain(&args.image, mixer)?;

        let src = self.make("filesrc")?;
        self.set(&src, "location", filename)?;
        let decode = self.make("decodebin")?;
        let freeze = self.make("imagefreeze")?;
        let convert = self.make("videoconvert")?;
        self.backend.link(&src, &decode)?;
        self.backend.link_dynamic(&decode, &freeze)?;
        self.backend.chain(&[&freeze, &convert, &head])
    }

    /// pulsesrc through the configured encoder into `audiotee`
    fn audio_path(&mut self) -> Result<B::Element> {
        let format = self.args.audio.resolved_format();
        let bitrate = self.args.effective_audio_bitrate();
        info!("Audio: {} at {} bit/s", format, bitrate);

        let src = self.make("pulsesrc")?;
        let in_queue = self.make("queue")?;
        let convert = self.make("audioconvert")?;
        let mut stages = vec![src, in_queue, convert];

        match format {
            AudioFormat::Aac => {
                let enc = self.named("avenc_aac", "audio_enc")?;
                self.set(&enc, "bitrate", format.encoder_bitrate(bitrate))?;
                let parse = self.make("aacparse")?;
                let filter = self.make("capsfilter")?;
                let caps = CapsSpec::new("audio/mpeg")
                    .int("mpegversion", 4)
                    .string("stream-format", "raw");
                self.set(&filter, "caps", caps)?;
                stages.extend([enc, parse, filter]);
            }
            AudioFormat::Mp3 => {
                let enc = self.named("lamemp3enc", "audio_enc")?;
                self.set(&enc, "target", PropertyValue::Enum("bitrate"))?;
                self.set(&enc, "bitrate", format.encoder_bitrate(bitrate))?;
                let parse = self.make("mpegaudioparse")?;
                stages.extend([enc, parse]);
            }
        }

        let out_queue = self.make("queue")?;
        let tee = self.named("tee", "audiotee")?;
        self.set(&tee, "allow-not-linked", true)?;
        stages.extend([out_queue, tee.clone()]);

        let refs: Vec<&B::Element> = stages.iter().collect();
        self.backend.chain(&refs)?;
        Ok(tee)
    }

    /// H.264 encode of the raw composite into `videnctee`; returns the tee and bitrate
    fn video_path(&mut self, raw_tee: &B::Element) -> Result<(B::Element, u32)> {
        let preenc = self.named("queue", "preenc")?;
        let q1 = self.make("queue")?;
        let convert = self.make("videoconvert")?;
        let q2 = self.make("queue")?;
        let enc = self.named("vaapih264enc", "h264enc")?;
        self.set(&enc, "max-bframes", 0u32)?;
        self.set(&enc, "tune", PropertyValue::Enum("low-power"))?;
        let q3 = self.make("queue")?;
        let parse = self.make("h264parse")?;
        self.set(&parse, "config-interval", 1i32)?;
        let q4 = self.make("queue")?;
        let tee = self.named("tee", "videnctee")?;

        let bitrate = if self.args.video_bitrate > 0 {
            self.set(&enc, "bitrate", self.args.video_bitrate)?;
            self.args.video_bitrate
        } else {
            self.backend.get_u32(&enc, "bitrate")?
        };
        info!("Video: H.264 at {} kbit/s (0 = encoder decides)", bitrate);

        self.backend.chain(&[
            raw_tee, &preenc, &q1, &convert, &q2, &enc, &q3, &parse, &q4, &tee,
        ])?;
        Ok((tee, bitrate))
    }

    /// Queue a branch of both encoded streams into `mux`
    fn attach_tees(&mut self, tees: &Tees<B::Element>, mux: &B::Element, label: &str) -> Result<()> {
        let video_queue = self.named("queue", &format!("video_{}_queue", label))?;
        let audio_queue = self.named("queue", &format!("audio_{}_queue", label))?;
        self.backend.chain(&[&tees.video, &video_queue, mux])?;
        self.backend.chain(&[&tees.audio, &audio_queue, mux])
    }

    fn rtp_sink(&mut self, tees: &Tees<B::Element>) -> Result<()> {
        let rtp = &self.args.rtp;
        info!("RTP: mpegts to {}:{}", rtp.host, rtp.port);

        let mux = self.named("mpegtsmux", "tsmux")?;
        self.attach_tees(tees, &mux, "rtp")?;

        let queue = self.make("queue")?;
        let pay = self.make("rtpmp2tpay")?;
        let sink = self.named("udpsink", "rtpsink")?;
        self.set(&sink, "host", rtp.host.as_str())?;
        self.set(&sink, "port", i32::from(rtp.port))?;
        self.backend.chain(&[&mux, &queue, &pay, &sink])
    }

    fn rtmp_sink(&mut self, tees: &Tees<B::Element>, video_bitrate: u32) -> Result<String> {
        let rtmp = &self.args.rtmp;
        let service = rtmp
            .service
            .ok_or_else(|| BitcorderError::config("--rtmp requires service=youtube or service=twitch"))?;
        let total_kbps = self.args.effective_audio_bitrate() / 1000 + video_bitrate;
        let location = rtmp_location(service, rtmp, total_kbps);
        info!("RTMP: streaming to {} ({})", service, rtmp.url);

        let mux = self.named("flvmux", "flashmux")?;
        self.set(&mux, "streamable", true)?;
        self.attach_tees(tees, &mux, "rtmp")?;

        let queue = self.make("queue")?;
        self.set(&queue, "leaky", PropertyValue::Enum("downstream"))?;
        let sink = self.named("rtmpsink", "streamsink")?;
        self.set(&sink, "location", location.as_str())?;
        self.backend.chain(&[&mux, &queue, &sink])?;
        Ok(location)
    }

    fn save_sink(&mut self, tees: &Tees<B::Element>) -> Result<()> {
        let filename = &self.args.save.filename;
        info!("Saving to {}", filename);

        let mux = self.named("matroskamux", "savemux")?;
        self.attach_tees(tees, &mux, "save")?;

        let queue = self.make("queue")?;
        let sink = self.named("filesink", "savesink")?;
        self.set(&sink, "location", filename.as_str())?;
        self.backend.chain(&[&mux, &queue, &sink])
    }
}

/// Capture caps for the camera when a format was requested
///
/// Dimensions and rate are bounded by `MAX_CAPS_INT` when parsed.
fn camera_caps(camera: &CameraOptions) -> Option<CapsSpec> {
    if !camera.has_format() {
        return None;
    }
    let mut caps = CapsSpec::raw_video();
    if let Some(ref fourcc) = camera.fourcc {
        caps = caps.string("format", fourcc.as_str());
    }
    if let Some(width) = camera.width {
        caps = caps.int("width", width as i32);
    }
    if let Some(height) = camera.height {
        caps = caps.int("height", height as i32);
    }
    if let Some(fps) = camera.framerate {
        caps = caps.framerate(fps as i32);
    }
    Some(caps)
}
