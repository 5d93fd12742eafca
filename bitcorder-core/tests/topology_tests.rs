//! Integration tests for graph construction, recorded without GStreamer

use bitcorder_core::options::{Arguments, AudioFormat, OptionGroup};
use bitcorder_core::topology::{build, CapsField, PlanLink, PlanRecorder, PropertyValue};

fn plan(groups: &[(OptionGroup, &str)]) -> (PlanRecorder, bitcorder_core::BuildSummary) {
    let args = Arguments::from_groups(groups.iter().copied()).unwrap();
    let mut recorder = PlanRecorder::new();
    let summary = build(&args, &mut recorder).unwrap();
    (recorder, summary)
}

fn prop<'a>(plan: &'a PlanRecorder, element: &str, property: &str) -> &'a PropertyValue {
    plan.get(element)
        .unwrap_or_else(|| panic!("no element {}", element))
        .property(property)
        .unwrap_or_else(|| panic!("{} has no {}", element, property))
}

#[test]
fn test_preview_only_window() {
    let (plan, summary) = plan(&[]);

    assert_eq!(summary.sources, vec!["window"]);
    assert_eq!(summary.audio_format, None);
    assert_eq!(summary.video_bitrate, None);

    assert_eq!(
        plan.factory_path_from("window_el"),
        vec![
            "queue",
            "glupload",
            "glcolorconvert",
            "glvideomixerelement",
            "glcolorconvert",
            "gldownload",
            "queue",
            "tee",
            "queue",
            "gtksink",
        ]
    );
    assert!(plan.get("h264enc").is_none());
    assert!(plan.get("audiotee").is_none());
    assert!(plan.by_factory("pulsesrc").next().is_none());
}

#[test]
fn test_window_capture_properties() {
    let (plan, _) = plan(&[(
        OptionGroup::Window,
        "xid=0x1234,framerate=24,display=:1,xname=Terminal,show-pointer",
    )]);

    assert_eq!(prop(&plan, "window_el", "xid"), &PropertyValue::UInt(4660));
    assert_eq!(prop(&plan, "window_el", "use-damage"), &PropertyValue::Bool(false));
    assert_eq!(prop(&plan, "window_el", "show-pointer"), &PropertyValue::Bool(true));
    assert_eq!(prop(&plan, "window_el", "display-name"), &PropertyValue::Str(":1".into()));
    assert_eq!(prop(&plan, "window_el", "xname"), &PropertyValue::Str("Terminal".into()));

    let link = plan
        .links()
        .iter()
        .find(|l| l.src() == "window_el")
        .unwrap();
    match link {
        PlanLink::Filtered { caps, .. } => {
            assert_eq!(caps.media_type, "video/x-raw");
            assert_eq!(caps.get("framerate"), Some(&CapsField::Fraction(24, 1)));
        }
        other => panic!("expected a filtered link, got {:?}", other),
    }
}

#[test]
fn test_window_crop_happens_in_source() {
    let (plan, _) = plan(&[(OptionGroup::Window, "left=10,top=20,right=650,bottom=500")]);

    assert!(plan.by_factory("videocrop").next().is_none());
    assert_eq!(prop(&plan, "window_el", "startx"), &PropertyValue::UInt(10));
    assert_eq!(prop(&plan, "window_el", "starty"), &PropertyValue::UInt(20));
    assert_eq!(prop(&plan, "window_el", "endx"), &PropertyValue::UInt(650));
    assert_eq!(prop(&plan, "window_el", "endy"), &PropertyValue::UInt(500));
}

#[test]
fn test_camera_chain_with_crop_scale_and_placement() {
    let (plan, summary) = plan(&[(
        OptionGroup::Camera,
        "device=/dev/video2,width=640,height=480,left=8,scale_width=320,scale_height=240,xpos=16,ypos=-4,zorder=2,alpha=0.75,effect=3",
    )]);

    // A camera alone replaces the default window capture
    assert_eq!(summary.sources, vec!["camera"]);
    assert!(plan.get("window_el").is_none());

    let camera = plan.by_factory("v4l2src").next().unwrap();
    assert_eq!(camera.property("device"), Some(&PropertyValue::Str("/dev/video2".into())));
    assert_eq!(
        plan.factory_path_from(&camera.name)[..8],
        [
            "queue",
            "videocrop",
            "glupload",
            "glcolorconvert",
            "glcolorscale",
            "capsfilter",
            "gleffects",
            "glvideomixerelement",
        ]
    );

    let crop = plan.by_factory("videocrop").next().unwrap();
    assert_eq!(crop.property("left"), Some(&PropertyValue::UInt(8)));
    assert_eq!(crop.property("right"), Some(&PropertyValue::UInt(0)));

    let effect = plan.by_factory("gleffects").next().unwrap();
    assert_eq!(effect.property("effect"), Some(&PropertyValue::UInt(3)));

    let placement = plan
        .links()
        .iter()
        .find_map(|l| match l {
            PlanLink::Mixer { placement, .. } => Some(*placement),
            _ => None,
        })
        .unwrap();
    assert_eq!(placement.xpos, 16);
    assert_eq!(placement.ypos, -4);
    assert_eq!(placement.zorder, 2);
    assert_eq!(placement.alpha, 0.75);

    match plan.links().iter().find(|l| l.src() == camera.name).unwrap() {
        PlanLink::Filtered { caps, .. } => {
            assert_eq!(caps.get("width"), Some(&CapsField::Int(640)));
            assert_eq!(caps.get("height"), Some(&CapsField::Int(480)));
        }
        other => panic!("expected a filtered link, got {:?}", other),
    }
}

#[test]
fn test_image_source_links_decoder_dynamically() {
    let (plan, summary) = plan(&[
        (OptionGroup::Window, ""),
        (OptionGroup::Image, "filename=logo.png,xpos=100,zorder=5"),
    ]);

    assert_eq!(summary.sources, vec!["window", "image"]);

    let file = plan.by_factory("filesrc").next().unwrap();
    assert_eq!(file.property("location"), Some(&PropertyValue::Str("logo.png".into())));

    let decode = plan.by_factory("decodebin").next().unwrap();
    let freeze = plan.by_factory("imagefreeze").next().unwrap();
    assert!(plan.links().contains(&PlanLink::Dynamic {
        src: decode.name.clone(),
        sink: freeze.name.clone(),
    }));
    assert_eq!(
        plan.factory_path_from(&freeze.name)[..4],
        ["videoconvert", "queue", "glupload", "glcolorconvert"]
    );

    let mixer_links = plan
        .links()
        .iter()
        .filter(|l| matches!(l, PlanLink::Mixer { .. }))
        .count();
    assert_eq!(mixer_links, 2);
}

#[test]
fn test_output_scale_filters_mixer_caps() {
    let (plan, _) = plan(&[(
        OptionGroup::Output,
        "scale_width=1280,scale_height=720,framerate=30,effect=7",
    )]);

    assert_eq!(plan.caps_filters(), ["mix".to_string()]);
    assert_eq!(
        plan.factory_path_from("mix")[..4],
        ["glcolorscale", "capsfilter", "gleffects", "glcolorconvert"]
    );

    let filter = plan.by_factory("capsfilter").next().unwrap();
    match filter.property("caps") {
        Some(PropertyValue::Caps(caps)) => {
            assert_eq!(caps.features, Some("memory:GLMemory"));
            assert_eq!(caps.get("width"), Some(&CapsField::Int(1280)));
            assert_eq!(caps.get("height"), Some(&CapsField::Int(720)));
            assert_eq!(caps.get("framerate"), Some(&CapsField::Fraction(30, 1)));
        }
        other => panic!("expected caps, got {:?}", other),
    }
}

#[test]
fn test_output_framerate_without_scale() {
    let (plan, _) = plan(&[(OptionGroup::Output, "framerate=15,scale_width=1280")]);

    assert!(plan.caps_filters().is_empty());
    assert!(plan.by_factory("glcolorscale").next().is_none());
    assert_eq!(plan.factory_path_from("mix")[0], "capsfilter");
}

#[test]
fn test_all_sinks() {
    let (plan, summary) = plan(&[
        (OptionGroup::VideoBitrate, "2500"),
        (OptionGroup::Rtp, "host=10.0.0.2,port=5004"),
        (
            OptionGroup::Rtmp,
            "service=YouTube,url=rtmp://a.rtmp.youtube.com/live2,key=abcd-1234",
        ),
        (OptionGroup::Save, "filename=out.mkv"),
    ]);

    assert_eq!(summary.audio_format, Some(AudioFormat::Aac));
    assert_eq!(summary.audio_bitrate, 128_000);
    assert_eq!(summary.video_bitrate, Some(2500));

    // Encoders
    assert_eq!(plan.get("audio_enc").unwrap().factory, "avenc_aac");
    assert_eq!(prop(&plan, "audio_enc", "bitrate"), &PropertyValue::UInt(128_000));
    assert_eq!(prop(&plan, "audiotee", "allow-not-linked"), &PropertyValue::Bool(true));
    assert_eq!(prop(&plan, "h264enc", "bitrate"), &PropertyValue::UInt(2500));
    assert_eq!(prop(&plan, "h264enc", "tune"), &PropertyValue::Enum("low-power"));

    // RTP
    assert_eq!(plan.downstream("video_rtp_queue"), Some("tsmux"));
    assert_eq!(plan.downstream("audio_rtp_queue"), Some("tsmux"));
    assert_eq!(plan.factory_path_from("tsmux"), ["queue", "rtpmp2tpay", "udpsink"]);
    assert_eq!(prop(&plan, "rtpsink", "host"), &PropertyValue::Str("10.0.0.2".into()));
    assert_eq!(prop(&plan, "rtpsink", "port"), &PropertyValue::Int(5004));

    // RTMP
    assert_eq!(prop(&plan, "flashmux", "streamable"), &PropertyValue::Bool(true));
    assert_eq!(plan.factory_path_from("flashmux"), ["queue", "rtmpsink"]);
    let location = summary.rtmp_location.unwrap();
    assert!(location.starts_with(
        "rtmp://a.rtmp.youtube.com/live2/x/abcd-1234?videoKeyframeFrequency=1&totalDatarate=2628 app=live2"
    ));
    assert_eq!(prop(&plan, "streamsink", "location"), &PropertyValue::Str(location));

    // File
    assert_eq!(plan.factory_path_from("savemux"), ["queue", "filesink"]);
    assert_eq!(prop(&plan, "savesink", "location"), &PropertyValue::Str("out.mkv".into()));
}

#[test]
fn test_encoded_video_reaches_every_mux() {
    let (plan, _) = plan(&[
        (OptionGroup::Rtp, ""),
        (OptionGroup::Save, "filename=a.mkv"),
    ]);

    let from_tee: Vec<&str> = plan
        .links()
        .iter()
        .filter(|l| l.src() == "videnctee")
        .map(|l| l.sink())
        .collect();
    assert_eq!(from_tee, ["video_rtp_queue", "video_save_queue"]);
    assert_eq!(
        plan.factory_path_from("preenc"),
        ["queue", "videoconvert", "queue", "vaapih264enc", "queue", "h264parse", "queue", "tee", "queue", "mpegtsmux", "queue", "rtpmp2tpay", "udpsink"]
    );
}

#[test]
fn test_video_bitrate_defaults_to_encoder() {
    let (plan, summary) = plan(&[(OptionGroup::Save, "filename=a.mkv")]);
    assert_eq!(summary.video_bitrate, Some(0));
    assert!(plan.get("h264enc").unwrap().property("bitrate").is_none());
}

#[test]
fn test_mp3_audio() {
    let (plan, summary) = plan(&[
        (OptionGroup::Audio, "format=mp3"),
        (OptionGroup::AudioBitrate, "192000"),
        (OptionGroup::Save, "filename=a.mkv"),
    ]);

    assert_eq!(summary.audio_format, Some(AudioFormat::Mp3));
    assert_eq!(plan.get("audio_enc").unwrap().factory, "lamemp3enc");
    assert_eq!(prop(&plan, "audio_enc", "target"), &PropertyValue::Enum("bitrate"));
    assert_eq!(prop(&plan, "audio_enc", "bitrate"), &PropertyValue::UInt(192));
    assert_eq!(plan.factory_path_from("audio_enc"), ["mpegaudioparse", "queue", "tee", "queue", "matroskamux", "queue", "filesink"]);
}

#[test]
fn test_audio_without_sinks_is_preview_only() {
    let (plan, summary) = plan(&[(OptionGroup::Audio, "")]);

    assert_eq!(summary.audio_format, Some(AudioFormat::Aac));
    assert!(plan.get("audiotee").is_some());
    assert!(plan.get("h264enc").is_none());
}

#[test]
fn test_no_monitor_with_sink() {
    let (plan, _) = plan(&[
        (OptionGroup::Output, "monitor_sink=none"),
        (OptionGroup::Rtp, ""),
    ]);
    assert!(plan.get("monitor").is_none());
    assert_eq!(plan.downstream("vid_raw_tee"), Some("preenc"));
}

#[test]
fn test_custom_monitor_sink() {
    let (plan, _) = plan(&[(OptionGroup::Output, "monitor_sink=glimagesink")]);
    assert_eq!(plan.get("monitor").unwrap().factory, "glimagesink");
}

#[test]
fn test_twitch_bandwidth_test() {
    let (_, summary) = plan(&[(
        OptionGroup::Rtmp,
        "service=twitch,url=rtmp://live.twitch.tv/app,key=live_1,test",
    )]);
    assert_eq!(
        summary.rtmp_location.unwrap(),
        "rtmp://live.twitch.tv/app/live_1?bandwidthtest=true app=app live=1 flashVer=FME/3.0%20(compatible;%20FMSc%201.0)"
    );
}

#[test]
fn test_build_is_deterministic() {
    let groups = [
        (OptionGroup::Camera, "device=/dev/video0,xpos=10"),
        (OptionGroup::Rtp, "port=7000"),
    ];
    let (first, _) = plan(&groups);
    let (second, _) = plan(&groups);
    assert_eq!(first.elements(), second.elements());
    assert_eq!(first.links(), second.links());
}
