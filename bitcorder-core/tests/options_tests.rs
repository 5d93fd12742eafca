//! Integration tests for the option grammar and parser

use bitcorder_core::options::{
    Arguments, AudioFormat, CompositeOptions, OptionGroup, RtmpService,
};
use bitcorder_core::topology::service_app;

fn parse(groups: &[(OptionGroup, &str)]) -> Arguments {
    let mut args = Arguments::default();
    for (group, value) in groups {
        args.apply(*group, value).unwrap();
    }
    args
}

#[test]
fn test_reparse_is_identical() {
    let groups = [
        (OptionGroup::Window, "xid=0x20,framerate=25,left=1,right=2"),
        (OptionGroup::Camera, "device=/dev/video0,scale_width=160,scale_height=120,alpha=0.5"),
        (OptionGroup::Output, "framerate=30"),
        (OptionGroup::Rtmp, "service=twitch,key=abc,test"),
        (OptionGroup::VideoBitrate, "0x400"),
    ];
    let first = Arguments::from_groups(groups.iter().copied()).unwrap();
    let second = Arguments::from_groups(groups.iter().copied()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.video_bitrate, 1024);
}

fn composite_of(args: &Arguments, group: OptionGroup) -> &CompositeOptions {
    match group {
        OptionGroup::Window => &args.window.composite,
        OptionGroup::Camera => &args.camera.composite,
        OptionGroup::Image => &args.image.composite,
        _ => &args.output.composite,
    }
}

#[test]
fn test_scale_requires_both_dimensions() {
    for group in [OptionGroup::Window, OptionGroup::Camera, OptionGroup::Image, OptionGroup::Output] {
        let width_first = parse(&[(group, "scale_width=640,scale_height=360")]);
        let height_first = parse(&[(group, "scale_height=360,scale_width=640")]);
        let split = parse(&[(group, "scale_height=360"), (group, "scale_width=640")]);
        assert_eq!(width_first, height_first);
        assert_eq!(width_first, split);
        assert_eq!(composite_of(&width_first, group).scale(), Some((640, 360)));

        let only_width = parse(&[(group, "scale_width=640")]);
        assert!(!composite_of(&only_width, group).use_scale());

        let zero_height = parse(&[(group, "scale_width=640,scale_height=0")]);
        assert!(!composite_of(&zero_height, group).use_scale());
    }
}

#[test]
fn test_sinks_force_audio() {
    assert!(parse(&[(OptionGroup::Rtp, "")]).use_audio);
    assert!(parse(&[(OptionGroup::Rtmp, "service=youtube")]).use_audio);
    assert!(parse(&[(OptionGroup::Save, "filename=a.mkv")]).use_audio);
    assert!(parse(&[(OptionGroup::Audio, "")]).use_audio);

    let quiet = parse(&[
        (OptionGroup::Window, "framerate=10"),
        (OptionGroup::Camera, "device=/dev/video0"),
        (OptionGroup::Output, "framerate=10"),
        (OptionGroup::AudioBitrate, "64000"),
    ]);
    assert!(!quiet.use_audio);
}

#[test]
fn test_save_needs_filename() {
    let args = parse(&[(OptionGroup::Save, "")]);
    assert!(!args.use_save);
    assert!(!args.use_audio);

    let args = parse(&[(OptionGroup::Save, "filename")]);
    assert!(!args.use_save);
}

#[test]
fn test_unknown_keys_change_nothing() {
    let cases = [
        (OptionGroup::Window, "bogus=1,device=/dev/video0,filename=x"),
        (OptionGroup::Camera, "xid=4,choose_device,host=h"),
        (OptionGroup::Image, "port=1,unknown"),
        (OptionGroup::Output, "xid=3,choose_window,xpos=4,alpha=0.1"),
        (OptionGroup::Audio, "bitrate=1,host=x"),
        (OptionGroup::Rtmp, "nonsense,filename=y"),
    ];
    for (group, value) in cases {
        let mut args = Arguments::default();
        args.apply(group, value).unwrap();

        let mut expected = Arguments::default();
        match group {
            OptionGroup::Window => expected.window.requested = true,
            OptionGroup::Audio => expected.use_audio = true,
            OptionGroup::Rtmp => {
                expected.use_rtmp = true;
                expected.use_audio = true;
            }
            _ => {}
        }
        assert_eq!(args, expected, "{} {}", group, value);
    }
}

#[test]
fn test_service_app() {
    assert_eq!(service_app("http://example.com/app/channel"), "channel");
    assert_eq!(service_app("http://example.com/app/channel/"), "");
}

#[test]
fn test_window_example() {
    let args = Arguments::from_groups([(OptionGroup::Window, "xid=0x1234,framerate=24")]).unwrap();
    assert_eq!(args.window.xid, 4660);
    assert_eq!(args.window.framerate, 24);
    assert!(!args.use_rtp && !args.use_rtmp && !args.use_save);
    assert!(args.use_monitor);
}

#[test]
fn test_audio_format_case_insensitive() {
    let args = parse(&[(OptionGroup::Audio, "format=MP3")]);
    assert_eq!(args.audio.format, Some(AudioFormat::Mp3));
    assert_eq!(args.audio.resolved_format(), AudioFormat::Mp3);

    let args = parse(&[(OptionGroup::Audio, "format=flac")]);
    assert_eq!(args.audio.format, None);
    assert_eq!(args.audio.resolved_format(), AudioFormat::Aac);
}

#[test]
fn test_bogus_service_left_unset() {
    let args = parse(&[(OptionGroup::Rtmp, "url=rtmp://example.com/live,service=bogus")]);
    assert_eq!(args.rtmp.service, None);
    assert_eq!(args.rtmp.url, "rtmp://example.com/live");
    assert!(args.finalize().is_err());

    let args = parse(&[
        (OptionGroup::Rtmp, "service=YOUTUBE"),
        (OptionGroup::Rtmp, "service=bogus"),
    ]);
    assert_eq!(args.rtmp.service, Some(RtmpService::YouTube));
}

#[test]
fn test_later_occurrence_overrides_per_key() {
    let args = parse(&[
        (OptionGroup::Rtp, "host=a.example,port=5000"),
        (OptionGroup::Rtp, "port=5002"),
    ]);
    assert_eq!(args.rtp.host, "a.example");
    assert_eq!(args.rtp.port, 5002);
}

#[test]
fn test_number_bases_and_errors() {
    let args = parse(&[(OptionGroup::Camera, "width=0x280,height=0740,framerate=+30")]);
    assert_eq!(args.camera.width, Some(640));
    assert_eq!(args.camera.height, Some(480));
    assert_eq!(args.camera.framerate, Some(30));

    let mut args = Arguments::default();
    assert!(args.apply(OptionGroup::Window, "xid=zzz").is_err());
    assert!(args.apply(OptionGroup::Rtp, "port=70000").is_err());
    assert!(args.apply(OptionGroup::Camera, "alpha=half").is_err());
    assert!(args.apply(OptionGroup::VideoBitrate, "").is_err());
}

#[test]
fn test_empty_tokens_skipped() {
    let args = parse(&[(OptionGroup::Window, ",,xid=7,,")]);
    assert_eq!(args.window.xid, 7);
}

#[test]
fn test_nothing_to_do_is_rejected() {
    let result = Arguments::from_groups([(OptionGroup::Output, "monitor_sink=none")]);
    assert!(matches!(result, Err(bitcorder_core::BitcorderError::Config(_))));
}

#[test]
fn test_caps_values_out_of_range() {
    let mut args = Arguments::default();
    let err = args
        .apply(OptionGroup::Window, "framerate=3000000000")
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("--win"));
    assert!(msg.contains("framerate"));
    assert!(msg.contains("out of range"));

    assert!(args.apply(OptionGroup::Output, "framerate=4294967295").is_err());
    assert!(args.apply(OptionGroup::Camera, "width=0x80000000").is_err());
    assert!(args.apply(OptionGroup::Camera, "framerate=2147483648").is_err());
    assert_eq!(args.camera.width, None);
}
