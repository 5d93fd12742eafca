//! Integration tests for error handling

use bitcorder_core::error::{BitcorderError, ResultExt};
use bitcorder_core::options::{Arguments, OptionGroup};

#[test]
fn test_error_context_chaining() {
    let base_error = BitcorderError::link("queue0 ! mix");
    let with_context = base_error.with_context("Failed to build window capture");

    let msg = format!("{}", with_context);
    assert!(msg.contains("Failed to build window capture"));
    assert!(msg.contains("queue0 ! mix"));
}

#[test]
fn test_error_context_preserves_hint() {
    let base_error = BitcorderError::ElementMissing("vaapih264enc".into());
    let hint_before = base_error.user_hint();

    let with_context = base_error.with_context("Failed to build video encoder");
    let hint_after = with_context.user_hint();

    assert!(hint_before.is_some());
    assert_eq!(hint_before, hint_after);
}

#[test]
fn test_result_ext_context() {
    let result: Result<(), BitcorderError> = Err(BitcorderError::property("udpsink has no 'hots'"));
    let err = result.context("Failed to build RTP sink").unwrap_err();

    let msg = format!("{}", err);
    assert!(msg.starts_with("Failed to build RTP sink"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_user_hints() {
    assert!(BitcorderError::config("bad").user_hint().is_some());
    assert!(BitcorderError::link("a ! b").user_hint().is_some());
    assert!(BitcorderError::gstreamer("boom").user_hint().is_none());
    assert!(BitcorderError::property("nope").user_hint().is_none());
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: BitcorderError = io.into();
    assert!(matches!(err, BitcorderError::Io(_)));
    assert!(err.to_string().contains("gone"));
}

#[test]
fn test_malformed_number_names_group_and_key() {
    let mut args = Arguments::default();
    let err = args.apply(OptionGroup::Rtp, "port=12ab").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("--rtp"));
    assert!(msg.contains("port"));
}
