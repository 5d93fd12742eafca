//! RTMP sink location strings
//!
//! librtmp takes the URL followed by space separated `key=value` options.

use crate::options::{RtmpOptions, RtmpService, FLASH_VERSION};

/// Application segment of an ingest URL: everything after the final `/`
pub fn service_app(url: &str) -> &str {
    url.rsplit_once('/').map_or(url, |(_, app)| app)
}

/// Build the rtmpsink `location` for a service
///
/// `total_kbps` is advertised to YouTube as `totalDatarate`.
pub fn rtmp_location(service: RtmpService, rtmp: &RtmpOptions, total_kbps: u32) -> String {
    let app = service_app(&rtmp.url);
    match service {
        RtmpService::YouTube => format!(
            "{url}/x/{key}?videoKeyframeFrequency=1&totalDatarate={rate} app={app} flashVer={ver} swfUrl={url}",
            url = rtmp.url,
            key = rtmp.key,
            rate = total_kbps,
            app = app,
            ver = FLASH_VERSION,
        ),
        RtmpService::Twitch => format!(
            "{url}/{key}{test} app={app} live=1 flashVer={ver}",
            url = rtmp.url,
            key = rtmp.key,
            test = if rtmp.test { "?bandwidthtest=true" } else { "" },
            app = app,
            ver = FLASH_VERSION,
        ),
    }
}
