//! Caps query filtering for output scaling
//!
//! When the output capsfilter asks for a fixed size, the GL mixer answers the
//! caps query with that size and crops its canvas instead of letting the
//! scaler downstream resize it. Dropping the fixed-size structures from the
//! answer keeps negotiation on the scaling path.

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;

use crate::error::{BitcorderError, Result};

fn has_fixed_size(structure: &gst::StructureRef) -> bool {
    ["width", "height"].iter().any(|field| {
        structure
            .value(*field)
            .map(|value| value.type_() == glib::Type::I32)
            .unwrap_or(false)
    })
}

/// Copy of `caps` without structures whose width or height is a fixed int,
/// or None when there are none to remove
pub fn strip_fixed_size(caps: &gst::CapsRef) -> Option<gst::Caps> {
    if !caps.iter().any(has_fixed_size) {
        return None;
    }

    let mut filtered = gst::Caps::new_empty();
    {
        let filtered = filtered.make_mut();
        for (structure, features) in caps.iter_with_features() {
            if !has_fixed_size(structure) {
                filtered.append_structure_full(structure.to_owned(), Some(features.to_owned()));
            }
        }
    }
    Some(filtered)
}

/// Rewrite caps query answers passing `pad`
pub fn install_probe(pad: &gst::Pad) -> Result<()> {
    pad.add_probe(gst::PadProbeType::QUERY_DOWNSTREAM, |_, info| {
        if let Some(gst::PadProbeData::Query(query)) = info.data.as_mut() {
            if let gst::QueryViewMut::Caps(caps_query) = query.view_mut() {
                if let Some(filtered) = caps_query.result().and_then(strip_fixed_size) {
                    tracing::trace!("Stripped fixed size from caps query: {}", filtered);
                    caps_query.set_result(&filtered);
                }
            }
        }
        gst::PadProbeReturn::Ok
    })
    .map(|_| ())
    .ok_or_else(|| BitcorderError::gstreamer(format!("cannot add caps probe on {}", pad.name())))
}
