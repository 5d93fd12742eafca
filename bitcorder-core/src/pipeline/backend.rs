//! GStreamer implementation of [`GraphBackend`]

use std::str::FromStr;

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use tracing::{debug, warn};

use super::caps;
use crate::error::{BitcorderError, Result};
use crate::options::Placement;
use crate::topology::{CapsSpec, GraphBackend, PropertyValue};

/// Adds elements straight into a `gst::Pipeline`
pub struct GstBackend {
    pipeline: gst::Pipeline,
}

impl GstBackend {
    pub fn new(pipeline: &gst::Pipeline) -> Self {
        Self {
            pipeline: pipeline.clone(),
        }
    }
}

fn display_name(element: &gst::Element) -> String {
    element.name().to_string()
}

fn to_caps(spec: &CapsSpec) -> Result<gst::Caps> {
    gst::Caps::from_str(&spec.to_string())
        .map_err(|e| BitcorderError::gstreamer(format!("invalid caps '{}': {}", spec, e)))
}

/// Deserialize `value` against the property's declared type and set it
fn set_from_str<O: IsA<glib::Object>>(
    object: &O,
    owner: &str,
    property: &str,
    value: &PropertyValue,
) -> Result<()> {
    let Some(pspec) = object.find_property(property) else {
        return Err(BitcorderError::property(format!(
            "{} has no property '{}'",
            owner, property
        )));
    };
    if !pspec.flags().contains(glib::ParamFlags::WRITABLE) {
        return Err(BitcorderError::property(format!(
            "{}:{} is read-only",
            owner, property
        )));
    }

    let text = value.to_string();
    if let PropertyValue::Str(s) = value {
        if pspec.value_type() == glib::Type::STRING {
            object.set_property_from_value(property, &s.to_value());
            debug!("{}:{} = {}", owner, property, s);
            return Ok(());
        }
    }
    let parsed = glib::Value::deserialize(&text, pspec.value_type()).map_err(|_| {
        BitcorderError::property(format!(
            "{}:{} rejects '{}' (expects {})",
            owner,
            property,
            text,
            pspec.value_type().name()
        ))
    })?;
    object.set_property_from_value(property, &parsed);
    debug!("{}:{} = {}", owner, property, text);
    Ok(())
}

impl GraphBackend for GstBackend {
    type Element = gst::Element;

    fn element(&mut self, factory: &str, name: Option<&str>) -> Result<gst::Element> {
        let mut builder = gst::ElementFactory::make(factory);
        if let Some(name) = name {
            builder = builder.name(name);
        }
        let element = builder
            .build()
            .map_err(|_| BitcorderError::ElementMissing(factory.to_string()))?;
        self.pipeline.add(&element).map_err(|e| {
            BitcorderError::gstreamer(format!("cannot add {} to pipeline: {}", factory, e))
        })?;
        Ok(element)
    }

    fn set(&mut self, element: &gst::Element, property: &str, value: PropertyValue) -> Result<()> {
        set_from_str(element, &display_name(element), property, &value)
    }

    fn get_u32(&self, element: &gst::Element, property: &str) -> Result<u32> {
        if element.find_property(property).is_none() {
            return Err(BitcorderError::property(format!(
                "{} has no property '{}'",
                display_name(element),
                property
            )));
        }
        let value = element.property_value(property);
        value
            .get::<u32>()
            .or_else(|_| value.get::<i32>().map(|v| v.max(0) as u32))
            .map_err(|e| {
                BitcorderError::property(format!(
                    "{}:{} is not an integer: {}",
                    display_name(element),
                    property,
                    e
                ))
            })
    }

    fn link(&mut self, src: &gst::Element, sink: &gst::Element) -> Result<()> {
        src.link(sink).map_err(|_| {
            BitcorderError::link(format!(
                "{} ! {}",
                display_name(src),
                display_name(sink)
            ))
        })
    }

    fn link_filtered(
        &mut self,
        src: &gst::Element,
        sink: &gst::Element,
        caps: &CapsSpec,
    ) -> Result<()> {
        let filter = to_caps(caps)?;
        src.link_filtered(sink, &filter).map_err(|_| {
            BitcorderError::link(format!(
                "{} ! {} ! {}",
                display_name(src),
                caps,
                display_name(sink)
            ))
        })
    }

    fn link_dynamic(&mut self, src: &gst::Element, sink: &gst::Element) -> Result<()> {
        let sink = sink.clone();
        src.connect_pad_added(move |src, pad| {
            let Some(sink_pad) = sink.static_pad("sink") else {
                warn!("{} has no sink pad", sink.name());
                return;
            };
            if sink_pad.is_linked() {
                debug!("{} already linked, ignoring new pad {}", sink.name(), pad.name());
                return;
            }
            match pad.link(&sink_pad) {
                Ok(_) => debug!("Linked {}:{} to {}", src.name(), pad.name(), sink.name()),
                Err(e) => warn!(
                    "Failed to link {}:{} to {}: {:?}",
                    src.name(),
                    pad.name(),
                    sink.name(),
                    e
                ),
            }
        });
        Ok(())
    }

    fn link_mixer(
        &mut self,
        src: &gst::Element,
        mixer: &gst::Element,
        placement: &Placement,
    ) -> Result<()> {
        self.link(src, mixer)?;
        let pad = src
            .static_pad("src")
            .and_then(|pad| pad.peer())
            .ok_or_else(|| {
                BitcorderError::link(format!(
                    "{} has no mixer pad after linking",
                    display_name(src)
                ))
            })?;

        let owner = format!("{}:{}", display_name(mixer), pad.name());
        set_from_str(&pad, &owner, "xpos", &placement.xpos.into())?;
        set_from_str(&pad, &owner, "ypos", &placement.ypos.into())?;
        set_from_str(&pad, &owner, "zorder", &placement.zorder.into())?;
        set_from_str(&pad, &owner, "alpha", &placement.alpha.into())?;
        Ok(())
    }

    fn filter_fixed_size_caps(&mut self, element: &gst::Element) -> Result<()> {
        let pad = element.static_pad("src").ok_or_else(|| {
            BitcorderError::gstreamer(format!("{} has no src pad", display_name(element)))
        })?;
        caps::install_probe(&pad)
    }
}
