//! Backend that records the graph instead of building it

use std::collections::HashMap;

use super::{CapsSpec, GraphBackend, PropertyValue};
use crate::error::{BitcorderError, Result};
use crate::options::Placement;

/// An element the builder asked for
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedElement {
    pub name: String,
    pub factory: String,
    pub properties: Vec<(String, PropertyValue)>,
}

impl PlannedElement {
    /// Last value assigned to `property`
    pub fn property(&self, property: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }
}

/// A recorded link between two element names
#[derive(Debug, Clone, PartialEq)]
pub enum PlanLink {
    Static {
        src: String,
        sink: String,
    },
    Filtered {
        src: String,
        sink: String,
        caps: CapsSpec,
    },
    Dynamic {
        src: String,
        sink: String,
    },
    Mixer {
        src: String,
        mixer: String,
        placement: Placement,
    },
}

impl PlanLink {
    pub fn src(&self) -> &str {
        match self {
            Self::Static { src, .. }
            | Self::Filtered { src, .. }
            | Self::Dynamic { src, .. }
            | Self::Mixer { src, .. } => src,
        }
    }

    pub fn sink(&self) -> &str {
        match self {
            Self::Static { sink, .. } | Self::Filtered { sink, .. } | Self::Dynamic { sink, .. } => {
                sink
            }
            Self::Mixer { mixer, .. } => mixer,
        }
    }
}

/// Records every builder call; element handles are indices
#[derive(Debug, Default)]
pub struct PlanRecorder {
    elements: Vec<PlannedElement>,
    links: Vec<PlanLink>,
    caps_filters: Vec<String>,
    counters: HashMap<String, usize>,
}

impl PlanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[PlannedElement] {
        &self.elements
    }

    pub fn links(&self) -> &[PlanLink] {
        &self.links
    }

    /// Elements whose src pad gets the fixed-size caps filter
    pub fn caps_filters(&self) -> &[String] {
        &self.caps_filters
    }

    /// Find an element by name
    pub fn get(&self, name: &str) -> Option<&PlannedElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// All elements created from `factory`
    pub fn by_factory<'a>(&'a self, factory: &'a str) -> impl Iterator<Item = &'a PlannedElement> {
        self.elements.iter().filter(move |e| e.factory == factory)
    }

    /// Name of the element `src` links into, following the first link
    pub fn downstream(&self, src: &str) -> Option<&str> {
        self.links.iter().find(|l| l.src() == src).map(|l| l.sink())
    }

    /// Names of every element downstream of `src`, following the first link each time
    pub fn path_from(&self, src: &str) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = src;
        while let Some(next) = self.downstream(current) {
            if path.iter().any(|p| p == next) {
                break;
            }
            path.push(next.to_string());
            current = next;
        }
        path
    }

    /// Factories along [`path_from`](Self::path_from)
    pub fn factory_path_from(&self, src: &str) -> Vec<String> {
        self.path_from(src)
            .iter()
            .filter_map(|name| self.get(name))
            .map(|e| e.factory.clone())
            .collect()
    }

    /// gst-launch style listing of the recorded graph
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for element in &self.elements {
            out.push_str(&format!("{} name={}", element.factory, element.name));
            for (name, value) in &element.properties {
                out.push_str(&format!(" {}=\"{}\"", name, value));
            }
            out.push('\n');
        }
        for link in &self.links {
            match link {
                PlanLink::Static { src, sink } => out.push_str(&format!("{}. ! {}.\n", src, sink)),
                PlanLink::Filtered { src, sink, caps } => {
                    out.push_str(&format!("{}. ! {} ! {}.\n", src, caps, sink))
                }
                PlanLink::Dynamic { src, sink } => {
                    out.push_str(&format!("{}. ~ {}. (on pad-added)\n", src, sink))
                }
                PlanLink::Mixer {
                    src,
                    mixer,
                    placement,
                } => out.push_str(&format!(
                    "{}. ! {}. (xpos={} ypos={} zorder={} alpha={})\n",
                    src, mixer, placement.xpos, placement.ypos, placement.zorder, placement.alpha
                )),
            }
        }
        for name in &self.caps_filters {
            out.push_str(&format!("{}.src: fixed width/height stripped from caps queries\n", name));
        }
        out
    }

    fn name_of(&self, element: &usize) -> Result<String> {
        self.elements
            .get(*element)
            .map(|e| e.name.clone())
            .ok_or_else(|| BitcorderError::link(format!("unknown element handle {}", element)))
    }
}

impl GraphBackend for PlanRecorder {
    type Element = usize;

    fn element(&mut self, factory: &str, name: Option<&str>) -> Result<usize> {
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let counter = self.counters.entry(factory.to_string()).or_insert(0);
                let name = format!("{}{}", factory, counter);
                *counter += 1;
                name
            }
        };
        if self.get(&name).is_some() {
            return Err(BitcorderError::gstreamer(format!(
                "an element named '{}' already exists",
                name
            )));
        }
        self.elements.push(PlannedElement {
            name,
            factory: factory.to_string(),
            properties: Vec::new(),
        });
        Ok(self.elements.len() - 1)
    }

    fn set(&mut self, element: &usize, property: &str, value: PropertyValue) -> Result<()> {
        let planned = self
            .elements
            .get_mut(*element)
            .ok_or_else(|| BitcorderError::property(format!("unknown element handle {}", element)))?;
        planned.properties.push((property.to_string(), value));
        Ok(())
    }

    fn get_u32(&self, element: &usize, property: &str) -> Result<u32> {
        let planned = self
            .elements
            .get(*element)
            .ok_or_else(|| BitcorderError::property(format!("unknown element handle {}", element)))?;
        Ok(match planned.property(property) {
            Some(PropertyValue::UInt(v)) => u32::try_from(*v).unwrap_or(u32::MAX),
            Some(PropertyValue::Int(v)) => u32::try_from(*v).unwrap_or(0),
            _ => 0,
        })
    }

    fn link(&mut self, src: &usize, sink: &usize) -> Result<()> {
        let link = PlanLink::Static {
            src: self.name_of(src)?,
            sink: self.name_of(sink)?,
        };
        self.links.push(link);
        Ok(())
    }

    fn link_filtered(&mut self, src: &usize, sink: &usize, caps: &CapsSpec) -> Result<()> {
        let link = PlanLink::Filtered {
            src: self.name_of(src)?,
            sink: self.name_of(sink)?,
            caps: caps.clone(),
        };
        self.links.push(link);
        Ok(())
    }

    fn link_dynamic(&mut self, src: &usize, sink: &usize) -> Result<()> {
        let link = PlanLink::Dynamic {
            src: self.name_of(src)?,
            sink: self.name_of(sink)?,
        };
        self.links.push(link);
        Ok(())
    }

    fn link_mixer(&mut self, src: &usize, mixer: &usize, placement: &Placement) -> Result<()> {
        let link = PlanLink::Mixer {
            src: self.name_of(src)?,
            mixer: self.name_of(mixer)?,
            placement: *placement,
        };
        self.links.push(link);
        Ok(())
    }

    fn filter_fixed_size_caps(&mut self, element: &usize) -> Result<()> {
        let name = self.name_of(element)?;
        self.caps_filters.push(name);
        Ok(())
    }
}
