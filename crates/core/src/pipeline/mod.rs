//! GStreamer launch descriptions for the camera stream.
//!
//! A pipeline is composed as an ordered list of [`Stage`]s and rendered to
//! text in a separate step. The rendered form is what the RTSP media
//! factory parses:
//!
//! ```text
//! ( videotestsrc pattern=ball is-live=true
//!   ! video/x-raw,width=640,height=480,framerate=15/1
//!   ! videoconvert
//!   ! video/x-raw,format=I420,width=640,height=480
//!   ! x264enc bitrate=700 key-int-max=15 tune=zerolatency speed-preset=ultrafast
//!   ! video/x-h264,stream-format=byte-stream
//!   ! rtph264pay config-interval=1 mtu=1400 name=pay0 pt=96 )
//! ```
//!
//! Which stages appear, and with which parameters, is decided by
//! [`PipelineBuilder`] from the platform's [`Capabilities`].

pub mod builder;
pub mod capabilities;

use std::fmt;

pub use builder::{PipelineBuilder, build};
pub use capabilities::{Capabilities, Encoder, SensorMode, SensorModes};

/// A named element with ordered `key=value` properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Value of the first property named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        lookup(&self.params, key)
    }
}

/// A caps filter such as `video/x-raw(memory:NVMM),width=1920,height=1080`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    pub media: String,
    /// Caps feature, e.g. `memory:NVMM`. `None` means system memory.
    pub memory: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl Caps {
    pub fn new(media: &str) -> Self {
        Self {
            media: media.to_string(),
            memory: None,
            fields: Vec::new(),
        }
    }

    /// Raw video caps, optionally in a non-system memory.
    pub fn raw(memory: Option<&str>) -> Self {
        Self {
            memory: memory.map(str::to_string),
            ..Self::new("video/x-raw")
        }
    }

    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        lookup(&self.fields, key)
    }

    /// Declared `(width, height)`, if both fields are present and numeric.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let width = self.get("width")?.parse().ok()?;
        let height = self.get("height")?.parse().ok()?;
        Some((width, height))
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// One link in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Element(Element),
    Caps(Caps),
}

impl Stage {
    /// Element name, or media type for caps.
    pub fn name(&self) -> &str {
        match self {
            Stage::Element(e) => &e.name,
            Stage::Caps(c) => &c.media,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Stage::Element(e) => Some(e),
            Stage::Caps(_) => None,
        }
    }

    pub fn as_caps(&self) -> Option<&Caps> {
        match self {
            Stage::Caps(c) => Some(c),
            Stage::Element(_) => None,
        }
    }
}

impl From<Element> for Stage {
    fn from(e: Element) -> Self {
        Stage::Element(e)
    }
}

impl From<Caps> for Stage {
    fn from(c: Caps) -> Self {
        Stage::Caps(c)
    }
}

/// Ordered stages, capture first and payloader last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl Into<Stage>) {
        self.stages.push(stage.into());
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.stages.iter().filter_map(Stage::as_element)
    }

    pub fn caps(&self) -> impl Iterator<Item = &Caps> {
        self.stages.iter().filter_map(Stage::as_caps)
    }

    /// First element named `name`.
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Position of the first stage named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name() == name)
    }

    pub fn render(&self) -> PipelineDescription {
        PipelineDescription(self.to_string())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, stage) in self.stages.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { " ! " })?;
            match stage {
                Stage::Element(e) => {
                    f.write_str(&e.name)?;
                    for (k, v) in &e.params {
                        write!(f, " {}={}", k, Quoted(v))?;
                    }
                }
                Stage::Caps(c) => {
                    f.write_str(&c.media)?;
                    if let Some(memory) = &c.memory {
                        write!(f, "({memory})")?;
                    }
                    for (k, v) in &c.fields {
                        write!(f, ",{}={}", k, Quoted(v))?;
                    }
                }
            }
        }
        f.write_str(" )")
    }
}

/// Writes a property value, double-quoting it unless it is a bare token.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare = !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "_.:/+-".contains(c));
        if bare {
            return f.write_str(self.0);
        }
        f.write_str("\"")?;
        for c in self.0.chars() {
            if c == '"' || c == '\\' {
                f.write_str("\\")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("\"")
    }
}

/// Rendered launch description handed to the transport engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineDescription(String);

impl PipelineDescription {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PipelineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PipelineDescription {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
