//! TOML pipeline descriptions.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use austreamer_core::{AbortPolicy, EventType, PropValue, StreamFormat};

use crate::error::ConfigError;

/// A pipeline described in TOML.
///
/// # TOML Format
///
/// ```toml
/// name = "uplink"
/// event = "voice"
///
/// [format]
/// sample_rate = 16000
/// channels = 1
/// frame_samples = 160
///
/// [scheduler]
/// frames_to_stable = 2
///
/// [[elements]]
/// name = "mic"
/// type = "wave_src"
/// [elements.props]
/// waveform = "noise"
///
/// [[elements]]
/// name = "ns"
/// type = "ns"
///
/// [[elements]]
/// name = "out"
/// type = "capture"
/// ```
///
/// Without `[[links]]` the elements are chained in listed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Pipeline name.
    pub name: String,

    /// Audio event type: `music`, `voice`, `prompt` or `record`.
    #[serde(default = "default_event")]
    pub event: String,

    /// Stream format.
    #[serde(default)]
    pub format: FormatConfig,

    /// Scheduler and state machine settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Elements in insertion order.
    #[serde(default)]
    pub elements: Vec<ElementConfig>,

    /// Explicit links; empty means chain order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkConfig>,
}

fn default_event() -> String {
    "music".to_string()
}

/// Stream format section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatConfig {
    /// Samples per second.
    pub sample_rate: u32,
    /// Interleaved channels.
    pub channels: u16,
    /// Samples per channel per frame.
    pub frame_samples: u32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        let f = StreamFormat::default();
        Self {
            sample_rate: f.sample_rate,
            channels: f.channels,
            frame_samples: f.frame_samples,
        }
    }
}

impl From<FormatConfig> for StreamFormat {
    fn from(f: FormatConfig) -> Self {
        StreamFormat::new(f.sample_rate, f.channels, f.frame_samples)
    }
}

/// Scheduler section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SchedulerConfig {
    /// Ticks swallowed after every start.
    #[serde(default)]
    pub frames_to_stable: u32,

    /// Samples per tick; defaults to the frame size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples_per_tick: Option<u32>,

    /// `abort` (default) or `tolerate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,
}

impl SchedulerConfig {
    /// Parsed failure policy.
    pub fn abort_policy(&self) -> Result<AbortPolicy, ConfigError> {
        match self.on_failure.as_deref() {
            None | Some("abort") => Ok(AbortPolicy::Abort),
            Some("tolerate") => Ok(AbortPolicy::Tolerate),
            Some(other) => Err(ConfigError::malformed("scheduler", format!("on_failure = {other:?}"))),
        }
    }
}

/// One element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementConfig {
    /// Unique element name.
    pub name: String,

    /// Registry type name.
    #[serde(rename = "type")]
    pub kind: String,

    /// Properties applied after construction.
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub props: toml::Table,
}

impl ElementConfig {
    /// Element without properties.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            props: toml::Table::new(),
        }
    }

    /// Adds a property.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Properties converted to [`PropValue`]s, in key order.
    pub fn prop_values(&self) -> Result<Vec<(String, PropValue)>, ConfigError> {
        self.props
            .iter()
            .map(|(k, v)| {
                to_prop(v).map(|p| (k.clone(), p)).ok_or_else(|| {
                    ConfigError::malformed("property", format!("{}.{k} has unsupported type {}", self.name, v.type_str()))
                })
            })
            .collect()
    }
}

/// Converts a scalar TOML value.
pub fn to_prop(value: &toml::Value) -> Option<PropValue> {
    match value {
        toml::Value::Boolean(b) => Some(PropValue::Bool(*b)),
        toml::Value::Integer(i) => Some(PropValue::Int(*i)),
        toml::Value::Float(f) => Some(PropValue::Float(*f)),
        toml::Value::String(s) => Some(PropValue::Str(s.clone())),
        _ => None,
    }
}

/// One link between named elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkConfig {
    /// Upstream element.
    pub from: String,
    /// Downstream element.
    pub to: String,
    /// Source pad; next free pad when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_pad: Option<usize>,
    /// Sink pad; next free pad when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_pad: Option<usize>,
}

impl LinkConfig {
    /// Link using the next free pads.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            src_pad: None,
            sink_pad: None,
        }
    }
}

/// Parses an event type name.
pub fn parse_event(name: &str) -> Result<EventType, ConfigError> {
    match name {
        "music" => Ok(EventType::Music),
        "voice" => Ok(EventType::Voice),
        "prompt" => Ok(EventType::Prompt),
        "record" => Ok(EventType::Record),
        other => Err(ConfigError::UnknownEvent(other.to_string())),
    }
}

impl PipelineConfig {
    /// Empty description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event: default_event(),
            format: FormatConfig::default(),
            scheduler: SchedulerConfig::default(),
            elements: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Adds an element.
    pub fn with_element(mut self, element: ElementConfig) -> Self {
        self.elements.push(element);
        self
    }

    /// Adds a link.
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.links.push(link);
        self
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Event type.
    pub fn event_type(&self) -> Result<EventType, ConfigError> {
        parse_event(&self.event)
    }

    /// Stream format.
    pub fn stream_format(&self) -> StreamFormat {
        self.format.into()
    }

    /// Checks names, link endpoints, event and policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.event_type()?;
        self.scheduler.abort_policy()?;
        if self.format.sample_rate == 0 || self.format.channels == 0 || self.format.frame_samples == 0 {
            return Err(ConfigError::malformed("format", "zero field"));
        }
        let mut names = HashSet::new();
        for e in &self.elements {
            if !names.insert(e.name.as_str()) {
                return Err(ConfigError::malformed("elements", format!("duplicate name {:?}", e.name)));
            }
            e.prop_values()?;
        }
        for l in &self.links {
            for end in [&l.from, &l.to] {
                if !names.contains(end.as_str()) {
                    return Err(ConfigError::malformed("links", format!("unknown element {end:?}")));
                }
            }
        }
        Ok(())
    }

    /// Links to create: the explicit list, or consecutive elements.
    pub fn link_plan(&self) -> Vec<LinkConfig> {
        if !self.links.is_empty() {
            return self.links.clone();
        }
        self.elements
            .windows(2)
            .map(|w| LinkConfig::new(w[0].name.clone(), w[1].name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = r#"
        name = "prompt"
        event = "prompt"

        [format]
        sample_rate = 16000
        channels = 1
        frame_samples = 256

        [scheduler]
        frames_to_stable = 2

        [[elements]]
        name = "src"
        type = "wave_src"
        [elements.props]
        frequency = 440.0
        duration_ms = 100
        waveform = "square"

        [[elements]]
        name = "reframe"
        type = "reframe"
        [elements.props]
        out_frame_bytes = 320

        [[elements]]
        name = "sink"
        type = "capture"
    "#;

    #[test]
    fn parses_chain() {
        let config = PipelineConfig::from_toml(CHAIN).unwrap();
        assert_eq!(config.event_type().unwrap(), EventType::Prompt);
        assert_eq!(config.stream_format().frame_bytes(), 512);
        assert_eq!(config.scheduler.frames_to_stable, 2);
        assert_eq!(config.scheduler.abort_policy().unwrap(), AbortPolicy::Abort);
        let plan = config.link_plan();
        assert_eq!(plan, vec![LinkConfig::new("src", "reframe"), LinkConfig::new("reframe", "sink")]);

        let props = config.elements[0].prop_values().unwrap();
        assert!(props.contains(&("frequency".to_string(), PropValue::Float(440.0))));
        assert!(props.contains(&("duration_ms".to_string(), PropValue::Int(100))));
    }

    #[test]
    fn explicit_links_win() {
        let config = PipelineConfig::new("fan")
            .with_element(ElementConfig::new("a", "wave_src"))
            .with_element(ElementConfig::new("b", "splitter").with_prop("outputs", 2))
            .with_element(ElementConfig::new("c", "capture"))
            .with_link(LinkConfig::new("a", "b"))
            .with_link(LinkConfig::new("b", "c"));
        config.validate().unwrap();
        assert_eq!(config.link_plan().len(), 2);
    }

    #[test]
    fn validation_rejects_bad_descriptions() {
        let dup = PipelineConfig::new("dup")
            .with_element(ElementConfig::new("a", "x"))
            .with_element(ElementConfig::new("a", "y"));
        assert!(dup.validate().is_err());

        let dangling = PipelineConfig::new("dangling")
            .with_element(ElementConfig::new("a", "x"))
            .with_link(LinkConfig::new("a", "zz"));
        assert!(dangling.validate().is_err());

        let mut event = PipelineConfig::new("event");
        event.event = "alarm".into();
        assert!(matches!(event.validate(), Err(ConfigError::UnknownEvent(_))));

        let nested = PipelineConfig::new("nested")
            .with_element(ElementConfig::new("a", "x").with_prop("list", toml::Value::Array(vec![])));
        assert!(nested.validate().is_err());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.toml");
        let config = PipelineConfig::from_toml(CHAIN).unwrap();
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }
}
