//! Element registry and pipeline builder.
//!
//! Maps the `type` names used in pipeline descriptions to factories. The
//! built-in set covers the core sources, sinks and routing elements plus one
//! algorithm element per [`AlgoKind`]. Hosts register their own types (file
//! or device endpoints) with [`ElementRegistry::register`].

use std::sync::Arc;

use parking_lot::Mutex;

use austreamer_config::{AlgoKind, PipelineConfig, SharedConfig};
use austreamer_core::elements::{Capture, CaptureSink, Reframe, Splitter, WaveSrc};
use austreamer_core::{Element, Pipeline, PropValue, PropertyError, SramPool};

use crate::element::AlgoElement;
use crate::error::BuildError;
use crate::kernel::AlgoKernel;
use crate::kernels::{Aec, Agc, Drc, Gain, Mbdrc, Mixer, Ns, Peq, Resample, Vad, Wnr};

/// Category of element for listing and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementCategory {
    /// Produces frames on scheduler ticks.
    Source,
    /// Consumes frames at the end of a chain.
    Sink,
    /// Splits, merges or re-frames without touching samples.
    Routing,
    /// Runs a signal processing kernel.
    Algorithm,
}

impl ElementCategory {
    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            ElementCategory::Source => "Source",
            ElementCategory::Sink => "Sink",
            ElementCategory::Routing => "Routing",
            ElementCategory::Algorithm => "Algorithm",
        }
    }

    /// One-line description.
    pub const fn description(&self) -> &'static str {
        match self {
            ElementCategory::Source => "Generators, file readers and capture devices",
            ElementCategory::Sink => "Recorders, file writers and playback devices",
            ElementCategory::Routing => "Splitters and re-framers",
            ElementCategory::Algorithm => "Echo, noise, dynamics, equalisation and mixing",
        }
    }
}

/// Describes an element type in the registry.
#[derive(Debug, Clone)]
pub struct ElementDescriptor {
    /// Type name used in pipeline descriptions.
    pub id: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for organization.
    pub category: ElementCategory,
    /// Properties consumed by the constructor rather than set afterwards.
    pub ctor_props: &'static [&'static str],
}

/// Shared resources handed to every factory.
pub struct BuildContext {
    store: SharedConfig,
    pool: Option<Arc<SramPool>>,
    captures: Mutex<Vec<(String, Capture)>>,
}

impl BuildContext {
    /// Context reading parameters from `store`.
    pub fn new(store: SharedConfig) -> Self {
        Self {
            store,
            pool: None,
            captures: Mutex::new(Vec::new()),
        }
    }

    /// Elements that can draw from a pool use `pool` for their output frames.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<SramPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Parameter store.
    pub fn store(&self) -> &SharedConfig {
        &self.store
    }

    /// Frame pool, if any.
    pub fn pool(&self) -> Option<&Arc<SramPool>> {
        self.pool.as_ref()
    }

    /// Records a capture handle under its element name.
    pub fn add_capture(&self, name: &str, capture: Capture) {
        self.captures.lock().push((name.to_string(), capture));
    }

    fn take_captures(&self) -> Vec<(String, Capture)> {
        std::mem::take(&mut *self.captures.lock())
    }
}

/// What a factory gets to build one element.
pub struct ElementSpec<'a> {
    /// Element name.
    pub name: &'a str,
    /// All properties from the description.
    pub props: &'a [(String, PropValue)],
    /// Shared resources.
    pub ctx: &'a BuildContext,
}

impl ElementSpec<'_> {
    /// Raw property value.
    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Integer property as `usize`, `default` when absent.
    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize, BuildError> {
        match self.prop(key) {
            None => Ok(default),
            Some(PropValue::Int(v)) => {
                usize::try_from(*v).map_err(|_| self.error(PropertyError::OutOfRange(key.to_string())))
            }
            Some(other) => Err(self.mismatch(key, "int", other)),
        }
    }

    /// String property, `default` when absent.
    pub fn str_or<'s>(&'s self, key: &str, default: &'s str) -> Result<&'s str, BuildError> {
        match self.prop(key) {
            None => Ok(default),
            Some(PropValue::Str(s)) => Ok(s),
            Some(other) => Err(self.mismatch(key, "string", other)),
        }
    }

    /// Property error tagged with this element.
    pub fn error(&self, source: PropertyError) -> BuildError {
        BuildError::property(self.name, source)
    }

    fn mismatch(&self, key: &str, expected: &'static str, found: &PropValue) -> BuildError {
        self.error(PropertyError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        })
    }
}

/// Factory closure for one element type.
pub type ElementFactory =
    Box<dyn Fn(&ElementSpec<'_>) -> Result<Box<dyn Element>, BuildError> + Send + Sync>;

struct RegistryEntry {
    descriptor: ElementDescriptor,
    factory: ElementFactory,
}

/// A pipeline built from a description, with handles to its capture sinks.
pub struct BuiltPipeline {
    /// The pipeline, in Idle.
    pub pipeline: Pipeline,
    /// `capture` elements by name.
    pub captures: Vec<(String, Capture)>,
}

impl BuiltPipeline {
    /// Capture handle of the named sink.
    pub fn capture(&self, name: &str) -> Option<&Capture> {
        self.captures.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

/// Registry of element types.
pub struct ElementRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementRegistry {
    /// Registry with all built-in types.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(4 + AlgoKind::ALL.len()),
        };
        registry.register_builtin_elements();
        registry
    }

    /// Registry without any types.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    fn register_builtin_elements(&mut self) {
        self.register(
            ElementDescriptor {
                id: "wave_src",
                description: "Test tone, noise or silence generator",
                category: ElementCategory::Source,
                ctor_props: &[],
            },
            |spec| {
                let mut src = WaveSrc::new(spec.name);
                if let Some(pool) = spec.ctx.pool() {
                    src = src.with_pool(Arc::clone(pool));
                }
                Ok(Box::new(src))
            },
        );

        self.register(
            ElementDescriptor {
                id: "capture",
                description: "Records frames and bus messages in memory",
                category: ElementCategory::Sink,
                ctor_props: &[],
            },
            |spec| {
                let capture = Capture::default();
                spec.ctx.add_capture(spec.name, capture.clone());
                Ok(Box::new(CaptureSink::with_capture(spec.name, capture)))
            },
        );

        self.register(
            ElementDescriptor {
                id: "reframe",
                description: "Re-slices the stream into frames of another size",
                category: ElementCategory::Routing,
                ctor_props: &[],
            },
            |spec| Ok(Box::new(Reframe::new(spec.name))),
        );

        self.register(
            ElementDescriptor {
                id: "splitter",
                description: "Shares one input frame with several branches",
                category: ElementCategory::Routing,
                ctor_props: &["outputs"],
            },
            |spec| {
                let outputs = spec.usize_or("outputs", 2)?;
                if outputs == 0 {
                    return Err(spec.error(PropertyError::OutOfRange("outputs".into())));
                }
                Ok(Box::new(Splitter::new(spec.name, outputs)))
            },
        );

        for kind in AlgoKind::ALL {
            self.register(
                ElementDescriptor {
                    id: kind.name(),
                    description: algo_description(kind),
                    category: ElementCategory::Algorithm,
                    ctor_props: &[],
                },
                move |spec| Ok(algo_element(kind, spec)),
            );
        }
    }

    /// Adds a type, replacing any earlier entry with the same id.
    pub fn register<F>(&mut self, descriptor: ElementDescriptor, factory: F)
    where
        F: Fn(&ElementSpec<'_>) -> Result<Box<dyn Element>, BuildError> + Send + Sync + 'static,
    {
        self.entries.retain(|e| e.descriptor.id != descriptor.id);
        self.entries.push(RegistryEntry {
            descriptor,
            factory: Box::new(factory),
        });
    }

    /// All registered types.
    pub fn all(&self) -> Vec<&ElementDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Types in a category.
    pub fn in_category(&self, category: ElementCategory) -> Vec<&ElementDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Descriptor by type name.
    pub fn get(&self, id: &str) -> Option<&ElementDescriptor> {
        self.entries.iter().find(|e| e.descriptor.id == id).map(|e| &e.descriptor)
    }

    /// Builds one element. Properties are not applied; see [`build`](Self::build).
    pub fn create(&self, id: &str, spec: &ElementSpec<'_>) -> Result<Box<dyn Element>, BuildError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .ok_or_else(|| BuildError::UnknownType(id.to_string()))?;
        (entry.factory)(spec)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the described pipeline in Idle.
    ///
    /// Elements are added in listed order, then their properties are set,
    /// then the link plan is applied.
    pub fn build(&self, config: &PipelineConfig, ctx: &BuildContext) -> Result<BuiltPipeline, BuildError> {
        config.validate()?;
        let mut pipeline = Pipeline::new(config.name.clone(), config.event_type()?, config.stream_format())
            .with_abort_policy(config.scheduler.abort_policy()?);
        let scheduler = pipeline.scheduler_mut();
        scheduler.set_frames_to_stable(config.scheduler.frames_to_stable);
        if let Some(samples) = config.scheduler.samples_per_tick {
            scheduler.set_samples_per_tick(samples);
        }

        for element in &config.elements {
            let props = element.prop_values()?;
            let descriptor = self
                .get(&element.kind)
                .ok_or_else(|| BuildError::UnknownType(element.kind.clone()))?;
            let ctor_props = descriptor.ctor_props;
            let spec = ElementSpec {
                name: &element.name,
                props: &props,
                ctx,
            };
            let id = pipeline.add(self.create(&element.kind, &spec)?)?;
            for (key, value) in props.into_iter().filter(|(k, _)| !ctor_props.contains(&k.as_str())) {
                pipeline
                    .with_element(id, |e| e.set_property(&key, value))
                    .ok_or_else(|| BuildError::UnknownElement(element.name.clone()))?
                    .map_err(|err| BuildError::property(&element.name, err))?;
            }
            tracing::debug!("build: {} <- {} ({})", config.name, element.name, element.kind);
        }

        for link in config.link_plan() {
            let from = pipeline
                .find(&link.from)
                .ok_or_else(|| BuildError::UnknownElement(link.from.clone()))?;
            let to = pipeline
                .find(&link.to)
                .ok_or_else(|| BuildError::UnknownElement(link.to.clone()))?;
            match (link.src_pad, link.sink_pad) {
                (None, None) => pipeline.link(from, to)?,
                (src, sink) => pipeline.link_pads(from, src.unwrap_or(0), to, sink.unwrap_or(0))?,
            }
        }

        tracing::info!(
            "build: pipeline '{}' with {} elements",
            config.name,
            config.elements.len()
        );
        Ok(BuiltPipeline {
            pipeline,
            captures: ctx.take_captures(),
        })
    }
}

fn algo_description(kind: AlgoKind) -> &'static str {
    match kind {
        AlgoKind::Aec => "Acoustic echo canceller with far-end reference",
        AlgoKind::Agc => "Automatic gain control",
        AlgoKind::Ns => "Stationary noise suppressor",
        AlgoKind::UlPeq => "Uplink parametric equaliser",
        AlgoKind::UlDrc => "Uplink dynamic range compressor",
        AlgoKind::Wnr => "Wind noise reduction",
        AlgoKind::Vad => "Voice activity detector",
        AlgoKind::DlPeq => "Downlink parametric equaliser",
        AlgoKind::DlDrc => "Downlink dynamic range compressor",
        AlgoKind::Mbdrc => "Multi-band dynamic range compressor",
        AlgoKind::Gain => "Gain and volume stage",
        AlgoKind::Mixer => "Four-input mixer with Q1.14 gains",
        AlgoKind::Resample => "Sample rate converter",
    }
}

fn algo_element(kind: AlgoKind, spec: &ElementSpec<'_>) -> Box<dyn Element> {
    match kind {
        AlgoKind::Aec => wrap(Aec::new(), spec),
        AlgoKind::Agc => wrap(Agc::new(), spec),
        AlgoKind::Ns => wrap(Ns::new(), spec),
        AlgoKind::UlPeq => wrap(Peq::uplink(), spec),
        AlgoKind::UlDrc => wrap(Drc::uplink(), spec),
        AlgoKind::Wnr => wrap(Wnr::new(), spec),
        AlgoKind::Vad => wrap(Vad::new(), spec),
        AlgoKind::DlPeq => wrap(Peq::downlink(), spec),
        AlgoKind::DlDrc => wrap(Drc::downlink(), spec),
        AlgoKind::Mbdrc => wrap(Mbdrc::new(), spec),
        AlgoKind::Gain => wrap(Gain::new(), spec),
        AlgoKind::Mixer => wrap(Mixer::new(), spec),
        AlgoKind::Resample => wrap(Resample::new(), spec),
    }
}

fn wrap<K: AlgoKernel + 'static>(kernel: K, spec: &ElementSpec<'_>) -> Box<dyn Element> {
    let mut element = AlgoElement::new(spec.name, kernel, Arc::clone(spec.ctx.store()));
    if let Some(pool) = spec.ctx.pool() {
        element = element.with_pool(Arc::clone(pool));
    }
    Box::new(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use austreamer_config::{ConfigStore, ElementConfig, LinkConfig};

    fn ctx() -> BuildContext {
        BuildContext::new(ConfigStore::defaults().shared())
    }

    #[test]
    fn test_registry_has_builtins() {
        let registry = ElementRegistry::new();
        assert_eq!(registry.len(), 4 + AlgoKind::ALL.len());
        for kind in AlgoKind::ALL {
            assert!(registry.get(kind.name()).is_some(), "missing {kind}");
        }
        assert!(registry.get("splitter").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_categories() {
        let registry = ElementRegistry::new();
        assert_eq!(registry.in_category(ElementCategory::Algorithm).len(), AlgoKind::ALL.len());
        assert_eq!(registry.in_category(ElementCategory::Routing).len(), 2);
        for category in [
            ElementCategory::Source,
            ElementCategory::Sink,
            ElementCategory::Routing,
            ElementCategory::Algorithm,
        ] {
            assert!(!category.name().is_empty());
            assert!(!category.description().is_empty());
        }
    }

    #[test]
    fn test_create_unknown_type() {
        let registry = ElementRegistry::new();
        let ctx = ctx();
        let spec = ElementSpec { name: "x", props: &[], ctx: &ctx };
        assert!(matches!(registry.create("echo", &spec), Err(BuildError::UnknownType(_))));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ElementRegistry::empty();
        assert!(registry.is_empty());
        for description in ["first", "second"] {
            registry.register(
                ElementDescriptor {
                    id: "tone",
                    description,
                    category: ElementCategory::Source,
                    ctor_props: &[],
                },
                |spec| Ok(Box::new(WaveSrc::new(spec.name))),
            );
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("tone").map(|d| d.description), Some("second"));
    }

    #[test]
    fn test_splitter_outputs_from_props() {
        let registry = ElementRegistry::new();
        let ctx = ctx();
        let props = vec![("outputs".to_string(), PropValue::Int(3))];
        let spec = ElementSpec { name: "split", props: &props, ctx: &ctx };
        let split = registry.create("splitter", &spec).unwrap();
        assert_eq!(split.source_pads(), 3);

        let props = vec![("outputs".to_string(), PropValue::Str("many".into()))];
        let spec = ElementSpec { name: "split", props: &props, ctx: &ctx };
        assert!(matches!(registry.create("splitter", &spec), Err(BuildError::Property { .. })));
    }

    #[test]
    fn test_build_applies_props_and_links() {
        let config = PipelineConfig::new("fanout")
            .with_element(ElementConfig::new("src", "wave_src").with_prop("frequency", 500.0))
            .with_element(ElementConfig::new("split", "splitter").with_prop("outputs", 2))
            .with_element(ElementConfig::new("a", "capture"))
            .with_element(ElementConfig::new("b", "capture"))
            .with_link(LinkConfig::new("src", "split"))
            .with_link(LinkConfig::new("split", "a"))
            .with_link(LinkConfig::new("split", "b"));
        let built = ElementRegistry::new().build(&config, &ctx()).unwrap();
        assert_eq!(built.captures.len(), 2);
        assert!(built.capture("a").is_some());
        assert!(built.capture("src").is_none());
        assert!(built.pipeline.find("split").is_some());
    }

    #[test]
    fn test_build_rejects_bad_property() {
        let config = PipelineConfig::new("bad")
            .with_element(ElementConfig::new("src", "wave_src").with_prop("volume", 3));
        let err = ElementRegistry::new().build(&config, &ctx()).err();
        assert!(matches!(err, Some(BuildError::Property { element, .. }) if element == "src"));
    }

    #[test]
    fn test_build_rejects_unknown_type() {
        let config = PipelineConfig::new("bad").with_element(ElementConfig::new("x", "echo"));
        assert!(matches!(
            ElementRegistry::new().build(&config, &ctx()),
            Err(BuildError::UnknownType(t)) if t == "echo"
        ));
    }
}
