//! Signal processing elements for austreamer pipelines.
//!
//! Every algorithm runs inside the same [`AlgoElement`] wrapper, which reads
//! its parameters from the shared store, follows live sub-block updates on
//! the bus, bypasses on request, taps frames for the sniffer and measures
//! its own load. The per-algorithm work lives in small [`AlgoKernel`]
//! implementations under [`kernels`].
//!
//! # Features
//!
//! - **Wrapper**: [`AlgoElement`] with bypass, VAD gating, sniffer and MCPS
//! - **Kernels**: AEC, AGC, NS, WNR, VAD, PEQ, DRC, MBDRC, gain, mixer, resampler
//! - **Registry**: [`ElementRegistry`] maps type names to factories and
//!   builds pipelines from [`PipelineConfig`](austreamer_config::PipelineConfig)
//!
//! # Example
//!
//! ```rust
//! use austreamer_algo::{BuildContext, ElementRegistry};
//! use austreamer_config::{ConfigStore, ElementConfig, PipelineConfig};
//! use austreamer_core::State;
//!
//! let config = PipelineConfig::new("demo")
//!     .with_element(ElementConfig::new("src", "wave_src").with_prop("duration_ms", 20))
//!     .with_element(ElementConfig::new("gain", "gain"))
//!     .with_element(ElementConfig::new("out", "capture"));
//!
//! let registry = ElementRegistry::new();
//! let ctx = BuildContext::new(ConfigStore::defaults().shared());
//! let mut built = registry.build(&config, &ctx).unwrap();
//! built.pipeline.set_state(State::Play).unwrap();
//! ```

pub mod dsp;
mod element;
mod error;
mod kernel;
pub mod kernels;
mod mcps;
mod registry;
mod sniffer;

pub use element::AlgoElement;
pub use error::BuildError;
pub use kernel::AlgoKernel;
pub use mcps::{DEFAULT_CLOCK_MHZ, McpsMeter};
pub use registry::{
    BuildContext, BuiltPipeline, ElementCategory, ElementDescriptor, ElementFactory,
    ElementRegistry, ElementSpec,
};
pub use sniffer::{BusSniffer, SniffChannel, Sniffer, Tap};
