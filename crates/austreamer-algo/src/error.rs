//! Errors raised while building pipelines from descriptions.

use austreamer_config::ConfigError;
use austreamer_core::{PipelineError, PropertyError};
use thiserror::Error;

/// Failure to turn a [`PipelineConfig`](austreamer_config::PipelineConfig)
/// into a pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No factory is registered for the element type.
    #[error("unknown element type '{0}'")]
    UnknownType(String),

    /// A link names an element that was not declared.
    #[error("link refers to unknown element '{0}'")]
    UnknownElement(String),

    /// A construction property is missing or has the wrong type.
    #[error("element '{element}': {source}")]
    Property {
        /// Element name.
        element: String,
        /// Underlying property error.
        #[source]
        source: PropertyError,
    },

    /// The description itself is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Adding or linking failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl BuildError {
    /// Wraps a property error with the element it came from.
    pub fn property(element: impl Into<String>, source: PropertyError) -> Self {
        Self::Property {
            element: element.into(),
            source,
        }
    }
}
