//! Configuration for austreamer pipelines.
//!
//! Algorithm parameters live in 16-byte sub-blocks addressed by stable ids.
//! This crate owns everything around them: the id table, typed decoding,
//! the magic-delimited binary block used for flash images and host tools,
//! the runtime store elements read from, the transport codec that applies
//! host requests, and TOML descriptions of whole pipelines.
//!
//! # Features
//!
//! - **Id table**: [`AlgoKind`] groups of config/sniffer/MCPS/bypass ids
//! - **Parameter blocks**: [`ParamBlock`] encode/decode with validation
//! - **Binary block**: [`ConfigBlock`] load/save
//! - **Store**: [`ConfigStore`] with check and notify callbacks
//! - **Transport**: [`ControlBridge`] for phonet-framed control requests
//! - **Pipelines**: [`PipelineConfig`] TOML descriptions
//!
//! # Example
//!
//! ```rust
//! use austreamer_config::{AlgoKind, ConfigStore, ParamBlock};
//!
//! let mut store = ConfigStore::defaults();
//! let bypass = AlgoKind::Aec.sub_blocks().bypass.unwrap();
//! store.write_sb(bypass, &[1, 0]).unwrap();
//! assert_eq!(store.param(bypass), Some(ParamBlock::Bypass(true)));
//! ```

pub mod acore;
mod block;
mod error;
mod params;
mod pipeline_config;
mod store;
pub mod sub_block;

pub use acore::{AcoreMessage, ControlBridge, NodeData, PhonetHeader, SubBlock};
pub use block::{BLOCK_VERSION, ConfigBlock, HEAD_MAGIC, Record, TAIL_MAGIC};
pub use error::ConfigError;
pub use params::{
    AecParams, AgcParams, DrcParams, EqBand, GainParams, MAX_BANDS, MbdrcBand, MbdrcParams,
    MixerParams, NsParams, ParamBlock, PeqParams, PromptParams, Q14_ONE, RawBlock,
    ResampleParams, SUB_BLOCK_SIZE, SUPPORTED_RATES, VadParams, WnrParams, q14_to_linear,
};
pub use pipeline_config::{
    ElementConfig, FormatConfig, LinkConfig, PipelineConfig, SchedulerConfig, parse_event, to_prop,
};
pub use store::{CheckFn, ConfigStore, NotifyFn, SharedConfig};
pub use sub_block::{ALL_CONFIG, ALL_MCPS, AlgoKind, AlgoSubBlocks, PROMPT, SNIFFER_ACTIVATE, SubBlockRole};
