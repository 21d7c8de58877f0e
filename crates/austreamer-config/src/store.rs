//! Sub-block parameter store.
//!
//! Elements read their parameters with [`ConfigStore::read_sb`] when they
//! leave Idle. Runtime updates go through [`ConfigStore::write_sb`], which
//! validates the payload, asks every check callback, stores the record and
//! then runs every notify callback:
//!
//! ```text
//! write_sb(id, data)
//!   ├─ decode as ParamBlock      (refuse malformed)
//!   ├─ check callbacks           (any false → Rejected)
//!   ├─ store
//!   └─ notify callbacks
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::block::{ConfigBlock, Record};
use crate::error::ConfigError;
use crate::params::{ParamBlock, RawBlock};
use crate::sub_block::{AlgoKind, SNIFFER_ACTIVATE, SubBlockRole};

/// Validation hook: returns `false` to refuse a write.
pub type CheckFn = Box<dyn Fn(u16, &ParamBlock) -> bool + Send + Sync>;

/// Observer run after a successful write.
pub type NotifyFn = Box<dyn Fn(u16, &ParamBlock) + Send + Sync>;

/// Store shared between the transport and the elements.
pub type SharedConfig = Arc<RwLock<ConfigStore>>;

/// Sub-block records keyed by id.
#[derive(Default)]
pub struct ConfigStore {
    records: BTreeMap<u16, Record>,
    checks: Vec<CheckFn>,
    notifies: Vec<NotifyFn>,
}

impl ConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the factory parameter block of every algorithm, with
    /// sniffers, MCPS reporting and bypass off.
    pub fn defaults() -> Self {
        let mut store = Self::new();
        for kind in AlgoKind::ALL {
            let ids = kind.sub_blocks();
            store.insert(ids.config, &ParamBlock::default_for(kind));
            store.insert(ids.sniffer, &ParamBlock::Sniffer(false));
            store.insert(ids.mcps, &ParamBlock::Mcps(false));
            if let Some(bypass) = ids.bypass {
                store.insert(bypass, &ParamBlock::Bypass(false));
            }
        }
        store.insert(SNIFFER_ACTIVATE, &ParamBlock::SnifferActivate(false));
        store
    }

    /// Store built from a decoded block. Every record must decode.
    pub fn from_block(block: &ConfigBlock) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        for r in &block.records {
            let decoded = ParamBlock::decode(r.id, r.payload())?;
            store.insert(r.id, &decoded);
        }
        Ok(store)
    }

    /// Store overlaid on the factory defaults.
    pub fn defaults_with(block: &ConfigBlock) -> Result<Self, ConfigError> {
        let mut store = Self::defaults();
        for r in &block.records {
            let decoded = ParamBlock::decode(r.id, r.payload())?;
            store.insert(r.id, &decoded);
        }
        Ok(store)
    }

    /// Wraps the store for sharing.
    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }

    /// Every record as a block, in id order.
    pub fn to_block(&self) -> ConfigBlock {
        ConfigBlock::new(self.records.values().copied().collect())
    }

    fn insert(&mut self, id: u16, block: &ParamBlock) {
        let data = block.encode();
        self.records.insert(
            id,
            Record {
                id,
                len: data.len() as u16,
                data,
            },
        );
    }

    /// Payload and meaningful length of sub-block `id`.
    pub fn read_sb(&self, id: u16) -> Option<(&RawBlock, usize)> {
        self.records.get(&id).map(|r| (&r.data, usize::from(r.len)))
    }

    /// Decoded sub-block `id`.
    pub fn param(&self, id: u16) -> Option<ParamBlock> {
        let r = self.records.get(&id)?;
        ParamBlock::decode(id, r.payload()).ok()
    }

    /// Decoded flag sub-block, `false` when absent.
    pub fn flag(&self, id: u16) -> bool {
        self.param(id).is_some_and(|p| p.enabled())
    }

    /// Validates and stores sub-block `id`, then notifies observers.
    pub fn write_sb(&mut self, id: u16, data: &[u8]) -> Result<ParamBlock, ConfigError> {
        let block = ParamBlock::decode(id, data)?;
        if matches!(
            SubBlockRole::of(id),
            Some(SubBlockRole::AllMcps | SubBlockRole::AllConfig)
        ) {
            // queries are not stored
            self.notify(id, &block);
            return Ok(block);
        }
        if !self.checks.iter().all(|check| check(id, &block)) {
            tracing::warn!("config_store: sub-block {id:#06x} rejected by check");
            return Err(ConfigError::Rejected(id));
        }
        let record = Record::new(id, data)?;
        self.records.insert(id, record);
        tracing::debug!("config_store: sub-block {id:#06x} updated");
        self.notify(id, &block);
        Ok(block)
    }

    fn notify(&self, id: u16, block: &ParamBlock) {
        for notify in &self.notifies {
            notify(id, block);
        }
    }

    /// Adds a check callback.
    pub fn on_check(&mut self, check: impl Fn(u16, &ParamBlock) -> bool + Send + Sync + 'static) {
        self.checks.push(Box::new(check));
    }

    /// Adds a notify callback.
    pub fn on_notify(&mut self, notify: impl Fn(u16, &ParamBlock) + Send + Sync + 'static) {
        self.notifies.push(Box::new(notify));
    }

    /// Stored ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.records.keys().copied()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
