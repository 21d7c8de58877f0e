//! Uniform element wrapper around an [`AlgoKernel`].
//!
//! The wrapper owns everything that is the same for every algorithm:
//!
//! ```text
//!             ┌──────────── bypass / disabled / VAD-gated ───────────┐
//! sink 0 ─────┤                                                      ├──► source 0
//! sink 1..n ──┴─► gather ─► sniff in ─► [kernel, timed] ─► sniff out ┘
//! ```
//!
//! - **Bypass**: the buffer on sink 0 is forwarded untouched and the kernel
//!   is not called. Active while the bypass sub-block or the `bypass`
//!   property is set, while the parameter block is disabled, or while VAD
//!   gating is on and no voice is present.
//! - **Gather**: a multi-input kernel runs once every linked sink pad has
//!   delivered a frame. Unlinked inputs arrive as empty slices.
//! - **Sniffer**: input and output taps, on while both the element's
//!   sniffer sub-block and the global activation sub-block are set.
//! - **MCPS**: every kernel call is timed; a query on the bus is answered
//!   with an [`MsgId::MCPS_REPORT`] when the MCPS sub-block is set.
//!
//! Parameters are read from the shared store at Idle→Ready and updated from
//! [`MsgId::PARAM_UPDATE`] messages carrying the element's own ids.
//!
//! | Property | Type | Default |
//! |----------|------|---------|
//! | `bypass` | bool | false |
//! | `vad_gate` | bool | false |
//! | `node_index` | int | 0 |
//! | `cpu_mhz` | int | 96 |
//! | `sample_rate` | int | 0 (pipeline rate) |

use std::sync::Arc;

use austreamer_config::{
    AlgoKind, AlgoSubBlocks, ParamBlock, SNIFFER_ACTIVATE, SharedConfig, SubBlockRole,
};
use austreamer_core::{
    Attachment, BYTES_PER_SAMPLE, Buffer, BusSender, Element, ElementId, Flow, FlowContext,
    FlowError, FlowResult, FrameBuffer, Message, MessageBody, MsgId, Object, SniffPoint, SramPool,
    StateChange, StreamFormat, f32_to_pcm16, pcm16_to_f32,
};

use crate::kernel::AlgoKernel;
use crate::mcps::{DEFAULT_CLOCK_MHZ, McpsMeter};
use crate::sniffer::{BusSniffer, SniffChannel, Sniffer, Tap};

/// Pipeline element running an [`AlgoKernel`].
pub struct AlgoElement<K> {
    obj: Object,
    kernel: K,
    kind: AlgoKind,
    ids: AlgoSubBlocks,
    store: SharedConfig,
    pool: Option<Arc<SramPool>>,
    attached: Option<(ElementId, BusSender)>,
    pipeline_format: StreamFormat,
    format: StreamFormat,
    prepared: bool,
    bypass: bool,
    enabled: bool,
    vad_gate: bool,
    voice: bool,
    report_mcps: bool,
    node_index: u8,
    sniffer: Sniffer,
    meter: McpsMeter,
    pending: Vec<Vec<u8>>,
    filled: Vec<bool>,
    samples: Vec<Vec<f32>>,
    output: Vec<f32>,
    out: FrameBuffer,
}

impl<K: AlgoKernel> AlgoElement<K> {
    /// Wraps `kernel`, configured from `store`.
    pub fn new(name: &str, kernel: K, store: SharedConfig) -> Self {
        let kind = kernel.kind();
        Self {
            obj: Object::new(name)
                .with("bypass", false)
                .with("vad_gate", false)
                .with("node_index", 0)
                .with("cpu_mhz", i64::from(DEFAULT_CLOCK_MHZ))
                .with("sample_rate", 0),
            kernel,
            kind,
            ids: kind.sub_blocks(),
            store,
            pool: None,
            attached: None,
            pipeline_format: StreamFormat::default(),
            format: StreamFormat::default(),
            prepared: false,
            bypass: false,
            enabled: true,
            vad_gate: false,
            voice: true,
            report_mcps: false,
            node_index: 0,
            sniffer: Sniffer::default(),
            meter: McpsMeter::default(),
            pending: Vec::new(),
            filled: Vec::new(),
            samples: Vec::new(),
            output: Vec::new(),
            out: FrameBuffer::heap(),
        }
    }

    /// Draws output frames from `pool` instead of the heap.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<SramPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sends sniffed frames to `channel` instead of the bus.
    #[must_use]
    pub fn with_sniff_channel(mut self, channel: Box<dyn SniffChannel>) -> Self {
        self.sniffer.set_channel(channel);
        self
    }

    /// Wrapped kernel.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Algorithm kind.
    pub fn kind(&self) -> AlgoKind {
        self.kind
    }

    /// Whether frames currently skip the kernel.
    pub fn is_bypassed(&self) -> bool {
        self.bypass || !self.enabled || (self.vad_gate && !self.voice)
    }

    fn load_properties(&mut self) -> Option<()> {
        let prop_bypass = self.obj.get_bool("bypass").ok()?;
        self.vad_gate = self.obj.get_bool("vad_gate").ok()?;
        self.node_index = u8::try_from(self.obj.get_int("node_index").ok()?).ok()?;
        self.meter = McpsMeter::new(self.obj.get_u32("cpu_mhz").ok()?);
        let rate = self.obj.get_u32("sample_rate").ok()?;
        self.format = self.pipeline_format;
        if rate != 0 {
            self.format.sample_rate = rate;
        }
        self.meter.set_frame_micros(self.format.frame_micros());

        let store = self.store.read();
        let params = store
            .param(self.ids.config)
            .unwrap_or_else(|| ParamBlock::default_for(self.kind));
        self.bypass = prop_bypass || self.ids.bypass.is_some_and(|id| store.flag(id));
        self.report_mcps = store.flag(self.ids.mcps);
        self.sniffer.set_enabled(store.flag(self.ids.sniffer));
        self.sniffer.set_active(store.flag(SNIFFER_ACTIVATE));
        drop(store);

        if !self.kernel.get_config(&params) {
            tracing::warn!("{}: {} refused its parameter block", self.obj.name(), self.kind);
            return None;
        }
        self.enabled = params.enabled();
        Some(())
    }

    fn on_param_update(&mut self, id: u16, data: &[u8]) {
        let Some(role) = SubBlockRole::of(id) else {
            return;
        };
        match role {
            SubBlockRole::AllMcps => {
                self.publish_mcps();
                return;
            }
            SubBlockRole::SnifferActivate => {}
            _ if role.algo() == Some(self.kind) => {}
            _ => return,
        }
        let block = match ParamBlock::decode(id, data) {
            Ok(block) => block,
            Err(err) => {
                tracing::warn!("{}: sub-block {id:#06x}: {err}", self.obj.name());
                return;
            }
        };
        match role {
            SubBlockRole::Config(_) => {
                if self.prepared && !self.kernel.apply_params(&block) {
                    tracing::warn!("{}: update {id:#06x} refused by kernel", self.obj.name());
                    return;
                }
                self.enabled = block.enabled();
            }
            SubBlockRole::Sniffer(_) => self.sniffer.set_enabled(block.enabled()),
            SubBlockRole::SnifferActivate => self.sniffer.set_active(block.enabled()),
            SubBlockRole::Mcps(_) => self.report_mcps = block.enabled(),
            SubBlockRole::Bypass(_) => self.bypass = block.enabled(),
            _ => {}
        }
        tracing::debug!("{}: applied sub-block {id:#06x}", self.obj.name());
    }

    fn publish_mcps(&mut self) {
        if !self.report_mcps {
            return;
        }
        let Some((element, bus)) = &self.attached else {
            return;
        };
        let body = MessageBody::Mcps {
            id: self.ids.mcps,
            milli_mcps: self.meter.take(),
        };
        let msg = Message::with_body(MsgId::MCPS_REPORT, body).from_element(*element);
        if let Err(err) = bus.publish(msg) {
            tracing::warn!("{}: {err}", self.obj.name());
        }
    }

    fn publish_events(&mut self) {
        while let Some((id, body)) = self.kernel.poll_event() {
            let Some((element, bus)) = &self.attached else {
                continue;
            };
            if let Err(err) = bus.publish(Message::with_body(id, body).from_element(*element)) {
                tracing::warn!("{}: {err}", self.obj.name());
            }
        }
    }

    fn run_kernel(&mut self, ctx: &mut FlowContext<'_>) -> FlowResult {
        for ((bytes, filled), samples) in self.pending.iter().zip(&self.filled).zip(&mut self.samples) {
            if *filled {
                pcm16_to_f32(bytes, samples);
            } else {
                samples.clear();
            }
        }
        self.filled.fill(false);

        self.sniffer.tap(Tap {
            point: SniffPoint::Input,
            index: self.node_index,
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
            pcm: &self.pending[0],
        });

        let inputs: Vec<&[f32]> = self.samples.iter().map(Vec::as_slice).collect();
        self.output.clear();
        let (kernel, output) = (&mut self.kernel, &mut self.output);
        self.meter.measure(|| kernel.algo_process(&inputs, output));
        self.publish_events();

        if self.output.is_empty() {
            return Ok(Flow::Continue);
        }
        let bytes = self.output.len() * BYTES_PER_SAMPLE;
        let payload = self.out.require(bytes).ok_or(FlowError::Backpressure(bytes))?;
        f32_to_pcm16(&self.output, payload);
        if let Some(pcm) = self.out.payload() {
            self.sniffer.tap(Tap {
                point: SniffPoint::Output,
                index: self.node_index,
                sample_rate: self.kernel.output_rate(self.format.sample_rate),
                channels: self.format.channels,
                pcm,
            });
        }
        let result = ctx.submit(0, &self.out);
        self.out.release();
        result
    }
}

impl<K: AlgoKernel> Element for AlgoElement<K> {
    fn object(&self) -> &Object {
        &self.obj
    }

    fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    fn sink_pads(&self) -> usize {
        self.kernel.inputs()
    }

    fn source_pads(&self) -> usize {
        1
    }

    fn attach(&mut self, attachment: Attachment) {
        self.pipeline_format = attachment.format;
        if !self.sniffer.has_channel() {
            self.sniffer
                .set_channel(Box::new(BusSniffer::new(attachment.bus.clone(), attachment.id)));
        }
        self.attached = Some((attachment.id, attachment.bus));
    }

    fn idle_to_ready(&mut self) -> StateChange {
        if self.load_properties().is_none() {
            return StateChange::Fail;
        }
        if !self.kernel.init_algo(&self.format) {
            tracing::warn!("{}: {} cannot run at {:?}", self.obj.name(), self.kind, self.format);
            return StateChange::Fail;
        }
        let inputs = self.kernel.inputs();
        self.pending = vec![Vec::new(); inputs];
        self.filled = vec![false; inputs];
        self.samples = vec![Vec::new(); inputs];
        self.out = FrameBuffer::with_pool(self.pool.clone());
        self.voice = true;
        self.prepared = true;
        tracing::debug!("{}: {} ready, bypass={}", self.obj.name(), self.kind, self.is_bypassed());
        StateChange::Success
    }

    fn pause_to_ready(&mut self) -> StateChange {
        self.filled.fill(false);
        StateChange::Success
    }

    fn ready_to_idle(&mut self) -> StateChange {
        self.kernel.deinit_algo();
        self.prepared = false;
        self.out.release();
        self.pending = Vec::new();
        self.filled = Vec::new();
        self.samples = Vec::new();
        self.output = Vec::new();
        StateChange::Success
    }

    fn process(&mut self, ctx: &mut FlowContext<'_>, pad: usize, buffer: &dyn Buffer) -> FlowResult {
        if !self.prepared {
            return Err(FlowError::NotPrepared);
        }
        if pad >= self.pending.len() {
            return Err(FlowError::NoSuchPad {
                element: ctx.element(),
                pad,
            });
        }
        let data = buffer.payload().ok_or(FlowError::NullPayload)?;
        if self.is_bypassed() {
            if pad != 0 {
                return Ok(Flow::Continue);
            }
            self.filled.fill(false);
            return ctx.submit(0, buffer);
        }

        let slot = &mut self.pending[pad];
        slot.clear();
        slot.extend_from_slice(data);
        self.filled[pad] = true;
        let complete = self
            .filled
            .iter()
            .enumerate()
            .all(|(p, filled)| *filled || !ctx.is_sink_linked(p));
        if !complete {
            return Ok(Flow::Continue);
        }
        self.run_kernel(ctx)
    }

    fn handle_message(&mut self, msg: &Message) {
        match (msg.id, &msg.body) {
            (MsgId::PARAM_UPDATE, MessageBody::SubBlock { id, data }) => {
                self.on_param_update(*id, data);
            }
            (MsgId::VAD_STATE, MessageBody::Vad(voice)) => self.voice = *voice,
            _ => self.kernel.handle_message(msg),
        }
    }
}
