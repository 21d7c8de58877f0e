//! Zero-copy fan-out of one input to N outputs.

use crate::buffer::{Buffer, Payload, ShadowGroup};
use crate::element::{Element, Flow, FlowResult};
use crate::error::FlowError;
use crate::graph::FlowContext;
use crate::object::Object;

/// Hands the same payload to every linked source pad through shadow buffers.
///
/// The upstream payload stays alive until every branch has released its
/// shadow. Unlinked outputs are skipped. A failing branch does not stop the
/// others; the first error is reported after all branches ran.
pub struct Splitter {
    obj: Object,
    outputs: usize,
}

impl Splitter {
    /// Splitter with `outputs` source pads.
    pub fn new(name: &str, outputs: usize) -> Self {
        Self {
            obj: Object::new(name),
            outputs,
        }
    }
}

impl Element for Splitter {
    fn object(&self) -> &Object {
        &self.obj
    }

    fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    fn sink_pads(&self) -> usize {
        1
    }

    fn source_pads(&self) -> usize {
        self.outputs
    }

    fn listens(&self) -> bool {
        false
    }

    fn process(&mut self, ctx: &mut FlowContext<'_>, _pad: usize, buffer: &dyn Buffer) -> FlowResult {
        let upstream = match buffer.share() {
            Some(payload) => payload,
            None => Payload::copy_from(buffer.payload().ok_or(FlowError::NullPayload)?),
        };
        let mut first_err = None;
        for mut shadow in ShadowGroup::fan_out(upstream, self.outputs) {
            let pad = shadow.index();
            if ctx.is_linked(pad) {
                if let Err(err) = ctx.submit(pad, &shadow) {
                    first_err.get_or_insert(err);
                }
            }
            shadow.release();
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(Flow::Continue),
        }
    }
}
