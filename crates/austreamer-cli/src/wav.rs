//! WAV file endpoints backed by `hound`.
//!
//! Both elements work on 16-bit PCM at the pipeline format. A file with a
//! different rate or channel count fails Idle→Ready.

use std::fs::File;
use std::io::BufWriter;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use austreamer_algo::{ElementCategory, ElementDescriptor, ElementRegistry};
use austreamer_core::{
    Attachment, BYTES_PER_SAMPLE, Buffer, BusSender, Element, ElementId, Flow, FlowContext,
    FlowError, FlowResult, FrameBuffer, Message, MessageBody, MsgId, Object, StateChange,
    StreamFormat,
};

/// Adds `wav_src` and `wav_sink` to `registry`.
pub fn register(registry: &mut ElementRegistry) {
    registry.register(
        ElementDescriptor {
            id: "wav_src",
            description: "Plays a 16-bit WAV file",
            category: ElementCategory::Source,
            ctor_props: &[],
        },
        |spec| Ok(Box::new(WavSource::new(spec.name))),
    );
    registry.register(
        ElementDescriptor {
            id: "wav_sink",
            description: "Writes the stream to a 16-bit WAV file",
            category: ElementCategory::Sink,
            ctor_props: &[],
        },
        |spec| Ok(Box::new(WavSink::new(spec.name))),
    );
}

fn wav_spec(format: StreamFormat) -> WavSpec {
    WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Scheduled source reading a WAV file frame by frame.
///
/// | Property | Type | Default |
/// |----------|------|---------|
/// | `path` | string | "" |
pub struct WavSource {
    obj: Object,
    format: StreamFormat,
    bus: Option<(ElementId, BusSender)>,
    samples: Vec<i16>,
    pos: usize,
    out: FrameBuffer,
    finished: bool,
}

impl WavSource {
    /// New source with default properties.
    pub fn new(name: &str) -> Self {
        Self {
            obj: Object::new(name).with("path", ""),
            format: StreamFormat::default(),
            bus: None,
            samples: Vec::new(),
            pos: 0,
            out: FrameBuffer::heap(),
            finished: false,
        }
    }

    fn load(&mut self) -> Result<(), String> {
        let path = self.obj.get_str("path").map_err(|e| e.to_string())?;
        let reader = WavReader::open(path).map_err(|e| format!("{path}: {e}"))?;
        let spec = reader.spec();
        if spec != wav_spec(self.format) {
            return Err(format!(
                "{path}: {} Hz x{} {}-bit, pipeline runs {} Hz x{} 16-bit",
                spec.sample_rate, spec.channels, spec.bits_per_sample, self.format.sample_rate, self.format.channels
            ));
        }
        self.samples = reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(|e| format!("{path}: {e}"))?;
        Ok(())
    }

    fn end_of_stream(&self) {
        if let Some((id, bus)) = &self.bus {
            let msg = Message::with_body(MsgId::END_OF_STREAM, MessageBody::Element(*id)).from_element(*id);
            if let Err(err) = bus.publish(msg) {
                tracing::warn!("{}: {err}", self.obj.name());
            }
        }
    }
}

impl Element for WavSource {
    fn object(&self) -> &Object {
        &self.obj
    }

    fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    fn sink_pads(&self) -> usize {
        0
    }

    fn source_pads(&self) -> usize {
        1
    }

    fn attach(&mut self, attachment: Attachment) {
        self.format = attachment.format;
        self.bus = Some((attachment.id, attachment.bus));
    }

    fn is_scheduled(&self) -> bool {
        true
    }

    fn idle_to_ready(&mut self) -> StateChange {
        if let Err(err) = self.load() {
            tracing::warn!("{}: {err}", self.obj.name());
            return StateChange::Fail;
        }
        self.pos = 0;
        self.finished = false;
        tracing::debug!("{}: loaded {} samples", self.obj.name(), self.samples.len());
        StateChange::Success
    }

    fn ready_to_idle(&mut self) -> StateChange {
        self.out.release();
        self.samples = Vec::new();
        StateChange::Success
    }

    fn pull(&mut self, ctx: &mut FlowContext<'_>) -> FlowResult {
        if self.finished {
            return Ok(Flow::Eof);
        }
        let end = (self.pos + self.format.frame_len()).min(self.samples.len());
        let chunk = &self.samples[self.pos..end];
        self.pos = end;
        let mut result = Ok(Flow::Continue);
        if !chunk.is_empty() {
            let bytes = chunk.len() * BYTES_PER_SAMPLE;
            let payload = self.out.require(bytes).ok_or(FlowError::Backpressure(bytes))?;
            for (dst, s) in payload.chunks_exact_mut(BYTES_PER_SAMPLE).zip(chunk) {
                dst.copy_from_slice(&s.to_le_bytes());
            }
            result = ctx.submit(0, &self.out);
            self.out.release();
        }
        if self.pos == self.samples.len() {
            self.finished = true;
            self.end_of_stream();
            return result.map(|_| Flow::Eof);
        }
        result
    }
}

/// Terminal sink writing every frame to a WAV file.
///
/// The file is created at Idle→Ready and finalized at Ready→Idle.
///
/// | Property | Type | Default |
/// |----------|------|---------|
/// | `path` | string | "" |
pub struct WavSink {
    obj: Object,
    format: StreamFormat,
    writer: Option<WavWriter<BufWriter<File>>>,
    written: u64,
}

impl WavSink {
    /// New sink with default properties.
    pub fn new(name: &str) -> Self {
        Self {
            obj: Object::new(name).with("path", ""),
            format: StreamFormat::default(),
            writer: None,
            written: 0,
        }
    }
}

impl Element for WavSink {
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
        0
    }

    fn listens(&self) -> bool {
        false
    }

    fn attach(&mut self, attachment: Attachment) {
        self.format = attachment.format;
    }

    fn idle_to_ready(&mut self) -> StateChange {
        let Ok(path) = self.obj.get_str("path") else {
            return StateChange::Fail;
        };
        match WavWriter::create(path, wav_spec(self.format)) {
            Ok(writer) => {
                self.writer = Some(writer);
                self.written = 0;
                StateChange::Success
            }
            Err(err) => {
                tracing::warn!("{}: {path}: {err}", self.obj.name());
                StateChange::Fail
            }
        }
    }

    fn ready_to_idle(&mut self) -> StateChange {
        let Some(writer) = self.writer.take() else {
            return StateChange::Success;
        };
        match writer.finalize() {
            Ok(()) => {
                tracing::info!("{}: wrote {} samples", self.obj.name(), self.written);
                StateChange::Success
            }
            Err(err) => {
                tracing::warn!("{}: {err}", self.obj.name());
                StateChange::Fail
            }
        }
    }

    fn process(&mut self, _ctx: &mut FlowContext<'_>, _pad: usize, buffer: &dyn Buffer) -> FlowResult {
        let data = buffer.payload().ok_or(FlowError::NullPayload)?;
        let writer = self.writer.as_mut().ok_or(FlowError::NotPrepared)?;
        for pair in data.chunks_exact(BYTES_PER_SAMPLE) {
            if let Err(err) = writer.write_sample(i16::from_le_bytes([pair[0], pair[1]])) {
                tracing::warn!("{}: {err}", self.obj.name());
                return Err(FlowError::Device);
            }
        }
        self.written += (data.len() / BYTES_PER_SAMPLE) as u64;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use austreamer_core::{EventType, Pipeline, State};

    fn format() -> StreamFormat {
        StreamFormat::new(8_000, 1, 80)
    }

    fn write_ramp(path: &std::path::Path, len: i16) {
        let mut writer = WavWriter::create(path, wav_spec(format())).unwrap();
        for s in 0..len {
            writer.write_sample(s * 100).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn file_round_trips_through_a_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp(&input, 200);

        let mut p = Pipeline::new("copy", EventType::Music, format());
        let src = p.add_element(WavSource::new("src")).unwrap();
        let sink = p.add_element(WavSink::new("sink")).unwrap();
        p.link(src, sink).unwrap();
        p.set_property(src, "path", input.to_str().unwrap()).unwrap();
        p.set_property(sink, "path", output.to_str().unwrap()).unwrap();

        p.set_state(State::Play).unwrap();
        for _ in 0..5 {
            p.tick().unwrap();
        }
        p.set_state(State::Idle).unwrap();

        let samples: Vec<i16> = WavReader::open(&output)
            .unwrap()
            .into_samples::<i16>()
            .map(Result::unwrap)
            .collect();
        let expected: Vec<i16> = (0..200).map(|s| s * 100).collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn mismatched_rate_fails_ready() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        write_ramp(&input, 10);

        let mut p = Pipeline::new("wrong", EventType::Music, StreamFormat::new(16_000, 1, 160));
        let src = p.add_element(WavSource::new("src")).unwrap();
        p.set_property(src, "path", input.to_str().unwrap()).unwrap();
        assert!(p.set_state(State::Ready).is_err());
    }
}
