//! Audio-core transport codec.
//!
//! Host tools talk to the audio core with phonet-framed messages:
//!
//! ```text
//! u8 media, u8 rdev, u8 sdev, u8 res
//! u16 length     big-endian, total message length − 6
//! u8 robj, u8 sobj
//! u8 trans_id, u8 msg_id
//! payload
//! ```
//!
//! Payload fields after the header are little-endian. Sub-block lists are a
//! `u16` count followed by `{u16 id, u16 len, data}` entries where `len`
//! counts the 4-byte entry header plus the data.
//!
//! [`ControlBridge`] applies control requests to a [`ConfigStore`], turns
//! each accepted sub-block into a `PARAM_UPDATE` bus message and answers
//! with the ids it refused.

use austreamer_core::{BusSender, Message, MessageBody, MsgId, SniffPoint};

use crate::error::ConfigError;
use crate::params::SUB_BLOCK_SIZE;
use crate::store::{ConfigStore, SharedConfig};
use crate::sub_block::ALL_CONFIG;

/// Write sub-blocks.
pub const HW_CONTROL_REQUEST: u8 = 0x1B;
/// Answer to [`HW_CONTROL_REQUEST`]; lists refused ids.
pub const HW_CONTROL_RESPONSE: u8 = 0x1C;
/// Read sub-blocks.
pub const HW_READ_REQUEST: u8 = 0x1D;
/// Answer to [`HW_READ_REQUEST`].
pub const HW_READ_RESPONSE: u8 = 0x1E;
/// Sniffed PCM from the core.
pub const NODE_DATA_NOTIFY: u8 = 0x38;

/// Bytes in the phonet header.
pub const PHONET_HEADER_LEN: usize = 8;
/// Offset the phonet length field is measured from.
pub const PHONET_LEN_OFFSET: usize = 6;
/// Bytes in a sub-block entry header.
pub const SUB_BLOCK_HEADER_LEN: usize = 4;
/// Largest message the transport carries.
pub const MAX_MESSAGE_LEN: usize = 512;

const RATE_BITS: [(u32, u16); 6] = [
    (8_000, 0x0001),
    (16_000, 0x0002),
    (24_000, 0x0004),
    (32_000, 0x0080),
    (44_100, 0x0100),
    (48_000, 0x0200),
];

/// Sample-rate bitfield value of `rate`.
pub fn rate_bits(rate: u32) -> Option<u16> {
    RATE_BITS.iter().find(|(r, _)| *r == rate).map(|(_, b)| *b)
}

/// Sample rate of a single-bit bitfield value.
pub fn rate_from_bits(bits: u16) -> Option<u32> {
    RATE_BITS.iter().find(|(_, b)| *b == bits).map(|(r, _)| *r)
}

/// Phonet addressing. The length field is derived on encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PhonetHeader {
    /// Link-layer media.
    pub media: u8,
    /// Receiver device.
    pub rdev: u8,
    /// Sender device.
    pub sdev: u8,
    /// Resource.
    pub res: u8,
    /// Receiver object.
    pub robj: u8,
    /// Sender object.
    pub sobj: u8,
}

impl PhonetHeader {
    /// Header addressed back to the sender.
    pub fn reply(&self) -> Self {
        Self {
            rdev: self.sdev,
            sdev: self.rdev,
            robj: self.sobj,
            sobj: self.robj,
            ..*self
        }
    }
}

/// One framed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcoreMessage {
    /// Addressing.
    pub header: PhonetHeader,
    /// Transaction id, echoed in the reply.
    pub trans_id: u8,
    /// Message id.
    pub msg_id: u8,
    /// Bytes after `msg_id`.
    pub payload: Vec<u8>,
}

impl AcoreMessage {
    /// Parses a framed message; the length field must match the input.
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        ConfigError::need(PHONET_HEADER_LEN + 2, bytes.len())?;
        let length = usize::from(u16::from_be_bytes([bytes[4], bytes[5]]));
        if length + PHONET_LEN_OFFSET != bytes.len() {
            return Err(ConfigError::malformed(
                "phonet header",
                format!("length {length} for {} bytes", bytes.len()),
            ));
        }
        Ok(Self {
            header: PhonetHeader {
                media: bytes[0],
                rdev: bytes[1],
                sdev: bytes[2],
                res: bytes[3],
                robj: bytes[6],
                sobj: bytes[7],
            },
            trans_id: bytes[8],
            msg_id: bytes[9],
            payload: bytes[10..].to_vec(),
        })
    }

    /// Frames the message.
    pub fn encode(&self) -> Vec<u8> {
        let total = PHONET_HEADER_LEN + 2 + self.payload.len();
        let length = (total - PHONET_LEN_OFFSET) as u16;
        let h = &self.header;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&[h.media, h.rdev, h.sdev, h.res]);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&[h.robj, h.sobj, self.trans_id, self.msg_id]);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Reply to this message carrying `payload`.
    pub fn reply(&self, msg_id: u8, payload: Vec<u8>) -> Self {
        Self {
            header: self.header.reply(),
            trans_id: self.trans_id,
            msg_id,
            payload,
        }
    }
}

/// One entry of a sub-block list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubBlock {
    /// Sub-block id.
    pub id: u16,
    /// Data after the entry header.
    pub data: Vec<u8>,
}

/// Parses a counted sub-block list.
pub fn decode_sub_blocks(payload: &[u8]) -> Result<Vec<SubBlock>, ConfigError> {
    ConfigError::need(2, payload.len())?;
    let count = usize::from(u16::from_le_bytes([payload[0], payload[1]]));
    let mut at = 2;
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        ConfigError::need(at + SUB_BLOCK_HEADER_LEN, payload.len())?;
        let id = u16::from_le_bytes([payload[at], payload[at + 1]]);
        let len = usize::from(u16::from_le_bytes([payload[at + 2], payload[at + 3]]));
        if len < SUB_BLOCK_HEADER_LEN {
            return Err(ConfigError::malformed("sub-block", format!("{id:#06x} length {len}")));
        }
        ConfigError::need(at + len, payload.len())?;
        blocks.push(SubBlock {
            id,
            data: payload[at + SUB_BLOCK_HEADER_LEN..at + len].to_vec(),
        });
        at += len;
    }
    Ok(blocks)
}

/// Serializes a counted sub-block list.
pub fn encode_sub_blocks(blocks: &[SubBlock]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(blocks.len() as u16).to_le_bytes());
    for b in blocks {
        out.extend_from_slice(&b.id.to_le_bytes());
        out.extend_from_slice(&((b.data.len() + SUB_BLOCK_HEADER_LEN) as u16).to_le_bytes());
        out.extend_from_slice(&b.data);
    }
    out
}

fn encode_ids(ids: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2 * ids.len());
    out.extend_from_slice(&(ids.len() as u16).to_le_bytes());
    for id in ids {
        out.extend_from_slice(&id.to_le_bytes());
    }
    out
}

fn decode_ids(payload: &[u8]) -> Result<Vec<u16>, ConfigError> {
    ConfigError::need(2, payload.len())?;
    let count = usize::from(u16::from_le_bytes([payload[0], payload[1]]));
    ConfigError::need(2 + 2 * count, payload.len())?;
    Ok(payload[2..2 + 2 * count]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Refused ids listed in a control response.
pub fn decode_control_response(msg: &AcoreMessage) -> Result<Vec<u16>, ConfigError> {
    decode_ids(&msg.payload)
}

/// Sniffed PCM ready for the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeData {
    /// Tap position.
    pub point: SniffPoint,
    /// Node index.
    pub index: u8,
    /// Interleaved channels.
    pub channels: u16,
    /// Sample rate of `pcm`.
    pub sample_rate: u32,
    /// Little-endian `i16` samples.
    pub pcm: Vec<u8>,
}

impl NodeData {
    /// Extracts the PCM carried by a `NODE_DATA` bus message.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if msg.id != MsgId::NODE_DATA {
            return None;
        }
        match &msg.body {
            MessageBody::Pcm {
                point,
                index,
                sample_rate,
                channels,
                data,
            } => Some(Self {
                point: *point,
                index: *index,
                channels: *channels,
                sample_rate: *sample_rate,
                pcm: data.clone(),
            }),
            _ => None,
        }
    }

    /// Node-data-notify payload: direction, index, mode, rate bits, byte
    /// length, PCM. Refuses rates without a bitfield value.
    pub fn encode(&self) -> Result<Vec<u8>, ConfigError> {
        let bits = rate_bits(self.sample_rate)
            .ok_or_else(|| ConfigError::malformed("node data", format!("rate {}", self.sample_rate)))?;
        let direction = match self.point {
            SniffPoint::Input => 0u8,
            SniffPoint::Output => 1,
        };
        let mode = u8::from(self.channels > 1);
        let mut out = Vec::with_capacity(7 + self.pcm.len());
        out.extend_from_slice(&[direction, self.index, mode]);
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(&(self.pcm.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.pcm);
        Ok(out)
    }
}

/// Applies transport requests to a shared store and the pipeline bus.
pub struct ControlBridge {
    store: SharedConfig,
    bus: BusSender,
    local: PhonetHeader,
    next_trans: u8,
}

impl ControlBridge {
    /// Bridge writing into `store` and publishing on `bus`. `local` addresses
    /// unsolicited notifications.
    pub fn new(store: SharedConfig, bus: BusSender, local: PhonetHeader) -> Self {
        Self {
            store,
            bus,
            local,
            next_trans: 0,
        }
    }

    /// The store requests are applied to.
    pub fn store(&self) -> &SharedConfig {
        &self.store
    }

    /// Handles one framed request; returns the framed reply, if the message
    /// id expects one.
    pub fn handle(&mut self, bytes: &[u8]) -> Result<Option<Vec<u8>>, ConfigError> {
        let msg = AcoreMessage::decode(bytes)?;
        let reply = match msg.msg_id {
            HW_CONTROL_REQUEST => {
                let refused = self.apply(&decode_sub_blocks(&msg.payload)?);
                msg.reply(HW_CONTROL_RESPONSE, encode_ids(&refused))
            }
            HW_READ_REQUEST => {
                let blocks = self.read(&decode_ids(&msg.payload)?);
                msg.reply(HW_READ_RESPONSE, encode_sub_blocks(&blocks))
            }
            other => {
                tracing::debug!("acore: ignoring message {other:#04x}");
                return Ok(None);
            }
        };
        let out = reply.encode();
        if out.len() > MAX_MESSAGE_LEN {
            return Err(ConfigError::malformed("reply", format!("{} bytes", out.len())));
        }
        Ok(Some(out))
    }

    /// Writes each sub-block; returns the refused ids.
    pub fn apply(&self, blocks: &[SubBlock]) -> Vec<u16> {
        let mut refused = Vec::new();
        for sb in blocks {
            let written = self.store.write().write_sb(sb.id, &sb.data);
            match written {
                Ok(block) => {
                    let update = MessageBody::SubBlock {
                        id: sb.id,
                        data: block.encode(),
                    };
                    if let Err(err) = self.bus.publish(Message::with_body(MsgId::PARAM_UPDATE, update)) {
                        tracing::warn!("acore: sub-block {:#06x} stored but not announced: {err}", sb.id);
                        refused.push(sb.id);
                    }
                }
                Err(err) => {
                    tracing::warn!("acore: sub-block {:#06x} refused: {err}", sb.id);
                    refused.push(sb.id);
                }
            }
        }
        refused
    }

    /// Stored sub-blocks for `ids`; [`ALL_CONFIG`] expands to every record.
    /// Unknown ids are skipped.
    pub fn read(&self, ids: &[u16]) -> Vec<SubBlock> {
        let store = self.store.read();
        let wanted: Vec<u16> = if ids.contains(&ALL_CONFIG) {
            store.ids().collect()
        } else {
            ids.to_vec()
        };
        wanted
            .into_iter()
            .filter_map(|id| read_one(&store, id))
            .collect()
    }

    /// Frames a `NODE_DATA` bus message as a node-data notify.
    pub fn node_data_notify(&mut self, msg: &Message) -> Result<Option<Vec<u8>>, ConfigError> {
        let Some(node) = NodeData::from_message(msg) else {
            return Ok(None);
        };
        let trans_id = self.next_trans;
        self.next_trans = self.next_trans.wrapping_add(1);
        let notify = AcoreMessage {
            header: self.local,
            trans_id,
            msg_id: NODE_DATA_NOTIFY,
            payload: node.encode()?,
        };
        Ok(Some(notify.encode()))
    }
}

fn read_one(store: &ConfigStore, id: u16) -> Option<SubBlock> {
    let (data, len) = store.read_sb(id)?;
    Some(SubBlock {
        id,
        data: data[..len.min(SUB_BLOCK_SIZE)].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use austreamer_core::{Bus, EventType};

    fn request(msg_id: u8, payload: Vec<u8>) -> Vec<u8> {
        AcoreMessage {
            header: PhonetHeader {
                media: 0x1b,
                rdev: 0x10,
                sdev: 0x00,
                res: 0x01,
                robj: 0x20,
                sobj: 0x30,
            },
            trans_id: 7,
            msg_id,
            payload,
        }
        .encode()
    }

    #[test]
    fn length_field_is_total_minus_six() {
        let bytes = request(HW_READ_REQUEST, vec![1, 0, 3, 0]);
        assert_eq!(bytes.len(), 14);
        assert_eq!(&bytes[4..6], &[0x00, 0x08]);
        let msg = AcoreMessage::decode(&bytes).unwrap();
        assert_eq!(msg.trans_id, 7);
        assert_eq!(msg.payload, vec![1, 0, 3, 0]);

        let mut bad = bytes.clone();
        bad.push(0);
        assert!(AcoreMessage::decode(&bad).is_err());
    }

    #[test]
    fn sub_block_length_includes_header() {
        let blocks = vec![
            SubBlock { id: 0x03, data: vec![1, 0] },
            SubBlock { id: 0x35, data: vec![1, 0] },
        ];
        let payload = encode_sub_blocks(&blocks);
        assert_eq!(&payload[..6], &[2, 0, 0x03, 0, 6, 0]);
        assert_eq!(decode_sub_blocks(&payload).unwrap(), blocks);

        let mut bad = payload.clone();
        bad[4] = 2;
        assert!(decode_sub_blocks(&bad).is_err());
        assert!(decode_sub_blocks(&payload[..7]).is_err());
    }

    #[test]
    fn control_request_updates_store_and_bus() {
        let bus = Bus::new(EventType::Voice);
        let store = ConfigStore::defaults().shared();
        let mut bridge = ControlBridge::new(store.clone(), bus.sender(), PhonetHeader::default());

        let payload = encode_sub_blocks(&[
            SubBlock { id: 0x03, data: vec![1, 0] },
            SubBlock { id: 0x07, data: vec![1, 0] },
        ]);
        let reply = bridge.handle(&request(HW_CONTROL_REQUEST, payload)).unwrap().unwrap();
        let reply = AcoreMessage::decode(&reply).unwrap();
        assert_eq!(reply.msg_id, HW_CONTROL_RESPONSE);
        assert_eq!(reply.trans_id, 7);
        assert_eq!((reply.header.rdev, reply.header.sdev), (0x00, 0x10));
        assert_eq!(decode_control_response(&reply).unwrap(), vec![0x07]);

        assert!(store.read().flag(0x03));
        let update = bus.try_recv().unwrap();
        assert_eq!(update.id, MsgId::PARAM_UPDATE);
        assert!(matches!(update.body, MessageBody::SubBlock { id: 0x03, data } if data[0] == 1));
        assert!(bus.try_recv().is_none());
    }

    #[test]
    fn read_request_expands_all_config() {
        let bus = Bus::new(EventType::Music);
        let store = ConfigStore::defaults().shared();
        let count = store.read().len();
        let mut bridge = ControlBridge::new(store, bus.sender(), PhonetHeader::default());

        let reply = bridge
            .handle(&request(HW_READ_REQUEST, encode_ids(&[0x98, 0x07])))
            .unwrap()
            .unwrap();
        let blocks = decode_sub_blocks(&AcoreMessage::decode(&reply).unwrap().payload).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, 0x98);

        let all = bridge.read(&[ALL_CONFIG]);
        assert_eq!(all.len(), count);
    }

    #[test]
    fn unknown_messages_get_no_reply() {
        let bus = Bus::new(EventType::Music);
        let mut bridge = ControlBridge::new(ConfigStore::new().shared(), bus.sender(), PhonetHeader::default());
        assert_eq!(bridge.handle(&request(0x32, vec![])).unwrap(), None);
    }

    #[test]
    fn node_data_notify_layout() {
        let bus = Bus::new(EventType::Voice);
        let local = PhonetHeader {
            sdev: 0x10,
            ..PhonetHeader::default()
        };
        let mut bridge = ControlBridge::new(ConfigStore::new().shared(), bus.sender(), local);
        let msg = Message::with_body(
            MsgId::NODE_DATA,
            MessageBody::Pcm {
                point: SniffPoint::Output,
                index: 2,
                sample_rate: 16_000,
                channels: 1,
                data: vec![1, 0, 2, 0],
            },
        );
        let bytes = bridge.node_data_notify(&msg).unwrap().unwrap();
        let framed = AcoreMessage::decode(&bytes).unwrap();
        assert_eq!(framed.msg_id, NODE_DATA_NOTIFY);
        assert_eq!(framed.payload, vec![1, 2, 0, 0x02, 0x00, 4, 0, 1, 0, 2, 0]);
        assert_eq!(bridge.node_data_notify(&Message::new(MsgId::VOLUME)).unwrap(), None);

        let second = AcoreMessage::decode(&bridge.node_data_notify(&msg).unwrap().unwrap()).unwrap();
        assert_eq!(second.trans_id, framed.trans_id.wrapping_add(1));
    }

    #[test]
    fn rate_bitfield() {
        assert_eq!(rate_bits(44_100), Some(0x100));
        assert_eq!(rate_from_bits(0x80), Some(32_000));
        assert_eq!(rate_bits(22_050), None);
    }
}
