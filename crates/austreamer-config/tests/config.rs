//! Integration tests for the configuration crate.
//!
//! Exercises the path a parameter takes from a host tool to a pipeline:
//! binary block on disk → store → control request → bus update.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;

use austreamer_config::acore::{self, HW_CONTROL_REQUEST, HW_CONTROL_RESPONSE};
use austreamer_config::{
    AcoreMessage, AlgoKind, ConfigBlock, ConfigStore, ControlBridge, GainParams, ParamBlock,
    PhonetHeader, Record, SubBlock,
};
use austreamer_core::{Bus, EventType, MessageBody, MsgId};

// ============================================================================
// Block files
// ============================================================================

#[test]
fn defaults_blob_loads_back_into_identical_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defaults.bin");
    ConfigStore::defaults().to_block().save(&path).unwrap();

    let block = ConfigBlock::load(&path).unwrap();
    let store = ConfigStore::from_block(&block).unwrap();
    for kind in AlgoKind::ALL {
        assert_eq!(
            store.param(kind.sub_blocks().config),
            Some(ParamBlock::default_for(kind))
        );
    }
}

#[test]
fn blob_with_unknown_id_is_refused() {
    let block = ConfigBlock::new(vec![Record::new(0x07, &[1]).unwrap()]);
    assert!(ConfigStore::from_block(&block).is_err());
}

// ============================================================================
// Control requests
// ============================================================================

#[test]
fn host_update_reaches_bus_after_checks() {
    let bus = Bus::new(EventType::Voice);
    let mut store = ConfigStore::defaults();
    let notified = Arc::new(AtomicUsize::new(0));
    {
        let notified = Arc::clone(&notified);
        store.on_notify(move |_, _| {
            notified.fetch_add(1, Ordering::SeqCst);
        });
    }
    // gain above +12 dB is refused
    store.on_check(|_, block| !matches!(block, ParamBlock::Gain(g) if g.gain_db > 12));
    let store = store.shared();
    let mut bridge = ControlBridge::new(Arc::clone(&store), bus.sender(), PhonetHeader::default());

    let ok = ParamBlock::Gain(GainParams { enable: true, gain_db: 6 }).encode();
    let loud = ParamBlock::Gain(GainParams { enable: true, gain_db: 20 }).encode();
    let request = AcoreMessage {
        header: PhonetHeader::default(),
        trans_id: 1,
        msg_id: HW_CONTROL_REQUEST,
        payload: acore::encode_sub_blocks(&[
            SubBlock { id: 0x98, data: ok[..4].to_vec() },
            SubBlock { id: 0x98, data: loud[..4].to_vec() },
        ]),
    };
    let reply = bridge.handle(&request.encode()).unwrap().unwrap();
    let reply = AcoreMessage::decode(&reply).unwrap();
    assert_eq!(reply.msg_id, HW_CONTROL_RESPONSE);
    assert_eq!(acore::decode_control_response(&reply).unwrap(), vec![0x98]);

    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.read().param(0x98),
        Some(ParamBlock::Gain(GainParams { enable: true, gain_db: 6 }))
    );
    let msg = bus.try_recv().unwrap();
    assert_eq!(msg.id, MsgId::PARAM_UPDATE);
    assert_eq!(msg.body, MessageBody::SubBlock { id: 0x98, data: ok });
    assert!(bus.try_recv().is_none());
}

#[test]
fn truncated_request_is_an_error_not_a_partial_update() {
    let bus = Bus::new(EventType::Voice);
    let store = ConfigStore::defaults().shared();
    let before = store.read().to_block();
    let mut bridge = ControlBridge::new(Arc::clone(&store), bus.sender(), PhonetHeader::default());

    let mut payload = acore::encode_sub_blocks(&[SubBlock { id: 0x03, data: vec![1, 0] }]);
    payload[0] = 2; // claims a second block that is not there
    let request = AcoreMessage {
        header: PhonetHeader::default(),
        trans_id: 9,
        msg_id: HW_CONTROL_REQUEST,
        payload,
    };
    assert!(bridge.handle(&request.encode()).is_err());
    assert_eq!(store.read().to_block(), before);
    assert!(bus.try_recv().is_none());
}

// ============================================================================
// Properties
// ============================================================================

fn record_strategy() -> impl Strategy<Value = Record> {
    (any::<u16>(), prop::collection::vec(any::<u8>(), 0..=16))
        .prop_map(|(id, data)| Record::new(id, &data).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn arbitrary_blocks_decode_to_what_was_encoded(
        version_minor in 0u16..0x100,
        records in prop::collection::vec(record_strategy(), 0..40),
    ) {
        let block = ConfigBlock { version: 0x0100 | version_minor, records };
        let decoded = ConfigBlock::decode(&block.encode());
        prop_assert_eq!(decoded.ok(), Some(block));
    }

    #[test]
    fn garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = ConfigBlock::decode(&bytes);
        let _ = AcoreMessage::decode(&bytes);
        let _ = acore::decode_sub_blocks(&bytes);
    }

    #[test]
    fn decoded_params_re_encode_identically(id in 0u16..0x100, data in prop::array::uniform16(any::<u8>())) {
        if let Ok(block) = ParamBlock::decode(id, &data) {
            let again = ParamBlock::decode(id, &block.encode());
            prop_assert_eq!(again.ok(), Some(block));
        }
    }
}
