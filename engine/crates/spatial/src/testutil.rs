use entities::{Character, CharacterId, ConnectionId};

use crate::drops::{DropId, ItemDrop};
use crate::{PacketSink, ViewEncoder};

/// Sink that records every send in order, for asserting packet traffic.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub sent: Vec<(ConnectionId, Vec<u8>)>,
}

impl RecordingSink {
    pub(crate) fn packets_for(&self, connection: ConnectionId) -> Vec<Vec<u8>> {
        self.sent
            .iter()
            .filter(|(c, _)| *c == connection)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.sent.clear();
    }
}

impl PacketSink for RecordingSink {
    fn send(&mut self, connection: ConnectionId, packet: &[u8]) {
        self.sent.push((connection, packet.to_vec()));
    }
}

/// Encoder producing single-byte-tagged payloads so tests can tell a view
/// from a remove and recover the subject id.
#[derive(Debug, Default)]
pub(crate) struct TagEncoder;

impl TagEncoder {
    pub(crate) fn tagged(tag: u8, raw: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(9);
        out.push(tag);
        out.extend_from_slice(&raw.to_le_bytes());
        out
    }

    pub(crate) fn view_of(id: CharacterId) -> Vec<u8> {
        Self::tagged(b'V', id.to_u64())
    }

    pub(crate) fn remove_of(id: CharacterId) -> Vec<u8> {
        Self::tagged(b'R', id.to_u64())
    }

    pub(crate) fn drop_view_of(id: DropId) -> Vec<u8> {
        Self::tagged(b'v', id.0 as u64)
    }

    pub(crate) fn drop_remove_of(id: DropId) -> Vec<u8> {
        Self::tagged(b'r', id.0 as u64)
    }
}

impl ViewEncoder for TagEncoder {
    fn character_view(&self, id: CharacterId, _character: &Character) -> Vec<u8> {
        Self::view_of(id)
    }

    fn character_remove(&self, id: CharacterId) -> Vec<u8> {
        Self::remove_of(id)
    }

    fn drop_view(&self, id: DropId, _drop: &ItemDrop) -> Vec<u8> {
        Self::drop_view_of(id)
    }

    fn drop_remove(&self, id: DropId, _drop: &ItemDrop) -> Vec<u8> {
        Self::drop_remove_of(id)
    }
}
