//! Fixed-format UDP datagram framing: a 20-byte session header followed by
//! a run of 2-byte-length-prefixed message bodies (spec §4.2, §6).
//! Grounded in `original_source/include/network/udp_receiver.hpp`'s
//! `MoldUDP64Header` parsing and `ItchFeedHandler::process_packet`.
//!
//! This module only frames bytes already in memory; the actual socket I/O
//! (multicast join, epoll loop) is a deployment concern outside this
//! core's scope (spec §1's "out of scope: HTTP/REST/WebSocket clients to
//! specific venues" — the same boundary applies to raw UDP sockets).

use crate::binary::BinaryDecoder;
use crate::event::FeedCallback;

/// Size of the fixed transport header: 10-byte session id + 8-byte
/// sequence number + 2-byte message count.
pub const HEADER_LEN: usize = 20;

/// Parsed transport header for one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Opaque 10-byte session identifier.
    pub session: [u8; 10],
    /// Monotonically increasing sequence number of the first message in this packet.
    pub sequence: u64,
    /// Number of framed messages following the header.
    pub message_count: u16,
}

impl PacketHeader {
    /// Parse the 20-byte header from the start of `data`. Returns `None`
    /// if `data` is shorter than [`HEADER_LEN`].
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }
        let mut session = [0u8; 10];
        session.copy_from_slice(&data[0..10]);
        let sequence = u64::from_be_bytes(data[10..18].try_into().ok()?);
        let message_count = u16::from_be_bytes([data[18], data[19]]);
        Some(Self { session, sequence, message_count })
    }
}

/// Splits a framed packet into its header and iterates the length-prefixed
/// message bodies that follow, feeding each through a [`BinaryDecoder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketDecoder {
    inner: BinaryDecoder,
}

impl PacketDecoder {
    /// Decode every message in one transport packet, dispatching each to
    /// `callback`. Returns the number of messages successfully parsed;
    /// truncated trailing data (a length prefix that overruns the packet,
    /// or fewer bytes than the declared `message_count` promises) stops
    /// the loop early rather than panicking. Returns 0 (no header parsed,
    /// no messages processed) if `data` is shorter than [`HEADER_LEN`].
    pub fn process_packet<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> usize {
        let Some(header) = PacketHeader::parse(data) else { return 0 };
        let mut offset = HEADER_LEN;
        let mut processed = 0;

        for _ in 0..header.message_count {
            if offset + 2 > data.len() {
                break;
            }
            let msg_len = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
            offset += 2;
            if offset + msg_len > data.len() {
                break;
            }
            if self.inner.process_message(&data[offset..offset + msg_len], callback) {
                processed += 1;
            }
            offset += msg_len;
        }

        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::MSG_ORDER_DELETE;
    use crate::event::OrderDelete;
    use common::OrderId;

    #[derive(Default)]
    struct Recorder {
        deletes: Vec<OrderDelete>,
    }

    impl FeedCallback for Recorder {
        fn on_order_delete(&mut self, event: OrderDelete) {
            self.deletes.push(event);
        }
    }

    fn delete_message(order_id: u64) -> Vec<u8> {
        let mut msg = vec![0u8; 19];
        msg[0] = MSG_ORDER_DELETE;
        msg[11..19].copy_from_slice(&order_id.to_be_bytes());
        msg
    }

    fn framed_packet(messages: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[10..18].copy_from_slice(&1u64.to_be_bytes());
        buf[18..20].copy_from_slice(&(messages.len() as u16).to_be_bytes());
        for m in messages {
            buf.extend_from_slice(&(m.len() as u16).to_be_bytes());
            buf.extend_from_slice(m);
        }
        buf
    }

    #[test]
    fn header_parses_session_sequence_and_count() {
        let packet = framed_packet(&[delete_message(1), delete_message(2)]);
        let header = PacketHeader::parse(&packet).unwrap();
        assert_eq!(header.sequence, 1);
        assert_eq!(header.message_count, 2);
    }

    #[test]
    fn process_packet_dispatches_every_framed_message() {
        let packet = framed_packet(&[delete_message(10), delete_message(20), delete_message(30)]);
        let decoder = PacketDecoder::default();
        let mut cb = Recorder::default();
        let processed = decoder.process_packet(&packet, &mut cb);
        assert_eq!(processed, 3);
        assert_eq!(cb.deletes.iter().map(|d| d.order_id).collect::<Vec<_>>(), vec![OrderId(10), OrderId(20), OrderId(30)]);
    }

    #[test]
    fn truncated_packet_stops_early_without_panicking() {
        let mut packet = framed_packet(&[delete_message(1), delete_message(2)]);
        packet.truncate(packet.len() - 5);
        let decoder = PacketDecoder::default();
        let mut cb = Recorder::default();
        let processed = decoder.process_packet(&packet, &mut cb);
        assert_eq!(processed, 1);
    }

    #[test]
    fn short_packet_has_no_header() {
        let decoder = PacketDecoder::default();
        let mut cb = Recorder::default();
        assert_eq!(decoder.process_packet(&[1, 2, 3], &mut cb), 0);
    }
}
