//! Big-endian, fixed-offset binary order-level feed decoder (spec §4.2,
//! §6). Grounded in `original_source/include/itch_messages.hpp` and
//! `include/feed/itch_feed_handler.hpp`: field offsets, message-type tags
//! and minimum-length checks are reproduced exactly from that reference.
//!
//! Out-of-range lengths are rejected silently (the function returns
//! `false`); callers increment their own telemetry counter on a `false`
//! return (spec §7 — protocol/parse errors never propagate past the
//! decoder).

use common::{OrderId, Price, Quantity, Side, SymbolId, Timestamp};

use crate::event::{FeedCallback, OrderAdd, OrderDelete, OrderExecute, OrderReduce};

/// Add Order (no MPID attribution).
pub const MSG_ADD_ORDER: u8 = b'A';
/// Add Order with MPID attribution (parsed identically to `A`).
pub const MSG_ADD_ORDER_MPID: u8 = b'F';
/// Order Executed (at the resting price).
pub const MSG_ORDER_EXECUTED: u8 = b'E';
/// Order Executed with a distinct execution price.
pub const MSG_ORDER_EXECUTED_PRICE: u8 = b'C';
/// Order Cancel (partial reduction).
pub const MSG_ORDER_CANCEL: u8 = b'X';
/// Order Delete (full removal).
pub const MSG_ORDER_DELETE: u8 = b'D';
/// Order Replace (delivered to the callback as delete-then-add).
pub const MSG_ORDER_REPLACE: u8 = b'U';

#[inline]
fn be16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

#[inline]
fn be32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn be48(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[2..8].copy_from_slice(&b[0..6]);
    u64::from_be_bytes(buf)
}

#[inline]
fn be64(b: &[u8]) -> u64 {
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

/// Stateless decoder for the order-level binary feed. Holds no buffers of
/// its own — every `process_*` call borrows its input and drives the
/// caller-supplied [`FeedCallback`] directly, so decoding is allocation-free
/// on the hot path.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryDecoder;

impl BinaryDecoder {
    /// Decode one message and dispatch it to `callback`. Returns `false`
    /// (without dispatching anything) if `data` is too short for its
    /// declared type, or empty. An unrecognized type tag is treated as a
    /// silently-skipped message and returns `true`, matching the
    /// reference decoder's "unknown/unsupported message type — skip".
    pub fn process_message<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        let Some(&msg_type) = data.first() else { return false };
        match msg_type {
            MSG_ADD_ORDER | MSG_ADD_ORDER_MPID => self.parse_add_order(data, callback),
            MSG_ORDER_EXECUTED | MSG_ORDER_EXECUTED_PRICE => self.parse_order_executed(data, callback),
            MSG_ORDER_CANCEL => self.parse_order_cancel(data, callback),
            MSG_ORDER_DELETE => self.parse_order_delete(data, callback),
            MSG_ORDER_REPLACE => self.parse_order_replace(data, callback),
            _ => true,
        }
    }

    fn parse_add_order<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        if data.len() < 36 {
            return false;
        }
        let event = OrderAdd {
            order_id: OrderId(be64(&data[11..19])),
            symbol: SymbolId(u32::from(be16(&data[1..3]))),
            side: if data[19] == b'B' { Side::Buy } else { Side::Sell },
            price: Price(be32(&data[32..36])),
            quantity: Quantity(be32(&data[20..24])),
            timestamp: Timestamp(be48(&data[5..11])),
        };
        callback.on_order_add(event);
        true
    }

    fn parse_order_executed<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        if data.len() < 31 {
            return false;
        }
        let exec_price = if data[0] == MSG_ORDER_EXECUTED_PRICE && data.len() >= 36 {
            Some(Price(be32(&data[32..36])))
        } else {
            None
        };
        let event = OrderExecute {
            order_id: OrderId(be64(&data[11..19])),
            quantity: Quantity(be32(&data[19..23])),
            exec_price,
            timestamp: Timestamp(be48(&data[5..11])),
        };
        callback.on_order_execute(event);
        true
    }

    fn parse_order_cancel<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        if data.len() < 23 {
            return false;
        }
        let event = OrderReduce {
            order_id: OrderId(be64(&data[11..19])),
            reduce_by: Quantity(be32(&data[19..23])),
            timestamp: Timestamp(be48(&data[5..11])),
        };
        callback.on_order_reduce(event);
        true
    }

    fn parse_order_delete<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        if data.len() < 19 {
            return false;
        }
        let event = OrderDelete {
            order_id: OrderId(be64(&data[11..19])),
            timestamp: Timestamp(be48(&data[5..11])),
        };
        callback.on_order_delete(event);
        true
    }

    /// Replace has no side of its own (spec §9 Open Question: the wire
    /// message doesn't carry it); delivered as delete-then-add, with the
    /// add carrying a sentinel `Side::Buy` and zero symbol that the caller
    /// must override from its own order index before routing to a book —
    /// `MarketDataHandler::on_order_replace` does exactly that.
    fn parse_order_replace<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        if data.len() < 35 {
            return false;
        }
        let timestamp = Timestamp(be48(&data[5..11]));
        let old_order_id = OrderId(be64(&data[11..19]));
        let new_order_id = OrderId(be64(&data[19..27]));
        let new_qty = Quantity(be32(&data[27..31]));
        let new_price = Price(be32(&data[31..35]));

        callback.on_order_delete(OrderDelete { order_id: old_order_id, timestamp });
        callback.on_order_add(OrderAdd {
            order_id: new_order_id,
            symbol: SymbolId(0),
            side: Side::Buy,
            price: new_price,
            quantity: new_qty,
            timestamp,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        adds: Vec<OrderAdd>,
        executes: Vec<OrderExecute>,
        reduces: Vec<OrderReduce>,
        deletes: Vec<OrderDelete>,
    }

    impl FeedCallback for Recorder {
        fn on_order_add(&mut self, event: OrderAdd) {
            self.adds.push(event);
        }
        fn on_order_execute(&mut self, event: OrderExecute) {
            self.executes.push(event);
        }
        fn on_order_reduce(&mut self, event: OrderReduce) {
            self.reduces.push(event);
        }
        fn on_order_delete(&mut self, event: OrderDelete) {
            self.deletes.push(event);
        }
    }

    fn add_order_message(symbol_locate: u16, order_id: u64, side: u8, qty: u32, price: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 36];
        buf[0] = MSG_ADD_ORDER;
        buf[1..3].copy_from_slice(&symbol_locate.to_be_bytes());
        // bytes 3..5 tracking number, left zero
        buf[5..11].copy_from_slice(&0u64.to_be_bytes()[2..8]);
        buf[11..19].copy_from_slice(&order_id.to_be_bytes());
        buf[19] = side;
        buf[20..24].copy_from_slice(&qty.to_be_bytes());
        // bytes 24..32 stock symbol, unused
        buf[32..36].copy_from_slice(&price.to_be_bytes());
        buf
    }

    #[test]
    fn decodes_add_order_fields_at_documented_offsets() {
        let decoder = BinaryDecoder;
        let mut cb = Recorder::default();
        let msg = add_order_message(7, 555, b'B', 100, 10_100);
        assert!(decoder.process_message(&msg, &mut cb));
        assert_eq!(cb.adds.len(), 1);
        let add = cb.adds[0];
        assert_eq!(add.symbol, SymbolId(7));
        assert_eq!(add.order_id, OrderId(555));
        assert_eq!(add.side, Side::Buy);
        assert_eq!(add.quantity, Quantity(100));
        assert_eq!(add.price, Price(10_100));
    }

    #[test]
    fn short_add_order_message_is_rejected_silently() {
        let decoder = BinaryDecoder;
        let mut cb = Recorder::default();
        let msg = vec![MSG_ADD_ORDER; 10];
        assert!(!decoder.process_message(&msg, &mut cb));
        assert!(cb.adds.is_empty());
    }

    #[test]
    fn unknown_message_type_is_skipped_not_rejected() {
        let decoder = BinaryDecoder;
        let mut cb = Recorder::default();
        assert!(decoder.process_message(&[b'Z', 0, 0], &mut cb));
    }

    #[test]
    fn order_delete_decodes_order_id_and_timestamp() {
        let decoder = BinaryDecoder;
        let mut cb = Recorder::default();
        let mut msg = vec![0u8; 19];
        msg[0] = MSG_ORDER_DELETE;
        msg[11..19].copy_from_slice(&42u64.to_be_bytes());
        assert!(decoder.process_message(&msg, &mut cb));
        assert_eq!(cb.deletes[0].order_id, OrderId(42));
    }

    #[test]
    fn order_replace_emits_delete_then_add() {
        let decoder = BinaryDecoder;
        let mut cb = Recorder::default();
        let mut msg = vec![0u8; 35];
        msg[0] = MSG_ORDER_REPLACE;
        msg[11..19].copy_from_slice(&1u64.to_be_bytes());
        msg[19..27].copy_from_slice(&2u64.to_be_bytes());
        msg[27..31].copy_from_slice(&50u32.to_be_bytes());
        msg[31..35].copy_from_slice(&10_200u32.to_be_bytes());
        assert!(decoder.process_message(&msg, &mut cb));
        assert_eq!(cb.deletes[0].order_id, OrderId(1));
        assert_eq!(cb.adds[0].order_id, OrderId(2));
        assert_eq!(cb.adds[0].quantity, Quantity(50));
        assert_eq!(cb.adds[0].price, Price(10_200));
    }

    #[test]
    fn order_executed_with_price_reads_execution_price() {
        let decoder = BinaryDecoder;
        let mut cb = Recorder::default();
        let mut msg = vec![0u8; 36];
        msg[0] = MSG_ORDER_EXECUTED_PRICE;
        msg[11..19].copy_from_slice(&9u64.to_be_bytes());
        msg[19..23].copy_from_slice(&25u32.to_be_bytes());
        msg[32..36].copy_from_slice(&9_900u32.to_be_bytes());
        assert!(decoder.process_message(&msg, &mut cb));
        assert_eq!(cb.executes[0].exec_price, Some(Price(9_900)));
    }

    #[test]
    fn plain_order_executed_has_no_exec_price() {
        let decoder = BinaryDecoder;
        let mut cb = Recorder::default();
        let mut msg = vec![0u8; 31];
        msg[0] = MSG_ORDER_EXECUTED;
        msg[11..19].copy_from_slice(&9u64.to_be_bytes());
        msg[19..23].copy_from_slice(&25u32.to_be_bytes());
        assert!(decoder.process_message(&msg, &mut cb));
        assert_eq!(cb.executes[0].exec_price, None);
    }
}
