//! Hand-rolled byte-slice JSON scanner for the WebSocket text feed (spec
//! §4.2). No general-purpose JSON parser runs on the hot path — this
//! module looks for exactly the keys the three supported event shapes use
//! (`trade`, `bookTicker`, `depthUpdate`) plus the REST snapshot shape
//! (`bids`/`asks`/`lastUpdateId`), and ignores everything else in the
//! object. Grounded in the field conventions of
//! `services/market-connector/src/exchanges/binance` and
//! `feeds/src/binance/websocket.rs`.
//!
//! Prices and quantities are scaled to fixed-point by multiplying by a
//! caller-supplied decimal factor (spec §4.2, typically 10,000 — see
//! [`common::PRICE_SCALE`]).

use common::{Price, Quantity, Side, SymbolId, Timestamp};

use crate::event::{BookLevelUpdate, FeedCallback, QuoteUpdate, Trade};

/// Find the first occurrence of a `"key":` marker and return the byte
/// offset just past the colon, skipping any immediately-following
/// whitespace. Returns `None` if the key is absent.
fn find_value_start(data: &[u8], key: &str) -> Option<usize> {
    let needle = format!("\"{key}\":");
    let pos = find_subslice(data, needle.as_bytes())?;
    let mut i = pos + needle.len();
    while i < data.len() && (data[i] == b' ' || data[i] == b'\t') {
        i += 1;
    }
    Some(i)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Extract a quoted string value (e.g. `"s":"BTCUSDT"`), returning the
/// slice between the quotes without allocating.
fn str_value<'a>(data: &'a [u8], key: &str) -> Option<&'a str> {
    let start = find_value_start(data, key)?;
    if data.get(start) != Some(&b'"') {
        return None;
    }
    let content_start = start + 1;
    let rel_end = data[content_start..].iter().position(|&b| b == b'"')?;
    std::str::from_utf8(&data[content_start..content_start + rel_end]).ok()
}

/// Extract a bare (unquoted) numeric value, e.g. `"u":400900217`.
fn num_value(data: &[u8], key: &str) -> Option<u64> {
    let start = find_value_start(data, key)?;
    let mut end = start;
    while end < data.len() && (data[end].is_ascii_digit() || data[end] == b'-') {
        end += 1;
    }
    if end == start {
        return None;
    }
    std::str::from_utf8(&data[start..end]).ok()?.parse().ok()
}

/// Extract a value that may be either a quoted decimal string or a bare
/// number (venues differ), returning it as `f64`.
fn decimal_value(data: &[u8], key: &str) -> Option<f64> {
    let start = find_value_start(data, key)?;
    if data.get(start) == Some(&b'"') {
        str_value(data, key)?.parse().ok()
    } else {
        let mut end = start;
        while end < data.len() && (data[end].is_ascii_digit() || data[end] == b'.' || data[end] == b'-') {
            end += 1;
        }
        std::str::from_utf8(&data[start..end]).ok()?.parse().ok()
    }
}

/// Scale a floating-point price/quantity to the fixed-point representation
/// used throughout the book (spec §4.2: "scaled to fixed-point by
/// multiplying by the symbol's decimal factor").
#[must_use]
pub fn scale(value: f64, decimal_factor: u32) -> u32 {
    (value * f64::from(decimal_factor)).round() as u32
}

/// Find the `[...]` array following `"key":` and return the byte range of
/// its contents (excluding the brackets). Tracks bracket depth so nested
/// arrays (each `[price, qty]` pair) don't terminate the scan early.
fn array_span<'a>(data: &'a [u8], key: &str) -> Option<&'a [u8]> {
    let start = find_value_start(data, key)?;
    if data.get(start) != Some(&b'[') {
        return None;
    }
    let mut depth = 0usize;
    for (i, &b) in data[start..].iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&data[start + 1..start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Iterate `[price, qty]` pairs within an array span (as produced by
/// [`array_span`]), invoking `f` for each pair without collecting them
/// into a `Vec`.
fn for_each_level(span: &[u8], mut f: impl FnMut(f64, f64)) {
    let mut i = 0;
    while i < span.len() {
        if span[i] != b'[' {
            i += 1;
            continue;
        }
        let Some(rel_close) = span[i..].iter().position(|&b| b == b']') else { break };
        let pair = &span[i + 1..i + rel_close];
        let mut parts = pair.split(|&b| b == b',');
        let price_tok = parts.next();
        let qty_tok = parts.next();
        if let (Some(p), Some(q)) = (price_tok, qty_tok) {
            let p = trim_quotes(p);
            let q = trim_quotes(q);
            if let (Ok(p), Ok(q)) = (
                std::str::from_utf8(p).unwrap_or_default().parse::<f64>(),
                std::str::from_utf8(q).unwrap_or_default().parse::<f64>(),
            ) {
                f(p, q);
            }
        }
        i += rel_close + 1;
    }
}

fn trim_quotes(b: &[u8]) -> &[u8] {
    let b = b.strip_prefix(b"\"").unwrap_or(b);
    b.strip_suffix(b"\"").unwrap_or(b)
}

/// Hand-rolled scanner for the JSON-over-WebSocket feed dialect (spec §4.2,
/// §6). `symbol` resolves a venue ticker string to a dense [`SymbolId`]
/// (unknown tickers are silently dropped, mirroring the binary decoder's
/// out-of-range-length handling); `decimal_factor` scales decimal strings
/// to fixed-point ticks.
#[derive(Debug, Clone, Copy)]
pub struct JsonDecoder<F> {
    /// Resolves a venue symbol string to a dense [`SymbolId`], or `None`
    /// if the symbol is not tracked.
    pub symbol: F,
    /// Fixed-point scale applied to decoded prices/quantities.
    pub decimal_factor: u32,
}

impl<F: Fn(&str) -> Option<SymbolId>> JsonDecoder<F> {
    /// Build a decoder with the given symbol resolver and decimal factor.
    #[must_use]
    pub const fn new(symbol: F, decimal_factor: u32) -> Self {
        Self { symbol, decimal_factor }
    }

    /// Parse one JSON text message and dispatch it as a `trade`,
    /// `bookTicker`, `depthUpdate`, or REST snapshot event, whichever
    /// shape matches. Returns `false` if no recognized event kind could be
    /// extracted (malformed or unsupported message — spec §7: dropped
    /// silently, telemetered by the caller).
    pub fn process_message<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        match str_value(data, "e") {
            Some("trade") => self.parse_trade(data, callback),
            Some("depthUpdate") => self.parse_depth_update(data, callback),
            _ => {
                if str_value(data, "b").is_some() && str_value(data, "a").is_some() && str_value(data, "s").is_some()
                {
                    self.parse_book_ticker(data, callback)
                } else if array_span(data, "bids").is_some() || array_span(data, "asks").is_some() {
                    self.parse_snapshot(data, callback)
                } else {
                    false
                }
            }
        }
    }

    fn parse_trade<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        let Some(sym) = str_value(data, "s").and_then(|s| (self.symbol)(s)) else { return false };
        let Some(price) = decimal_value(data, "p") else { return false };
        let Some(qty) = decimal_value(data, "q") else { return false };
        let ts = num_value(data, "T").unwrap_or(0);
        let aggressor_side = match str_value(data, "m") {
            Some("true") => Side::Sell,
            _ => Side::Buy,
        };
        callback.on_trade(Trade {
            symbol: sym,
            price: Price(scale(price, self.decimal_factor)),
            quantity: Quantity(scale(qty, self.decimal_factor)),
            aggressor_side,
            timestamp: Timestamp(ts),
        });
        true
    }

    fn parse_book_ticker<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        let Some(sym) = str_value(data, "s").and_then(|s| (self.symbol)(s)) else { return false };
        let Some(bid_price) = decimal_value(data, "b") else { return false };
        let Some(ask_price) = decimal_value(data, "a") else { return false };
        let bid_size = decimal_value(data, "B").unwrap_or(0.0);
        let ask_size = decimal_value(data, "A").unwrap_or(0.0);
        callback.on_quote(QuoteUpdate {
            symbol: sym,
            bid_price: Price(scale(bid_price, self.decimal_factor)),
            ask_price: Price(scale(ask_price, self.decimal_factor)),
            bid_size: Quantity(scale(bid_size, self.decimal_factor)),
            ask_size: Quantity(scale(ask_size, self.decimal_factor)),
            timestamp: Timestamp(num_value(data, "E").unwrap_or(0)),
        });
        true
    }

    fn parse_depth_update<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        let Some(sym) = str_value(data, "s").and_then(|s| (self.symbol)(s)) else { return false };
        let ts = Timestamp(num_value(data, "E").unwrap_or(0));
        let mut any = false;
        if let Some(span) = array_span(data, "b") {
            for_each_level(span, |price, qty| {
                any = true;
                callback.on_book_level(BookLevelUpdate {
                    symbol: sym,
                    side: Side::Buy,
                    price: Price(scale(price, self.decimal_factor)),
                    quantity: Quantity(scale(qty, self.decimal_factor)),
                    timestamp: ts,
                });
            });
        }
        if let Some(span) = array_span(data, "a") {
            for_each_level(span, |price, qty| {
                any = true;
                callback.on_book_level(BookLevelUpdate {
                    symbol: sym,
                    side: Side::Sell,
                    price: Price(scale(price, self.decimal_factor)),
                    quantity: Quantity(scale(qty, self.decimal_factor)),
                    timestamp: ts,
                });
            });
        }
        any
    }

    fn parse_snapshot<C: FeedCallback>(&self, data: &[u8], callback: &mut C) -> bool {
        // A REST snapshot carries no symbol field of its own; the caller
        // must know which symbol it requested (out of band) and pass a
        // resolver that ignores the argument, or wrap this with the
        // symbol already bound.
        let Some(sym) = (self.symbol)("") else { return false };
        let ts = Timestamp(num_value(data, "lastUpdateId").unwrap_or(0));
        let mut any = false;
        for (key, side) in [("bids", Side::Buy), ("asks", Side::Sell)] {
            if let Some(span) = array_span(data, key) {
                for_each_level(span, |price, qty| {
                    any = true;
                    callback.on_book_level(BookLevelUpdate {
                        symbol: sym,
                        side,
                        price: Price(scale(price, self.decimal_factor)),
                        quantity: Quantity(scale(qty, self.decimal_factor)),
                        timestamp: ts,
                    });
                });
            }
        }
        any
    }
}
