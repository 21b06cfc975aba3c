//! Decoder for the WLED UDP realtime wire format.
//!
//! Every datagram starts with a two byte header:
//!
//! ```text
//! ┌────────────┬──────────────┬──────────────────────────────┐
//! │ protocol   │ timeout      │ pixel payload                │
//! │ id (1B)    │ seconds (1B) │ layout depends on protocol   │
//! └────────────┴──────────────┴──────────────────────────────┘
//! ```
//!
//! Timeout byte 255 means the frame never expires; any other value is the
//! number of seconds until the display falls back to its idle state, measured
//! from packet arrival. The payload layouts:
//!
//! - WARLS (1): repeating `[index, r, g, b]` groups
//! - DRGB  (2): repeating `[r, g, b]` groups, indices counting up from 0
//! - DRGBW (3): repeating `[r, g, b, w]` groups, the white channel is dropped
//! - DNRGB (4): big-endian u16 start index, then `[r, g, b]` groups
//!
//! Decoding is stateless and never fails: malformed payloads simply yield
//! fewer (or zero) pixel writes.

use std::fmt;

use tracing::trace;

/// Timeout byte value that marks a frame as never expiring.
pub const NO_TIMEOUT: u8 = 255;

/// Largest datagram the receiver hands to the decoder.
pub const MAX_DATAGRAM_SIZE: usize = 65536;

// Wire protocol ids
const PROTOCOL_WARLS: u8 = 1;
const PROTOCOL_DRGB: u8 = 2;
const PROTOCOL_DRGBW: u8 = 3;
const PROTOCOL_DNRGB: u8 = 4;

/// One display pixel. The wire never carries alpha, and the DRGBW white
/// channel is discarded during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Addressing scheme of a decoded packet, kept for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Warls,
    Drgb,
    Drgbw,
    Dnrgb,
    Unknown(u8),
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Warls => write!(f, "WARLS"),
            Protocol::Drgb => write!(f, "DRGB"),
            Protocol::Drgbw => write!(f, "DRGBW"),
            Protocol::Dnrgb => write!(f, "DNRGB"),
            Protocol::Unknown(id) => write!(f, "Unknown ({})", id),
        }
    }
}

/// A single in-range pixel write produced by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWrite {
    pub index: usize,
    pub color: Rgb,
}

/// Result of decoding one datagram.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub protocol: Protocol,
    /// `None` when the timeout byte was 255: the frame sticks forever and any
    /// existing expiry deadline is cleared.
    pub timeout: Option<u8>,
    /// In-range writes in wire order. Duplicate indices are allowed, the last
    /// write wins when applied.
    pub writes: Vec<PixelWrite>,
}

/// Decode one datagram against a display of `pixel_count` pixels.
///
/// Returns `None` for packets shorter than the two byte header. Unknown
/// protocol ids decode to zero writes but still carry the timeout directive.
pub fn decode(data: &[u8], pixel_count: usize) -> Option<DecodedFrame> {
    if data.len() < 2 {
        return None;
    }

    let timeout = match data[1] {
        NO_TIMEOUT => None,
        seconds => Some(seconds),
    };
    let payload = &data[2..];

    let (protocol, writes) = match data[0] {
        PROTOCOL_WARLS => (Protocol::Warls, decode_warls(payload, pixel_count)),
        PROTOCOL_DRGB => (Protocol::Drgb, decode_sequential(payload, 0, 3, pixel_count)),
        PROTOCOL_DRGBW => (Protocol::Drgbw, decode_sequential(payload, 0, 4, pixel_count)),
        PROTOCOL_DNRGB => {
            // Needs at least the u16 start index after the header.
            if payload.len() < 2 {
                (Protocol::Unknown(PROTOCOL_DNRGB), Vec::new())
            } else {
                let start = (payload[0] as usize) * 256 + (payload[1] as usize);
                (
                    Protocol::Dnrgb,
                    decode_sequential(&payload[2..], start, 3, pixel_count),
                )
            }
        }
        id => {
            trace!("Unrecognized protocol id {}", id);
            (Protocol::Unknown(id), Vec::new())
        }
    };

    Some(DecodedFrame {
        protocol,
        timeout,
        writes,
    })
}

// WARLS: each complete 4-byte group addresses one pixel explicitly. A
// trailing partial group is ignored.
fn decode_warls(payload: &[u8], pixel_count: usize) -> Vec<PixelWrite> {
    let mut writes = Vec::with_capacity(payload.len() / 4);
    for group in payload.chunks_exact(4) {
        push_in_range(
            &mut writes,
            group[0] as usize,
            Rgb::new(group[1], group[2], group[3]),
            pixel_count,
        );
    }
    writes
}

// DRGB/DRGBW/DNRGB: fixed-size groups written to consecutive indices from
// `start`. The color always sits in the first three bytes of a group.
fn decode_sequential(
    payload: &[u8],
    start: usize,
    group_len: usize,
    pixel_count: usize,
) -> Vec<PixelWrite> {
    let mut writes = Vec::with_capacity(payload.len() / group_len);
    for (offset, group) in payload.chunks_exact(group_len).enumerate() {
        push_in_range(
            &mut writes,
            start + offset,
            Rgb::new(group[0], group[1], group[2]),
            pixel_count,
        );
    }
    writes
}

// Shared bounds check for all four decode paths. An out-of-range index is
// dropped without aborting the remaining groups of the packet.
fn push_in_range(writes: &mut Vec<PixelWrite>, index: usize, color: Rgb, pixel_count: usize) {
    if index < pixel_count {
        writes.push(PixelWrite { index, color });
    } else {
        trace!("Dropping out-of-range pixel index {}", index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undersized_packet_decodes_to_nothing() {
        assert!(decode(&[], 8).is_none());
        assert!(decode(&[0x01], 8).is_none());
    }

    #[test]
    fn warls_addresses_one_pixel_per_group() {
        // Timeout 5s, pixel 3 <- (0x10, 0x20, 0x30)
        let frame = decode(&[0x01, 0x05, 0x03, 0x10, 0x20, 0x30], 8).unwrap();
        assert_eq!(frame.protocol, Protocol::Warls);
        assert_eq!(frame.timeout, Some(5));
        assert_eq!(
            frame.writes,
            vec![PixelWrite {
                index: 3,
                color: Rgb::new(0x10, 0x20, 0x30),
            }]
        );
    }

    #[test]
    fn warls_ignores_trailing_partial_group() {
        let data = [0x01, 0xFF, 0x00, 0x11, 0x22, 0x33, 0x01, 0x44];
        let frame = decode(&data, 8).unwrap();
        assert_eq!(frame.writes.len(), 1);
        assert_eq!(frame.writes[0].index, 0);
    }

    #[test]
    fn warls_drops_out_of_range_index_but_keeps_decoding() {
        let data = [
            0x01, 0xFF, // header
            0x09, 0x01, 0x02, 0x03, // out of range for 4 pixels
            0x02, 0x04, 0x05, 0x06, // in range
        ];
        let frame = decode(&data, 4).unwrap();
        assert_eq!(
            frame.writes,
            vec![PixelWrite {
                index: 2,
                color: Rgb::new(0x04, 0x05, 0x06),
            }]
        );
    }

    #[test]
    fn drgb_counts_up_from_zero() {
        let frame = decode(&[0x02, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0xFF, 0x00], 2).unwrap();
        assert_eq!(frame.protocol, Protocol::Drgb);
        assert_eq!(frame.timeout, None);
        assert_eq!(
            frame.writes,
            vec![
                PixelWrite {
                    index: 0,
                    color: Rgb::new(0xFF, 0x00, 0x00),
                },
                PixelWrite {
                    index: 1,
                    color: Rgb::new(0x00, 0xFF, 0x00),
                },
            ]
        );
    }

    #[test]
    fn drgb_truncates_at_buffer_bounds() {
        // Three groups against a two pixel display.
        let data = [0x02, 0xFF, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let frame = decode(&data, 2).unwrap();
        assert_eq!(frame.writes.len(), 2);
        assert_eq!(frame.writes[1].color, Rgb::new(4, 5, 6));
    }

    #[test]
    fn drgbw_discards_white_channel() {
        let data = [0x03, 0x0A, 10, 20, 30, 99, 40, 50, 60, 99];
        let frame = decode(&data, 8).unwrap();
        assert_eq!(frame.protocol, Protocol::Drgbw);
        assert_eq!(frame.timeout, Some(10));
        assert_eq!(
            frame.writes,
            vec![
                PixelWrite {
                    index: 0,
                    color: Rgb::new(10, 20, 30),
                },
                PixelWrite {
                    index: 1,
                    color: Rgb::new(40, 50, 60),
                },
            ]
        );
    }

    #[test]
    fn dnrgb_starts_at_big_endian_offset() {
        // Start index 0x0102 = 258
        let data = [0x04, 0xFF, 0x01, 0x02, 7, 8, 9, 10, 11, 12];
        let frame = decode(&data, 1024).unwrap();
        assert_eq!(frame.protocol, Protocol::Dnrgb);
        assert_eq!(frame.writes.len(), 2);
        assert_eq!(frame.writes[0].index, 258);
        assert_eq!(frame.writes[1].index, 259);
        assert_eq!(frame.writes[1].color, Rgb::new(10, 11, 12));
    }

    #[test]
    fn dnrgb_without_start_index_yields_zero_writes() {
        let frame = decode(&[0x04, 0x05], 8).unwrap();
        assert!(frame.writes.is_empty());
        assert_eq!(frame.protocol, Protocol::Unknown(4));
        // Header is still honored.
        assert_eq!(frame.timeout, Some(5));

        let frame = decode(&[0x04, 0x05, 0x00], 8).unwrap();
        assert!(frame.writes.is_empty());
    }

    #[test]
    fn unknown_protocol_yields_zero_writes_but_keeps_timeout() {
        let frame = decode(&[0x07, 0x1E, 1, 2, 3], 8).unwrap();
        assert_eq!(frame.protocol, Protocol::Unknown(7));
        assert_eq!(frame.timeout, Some(30));
        assert!(frame.writes.is_empty());
    }

    #[test]
    fn timeout_byte_255_means_sticky() {
        let frame = decode(&[0x02, 0xFF, 1, 2, 3], 8).unwrap();
        assert_eq!(frame.timeout, None);
    }

    #[test]
    fn duplicate_indices_stay_in_wire_order() {
        let data = [0x01, 0xFF, 0x00, 1, 1, 1, 0x00, 2, 2, 2];
        let frame = decode(&data, 4).unwrap();
        assert_eq!(frame.writes.len(), 2);
        assert_eq!(frame.writes[1].color, Rgb::new(2, 2, 2));
    }
}
