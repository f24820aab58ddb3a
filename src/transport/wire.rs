//! Canonical wire formats for the telemetry and image channels.
//!
//! Both channels ride raw UDP datagrams, fire-and-forget.
//!
//! **Box datagram** (telemetry channel): a 4-byte header
//! `[0x00, 0x00, sender_id, count]` followed by `count` 20-byte records:
//! `f32 min_distance, i32 x_min, i32 x_max, i32 y_min, i32 y_max`. All
//! multi-byte fields are little-endian with no padding, so receivers on any
//! architecture decode the same layout.
//!
//! **Image stream** (image channel): a start marker datagram of ASCII
//! `"__HylPnaJY_START_JPG <9-digit zero-padded length>\n"`, the JPEG payload
//! split into chunks of at most 1400 bytes, then a fixed 9-byte stop marker
//! `"_g1nC_EOF"`. Receivers concatenate payload datagrams until the declared
//! length is reached and verify the stop marker as the integrity signal.
//! There is no acknowledgment or retransmission; a live feed favors recency
//! over reliability.

use anyhow::{bail, Result};

/// Bytes per bounding-box record on the wire.
pub const BOX_RECORD_BYTES: usize = 20;

/// Bytes in the box datagram header.
pub const BOX_HEADER_BYTES: usize = 4;

/// The header's count field is a single byte.
pub const MAX_BOXES_PER_DATAGRAM: usize = 255;

/// Image payload chunk size. Sized to fit a 1500-byte Ethernet MTU rather
/// than the 508-byte never-fragmented UDP bound: fewer datagrams per frame at
/// the cost of fragmentation on constrained links.
pub const IMAGE_CHUNK_BYTES: usize = 1400;

/// ASCII prefix of the image start marker.
pub const IMAGE_START_PREFIX: &str = "__HylPnaJY_START_JPG";

/// Fixed stop marker ending every image transfer.
pub const IMAGE_STOP_MAGIC: &[u8; 9] = b"_g1nC_EOF";

/// One bounding-box result as transmitted: closest surface in the box (in
/// meters) plus the clamped pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxPacket {
    pub min_distance: f32,
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

// ----------------------------------------------------------------------------
// Box datagram
// ----------------------------------------------------------------------------

/// Encode one telemetry datagram.
///
/// `packets` beyond [`MAX_BOXES_PER_DATAGRAM`] are dropped; callers that care
/// should bound the batch first (the streamer logs when this truncates). The
/// result is always exactly `4 + 20 * count` bytes.
pub fn encode_box_datagram(sender_id: u8, packets: &[BoxPacket]) -> Vec<u8> {
    let count = packets.len().min(MAX_BOXES_PER_DATAGRAM);

    let mut buf = Vec::with_capacity(BOX_HEADER_BYTES + count * BOX_RECORD_BYTES);
    buf.extend_from_slice(&[0x00, 0x00, sender_id, count as u8]);
    for packet in &packets[..count] {
        buf.extend_from_slice(&packet.min_distance.to_le_bytes());
        buf.extend_from_slice(&packet.x_min.to_le_bytes());
        buf.extend_from_slice(&packet.x_max.to_le_bytes());
        buf.extend_from_slice(&packet.y_min.to_le_bytes());
        buf.extend_from_slice(&packet.y_max.to_le_bytes());
    }
    buf
}

/// Decode a telemetry datagram into `(sender_id, packets)`.
///
/// The receiving half of [`encode_box_datagram`], used by tests and by
/// downstream consumers of the feed.
pub fn decode_box_datagram(buf: &[u8]) -> Result<(u8, Vec<BoxPacket>)> {
    if buf.len() < BOX_HEADER_BYTES {
        bail!("box datagram too short: {} bytes", buf.len());
    }
    let sender_id = buf[2];
    let count = buf[3] as usize;
    let expected = BOX_HEADER_BYTES + count * BOX_RECORD_BYTES;
    if buf.len() != expected {
        bail!(
            "box datagram length mismatch: {} bytes for count {}, expected {}",
            buf.len(),
            count,
            expected
        );
    }

    let mut packets = Vec::with_capacity(count);
    for record in buf[BOX_HEADER_BYTES..].chunks_exact(BOX_RECORD_BYTES) {
        packets.push(BoxPacket {
            min_distance: f32::from_le_bytes(record[0..4].try_into().unwrap()),
            x_min: i32::from_le_bytes(record[4..8].try_into().unwrap()),
            x_max: i32::from_le_bytes(record[8..12].try_into().unwrap()),
            y_min: i32::from_le_bytes(record[12..16].try_into().unwrap()),
            y_max: i32::from_le_bytes(record[16..20].try_into().unwrap()),
        });
    }
    Ok((sender_id, packets))
}

// ----------------------------------------------------------------------------
// Image framing
// ----------------------------------------------------------------------------

/// Start marker datagram declaring the payload length.
pub fn start_marker(payload_len: usize) -> Vec<u8> {
    format!("{} {:09}\n", IMAGE_START_PREFIX, payload_len).into_bytes()
}

/// Parse a start marker; `None` if the datagram is not one.
pub fn parse_start_marker(datagram: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(datagram).ok()?;
    let rest = text.strip_prefix(IMAGE_START_PREFIX)?.strip_prefix(' ')?;
    let digits = rest.strip_suffix('\n')?;
    if digits.len() != 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Split a payload into wire-sized chunks, in transmit order.
pub fn chunk_payload(payload: &[u8]) -> impl Iterator<Item = &[u8]> {
    payload.chunks(IMAGE_CHUNK_BYTES)
}

/// Receiver-side reassembly state machine for the image channel.
///
/// Feed it every datagram from the image port in arrival order; it returns
/// the complete payload once the declared length has been received and the
/// stop marker verified. Loss or reordering shows up as a length or marker
/// mismatch and drops the transfer in progress; the next start marker begins
/// a fresh one.
pub struct ImageReassembler {
    state: ReassemblyState,
}

enum ReassemblyState {
    Idle,
    Receiving { expected: usize, buf: Vec<u8> },
    AwaitingStop { buf: Vec<u8> },
}

impl ImageReassembler {
    pub fn new() -> Self {
        Self {
            state: ReassemblyState::Idle,
        }
    }

    /// Consume one datagram; returns the reconstructed payload when a
    /// transfer completes.
    ///
    /// A start marker always begins a new transfer, even mid-payload: after
    /// a lost chunk the declared length is never reached, and the next
    /// frame's start marker is the only way back in sync.
    pub fn feed(&mut self, datagram: &[u8]) -> Option<Vec<u8>> {
        if let Some(expected) = parse_start_marker(datagram) {
            self.state = if expected == 0 {
                ReassemblyState::AwaitingStop { buf: Vec::new() }
            } else {
                ReassemblyState::Receiving {
                    expected,
                    buf: Vec::with_capacity(expected),
                }
            };
            return None;
        }

        match std::mem::replace(&mut self.state, ReassemblyState::Idle) {
            ReassemblyState::Idle => None,
            ReassemblyState::Receiving { expected, mut buf } => {
                buf.extend_from_slice(datagram);
                if buf.len() < expected {
                    self.state = ReassemblyState::Receiving { expected, buf };
                } else if buf.len() == expected {
                    self.state = ReassemblyState::AwaitingStop { buf };
                }
                // Overrun means chunk boundaries did not line up with the
                // declared length; the transfer is dropped.
                None
            }
            // The stop marker is the integrity signal: anything else in its
            // place drops the transfer.
            ReassemblyState::AwaitingStop { buf } => {
                if datagram == IMAGE_STOP_MAGIC {
                    Some(buf)
                } else {
                    None
                }
            }
        }
    }
}

impl Default for ImageReassembler {
    fn default() -> Self {
        Self::new()
    }
}
