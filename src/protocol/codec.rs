//! OSC codec
//!
//! Encoding and decoding for the OSC-1.0 subset.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────┬──────────────────┬─────────────────────────┐
//! │ Address (padded) │ Typetags (padded)│     Arguments           │
//! └──────────────────┴──────────────────┴─────────────────────────┘
//! ```
//!
//! Every block is zero-padded to a 4-byte boundary. Ints and floats are
//! big-endian. The typetag string is `,` plus one letter per argument.
//!
//! Decoding is lenient: the peer is a trusted local process, so malformed
//! input (no NUL terminator, missing leading comma, unknown tag, truncated
//! argument data) decodes to the recovered address with empty args instead
//! of failing.

use bytes::{BufMut, BytesMut};

use super::{OscArg, OscMessage};

/// Bytes of zero padding needed to bring `len` up to a 4-byte boundary
fn pad4(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Append `s` as a NUL-terminated string padded to a 4-byte boundary
fn put_padded_str(buf: &mut BytesMut, s: &str) {
    let terminated_len = s.len() + 1;
    buf.put_slice(s.as_bytes());
    buf.put_bytes(0, 1 + pad4(terminated_len));
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a message to wire bytes
pub fn encode(msg: &OscMessage) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(msg.address.len() + 8 + msg.args.len() * 8);

    put_padded_str(&mut buf, &msg.address);

    let mut tags = String::with_capacity(msg.args.len() + 1);
    tags.push(',');
    for arg in &msg.args {
        tags.push(arg.type_tag());
    }
    put_padded_str(&mut buf, &tags);

    for arg in &msg.args {
        match arg {
            OscArg::Int(v) => buf.put_i32(*v),
            OscArg::Float(v) => buf.put_f32(*v),
            OscArg::Str(s) => put_padded_str(&mut buf, s),
        }
    }

    buf.to_vec()
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode wire bytes into a message.
///
/// Never fails; see the module docs for the leniency policy.
pub fn decode(data: &[u8]) -> OscMessage {
    // Address: everything up to the first NUL
    let Some(addr_nul) = data.iter().position(|&b| b == 0) else {
        // No terminator at all: treat the whole datagram as an address
        return OscMessage::bare(String::from_utf8_lossy(data).into_owned());
    };
    let address = String::from_utf8_lossy(&data[..addr_nul]).into_owned();

    // Address block size rounded up to a multiple of 4 (incl. terminator)
    let addr_block = (addr_nul + 4) & !3;
    if data.len() <= addr_block {
        return OscMessage::bare(address);
    }

    let args = decode_args(&data[addr_block..]).unwrap_or_default();
    OscMessage::new(address, args)
}

/// Parse the typetag block and argument data; `None` on any malformation
fn decode_args(data: &[u8]) -> Option<Vec<OscArg>> {
    if data.first() != Some(&b',') {
        return None;
    }
    let tags_nul = data.iter().position(|&b| b == 0)?;
    let tags = std::str::from_utf8(&data[1..tags_nul]).ok()?;
    let tags_block = (tags_nul + 4) & !3;

    let mut args = Vec::with_capacity(tags.len());
    let mut offset = tags_block;
    for tag in tags.chars() {
        match tag {
            'i' => {
                let raw: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
                args.push(OscArg::Int(i32::from_be_bytes(raw)));
                offset += 4;
            }
            'f' => {
                let raw: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
                args.push(OscArg::Float(f32::from_be_bytes(raw)));
                offset += 4;
            }
            's' => {
                let rel_nul = data.get(offset..)?.iter().position(|&b| b == 0)?;
                let s = String::from_utf8_lossy(&data[offset..offset + rel_nul]).into_owned();
                args.push(OscArg::Str(s));
                offset += (rel_nul + 4) & !3;
            }
            // Unsupported tag (blob, time tag, ...): give up on the args
            _ => return None,
        }
    }

    Some(args)
}
