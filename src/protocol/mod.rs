//! Protocol Module
//!
//! Defines the OSC-1.0 subset spoken on the wire.
//!
//! ## Message Format
//! ```text
//! ┌──────────────────┬──────────────────┬─────────────────────────┐
//! │ Address (padded) │ Typetags (padded)│     Arguments           │
//! └──────────────────┴──────────────────┴─────────────────────────┘
//! ```
//!
//! - Address: ASCII `/`-delimited pattern, NUL-terminated, zero-padded
//!   to a 4-byte boundary
//! - Typetags: `,` followed by one letter per argument, padded the same way
//! - Arguments, by tag:
//!   - `i`: int32, big-endian
//!   - `f`: float32, big-endian
//!   - `s`: NUL-terminated UTF-8, zero-padded to a 4-byte boundary
//!
//! Bundles, blobs, and time tags are not supported.

mod codec;
mod message;

pub use codec::{decode, encode};
pub use message::{OscArg, OscMessage};
