//! Protocol module: message types, the line-frame codec, and per-connection
//! reassembly of chunked transport reads.

pub mod codec;
pub mod line_buffer;
pub mod messages;

pub use codec::{decode_line, encode_frame, ProtocolError};
pub use line_buffer::LineBuffer;
pub use messages::*;
