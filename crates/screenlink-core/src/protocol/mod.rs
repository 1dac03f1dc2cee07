//! Protocol module containing the signaling envelopes and their codec.

pub mod codec;
pub mod messages;

pub use codec::{
    decode_pointer_frame, encode_pointer_frame, encode_server_message, parse_client_message,
    ProtocolError, POINTER_FRAME_LEN,
};
pub use messages::*;
