//! Protocol Module
//!
//! Wire protocol between a remote console handle and a backend server.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! Responses use the same header with a status byte in place of the command.
//!
//! ### Commands
//! Every keyed command starts its payload with a keyspace byte
//! (0x00 direct, 0x01 transactional).
//! - 0x01: GET     - keyspace + key_len (4) + key
//! - 0x02: PUT     - keyspace + key_len (4) + key + value
//! - 0x03: DEL     - keyspace + key_len (4) + key
//! - 0x04: PING    - empty
//! - 0x05: SCAN    - keyspace + bincode(ScanRequest)
//! - 0x06: COMMIT  - keyspace + bincode(CommitRequest)
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR     (payload: message)
//! - 0x03: CONFLICT  (payload: message)
//!
//! A SCAN reply carries `bincode(Vec<(key, value)>)`.

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, CommitRequest, ScanRequest};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_pairs, decode_response, encode_command, encode_pairs,
    encode_response, read_command, read_response, write_command, write_response, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
