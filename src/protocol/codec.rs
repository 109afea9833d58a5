//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol. See the module
//! docs in `protocol` for the frame layout.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ConsoleError, Result};
use crate::model::{KvPair, Mode};

use super::command::{keyspace_byte, keyspace_from_byte};
use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Split a complete frame into its tag byte and payload
fn unframe<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(ConsoleError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let tag = header.get_u8();
    let payload_len = checked_len(header.get_u32(), what)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(ConsoleError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }
    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

fn checked_len(len: u32, what: &str) -> Result<usize> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(ConsoleError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

/// Read one whole frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = checked_len(
        u32::from_be_bytes([header[1], header[2], header[3], header[4]]),
        what,
    )?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let mut payload = BytesMut::new();

    match command {
        Command::Get { mode, key } | Command::Delete { mode, key } => {
            payload.put_u8(keyspace_byte(*mode));
            payload.put_u32(key.len() as u32);
            payload.put_slice(key);
        }
        Command::Put { mode, key, value } => {
            payload.put_u8(keyspace_byte(*mode));
            payload.put_u32(key.len() as u32);
            payload.put_slice(key);
            payload.put_slice(value);
        }
        Command::Ping => {}
        Command::Scan { mode, request } => {
            payload.put_u8(keyspace_byte(*mode));
            payload.put_slice(&bincode::serialize(request)?);
        }
        Command::Commit { mode, request } => {
            payload.put_u8(keyspace_byte(*mode));
            payload.put_slice(&bincode::serialize(request)?);
        }
    }

    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(ConsoleError::Protocol(format!(
            "Command payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }
    Ok(frame(command.command_type() as u8, &payload))
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = unframe(bytes, "command")?;

    match cmd_type {
        t if t == CommandType::Ping as u8 => {
            if !payload.is_empty() {
                return Err(ConsoleError::Protocol(format!(
                    "PING command: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Ok(Command::Ping)
        }
        t if t == CommandType::Get as u8 => {
            let (mode, key, _) = decode_keyed(payload, "GET")?;
            Ok(Command::Get { mode, key })
        }
        t if t == CommandType::Put as u8 => {
            let (mode, key, value) = decode_keyed(payload, "PUT")?;
            Ok(Command::Put { mode, key, value })
        }
        t if t == CommandType::Delete as u8 => {
            let (mode, key, _) = decode_keyed(payload, "DELETE")?;
            Ok(Command::Delete { mode, key })
        }
        t if t == CommandType::Scan as u8 => {
            let (mode, body) = split_keyspace(payload, "SCAN")?;
            Ok(Command::Scan {
                mode,
                request: bincode::deserialize(body)?,
            })
        }
        t if t == CommandType::Commit as u8 => {
            let (mode, body) = split_keyspace(payload, "COMMIT")?;
            Ok(Command::Commit {
                mode,
                request: bincode::deserialize(body)?,
            })
        }
        _ => Err(ConsoleError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

fn split_keyspace<'a>(payload: &'a [u8], name: &str) -> Result<(Mode, &'a [u8])> {
    match payload.split_first() {
        Some((byte, rest)) => Ok((keyspace_from_byte(*byte)?, rest)),
        None => Err(ConsoleError::Protocol(format!(
            "{} command: missing keyspace",
            name
        ))),
    }
}

/// keyspace + key_len + key + trailing bytes (the value, for PUT)
fn decode_keyed(payload: &[u8], name: &str) -> Result<(Mode, Vec<u8>, Vec<u8>)> {
    let (mode, mut body) = split_keyspace(payload, name)?;

    if body.len() < 4 {
        return Err(ConsoleError::Protocol(format!(
            "{} command: missing key length",
            name
        )));
    }
    let key_len = body.get_u32() as usize;

    if body.len() < key_len {
        return Err(ConsoleError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            name,
            key_len,
            body.len()
        )));
    }
    let key = body[..key_len].to_vec();
    let rest = body[key_len..].to_vec();

    if name != "PUT" && !rest.is_empty() {
        return Err(ConsoleError::Protocol(format!(
            "{} command: {} trailing bytes",
            name,
            rest.len()
        )));
    }
    Ok((mode, key, rest))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    frame(response.status as u8, response.payload.as_deref().unwrap_or(&[]))
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = unframe(bytes, "response")?;

    let status = Status::from_byte(status_byte).ok_or_else(|| {
        ConsoleError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    // An empty GET value and "no payload" are the same on the wire; callers
    // treat an OK GET without payload as an empty value.
    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

/// Encode scan results for a SCAN reply
pub fn encode_pairs(pairs: &[KvPair]) -> Result<Vec<u8>> {
    let raw: Vec<(&[u8], &[u8])> = pairs
        .iter()
        .map(|p| (p.key.as_slice(), p.value.as_slice()))
        .collect();
    Ok(bincode::serialize(&raw)?)
}

/// Decode a SCAN reply payload
pub fn decode_pairs(payload: &[u8]) -> Result<Vec<KvPair>> {
    let raw: Vec<(Vec<u8>, Vec<u8>)> = bincode::deserialize(payload)?;
    Ok(raw.into_iter().map(|(key, value)| KvPair { key, value }).collect())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader, "command")?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command)?)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader, "response")?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
