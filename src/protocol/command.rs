//! Command definitions

use serde::{Deserialize, Serialize};

use crate::client::{Mutation, ReadCheck};
use crate::error::{ConsoleError, Result};
use crate::model::Mode;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    Ping = 0x04,
    Scan = 0x05,
    Commit = 0x06,
}

/// Bounded range read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
    pub limit: u64,
}

/// Conditional atomic write set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub checks: Vec<ReadCheck>,
    pub mutations: Vec<Mutation>,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { mode: Mode, key: Vec<u8> },
    Put { mode: Mode, key: Vec<u8>, value: Vec<u8> },
    Delete { mode: Mode, key: Vec<u8> },
    Ping,
    Scan { mode: Mode, request: ScanRequest },
    Commit { mode: Mode, request: CommitRequest },
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Put { .. } => CommandType::Put,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
            Command::Scan { .. } => CommandType::Scan,
            Command::Commit { .. } => CommandType::Commit,
        }
    }

    /// Keyspace the command targets, if any
    pub fn mode(&self) -> Option<Mode> {
        match self {
            Command::Get { mode, .. }
            | Command::Put { mode, .. }
            | Command::Delete { mode, .. }
            | Command::Scan { mode, .. }
            | Command::Commit { mode, .. } => Some(*mode),
            Command::Ping => None,
        }
    }
}

pub(crate) fn keyspace_byte(mode: Mode) -> u8 {
    match mode {
        Mode::Direct => 0x00,
        Mode::Transactional => 0x01,
    }
}

pub(crate) fn keyspace_from_byte(byte: u8) -> Result<Mode> {
    match byte {
        0x00 => Ok(Mode::Direct),
        0x01 => Ok(Mode::Transactional),
        other => Err(ConsoleError::Protocol(format!(
            "Unknown keyspace: 0x{:02x}",
            other
        ))),
    }
}
