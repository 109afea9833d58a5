//! Response definitions

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Conflict = 0x03,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            0x03 => Some(Status::Conflict),
            _ => None,
        }
    }
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,

    /// Value for GET, encoded pairs for SCAN, message for ERROR / CONFLICT
    pub payload: Option<Vec<u8>>,
}

impl Response {
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    pub fn conflict(message: &str) -> Self {
        Self {
            status: Status::Conflict,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Payload as text, for ERROR and CONFLICT replies
    pub fn message(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}
