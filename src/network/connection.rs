//! Connection Handler
//!
//! Serves one client connection against the backend keyspaces.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;

use crate::error::{ConsoleError, Result};
use crate::protocol::{encode_pairs, read_command, write_response, Command, Response};

use super::Backend;

/// Handles a single client connection
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    backend: Backend,
    peer_addr: String,
}

/// Errors that just mean the peer went away
fn is_disconnect(err: &ConsoleError) -> bool {
    matches!(
        err,
        ConsoleError::Io(e) if matches!(
            e.kind(),
            ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::NotConnected
        )
    )
}

impl Connection {
    pub fn new(stream: TcpStream, backend: Backend) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            backend,
            peer_addr,
        })
    }

    /// Serve commands until the client disconnects
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(e) if is_disconnect(&e) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received {:?} from {}", command.command_type(), self.peer_addr);
            let response = self.execute(command);

            if let Err(e) = self.send(response) {
                if is_disconnect(&e) {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent",
                        self.peer_addr
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    fn execute(&self, command: Command) -> Response {
        let result = match command {
            Command::Ping => Ok(Response::ok(None)),
            Command::Get { mode, key } => {
                self.backend.store(mode).get(&key).map(|value| match value {
                    Some(value) => Response::ok(Some(value)),
                    None => Response::not_found(),
                })
            }
            Command::Put { mode, key, value } => self
                .backend
                .store(mode)
                .put(&key, &value)
                .map(|_| Response::ok(None)),
            Command::Delete { mode, key } => self
                .backend
                .store(mode)
                .delete(&key)
                .map(|_| Response::ok(None)),
            Command::Scan { mode, request } => {
                let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
                self.backend
                    .store(mode)
                    .scan(&request.start, request.end.as_deref(), limit)
                    .and_then(|pairs| encode_pairs(&pairs))
                    .map(|payload| Response::ok(Some(payload)))
            }
            Command::Commit { mode, request } => self
                .backend
                .store(mode)
                .commit(&request.checks, &request.mutations)
                .map(|_| Response::ok(None)),
        };

        match result {
            Ok(response) => response,
            Err(ConsoleError::Conflict(msg)) => Response::conflict(&msg),
            Err(e) => Response::error(&e.to_string()),
        }
    }

    fn send(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
