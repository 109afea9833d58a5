//! Remote handle
//!
//! A [`KvStore`] that forwards every call to a backend server over TCP.
//! Connections are pooled per handle and reused across calls.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::client::{Connector, Endpoint, KvStore, Mutation, ReadCheck};
use crate::config::Config;
use crate::error::{ConsoleError, Result};
use crate::model::{KvPair, Mode};
use crate::protocol::{
    decode_pairs, read_response, write_command, Command, CommitRequest, Response, ScanRequest,
    Status,
};

/// Socket settings shared by every connection a handle opens
#[derive(Debug, Clone, Copy)]
struct SocketOptions {
    connect_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SocketOptions {
    fn dial(&self, addr: SocketAddr, timeout: Duration) -> Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        self.apply(&stream)?;
        Ok(stream)
    }

    /// Restore the per-request timeouts
    fn apply(&self, stream: &TcpStream) -> Result<()> {
        stream.set_read_timeout(non_zero(self.read_timeout))?;
        stream.set_write_timeout(non_zero(self.write_timeout))?;
        Ok(())
    }

    /// Cap both socket timeouts at `limit` (never unbounded)
    fn cap(&self, stream: &TcpStream, limit: Duration) -> Result<()> {
        let limit = limit.max(Duration::from_millis(1));
        let capped = |d: Duration| Some(non_zero(d).map_or(limit, |d| d.min(limit)));
        stream.set_read_timeout(capped(self.read_timeout))?;
        stream.set_write_timeout(capped(self.write_timeout))?;
        Ok(())
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d.is_zero() {
        None
    } else {
        Some(d)
    }
}

/// Handle onto one keyspace of a remote backend
pub struct RemoteStore {
    addr: SocketAddr,
    mode: Mode,
    options: SocketOptions,
    idle_tx: Sender<TcpStream>,
    idle_rx: Receiver<TcpStream>,
    closed: AtomicBool,
}

impl RemoteStore {
    fn new(addr: SocketAddr, mode: Mode, options: SocketOptions, pool_size: usize) -> Self {
        let (idle_tx, idle_rx) = bounded(pool_size.max(1));
        Self {
            addr,
            mode,
            options,
            idle_tx,
            idle_rx,
            closed: AtomicBool::new(false),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn checkout(&self) -> Result<TcpStream> {
        match self.idle_rx.try_recv() {
            Ok(stream) => Ok(stream),
            Err(_) => self.options.dial(self.addr, self.options.connect_timeout),
        }
    }

    fn checkin(&self, stream: TcpStream) {
        if self.closed.load(Ordering::SeqCst) {
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
        // Pool full: let the extra connection drop
        let _ = self.idle_tx.try_send(stream);
    }

    /// One request/response exchange
    fn call(&self, command: Command) -> Result<Response> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConsoleError::Closed);
        }

        let stream = self.checkout()?;
        let response = exchange(&stream, &command)?;

        // A connection that failed mid-exchange is never returned to the pool
        self.checkin(stream);
        Self::check_status(response)
    }

    fn check_status(response: Response) -> Result<Response> {
        match response.status {
            Status::Error => Err(ConsoleError::Backend(response.message())),
            Status::Conflict => Err(ConsoleError::Conflict(response.message())),
            _ => Ok(response),
        }
    }

    fn expect_ok(response: Response) -> Result<()> {
        match response.status {
            Status::Ok => Ok(()),
            other => Err(ConsoleError::Protocol(format!(
                "unexpected status {:?}",
                other
            ))),
        }
    }
}

fn exchange(stream: &TcpStream, command: &Command) -> Result<Response> {
    write_command(&mut BufWriter::new(stream), command)?;
    read_response(&mut BufReader::new(stream))
}

impl KvStore for RemoteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = self.call(Command::Get {
            mode: self.mode,
            key: key.to_vec(),
        })?;
        match response.status {
            Status::Ok => Ok(Some(response.payload.unwrap_or_default())),
            _ => Ok(None),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        Self::expect_ok(self.call(Command::Put {
            mode: self.mode,
            key: key.to_vec(),
            value: value.to_vec(),
        })?)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        Self::expect_ok(self.call(Command::Delete {
            mode: self.mode,
            key: key.to_vec(),
        })?)
    }

    fn scan(&self, start: &[u8], end: Option<&[u8]>, limit: usize) -> Result<Vec<KvPair>> {
        let response = self.call(Command::Scan {
            mode: self.mode,
            request: ScanRequest {
                start: start.to_vec(),
                end: end.map(<[u8]>::to_vec),
                limit: limit as u64,
            },
        })?;
        match response.payload {
            Some(payload) if response.status == Status::Ok => decode_pairs(&payload),
            _ => Err(ConsoleError::Protocol("SCAN reply without payload".to_string())),
        }
    }

    fn commit(&self, checks: &[ReadCheck], mutations: &[Mutation]) -> Result<()> {
        Self::expect_ok(self.call(Command::Commit {
            mode: self.mode,
            request: CommitRequest {
                checks: checks.to_vec(),
                mutations: mutations.to_vec(),
            },
        })?)
    }

    fn ping(&self) -> Result<()> {
        Self::expect_ok(self.call(Command::Ping)?)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        while let Ok(stream) = self.idle_rx.try_recv() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        tracing::debug!("Closed {} handle to {}", self.mode, self.addr);
    }
}

/// Opens [`RemoteStore`] handles, trying endpoints in order
#[derive(Debug, Clone)]
pub struct TcpConnector {
    read_timeout: Duration,
    write_timeout: Duration,
    pool_size: usize,
}

impl TcpConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            pool_size: config.pool_size,
        }
    }

    /// Dial and ping one address, all before `deadline`
    fn open(&self, addr: SocketAddr, mode: Mode, deadline: Instant) -> Result<RemoteStore> {
        let timeout = remaining(deadline)?;
        let options = SocketOptions {
            connect_timeout: timeout,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        };
        let first = options.dial(addr, timeout)?;

        options.cap(&first, remaining(deadline)?)?;
        let reply = exchange(&first, &Command::Ping)?;
        RemoteStore::expect_ok(RemoteStore::check_status(reply)?)?;
        options.apply(&first)?;

        let store = RemoteStore::new(addr, mode, options, self.pool_size);
        store.checkin(first);
        Ok(store)
    }
}

fn remaining(deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(ConsoleError::Connect("timed out".to_string()));
    }
    Ok(left)
}

/// Resolve `endpoint`, giving up at `deadline`.
///
/// IP literals resolve inline; host names resolve on a helper thread that is
/// abandoned if the lookup outlives the deadline.
fn resolve(endpoint: &Endpoint, deadline: Instant) -> Result<Vec<SocketAddr>> {
    if let Ok(addr) = endpoint.as_str().parse::<SocketAddr>() {
        return Ok(vec![addr]);
    }

    let (tx, rx) = bounded(1);
    let host = endpoint.as_str().to_string();
    thread::Builder::new()
        .name("kvconsole-resolve".to_string())
        .spawn(move || {
            let result = host.to_socket_addrs().map(|addrs| addrs.collect::<Vec<_>>());
            let _ = tx.send(result);
        })?;

    match rx.recv_timeout(remaining(deadline)?) {
        Ok(result) => Ok(result?),
        Err(RecvTimeoutError::Timeout) => {
            Err(ConsoleError::Connect("name resolution timed out".to_string()))
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(ConsoleError::Connect("name resolution failed".to_string()))
        }
    }
}

impl Connector for TcpConnector {
    fn connect(
        &self,
        endpoints: &[Endpoint],
        mode: Mode,
        timeout: Duration,
    ) -> Result<Arc<dyn KvStore>> {
        let deadline = Instant::now() + timeout;
        let mut failures = Vec::new();

        for endpoint in endpoints {
            if Instant::now() >= deadline {
                failures.push(format!("{}: timed out", endpoint));
                break;
            }
            let addrs = match resolve(endpoint, deadline) {
                Ok(addrs) => addrs,
                Err(e) => {
                    failures.push(format!("{}: {}", endpoint, e));
                    continue;
                }
            };

            for addr in addrs {
                if Instant::now() >= deadline {
                    failures.push(format!("{}: timed out", endpoint));
                    break;
                }
                match self.open(addr, mode, deadline) {
                    Ok(store) => {
                        tracing::debug!("Opened {} handle to {}", mode, addr);
                        return Ok(Arc::new(store));
                    }
                    Err(e) => failures.push(format!("{} ({}): {}", endpoint, addr, e)),
                }
            }
        }

        Err(ConsoleError::Connect(format!(
            "no reachable endpoint: {}",
            failures.join("; ")
        )))
    }
}
