//! TCP Server
//!
//! Accepts connections and serves each one on its own thread.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;

use super::{Backend, Connection};

/// How often the accept loop checks for shutdown
const ACCEPT_POLL: Duration = Duration::from_millis(10);

type LiveConnections = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server exposing a [`Backend`]
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    backend: Backend,
    shutdown: Arc<AtomicBool>,
    live: LiveConnections,
    next_conn_id: AtomicU64,
}

impl Server {
    /// Bind to `addr`. Port 0 picks a free port; see [`local_addr`](Self::local_addr).
    pub fn bind<A: ToSocketAddrs>(addr: A, backend: Backend) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            backend,
            shutdown: Arc::new(AtomicBool::new(false)),
            live: Arc::new(Mutex::new(HashMap::new())),
            next_conn_id: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until [`shutdown`](Self::shutdown) is called (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.serve(stream) {
                        tracing::warn!("Failed to start connection for {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        let live: Vec<TcpStream> = self.live.lock().drain().map(|(_, s)| s).collect();
        for stream in live {
            let _ = stream.shutdown(Shutdown::Both);
        }
        tracing::info!("Server on {} stopped", self.local_addr);
        Ok(())
    }

    fn serve(&self, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.live.lock().insert(id, stream.try_clone()?);

        let mut connection = Connection::new(stream, self.backend.clone())?;
        let live = Arc::clone(&self.live);

        let spawned = thread::Builder::new()
            .name(format!("kvconsole-conn-{}", id))
            .spawn(move || {
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
                live.lock().remove(&id);
            });

        if let Err(e) = spawned {
            if let Some(stream) = self.live.lock().remove(&id) {
                let _ = stream.shutdown(Shutdown::Both);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Signal the accept loop to stop and drop every open connection
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Run on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let server = Arc::new(self);
        let runner = Arc::clone(&server);
        let join = thread::Builder::new()
            .name("kvconsole-server".to_string())
            .spawn(move || runner.run())?;

        Ok(ServerHandle {
            server,
            join: Some(join),
        })
    }
}

/// A server running on a background thread. Stops it on drop.
pub struct ServerHandle {
    server: Arc<Server>,
    join: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Stop the server and wait for the accept loop to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.server.shutdown();
        match self.join.take() {
            Some(join) => join.join().unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
