use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::buffered::PeekedStream;
use crate::error::{BindError, DemuxError};
use crate::listener::VirtualListener;

/// Default time budget for peeking a request's headers before giving up.
pub const DEFAULT_PEEK_TIMEOUT: Duration = Duration::from_millis(100);

/// Cap on buffered header bytes before a connection is declared malformed.
const MAX_PEEK_BYTES: usize = 8 * 1024;

/// Backlog depth of each per-vhost virtual listener's accept queue.
const VHOST_BACKLOG: usize = 64;

type ErrorEvent = (Option<PeekedStream>, DemuxError);

pub(crate) struct Inner {
    bindings: RwLock<HashMap<String, mpsc::Sender<PeekedStream>>>,
    timeout: Duration,
    error_tx: mpsc::UnboundedSender<ErrorEvent>,
    error_rx: AsyncMutex<mpsc::UnboundedReceiver<ErrorEvent>>,
    closed: AtomicBool,
}

impl Inner {
    pub(crate) async fn unbind(self_arc: &Arc<Inner>, name: &str) {
        self_arc.bindings.write().await.remove(name);
    }
}

/// Accepts raw TCP connections on a single public listener and routes each
/// one, by its `Host` header, to the [`VirtualListener`] registered under
/// that exact name.
#[derive(Clone)]
pub struct Demuxer(Arc<Inner>);

impl Demuxer {
    /// Binds `addr` and spawns the demuxer's acceptor task. Returns the
    /// demuxer handle, the actual bound address, and the task's join handle.
    pub async fn listen(
        addr: impl tokio::net::ToSocketAddrs,
        timeout: Duration,
    ) -> io::Result<(Self, std::net::SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let demuxer = Demuxer(Arc::new(Inner {
            bindings: RwLock::new(HashMap::new()),
            timeout,
            error_tx,
            error_rx: AsyncMutex::new(error_rx),
            closed: AtomicBool::new(false),
        }));
        let handle = tokio::spawn(accept_loop(demuxer.clone(), listener));
        Ok((demuxer, local_addr, handle))
    }

    /// Reserves `name` on the demuxer, returning the virtual listener that
    /// will receive connections whose `Host` header matches it exactly.
    pub async fn bind(&self, name: &str) -> Result<VirtualListener, BindError> {
        let mut bindings = self.0.bindings.write().await;
        if self.0.closed.load(Ordering::SeqCst) {
            return Err(BindError::Closed);
        }
        if bindings.contains_key(name) {
            return Err(BindError::AlreadyBound(name.to_string()));
        }
        let (tx, rx) = mpsc::channel(VHOST_BACKLOG);
        bindings.insert(name.to_string(), tx);
        Ok(VirtualListener::new(
            name.to_string(),
            rx,
            Arc::downgrade(&self.0),
        ))
    }

    /// Blocking (async) drain of the next demux failure.
    pub async fn next_error(&self) -> (Option<PeekedStream>, DemuxError) {
        let mut rx = self.0.error_rx.lock().await;
        rx.recv()
            .await
            .expect("error_tx is held by this Demuxer's Arc and never dropped while it's alive")
    }

    /// Stops accepting and releases every name binding. Queued connections
    /// on still-open virtual listeners are discarded when those listeners
    /// next try to receive.
    pub async fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
        self.0.bindings.write().await.clear();
    }

    fn emit_error(&self, conn: Option<PeekedStream>, err: DemuxError) {
        let _ = self.0.error_tx.send((conn, err));
    }
}

async fn accept_loop(demuxer: Demuxer, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, _remote_addr)) => {
                let demuxer = demuxer.clone();
                tokio::spawn(async move {
                    demuxer.route_connection(stream).await;
                });
            }
            Err(e) => {
                if demuxer.0.closed.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %e, "public listener accept error");
                demuxer.emit_error(None, DemuxError::OpError(e));
            }
        }
    }
}

enum ReadOutcome {
    Host(String),
    Malformed,
    Eof,
}

impl Demuxer {
    async fn route_connection(&self, stream: TcpStream) {
        let (conn, outcome) = peek_host(stream, self.0.timeout).await;
        match outcome {
            Ok(ReadOutcome::Host(host)) => self.dispatch(conn, host).await,
            Ok(ReadOutcome::Malformed) => self.emit_error(Some(conn), DemuxError::BadRequest),
            Ok(ReadOutcome::Eof) => self.emit_error(Some(conn), DemuxError::Closed),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                self.emit_error(Some(conn), DemuxError::BadRequest)
            }
            Err(e) => self.emit_error(Some(conn), DemuxError::OpError(e)),
        }
    }

    async fn dispatch(&self, conn: PeekedStream, host: String) {
        let sender = {
            let bindings = self.0.bindings.read().await;
            bindings.get(&host).cloned()
        };
        match sender {
            Some(tx) => {
                if let Err(e) = tx.send(conn).await {
                    debug!(vhost = %host, "vhost unbound while routing connection");
                    self.emit_error(Some(e.0), DemuxError::NotFound(host));
                }
            }
            None => self.emit_error(Some(conn), DemuxError::NotFound(host)),
        }
    }
}

/// Reads at most `timeout` worth of bytes looking for a complete HTTP
/// request line + header block, extracting the `Host` header. Returns the
/// stream wrapped so those bytes can be replayed by whoever serves it next.
async fn peek_host(
    stream: TcpStream,
    timeout: Duration,
) -> (PeekedStream, io::Result<ReadOutcome>) {
    let mut buffer: Vec<u8> = Vec::with_capacity(512);
    let mut scratch = [0u8; 1024];

    let result = tokio::time::timeout(timeout, async {
        loop {
            stream.readable().await?;
            match stream.try_read(&mut scratch) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(n) => {
                    buffer.extend_from_slice(&scratch[..n]);
                    match try_parse_host(&buffer) {
                        ParseProgress::Host(host) => return Ok(ReadOutcome::Host(host)),
                        ParseProgress::Malformed => return Ok(ReadOutcome::Malformed),
                        ParseProgress::Incomplete if buffer.len() >= MAX_PEEK_BYTES => {
                            return Ok(ReadOutcome::Malformed)
                        }
                        ParseProgress::Incomplete => continue,
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    })
    .await;

    let outcome = match result {
        Ok(inner) => inner,
        Err(_elapsed) => Err(io::Error::new(io::ErrorKind::TimedOut, "header peek timed out")),
    };
    (PeekedStream::new(stream, buffer), outcome)
}

enum ParseProgress {
    Incomplete,
    Host(String),
    Malformed,
}

fn try_parse_host(buf: &[u8]) -> ParseProgress {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(buf) {
        Ok(httparse::Status::Complete(_)) => {
            let host = req
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case("host"))
                .map(|h| {
                    String::from_utf8_lossy(h.value)
                        .split_whitespace()
                        .collect::<String>()
                })
                .unwrap_or_default();
            ParseProgress::Host(host)
        }
        Ok(httparse::Status::Partial) => ParseProgress::Incomplete,
        Err(_) => ParseProgress::Malformed,
    }
}
