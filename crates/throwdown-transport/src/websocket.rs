//! WebSocket transport served through `axum`.
//!
//! Every request on the port lands in one fallback handler. Upgrade
//! requests become [`WebSocketConnection`]s queued for
//! [`accept`](Transport::accept); any other request is a health check and
//! gets [`HEALTH_RESPONSE`] back as plain text.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Body of the reply to any request that is not a WebSocket upgrade.
pub const HEALTH_RESPONSE: &str = "Throwdown server is running!";

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A request has this long to produce its response; for upgrades that
/// covers the handshake up to `101 Switching Protocols`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upgraded connections waiting for `accept()`.
const ACCEPT_BACKLOG: usize = 128;

/// A WebSocket [`Transport`] backed by an axum HTTP server.
///
/// The server runs in a background task and hyper gives every TCP
/// connection its own task, so a slow client never stalls the others.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<WebSocketConnection>,
    server: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Binds the listener and starts serving HTTP on it.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let bind_failed = |source| TransportError::BindFailed {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_failed)?;
        let local_addr = listener.local_addr().map_err(bind_failed)?;

        let (ready, incoming) = mpsc::channel(ACCEPT_BACKLOG);
        let app = Router::new()
            .fallback(serve_request)
            .with_state(ready)
            .layer(TimeoutLayer::new(HANDSHAKE_TIMEOUT))
            .layer(TraceLayer::new_for_http());

        let server = tokio::spawn(async move {
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!(error = %e, "HTTP server stopped");
            }
        });
        tracing::info!(%local_addr, "WebSocket transport listening");

        Ok(Self {
            local_addr,
            incoming,
            server,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.incoming.recv().await.ok_or(TransportError::Shutdown)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.server.abort();
        tracing::info!(local_addr = %self.local_addr, "WebSocket transport stopped");
        Ok(())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Upgrades WebSocket handshakes and answers everything else as a health check.
///
/// Only requests that never asked for an upgrade get the health reply; a
/// broken handshake (bad version, missing key) gets axum's rejection.
async fn serve_request(
    State(ready): State<mpsc::Sender<WebSocketConnection>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => ws
            .on_failed_upgrade(move |e| {
                tracing::debug!(%peer, error = %e, "WebSocket upgrade failed");
            })
            .on_upgrade(move |socket| hand_off(socket, peer, ready)),
        Err(
            WebSocketUpgradeRejection::MethodNotGet(_)
            | WebSocketUpgradeRejection::InvalidConnectionHeader(_),
        ) => {
            tracing::debug!(%peer, "answered plain HTTP health check");
            HEALTH_RESPONSE.into_response()
        }
        Err(rejection) => {
            tracing::debug!(%peer, error = %rejection, "WebSocket handshake rejected");
            rejection.into_response()
        }
    }
}

async fn hand_off(socket: WebSocket, peer: SocketAddr, ready: mpsc::Sender<WebSocketConnection>) {
    let conn = WebSocketConnection::new(socket, peer);
    tracing::debug!(id = %conn.id, %peer, "accepted WebSocket connection");
    if ready.send(conn).await.is_err() {
        tracing::debug!(%peer, "transport closed during handshake");
    }
}

/// A single WebSocket connection.
///
/// The socket is split so that a task parked in [`recv`](Connection::recv)
/// never blocks a concurrent [`send`](Connection::send).
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
}

impl WebSocketConnection {
    fn new(ws: WebSocket, peer: SocketAddr) -> Self {
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        let (sink, stream) = ws.split();
        Self {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }

    /// Remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends UTF-8 payloads as text frames (what browser clients expect
    /// for JSON) and anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(std::io::Error::other(e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.to_vec())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::other(e)));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(std::io::Error::other(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
