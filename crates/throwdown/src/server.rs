//! `Server` builder and accept loop.
//!
//! This is the entry point for running a Throwdown server. It ties the
//! layers together: transport → protocol → router → lobby.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use throwdown_protocol::JsonCodec;
use throwdown_room::{CodeGenerator, Lobby, MatchConfig, RandomCodeGenerator};
use throwdown_transport::{Transport, TransportError, WebSocketTransport};

use crate::ThrowdownError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) lobby: Lobby,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,ignore
/// let server = Server::builder()
///     .bind("0.0.0.0:8080")
///     .match_config(MatchConfig { rounds_per_match: 5, ..Default::default() })
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    match_config: MatchConfig,
    codes: Option<Box<dyn CodeGenerator>>,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            match_config: MatchConfig::default(),
            codes: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets match length, reveal delay and room code settings.
    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// Replaces the OS-seeded room code generator.
    pub fn code_generator(mut self, codes: impl CodeGenerator) -> Self {
        self.codes = Some(Box::new(codes));
        self
    }

    /// Binds the listener and builds the lobby.
    pub async fn build(self) -> Result<Server, ThrowdownError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let codes = self
            .codes
            .unwrap_or_else(|| Box::new(RandomCodeGenerator::new()));

        let state = Arc::new(ServerState {
            lobby: Lobby::with_code_generator(self.match_config, codes),
            codec: JsonCodec,
        });

        Ok(Server { transport, state })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Throwdown server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct Server {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl Server {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// A handle to the lobby every connection talks to.
    pub fn lobby(&self) -> Lobby {
        self.state.lobby.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ThrowdownError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// On shutdown the listener is closed and pending round resolutions are
    /// cancelled. Connections already accepted keep their tasks until the
    /// peers hang up.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ThrowdownError> {
        tracing::info!(local_addr = %self.local_addr(), "Throwdown server running");
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(TransportError::Shutdown) => {
                        tracing::error!("listener stopped unexpectedly");
                        break Err(TransportError::Shutdown.into());
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        };

        self.transport.shutdown().await?;
        self.state.lobby.shutdown().await;
        result
    }
}
