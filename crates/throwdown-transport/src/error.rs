use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not listen on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Writing a frame to the peer failed, or the socket is already closed.
    #[error("websocket send failed: {0}")]
    SendFailed(#[source] io::Error),

    /// Reading from the peer failed; the connection should be dropped.
    #[error("websocket receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// The listener is gone and no further connections will arrive.
    #[error("transport shut down")]
    Shutdown,
}
