//! # Throwdown
//!
//! A rock-paper-scissors matchmaking and session server.
//!
//! Browsers connect over WebSocket and exchange small JSON messages. Players
//! either ask to be paired with a stranger or share a room code with a
//! friend, then play a best-of-three match. The server is authoritative:
//! it collects both moves, waits a short reveal delay, judges the round and
//! tells each player the result from their own point of view.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use throwdown::prelude::*;
//!
//! # async fn run() -> Result<(), ThrowdownError> {
//! let server = Server::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! transport (bytes) → protocol (ClientMessage) → router → lobby (rooms)
//! ```

mod error;
mod handler;
pub mod router;
mod server;

pub use error::ThrowdownError;
pub use server::{Server, ServerBuilder};

/// Everything needed to embed or test the server.
pub mod prelude {
    pub use crate::{Server, ServerBuilder, ThrowdownError};
    pub use throwdown_protocol::{
        ClientMessage, Codec, JsonCodec, Move, PlayerSlot, RoomCode, ServerMessage, Winner,
    };
    pub use throwdown_room::{CodeGenerator, Lobby, MatchConfig, RandomCodeGenerator};
}
