//! Codec failures.
//!
//! Transport and room problems live in their own crates; a `ProtocolError`
//! always means bytes and message types did not line up.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A server message could not be turned into JSON.
    #[cfg(feature = "json")]
    #[error("could not encode message: {0}")]
    Encode(serde_json::Error),

    /// The payload was not a recognizable client message: broken JSON,
    /// a `JOIN_ROOM` without `roomId`, or a `move` that is not rock,
    /// paper or scissors.
    #[cfg(feature = "json")]
    #[error("could not decode message: {0}")]
    Decode(serde_json::Error),
}
