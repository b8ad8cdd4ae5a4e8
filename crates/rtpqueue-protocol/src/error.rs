//! Error types for the protocol layer.
//!
//! Each crate in rtpqueue defines its own error enum. A `ProtocolError`
//! always means user-supplied text could not be turned into one of the
//! shared value types; it never describes queue state.

/// Errors that can occur while parsing protocol values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A destination name was empty or only whitespace.
    #[error("destination name must not be empty")]
    EmptyDestination,

    /// A participant identifier could not be parsed.
    ///
    /// Accepted forms are a bare number (`42`) or the display form (`P-42`).
    #[error("invalid participant id: {0}")]
    InvalidParticipant(String),
}
