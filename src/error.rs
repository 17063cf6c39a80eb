//! Crate-wide error type.
//!
//! Hard Rust-level errors only — policy outcomes (`too_many_hops`,
//! `bad_extension`, ...) are values ([`crate::reply::ReplySpec`]), not
//! errors, since every one of them is an expected, total outcome of routing.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the transport, dialog and service collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport layer rejected or failed to deliver a message.
    #[error("transport error: {0}")]
    Transport(String),

    /// A dialog-subsystem hook (`dialog_update`, `auth_update`, ...) failed.
    #[error("dialog hook error: {0}")]
    Dialog(String),

    /// A service hook (`nksip_route`, `nksip_uac_response`) failed.
    #[error("service hook error: {0}")]
    Service(String),

    /// No transport handle was available to send a request or response on.
    #[error("no transport available for destination")]
    NoTransport,

    /// A response's Via stack did not have enough entries to route it.
    #[error("malformed Via stack: {0}")]
    MalformedVia(&'static str),

    /// The call actor's command channel was closed.
    #[error("call actor channel closed")]
    ChannelClosed,

    /// Generic I/O failure bubbled up from a collaborator.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
