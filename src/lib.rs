//! A SIP (RFC 3261, RFC 6026) call-control core: URI-set normalization,
//! request validation, proxy routing, stateless relay and the UAC client
//! transaction state machine. Everything this crate does not own —
//! parsing, transport, dialog state, extension dispatch and the upward
//! reply path — is consumed through the trait contracts in [`traits`].

pub mod call;
pub mod config;
pub mod error;
pub mod message;
pub mod normalize;
pub mod relay;
pub mod reply;
pub mod router;
pub mod traits;
pub mod transaction;
pub mod uac;
pub mod validate;

#[cfg(test)]
mod mock;

pub use call::{Call, CallHandle, Command};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use reply::ReplySpec;
pub use router::{RouteOpts, RouteOutcome};
pub use traits::{Collaborators, DialogHook, HookResult, ReplySink, RouteHookArgs, SendOpts, ServiceHook, Transport, UriParser};
pub use transaction::{Cancel, Origin, Status, Trans, TimerKind};
