//! Contracts for the collaborators this core consumes but does not
//! implement: the message/URI parser, the transport layer, the dialog
//! subsystem, the service/extension dispatch hook, and the reply sink
//! that feeds responses to the application.
//!
//! Each is expressed as a trait, the same "mock fixture module colocated
//! with the production module" pattern this codebase's transaction layer
//! uses for its own tests — see [`crate::mock`] (test-only) for
//! implementations used by this crate's own test suite.

use std::sync::Arc;

use async_trait::async_trait;

use crate::call::Call;
use crate::error::Result;
use crate::message::{DialogId, SipMsg, Uri};
use crate::reply::ReplySpec;
use crate::router::RouteOpts;
use crate::transaction::Trans;

/// A service hook's decision: proceed with (possibly rewritten) args,
/// short-circuit with a reply, or short-circuit silently.
///
/// Mirrors `srv_invoke`'s three-way return (`{continue, args'}`,
/// `{reply, spec, call'}`, `{ok, call'}`) — the `call'` half of the
/// latter two is expressed here as "the hook already mutated `call`
/// in place", since Rust's `&mut Call` makes the functional
/// return-a-new-call idiom redundant (see `DESIGN.md`).
#[derive(Debug)]
pub enum HookResult<T> {
    /// Proceed, using the (possibly modified) value.
    Continue(T),
    /// Short-circuit with this reply.
    Reply(ReplySpec),
    /// Short-circuit silently.
    Ok,
}

/// Pure leaf dependency: turns a byte string into the `Uri`s it names.
/// Never fails loudly — a parse failure at this layer is communicated as
/// an empty result, which the normalizer (§4.1) treats as "nothing here".
pub trait UriParser: Send + Sync {
    /// Parses zero or more URIs out of `input`.
    fn parse_uris(&self, input: &[u8]) -> Vec<Uri>;
}

/// Arguments threaded through the `nksip_route` hook.
#[derive(Debug, Clone)]
pub struct RouteHookArgs {
    /// The normalized destination set.
    pub uri_set: crate::message::UriSet,
    /// Routing options in effect.
    pub opts: RouteOpts,
    /// The request being routed.
    pub request: SipMsg,
}

/// Service/extension dispatch hook. This core calls exactly two hooks:
/// `nksip_route` (proxy routing, §4.3) and `nksip_uac_response` (every
/// UAC response dispatch point, §4.5).
#[async_trait]
pub trait ServiceHook: Send + Sync {
    /// Consulted once per `route` call, before validation.
    async fn nksip_route(&self, args: RouteHookArgs, call: &mut Call) -> HookResult<RouteHookArgs>;

    /// Consulted at each UAC response dispatch point named in §4.5.
    async fn nksip_uac_response(&self, resp: SipMsg, trans: &Trans, call: &mut Call) -> HookResult<SipMsg>;
}

/// The dialog subsystem, named only by contract (out of scope: dialog
/// state maintenance itself).
#[async_trait]
pub trait DialogHook: Send + Sync {
    /// `dialog_update(req, resp, is_proxy, call)`.
    async fn update(&self, req: &SipMsg, resp: &SipMsg, is_proxy: bool, call: &mut Call) -> Result<()>;

    /// `auth_update(dialog_id, resp, call)`.
    async fn auth_update(&self, dialog_id: Option<&DialogId>, resp: &SipMsg, call: &mut Call) -> Result<()>;

    /// `remove_prov_event(req, call)`.
    async fn remove_prov_event(&self, req: &SipMsg, call: &mut Call) -> Result<()>;

    /// `dialog_invoke(dialog_id, method, opts)` — used for the secondary-2xx
    /// ACK/BYE hangup (§4.5 Received-hangup).
    async fn invoke(&self, dialog_id: &DialogId, method: crate::message::SipMethod, opts: &RouteOpts) -> Result<()>;
}

/// Options the transport layer needs per-send beyond the message itself.
#[derive(Debug, Clone, Default)]
pub struct SendOpts {
    /// Tells the transport to insert/expect a Via whose branch is
    /// deterministic from the message, so a stateless response can be
    /// matched back to this send without retained state.
    pub stateless_via: bool,
}

/// The transport layer, named only by contract.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `send_request(req, call, opts) -> {ok, sent_req} | {error, reason}`.
    async fn send_request(&self, req: &SipMsg, call: &mut Call, opts: &SendOpts) -> Result<SipMsg>;

    /// `resend_request(msg, opts) -> {ok, _} | {error, _}` — used to
    /// re-pass an ACK (or a retransmitted request) to the wire.
    async fn resend_request(&self, msg: &SipMsg, opts: &SendOpts) -> Result<()>;

    /// `send_response(resp, opts) -> {ok, _} | {error, _}`.
    async fn send_response(&self, resp: &SipMsg, opts: &SendOpts) -> Result<()>;
}

/// Feeds responses (and the synthesized replies the router/validator
/// produce) up to the application. `reply(resp_event, trans, call)`.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Delivers `resp` upward, in the context of `trans` and `call`.
    async fn reply(&self, resp: SipMsg, trans: &Trans, call: &Call);
}

/// The bundle of collaborators the UAC state machine and the router need.
/// Bundled into one value so call sites don't have to thread five
/// parameters through every function.
pub struct Collaborators {
    /// Pure URI parser.
    pub parser: Arc<dyn UriParser>,
    /// Transport layer.
    pub transport: Arc<dyn Transport>,
    /// Dialog subsystem.
    pub dialog: Arc<dyn DialogHook>,
    /// Service/extension dispatch hook.
    pub service: Arc<dyn ServiceHook>,
    /// Reply sink.
    pub reply_sink: Arc<dyn ReplySink>,
}
