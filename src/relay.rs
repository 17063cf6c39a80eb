//! Stateless Relay (§4.4): for requests proxied without retaining
//! per-request state, rewrites the R-URI and delegates to the transport
//! with a deterministic Via; for responses, strips the top Via and
//! returns the message per the next one down the stack.

use crate::call::Call;
use crate::message::{SipMsg, TransportKind, Uri};
use crate::router::{RouteOpts, RouteOutcome};
use crate::traits::{SendOpts, Transport};

/// Request path: `(req, uri, opts, call) -> noreply | reply`.
///
/// The (out-of-scope) UAC request builder's `proxy_make` step — setting
/// up a fresh Via, Contact, etc. in proxy mode — is assumed folded into
/// `transport.send_request` via [`SendOpts::stateless_via`], since that
/// builder is named only by contract in this spec.
pub async fn forward_request_stateless(
    mut req: SipMsg,
    uri: Option<Uri>,
    _opts: &RouteOpts,
    call: &mut Call,
    transport: &dyn Transport,
) -> RouteOutcome {
    let Some(uri) = uri else {
        return RouteOutcome::Reply(crate::reply::ReplySpec::TemporarilyUnavailable);
    };
    req.ruri = uri;

    let send_opts = SendOpts { stateless_via: true };
    match transport.send_request(&req, call, &send_opts).await {
        Ok(_) => RouteOutcome::NoReply,
        Err(err) => {
            log::warn!("stateless forward of {} failed: {err}", req.method());
            RouteOutcome::NoReply
        }
    }
}

/// Response path (§4.4 "Response path"). Returns `Ok(())` whether or not
/// the response was actually forwardable — every early exit here is a
/// deliberate, logged drop, not a hard failure.
pub async fn relay_response(resp: SipMsg, transport: &dyn Transport) -> crate::error::Result<()> {
    let code = resp.status_code().unwrap_or(0);
    if code < 101 {
        log::trace!("dropping unforwardable stateless response, code={code}");
        return Ok(());
    }

    if resp.via.len() < 2 {
        log::warn!("dropping stateless response with fewer than two Via headers");
        return Ok(());
    }

    let mut via = resp.via.clone();
    via.remove(0); // pop ours
    let next = via[0].clone();

    let ip = next
        .received
        .or_else(|| match &next.sent_by.host {
            crate::message::Host::Ip(ip) => Some(*ip),
            crate::message::Host::Domain(_) => None,
        })
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
    let port = next.rport.or(next.sent_by.port).unwrap_or(5060);

    let mut out = resp;
    out.via = via;
    out.nkport = Some(crate::message::NkPort {
        transport: next.transport,
        remote: std::net::SocketAddr::new(ip, port),
        // The original UAS-side socket can't reach the upstream client;
        // clearing `local` forces the transport to open/select a fresh
        // association rather than reuse it.
        local: None,
    });

    transport.send_response(&out, &SendOpts::default()).await
}
