//! Request Validator (§4.2): `Max-Forwards` decrement plus
//! `Proxy-Require`/`Path` extension checks.

use crate::message::{MsgClass, SipMethod, SipMsg};
use crate::reply::ReplySpec;
use crate::router::RouteOpts;

/// `check(req, opts) -> req' | fails` (§4.2). On success, returns the
/// request with `Max-Forwards` decremented. On failure, returns the
/// [`ReplySpec`] the caller should turn into an outgoing response.
pub fn check(mut req: SipMsg, opts: &RouteOpts) -> Result<SipMsg, ReplySpec> {
    match req.max_forwards {
        Some(0) => {
            if matches!(&req.class, MsgClass::Request(SipMethod::Options)) {
                return Err(ReplySpec::OptionsMaxForwards {
                    supported: req.supported_tokens(),
                    accept: req.headers.tokens("Accept"),
                    allow: req.headers.tokens("Allow"),
                });
            }
            return Err(ReplySpec::TooManyHops);
        }
        Some(mf) => {
            req.max_forwards = Some(mf - 1);
        }
        None => return Err(ReplySpec::InvalidRequest),
    }

    if opts.path && !req.supported_tokens().iter().any(|t| t.eq_ignore_ascii_case("path")) {
        return Err(ReplySpec::ExtensionRequired("path".into()));
    }

    Ok(req)
}
