//! Proxy Router (§4.3): orchestrates the normalizer, the validator and
//! the `nksip_route` service hook, then classifies the request as a
//! stateful fork or a stateless forward.

use crate::call::Call;
use crate::message::{SipMethod, SipMsg, UriSet};
use crate::normalize::{self, NormalizeInput};
use crate::relay;
use crate::reply::ReplySpec;
use crate::traits::{Collaborators, HookResult, RouteHookArgs};
use crate::validate;

/// Per-request routing options (the `opts` threaded through §4.2–§4.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOpts {
    /// Proxy this request statelessly rather than forking a transaction.
    pub stateless: bool,
    /// The `path` extension is required (§4.2 rule 5).
    pub path: bool,
    /// Skip the `dialog_update` hook on response arrival (§4.5 entry
    /// pre-processing step 4).
    pub no_dialog: bool,
    /// Auto-ACK a 2xx via the dialog subsystem on first success (§4.5
    /// `invite_proceeding` with `code in [200,299]`).
    pub auto_2xx_ack: bool,
}

/// Return value of [`route`] (§4.3, §6) — the transaction manager uses
/// `Fork` to spawn child UAC transactions; the router itself never
/// spawns them. Stateless dispositions are resolved internally down to
/// `Reply`/`NoReply` since the relay's own request path is terminal.
#[derive(Debug)]
pub enum RouteOutcome {
    /// Fork the (validated) request over every URI in `uri_set`.
    Fork {
        /// The validated request, ready to be sent to each target.
        request: SipMsg,
        /// The destination set to fork over.
        uri_set: UriSet,
        /// Routing options in effect.
        opts: RouteOpts,
    },
    /// Short-circuit with this reply.
    Reply(ReplySpec),
    /// Nothing more to do (stateless forward succeeded, or a hook
    /// absorbed the request silently).
    NoReply,
}

/// `route(uri_list, opts, uas_trans, call) -> {fork, ...} | {reply, ...} | noreply` (§4.3).
///
/// `uas_request` plays the role the spec's `uas_trans` argument plays:
/// the inbound request context the validator and hook operate on. This
/// core has no in-scope UAS transaction type (the UAS machine is a
/// named Non-goal), so the "trans'" the spec returns alongside a fork is
/// represented here simply as the validated `SipMsg` the transaction
/// manager needs to spawn children from (see `DESIGN.md`).
pub async fn route(
    uri_list: NormalizeInput,
    opts: RouteOpts,
    uas_request: SipMsg,
    call: &mut Call,
    collaborators: &Collaborators,
) -> RouteOutcome {
    let uri_set = normalize::normalize(uri_list, collaborators.parser.as_ref());
    if is_empty_set(&uri_set) {
        return RouteOutcome::Reply(ReplySpec::TemporarilyUnavailable);
    }

    let args = RouteHookArgs {
        uri_set,
        opts,
        request: uas_request,
    };
    let RouteHookArgs { uri_set, opts, request } =
        match collaborators.service.nksip_route(args, call).await {
            HookResult::Continue(args) => args,
            HookResult::Reply(spec) => return RouteOutcome::Reply(spec),
            HookResult::Ok => return RouteOutcome::NoReply,
        };

    let checked = match validate::check(request, &opts) {
        Ok(req) => req,
        Err(spec) => return RouteOutcome::Reply(spec),
    };

    if *checked.method() == SipMethod::Ack {
        return if opts.stateless {
            relay::forward_request_stateless(checked, first_uri(&uri_set), &opts, call, collaborators.transport.as_ref()).await
        } else {
            RouteOutcome::Fork {
                request: checked,
                uri_set,
                opts,
            }
        };
    }

    let proxy_require = checked.proxy_require_tokens();
    if !proxy_require.is_empty() {
        return RouteOutcome::Reply(ReplySpec::BadExtension(proxy_require.join(", ")));
    }

    if opts.stateless {
        return relay::forward_request_stateless(checked, first_uri(&uri_set), &opts, call, collaborators.transport.as_ref()).await;
    }

    RouteOutcome::Fork {
        request: checked,
        uri_set,
        opts,
    }
}

fn is_empty_set(uri_set: &UriSet) -> bool {
    uri_set.iter().all(|group| group.is_empty())
}

/// The first URI of the *first* parallel group (§4.3 step 5), not the
/// first URI across the whole set — a uri_set like `[[], [UriA]]` (an
/// unparsable leading serial step followed by a real one) must not fall
/// through to `UriA`.
fn first_uri(uri_set: &UriSet) -> Option<crate::message::Uri> {
    uri_set.first()?.first().cloned()
}
