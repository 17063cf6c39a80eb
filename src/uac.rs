//! UAC Response State Machine (§4.5): the heart of the engine. Ingests a
//! response plus the transaction it belongs to and advances the
//! transaction's status, firing timer changes, dialog callbacks, ACK
//! emissions, reply delivery and fork-hangup side effects along the way.

use std::sync::Arc;
use std::time::Instant;

use crate::call::Call;
use crate::error::Result;
use crate::message::{HeaderMap, MsgClass, SipMethod, SipMsg, TransId};
use crate::traits::{Collaborators, HookResult, SendOpts};
use crate::transaction::{Cancel, Origin, Status, TimerKind, Trans};

/// Advances `trans_id`'s transaction in `call` by one response, per
/// §4.5. Unknown transaction ids are silently ignored — the spec's
/// "every `(status, response)` pair has a defined behavior" promise only
/// covers known transactions.
pub async fn handle_response(
    response: SipMsg,
    trans_id: &TransId,
    call: &mut Call,
    collaborators: &Collaborators,
) -> Result<()> {
    let Some(mut trans) = call.trans.remove(trans_id) else {
        log::debug!("response for unknown transaction {trans_id}, dropping");
        return Ok(());
    };

    let resp = entry_preprocess(response, &mut trans, call, collaborators).await;
    let code = resp.status_code().unwrap_or(0);

    match trans.status {
        Status::InviteCalling => {
            trans.timers.cancel(TimerKind::Retransmission);
            trans.status = Status::InviteProceeding;
            invite_proceeding(resp, code, &mut trans, call, collaborators).await;
        }
        Status::InviteProceeding => invite_proceeding(resp, code, &mut trans, call, collaborators).await,
        Status::InviteAccepted => invite_accepted(resp, code, &mut trans, collaborators).await,
        Status::InviteCompleted => invite_completed(resp, code, &mut trans, collaborators).await,
        Status::Trying => {
            trans.timers.cancel(TimerKind::Retransmission);
            trans.status = Status::Proceeding;
            non_invite_proceeding(resp, code, &mut trans, call, collaborators).await;
        }
        Status::Proceeding => non_invite_proceeding(resp, code, &mut trans, call, collaborators).await,
        Status::Completed => completed(resp, &mut trans),
        Status::Finished => {
            log::trace!("dropping response for finished transaction {trans_id}");
        }
    }

    call.put_trans(trans);
    Ok(())
}

/// Entry pre-processing (§4.5 "Entry pre-processing"), run before
/// dispatching on the transaction's current status.
async fn entry_preprocess(
    response: SipMsg,
    trans: &mut Trans,
    call: &mut Call,
    collaborators: &Collaborators,
) -> SipMsg {
    // Step 1: synthesize a local 408 if the wall clock blew past trans_time.
    let resp = if trans.start.elapsed() > call.config.trans_time {
        let base = trans.request.as_ref().unwrap_or(&response);
        log::warn!("transaction {} exceeded trans_time, synthesizing 408", trans.id);
        base.synth_response(408, "Transaction Timeout")
    } else {
        response
    };

    let code1 = resp.status_code().unwrap_or(0);

    // Step 2: auth_update on 2xx.
    if (200..300).contains(&code1) {
        if let Err(err) = collaborators.dialog.auth_update(resp.dialog_id.as_ref(), &resp, call).await {
            log::warn!("auth_update failed for {}: {err}", trans.id);
        }
    }

    // Step 3: stash response/code on the transaction.
    trans.response = Some(resp.clone());
    trans.code = Some(code1);

    // Step 4: dialog_update, unless opted out or the request is already gone.
    if !trans.opts.no_dialog {
        if let Some(req) = trans.request.clone() {
            let is_proxy = matches!(trans.from, Origin::Fork(_));
            if let Err(err) = collaborators.dialog.update(&req, &resp, is_proxy, call).await {
                log::warn!("dialog_update failed for {}: {err}", trans.id);
            }
        }
    }

    // Step 5: remove_prov_event on final errors for event-subscribing methods.
    if code1 >= 300 && trans.method.is_event_method() {
        if let Some(req) = trans.request.clone() {
            if let Err(err) = collaborators.dialog.remove_prov_event(&req, call).await {
                log::warn!("remove_prov_event failed for {}: {err}", trans.id);
            }
        }
    }

    // Step 6: message log.
    call.log_message(resp.msg_id.clone(), resp.trans_id.clone(), resp.dialog_id.clone());

    resp
}

/// Runs the `nksip_uac_response` hook, returning the (possibly
/// rewritten) response the caller should go on to use. A silent `Ok`
/// short-circuit keeps the original response — this core has nothing
/// further to do with a bare `ok` from this particular hook.
async fn run_uac_response_hook(resp: SipMsg, trans: &Trans, call: &mut Call, collaborators: &Collaborators) -> SipMsg {
    match collaborators.service.nksip_uac_response(resp.clone(), trans, call).await {
        HookResult::Continue(resp) => resp,
        HookResult::Reply(_) | HookResult::Ok => resp,
    }
}

async fn invite_proceeding(resp: SipMsg, code: u16, trans: &mut Trans, call: &mut Call, collaborators: &Collaborators) {
    if code < 200 {
        trans.timers.arm(TimerKind::TimerC, Instant::now() + call.config.timer_c);
        collaborators.reply_sink.reply(resp.clone(), trans, call).await;
        if trans.cancel == Cancel::ToCancel {
            initiate_cancel(trans, call, collaborators).await;
        }
        run_uac_response_hook(resp, trans, call, collaborators).await;
        return;
    }

    if (200..300).contains(&code) {
        collaborators.reply_sink.reply(resp.clone(), trans, call).await;
        trans.status = Status::InviteAccepted;
        trans.cancel = Cancel::None;
        trans.to_tags = to_tag(&resp).into_iter().collect();
        trans.response = None;
        trans.timers.cancel(TimerKind::Expire);
        trans.timers.arm(TimerKind::TimerM, Instant::now() + call.config.timer_m);
        if trans.opts.auto_2xx_ack {
            if let Some(dialog_id) = resp.dialog_id.clone() {
                if let Err(err) = collaborators.dialog.invoke(&dialog_id, SipMethod::Ack, &trans.opts).await {
                    log::warn!("auto_2xx_ack failed for {}: {err}", trans.id);
                }
            }
        }
        return;
    }

    // code >= 300
    if resp.is_local() {
        collaborators.reply_sink.reply(resp, trans, call).await;
        trans.status = Status::Finished;
        trans.timers.cancel(TimerKind::Timeout);
        trans.timers.cancel(TimerKind::Expire);
        return;
    }

    if let Some(request) = trans.request.as_mut() {
        if let Some(tag) = to_tag(&resp) {
            request.to.set_tag(tag);
        }
    }
    trans.to_tags = to_tag(&resp).into_iter().collect();
    trans.timers.cancel(TimerKind::Timeout);
    trans.timers.cancel(TimerKind::Expire);

    send_non_2xx_ack(trans, &resp, collaborators).await;

    if trans.transport.is_udp() {
        trans.status = Status::InviteCompleted;
        trans.timers.arm(TimerKind::TimerD, Instant::now() + call.config.timer_d);
    } else {
        trans.status = Status::Finished;
    }

    let final_resp = run_uac_response_hook(resp, trans, call, collaborators).await;
    collaborators.reply_sink.reply(final_resp, trans, call).await;
}

async fn invite_accepted(resp: SipMsg, code: u16, trans: &mut Trans, collaborators: &Collaborators) {
    if code < 200 {
        log::trace!("dropping provisional in invite_accepted for {}", trans.id);
        return;
    }

    if is_primary_tag(&resp, trans) {
        log::debug!("primary retransmission absorbed in invite_accepted for {}", trans.id);
        return;
    }

    received_hangup(resp, code, trans, collaborators).await;
}

async fn invite_completed(resp: SipMsg, code: u16, trans: &mut Trans, collaborators: &Collaborators) {
    if code < 200 {
        log::trace!("dropping provisional in invite_completed for {}", trans.id);
        return;
    }

    if is_primary_tag(&resp, trans) {
        if trans.code == Some(code) {
            send_non_2xx_ack(trans, &resp, collaborators).await;
        } else {
            log::debug!("ignoring mismatched-code retransmission for {}", trans.id);
        }
        return;
    }

    received_hangup(resp, code, trans, collaborators).await;
}

async fn non_invite_proceeding(resp: SipMsg, code: u16, trans: &mut Trans, call: &mut Call, collaborators: &Collaborators) {
    if code < 200 {
        collaborators.reply_sink.reply(resp, trans, call).await;
        return;
    }

    if resp.is_local() {
        collaborators.reply_sink.reply(resp, trans, call).await;
        trans.status = Status::Finished;
        trans.timers.cancel(TimerKind::Timeout);
        return;
    }

    trans.to_tags = to_tag(&resp).into_iter().collect();

    if trans.transport.is_udp() {
        trans.status = Status::Completed;
        trans.request = None;
        trans.response = None;
        trans.timers.arm(TimerKind::TimerK, Instant::now() + call.config.timer_k);
    } else {
        trans.status = Status::Finished;
        trans.timers.cancel(TimerKind::Timeout);
    }

    let final_resp = run_uac_response_hook(resp, trans, call, collaborators).await;
    collaborators.reply_sink.reply(final_resp, trans, call).await;
}

/// Non-INVITE `completed`: any further arrival either confirms a
/// retransmission of the primary response (logged, no further action) or
/// records a newly-seen secondary tag (appended, no further action —
/// §4.5 notes no SIP-level requirement mandates more than that).
fn completed(resp: SipMsg, trans: &mut Trans) {
    if is_primary_tag(&resp, trans) {
        log::trace!("ignoring non-INVITE retransmission for {}", trans.id);
        return;
    }
    if let Some(tag) = to_tag(&resp) {
        trans.record_tag(tag);
    }
}

fn to_tag(resp: &SipMsg) -> Option<Arc<str>> {
    resp.to.tag.clone()
}

fn is_primary_tag(resp: &SipMsg, trans: &Trans) -> bool {
    to_tag(resp).as_deref().map(|t| Some(t) == trans.primary_tag()).unwrap_or(false)
}

async fn send_non_2xx_ack(trans: &Trans, resp: &SipMsg, collaborators: &Collaborators) {
    let Some(request) = trans.request.as_ref() else {
        return;
    };
    let ack = build_ack(request, resp);
    if let Err(err) = collaborators.transport.resend_request(&ack, &SendOpts::default()).await {
        log::warn!("non-2xx ACK send failed for {}: {err}", trans.id);
    }
}

fn build_ack(request: &SipMsg, resp: &SipMsg) -> SipMsg {
    SipMsg {
        class: MsgClass::Request(SipMethod::Ack),
        ruri: request.ruri.clone(),
        from: request.from.clone(),
        to: resp.to.clone(),
        cseq: crate::message::CSeq {
            num: request.cseq.num,
            method: SipMethod::Ack,
        },
        call_id: request.call_id.clone(),
        via: request.via.clone(),
        max_forwards: request.max_forwards,
        expires: None,
        headers: HeaderMap::new(),
        body: None,
        msg_id: request.msg_id.clone(),
        trans_id: request.trans_id.clone(),
        dialog_id: resp.dialog_id.clone(),
        nkport: request.nkport.clone(),
    }
}

async fn initiate_cancel(trans: &mut Trans, call: &mut Call, collaborators: &Collaborators) {
    trans.cancel = Cancel::Cancelled;
    if let Some(request) = trans.request.clone() {
        let cancel = SipMsg {
            class: MsgClass::Request(SipMethod::Cancel),
            cseq: crate::message::CSeq {
                num: request.cseq.num,
                method: SipMethod::Cancel,
            },
            ..request
        };
        if let Err(err) = collaborators.transport.send_request(&cancel, call, &SendOpts::default()).await {
            log::warn!("CANCEL send failed for {}: {err}", trans.id);
        }
    }
}

/// Received-hangup (§4.5): a forked INVITE produced a second answerer
/// after the primary already reached a final outcome.
async fn received_hangup(resp: SipMsg, code: u16, trans: &mut Trans, collaborators: &Collaborators) {
    if let Some(tag) = to_tag(&resp) {
        trans.record_tag(tag);
    }

    if code < 300 {
        spawn_ack_then_bye(resp, trans, collaborators);
    } else {
        log::info!("secondary final error {code} on forked transaction {}, ignoring", trans.id);
    }
}

/// Spawns an independent task to ACK then BYE a secondary dialog. Must
/// not re-enter the owning call actor synchronously (§5) — the dialog
/// hook is reached through its own `Arc`, not through `call`.
fn spawn_ack_then_bye(resp: SipMsg, trans: &Trans, collaborators: &Collaborators) {
    let Some(dialog_id) = resp.dialog_id.clone() else {
        log::warn!("secondary 2xx with no dialog id on {}, cannot ACK/BYE", trans.id);
        return;
    };
    let dialog = collaborators.dialog.clone();
    let opts = trans.opts.clone();
    let trans_id = trans.id.clone();
    tokio::spawn(async move {
        if let Err(err) = dialog.invoke(&dialog_id, SipMethod::Ack, &opts).await {
            log::warn!("secondary-2xx ACK failed for {trans_id}: {err}");
        }
        if let Err(err) = dialog.invoke(&dialog_id, SipMethod::Bye, &opts).await {
            log::warn!("secondary-2xx BYE failed for {trans_id}: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::mock::{test_collaborators, test_invite_response, test_invite_trans};
    use crate::message::TransportKind;

    #[test_log::test(tokio::test(start_paused = true))]
    async fn scenario_f_invite_486_over_udp() {
        let mut call = Call::new("svc", crate::mock::test_config());
        let (collaborators, mocks) = test_collaborators();
        let trans = test_invite_trans("t1", TransportKind::Udp);
        let trans_id = trans.id.clone();
        call.put_trans(trans);

        let resp = test_invite_response(&trans_id, 486, "Busy Here", Some("tag1"), true);
        handle_response(resp, &trans_id, &mut call, &collaborators).await.unwrap();

        let trans = &call.trans[&trans_id];
        assert_matches!(trans.status, Status::InviteCompleted);
        assert!(trans.timers.is_armed(TimerKind::TimerD));
        assert_eq!(mocks.transport.resent.lock().unwrap().len(), 1);
        assert_eq!(mocks.reply_sink.delivered.lock().unwrap().len(), 1);
    }

    /// Scenario (g): a response arriving after `trans_time` is replaced
    /// by a synthesized 408 before anything else happens.
    #[tokio::test(start_paused = true)]
    async fn scenario_g_transaction_timeout_synthesizes_408() {
        let config = crate::config::EngineConfig::default();
        let mut call = Call::new("svc", Arc::new(config));
        let (collaborators, mocks) = test_collaborators();
        let mut trans = test_invite_trans("t1", TransportKind::Udp);
        trans.start = Instant::now() - (call.config.trans_time + std::time::Duration::from_secs(1));
        let trans_id = trans.id.clone();
        call.put_trans(trans);

        let resp = test_invite_response(&trans_id, 200, "OK", Some("tagX"), true);
        handle_response(resp, &trans_id, &mut call, &collaborators).await.unwrap();

        let delivered = mocks.reply_sink.delivered.lock().unwrap();
        assert_eq!(delivered.last().unwrap().status_code(), Some(408));
    }

    /// Scenario (e): 180 then a primary 200 then a forked 200.
    #[tokio::test(start_paused = true)]
    async fn scenario_e_invite_200_then_forked_200() {
        let mut call = Call::new("svc", crate::mock::test_config());
        let (collaborators, mocks) = test_collaborators();
        let trans = test_invite_trans("t1", TransportKind::Udp);
        let trans_id = trans.id.clone();
        call.put_trans(trans);

        let provisional = test_invite_response(&trans_id, 180, "Ringing", None, true);
        handle_response(provisional, &trans_id, &mut call, &collaborators).await.unwrap();
        assert_matches!(call.trans[&trans_id].status, Status::InviteProceeding);

        let first_ok = test_invite_response(&trans_id, 200, "OK", Some("tag1"), true);
        handle_response(first_ok, &trans_id, &mut call, &collaborators).await.unwrap();
        assert_matches!(call.trans[&trans_id].status, Status::InviteAccepted);
        assert_eq!(call.trans[&trans_id].to_tags, vec![Arc::<str>::from("tag1")]);

        let forked_ok = test_invite_response(&trans_id, 200, "OK", Some("tag2"), true);
        handle_response(forked_ok, &trans_id, &mut call, &collaborators).await.unwrap();
        assert_eq!(
            call.trans[&trans_id].to_tags,
            vec![Arc::<str>::from("tag1"), Arc::<str>::from("tag2")]
        );

        tokio::task::yield_now().await;
        // Only the provisional and the primary 2xx go upward; the forked
        // 2xx does not (Testable Property 7).
        let delivered = mocks.reply_sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        let invoked = mocks.dialog.invoked.lock().unwrap();
        assert!(invoked.iter().any(|(_, m)| *m == SipMethod::Ack));
        assert!(invoked.iter().any(|(_, m)| *m == SipMethod::Bye));
    }

    /// Testable Property 6: in `invite_accepted`, a primary-tag arrival
    /// produces no outward send and leaves state unchanged.
    #[tokio::test(start_paused = true)]
    async fn property_2xx_absorption() {
        let mut call = Call::new("svc", crate::mock::test_config());
        let (collaborators, mocks) = test_collaborators();
        let trans = test_invite_trans("t1", TransportKind::Udp);
        let trans_id = trans.id.clone();
        call.put_trans(trans);

        let first_ok = test_invite_response(&trans_id, 200, "OK", Some("tag1"), true);
        handle_response(first_ok, &trans_id, &mut call, &collaborators).await.unwrap();

        let retrans = test_invite_response(&trans_id, 200, "OK", Some("tag1"), true);
        handle_response(retrans, &trans_id, &mut call, &collaborators).await.unwrap();

        assert_eq!(call.trans[&trans_id].to_tags, vec![Arc::<str>::from("tag1")]);
        assert!(mocks.dialog.invoked.lock().unwrap().is_empty());
    }

    /// Testable Property 8: in `invite_completed`, a primary-tag
    /// retransmission with matching code re-emits exactly one ACK.
    #[test_log::test(tokio::test(start_paused = true))]
    async fn property_idempotent_retransmission_reacks() {
        let mut call = Call::new("svc", crate::mock::test_config());
        let (collaborators, mocks) = test_collaborators();
        let trans = test_invite_trans("t1", TransportKind::Udp);
        let trans_id = trans.id.clone();
        call.put_trans(trans);

        let busy = test_invite_response(&trans_id, 486, "Busy Here", Some("tag1"), true);
        handle_response(busy, &trans_id, &mut call, &collaborators).await.unwrap();
        assert_eq!(mocks.transport.resent.lock().unwrap().len(), 1);

        let retrans = test_invite_response(&trans_id, 486, "Busy Here", Some("tag1"), true);
        handle_response(retrans, &trans_id, &mut call, &collaborators).await.unwrap();
        assert_eq!(mocks.transport.resent.lock().unwrap().len(), 2);
        assert_eq!(call.trans[&trans_id].timers.armed_count(), 1);
    }
}
