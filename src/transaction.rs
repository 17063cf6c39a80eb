//! Per-client-transaction state (§3, §4.5, §4.6): the record the UAC
//! response state machine rebuilds and reinserts on every response.

use std::sync::Arc;
use std::time::Instant;

use crate::message::{SipMethod, SipMsg, TransId, TransportKind};
use crate::router::RouteOpts;

/// Where a client transaction originated from: directly from the
/// application (`User`), or spawned as one branch of a stateful fork
/// (`Fork(parent_trans_id)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Originated directly from the application/UAC API.
    User,
    /// One branch of a fork spawned by the proxy router, naming the
    /// transaction it was forked from.
    Fork(TransId),
}

/// The cancellation intent on a transaction (§5 "Cancellation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cancel {
    /// No cancellation requested.
    #[default]
    None,
    /// A CANCEL has been requested but not yet sent (waiting on a
    /// provisional response per RFC 3261 §9.1).
    ToCancel,
    /// CANCEL has been sent.
    Cancelled,
}

/// Lifecycle status (§4.5). INVITE and non-INVITE transactions share the
/// `Finished` terminal state but otherwise walk disjoint state sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// INVITE: request sent, no response yet.
    InviteCalling,
    /// INVITE: at least one provisional response seen.
    InviteProceeding,
    /// INVITE: the primary 2xx has arrived (RFC 6026) — absorbing
    /// retransmissions and late forks.
    InviteAccepted,
    /// INVITE: a non-2xx final response has arrived over UDP and the ACK
    /// has been sent — absorbing retransmissions (`timer_d`).
    InviteCompleted,
    /// Non-INVITE: request sent, no response yet.
    Trying,
    /// Non-INVITE: at least one provisional response seen.
    Proceeding,
    /// Non-INVITE: a final response has arrived over UDP — absorbing
    /// retransmissions (`timer_k`).
    Completed,
    /// Terminal for either family. Further arrivals are silently dropped.
    Finished,
}

/// One timer kind (§4.6). Each has at most one live instance per
/// transaction; arming re-arms (replacing any previous deadline),
/// cancelling is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Request retransmission (UDP only).
    Retransmission,
    /// INVITE provisional guard.
    TimerC,
    /// Absorbs non-2xx final-response retransmissions.
    TimerD,
    /// Absorbs non-INVITE final-response retransmissions.
    TimerK,
    /// RFC 6026 2xx-absorb interval.
    TimerM,
    /// INVITE `Expires:` enforcement.
    Expire,
    /// Wall-clock transaction death.
    Timeout,
}

/// The armed/cancelled state of every timer kind a transaction can carry.
/// A `None` entry is "not armed"; `Some(deadline)` is "armed, firing at
/// `deadline`". The actor loop (`Call`) is what actually schedules a
/// `tokio::time::sleep_until` against these deadlines — this struct only
/// carries the bookkeeping the pure transition logic needs to enforce
/// "at most one armed instance per kind" (Testable Property 4).
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    retransmission: Option<Instant>,
    timer_c: Option<Instant>,
    timer_d: Option<Instant>,
    timer_k: Option<Instant>,
    timer_m: Option<Instant>,
    expire: Option<Instant>,
    timeout: Option<Instant>,
}

impl TimerSet {
    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<Instant> {
        match kind {
            TimerKind::Retransmission => &mut self.retransmission,
            TimerKind::TimerC => &mut self.timer_c,
            TimerKind::TimerD => &mut self.timer_d,
            TimerKind::TimerK => &mut self.timer_k,
            TimerKind::TimerM => &mut self.timer_m,
            TimerKind::Expire => &mut self.expire,
            TimerKind::Timeout => &mut self.timeout,
        }
    }

    /// Arms `kind` to fire at `deadline`, replacing any previous instance.
    pub fn arm(&mut self, kind: TimerKind, deadline: Instant) {
        *self.slot_mut(kind) = Some(deadline);
    }

    /// Cancels `kind`. A no-op if it wasn't armed.
    pub fn cancel(&mut self, kind: TimerKind) {
        *self.slot_mut(kind) = None;
    }

    /// Whether `kind` is currently armed.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    fn slot(&self, kind: TimerKind) -> Option<Instant> {
        match kind {
            TimerKind::Retransmission => self.retransmission,
            TimerKind::TimerC => self.timer_c,
            TimerKind::TimerD => self.timer_d,
            TimerKind::TimerK => self.timer_k,
            TimerKind::TimerM => self.timer_m,
            TimerKind::Expire => self.expire,
            TimerKind::Timeout => self.timeout,
        }
    }

    /// Count of currently-armed timers, for Testable Property 4.
    pub fn armed_count(&self) -> usize {
        [
            self.retransmission,
            self.timer_c,
            self.timer_d,
            self.timer_k,
            self.timer_m,
            self.expire,
            self.timeout,
        ]
        .iter()
        .filter(|t| t.is_some())
        .count()
    }
}

/// A single client transaction (§3).
#[derive(Debug, Clone)]
pub struct Trans {
    /// Transaction identifier (branch-derived, minted by the transport/
    /// transaction manager — out of scope here).
    pub id: TransId,
    /// The method this transaction carries.
    pub method: SipMethod,
    /// Transport class (drives UDP-only timer behavior).
    pub transport: TransportKind,
    /// Where this transaction originated from.
    pub from: Origin,
    /// Routing options in effect for this transaction.
    pub opts: RouteOpts,
    /// The outgoing request, while still needed for ACK construction.
    /// Cleared once a non-INVITE transaction enters `Completed`.
    pub request: Option<SipMsg>,
    /// The last response received, while still needed for duplicate
    /// detection. Cleared on entering `InviteAccepted` so a later
    /// retransmission-vs-fork distinction can be made purely from
    /// `to_tags`.
    pub response: Option<SipMsg>,
    /// The last response's status code.
    pub code: Option<u16>,
    /// Current lifecycle status.
    pub status: Status,
    /// When this transaction started (for the `trans_time` wall clock).
    pub start: Instant,
    /// Cancellation intent.
    pub cancel: Cancel,
    /// Distinct `To`-tags seen, in arrival order. The first is the
    /// primary branch; any later ones are forked/secondary responses.
    pub to_tags: Vec<Arc<str>>,
    /// Armed/cancelled timers.
    pub timers: TimerSet,
}

impl Trans {
    /// Creates a freshly-started transaction in its family's initial
    /// status (`InviteCalling` / `Trying`).
    pub fn new(
        id: TransId,
        method: SipMethod,
        transport: TransportKind,
        from: Origin,
        opts: RouteOpts,
        request: SipMsg,
    ) -> Self {
        let status = if method == SipMethod::Invite {
            Status::InviteCalling
        } else {
            Status::Trying
        };
        Self {
            id,
            method,
            transport,
            from,
            opts,
            request: Some(request),
            response: None,
            code: None,
            status,
            start: Instant::now(),
            cancel: Cancel::None,
            to_tags: Vec::new(),
            timers: TimerSet::default(),
        }
    }

    /// `true` for an INVITE transaction.
    pub fn is_invite(&self) -> bool {
        self.method == SipMethod::Invite
    }

    /// The primary (first-seen) `To`-tag, if any response has arrived.
    pub fn primary_tag(&self) -> Option<&str> {
        self.to_tags.first().map(AsRef::as_ref)
    }

    /// `true` if `tag` is a tag we've already recorded.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.to_tags.iter().any(|t| t.as_ref() == tag)
    }

    /// Records `tag` if it is not already present. Returns `true` if it
    /// was newly added.
    pub fn record_tag(&mut self, tag: Arc<str>) -> bool {
        if self.has_tag(&tag) {
            false
        } else {
            self.to_tags.push(tag);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Testable Property 4: at most one armed instance per timer kind.
    #[test_log::test]
    fn arming_replaces_not_duplicates() {
        let mut timers = TimerSet::default();
        timers.arm(TimerKind::TimerC, Instant::now());
        timers.arm(TimerKind::TimerC, Instant::now());
        assert_eq!(timers.armed_count(), 1);
    }

    #[test_log::test]
    fn cancel_is_idempotent() {
        let mut timers = TimerSet::default();
        timers.cancel(TimerKind::TimerD);
        timers.cancel(TimerKind::TimerD);
        assert_eq!(timers.armed_count(), 0);
    }

    #[test]
    fn record_tag_dedupes() {
        let mut trans_tags: Vec<Arc<str>> = Vec::new();
        let tag: Arc<str> = Arc::from("abc");
        trans_tags.push(tag.clone());
        assert!(trans_tags.iter().any(|t| t.as_ref() == "abc"));
    }
}
