//! The immutable SIP message value the engine's components operate on.
//!
//! `SipMsg` is deliberately an owned, `'static` value rather than a
//! borrowed view over a wire buffer: it has to cross the call actor's
//! channel boundary (§5 of the design — the actor is driven by an
//! mpsc-fed command loop) and ride inside a [`crate::transaction::Trans`]
//! that outlives any single parse. Parsing itself is an out-of-scope
//! collaborator (see [`crate::traits::UriParser`]); this module only
//! describes the shape the engine reasons about afterwards.

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;

use super::method::SipMethod;
use super::uri::{NameAddr, Uri};

/// Message, transaction and dialog identifiers are opaque interned strings
/// handed to us by the (out-of-scope) collaborators that mint them.
pub type MsgId = Arc<str>;
/// See [`MsgId`].
pub type TransId = Arc<str>;
/// See [`MsgId`].
pub type DialogId = Arc<str>;

/// Whether a transaction's messages travel over a transport that
/// retransmits on its own (TCP/TLS/WS) or one that needs the transaction
/// layer to do it (UDP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Unreliable, connectionless — the transaction layer owns retransmission.
    Udp,
    /// Connection-oriented and reliable (TCP, TLS, WebSocket).
    Reliable,
}

impl TransportKind {
    /// `true` for UDP, where the INVITE/non-INVITE client transaction
    /// machinery is responsible for request retransmission and for
    /// absorbing duplicate final responses (`timer_d`/`timer_k`).
    pub fn is_udp(self) -> bool {
        matches!(self, TransportKind::Udp)
    }
}

/// The origin transport handle carried by a [`SipMsg`].
///
/// `None` marks a message this engine synthesized locally (a local 408,
/// or the zero-hops `OPTIONS` success reply) rather than one that arrived
/// over the wire — several state-machine branches key off exactly that
/// distinction (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NkPort {
    /// Transport kind this handle was received on / will send over.
    pub transport: TransportKind,
    /// Where to send the next message on this handle.
    pub remote: SocketAddr,
    /// The local association to send from. `None` means "no usable
    /// socket" — the stateless relay clears this when rewriting a
    /// response's return route, forcing the transport layer to open or
    /// select a fresh association rather than reuse the UAS-side one.
    pub local: Option<SocketAddr>,
}

/// `{req, Method}` or `{resp, Code, Reason}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgClass {
    /// A request, tagged with its method.
    Request(SipMethod),
    /// A response, tagged with its status code and reason phrase.
    Response(u16, Arc<str>),
}

impl MsgClass {
    /// Returns the status code of a response, `None` for requests.
    pub fn code(&self) -> Option<u16> {
        match self {
            MsgClass::Response(code, _) => Some(*code),
            MsgClass::Request(_) => None,
        }
    }
}

/// The `CSeq` header: a sequence number paired with the method it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    /// Sequence number.
    pub num: u32,
    /// Method this CSeq belongs to (for a response, the method of the
    /// request it answers — not necessarily the class's own method).
    pub method: SipMethod,
}

/// One entry of the Via stack, ordered top (closest hop) to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaHeader {
    /// Transport this hop used.
    pub transport: TransportKind,
    /// `sent-by` host and port.
    pub sent_by: super::uri::HostPort,
    /// The `branch` parameter.
    pub branch: Option<Arc<str>>,
    /// The `received` parameter, set by the hop that actually saw the
    /// source address differ from `sent_by`.
    pub received: Option<std::net::IpAddr>,
    /// The `rport` parameter, the symmetric-response-routing port.
    pub rport: Option<u16>,
}

/// A flat, case-insensitive multimap of header name to raw value, for the
/// headers this core only ever needs to read back out wholesale
/// (`Supported`, `Proxy-Require`, `Accept`, `Allow`) rather than structure
/// into dedicated types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap(Vec<(Arc<str>, Arc<str>)>);

impl HeaderMap {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, preserving insertion order and any duplicates.
    pub fn push(&mut self, name: impl Into<Arc<str>>, value: impl Into<Arc<str>>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_ref())
    }

    /// Returns the comma-joined option-tags of every header named `name`
    /// (`Supported`, `Proxy-Require`, ... are all `1#token` grammars),
    /// flattening repeated headers and repeated tags within one header.
    pub fn tokens(&self, name: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .flat_map(|(_, v)| v.split(','))
            .map(|tok| tok.trim().to_string())
            .filter(|tok| !tok.is_empty())
            .collect()
    }
}

/// An immutable SIP message.
#[derive(Debug, Clone)]
pub struct SipMsg {
    /// Request or response discriminant.
    pub class: MsgClass,
    /// Request-URI. Meaningless for responses but kept populated from the
    /// originating request for convenience when building an ACK.
    pub ruri: Uri,
    /// `From` header.
    pub from: NameAddr,
    /// `To` header.
    pub to: NameAddr,
    /// `CSeq` header.
    pub cseq: CSeq,
    /// `Call-ID` header.
    pub call_id: Arc<str>,
    /// Via stack, ordered top-to-bottom.
    pub via: Vec<ViaHeader>,
    /// `Max-Forwards`, when present.
    pub max_forwards: Option<u32>,
    /// `Expires`, when present (seconds).
    pub expires: Option<u32>,
    /// Every other header this core reads back wholesale.
    pub headers: HeaderMap,
    /// Message body, opaque to this core.
    pub body: Option<Bytes>,
    /// This message's own identifier.
    pub msg_id: MsgId,
    /// The transaction this message belongs to, once known.
    pub trans_id: Option<TransId>,
    /// The dialog this message belongs to, once known.
    pub dialog_id: Option<DialogId>,
    /// Origin transport handle. `None` when the message was synthesized
    /// locally rather than received from or about to be sent to the wire.
    pub nkport: Option<NkPort>,
}

impl SipMsg {
    /// The method of a request, or the method this response answers
    /// (carried in `CSeq`).
    pub fn method(&self) -> &SipMethod {
        match &self.class {
            MsgClass::Request(m) => m,
            MsgClass::Response(..) => &self.cseq.method,
        }
    }

    /// The status code, for a response.
    pub fn status_code(&self) -> Option<u16> {
        self.class.code()
    }

    /// `true` if this message was produced locally (a synthesized 408, or
    /// a zero-hops `OPTIONS` success) rather than received over the wire.
    pub fn is_local(&self) -> bool {
        self.nkport.is_none()
    }

    /// `Supported` option-tags.
    pub fn supported_tokens(&self) -> Vec<String> {
        self.headers.tokens("Supported")
    }

    /// `Proxy-Require` option-tags.
    pub fn proxy_require_tokens(&self) -> Vec<String> {
        self.headers.tokens("Proxy-Require")
    }

    /// Builds a locally synthesized final response sharing this message's
    /// dialog-identifying headers (`From`, `To`, `Call-ID`, `CSeq`) but
    /// carrying no transport handle — used for the transaction-timeout
    /// 408 and the zero-hops `OPTIONS` success reply.
    pub fn synth_response(&self, code: u16, reason: impl Into<Arc<str>>) -> SipMsg {
        SipMsg {
            class: MsgClass::Response(code, reason.into()),
            ruri: self.ruri.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            cseq: CSeq {
                num: self.cseq.num,
                method: self.cseq.method.clone(),
            },
            call_id: self.call_id.clone(),
            via: self.via.clone(),
            max_forwards: None,
            expires: None,
            headers: HeaderMap::new(),
            body: None,
            msg_id: self.msg_id.clone(),
            trans_id: self.trans_id.clone(),
            dialog_id: self.dialog_id.clone(),
            nkport: None,
        }
    }
}

impl fmt::Display for SipMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            MsgClass::Request(method) => write!(f, "{method} {}", self.ruri),
            MsgClass::Response(code, reason) => write!(f, "{code} {reason}"),
        }
    }
}

/// The call's recent-message log: `(msg_id, trans_id, dialog_id)`,
/// most-recent first.
pub type MsgLog = VecDeque<(MsgId, Option<TransId>, Option<DialogId>)>;
