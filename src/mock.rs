//! Test-only mock implementations of the five external-collaborator
//! traits (§6), plus small fixture builders — the same "mock fixture
//! module colocated with the production module" pattern this codebase's
//! transaction layer uses for its own tests.

#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::call::Call;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::message::{
    CSeq, DialogId, Host, HostPort, MsgClass, NameAddr, Scheme, SipMethod, SipMsg, TransId, TransportKind, Uri,
};
use crate::router::RouteOpts;
use crate::traits::{Collaborators, HookResult, RouteHookArgs, SendOpts, Transport, UriParser};
use crate::transaction::{Origin, Trans};

/// A `UriParser` stub: `sip:<name>` parses to one URI named `<name>`;
/// anything else (including the literal marker used by tests for an
/// intentionally-unparsable leaf) parses to nothing.
#[derive(Default)]
pub struct MockUriParser;

impl UriParser for MockUriParser {
    fn parse_uris(&self, input: &[u8]) -> Vec<Uri> {
        let text = std::str::from_utf8(input).unwrap_or("");
        if let Some(name) = text.strip_prefix("sip:") {
            if name == "unparsable" {
                return Vec::new();
            }
            return vec![uri_named(name)];
        }
        Vec::new()
    }
}

/// Records every send; never fails.
#[derive(Default)]
pub struct MockTransport {
    pub sent_requests: Mutex<Vec<SipMsg>>,
    pub resent: Mutex<Vec<SipMsg>>,
    pub sent_responses: Mutex<Vec<SipMsg>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_request(&self, req: &SipMsg, _call: &mut Call, _opts: &SendOpts) -> Result<SipMsg> {
        self.sent_requests.lock().unwrap().push(req.clone());
        Ok(req.clone())
    }

    async fn resend_request(&self, msg: &SipMsg, _opts: &SendOpts) -> Result<()> {
        self.resent.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn send_response(&self, resp: &SipMsg, _opts: &SendOpts) -> Result<()> {
        self.sent_responses.lock().unwrap().push(resp.clone());
        Ok(())
    }
}

/// Records every hook invocation; always succeeds.
#[derive(Default)]
pub struct MockDialog {
    pub invoked: Mutex<Vec<(DialogId, SipMethod)>>,
}

#[async_trait]
impl crate::traits::DialogHook for MockDialog {
    async fn update(&self, _req: &SipMsg, _resp: &SipMsg, _is_proxy: bool, _call: &mut Call) -> Result<()> {
        Ok(())
    }

    async fn auth_update(&self, _dialog_id: Option<&DialogId>, _resp: &SipMsg, _call: &mut Call) -> Result<()> {
        Ok(())
    }

    async fn remove_prov_event(&self, _req: &SipMsg, _call: &mut Call) -> Result<()> {
        Ok(())
    }

    async fn invoke(&self, dialog_id: &DialogId, method: SipMethod, _opts: &RouteOpts) -> Result<()> {
        self.invoked.lock().unwrap().push((dialog_id.clone(), method));
        Ok(())
    }
}

/// Always continues with the value it was given, unmodified.
#[derive(Default)]
pub struct MockService;

#[async_trait]
impl crate::traits::ServiceHook for MockService {
    async fn nksip_route(&self, args: RouteHookArgs, _call: &mut Call) -> HookResult<RouteHookArgs> {
        HookResult::Continue(args)
    }

    async fn nksip_uac_response(&self, resp: SipMsg, _trans: &Trans, _call: &mut Call) -> HookResult<SipMsg> {
        HookResult::Continue(resp)
    }
}

/// Records every response delivered upward.
#[derive(Default)]
pub struct MockReplySink {
    pub delivered: Mutex<Vec<SipMsg>>,
}

#[async_trait]
impl crate::traits::ReplySink for MockReplySink {
    async fn reply(&self, resp: SipMsg, _trans: &Trans, _call: &Call) {
        self.delivered.lock().unwrap().push(resp);
    }
}

/// The concrete mocks backing a [`Collaborators`] bundle, kept alongside
/// it so tests can inspect what happened.
pub struct Mocks {
    pub transport: Arc<MockTransport>,
    pub dialog: Arc<MockDialog>,
    pub service: Arc<MockService>,
    pub reply_sink: Arc<MockReplySink>,
}

/// Builds a fresh `Collaborators` bundle wired to inspectable mocks.
pub fn test_collaborators() -> (Collaborators, Mocks) {
    let transport = Arc::new(MockTransport::default());
    let dialog = Arc::new(MockDialog::default());
    let service = Arc::new(MockService::default());
    let reply_sink = Arc::new(MockReplySink::default());

    let collaborators = Collaborators {
        parser: Arc::new(MockUriParser),
        transport: transport.clone(),
        dialog: dialog.clone(),
        service: service.clone(),
        reply_sink: reply_sink.clone(),
    };

    (
        collaborators,
        Mocks {
            transport,
            dialog,
            service,
            reply_sink,
        },
    )
}

pub fn uri_named(name: &str) -> Uri {
    Uri::new(Scheme::Sip, None, HostPort::new(Host::Domain(name.into()), None))
}

/// A minimal well-formed request fixture.
pub fn test_request(method: SipMethod, max_forwards: Option<u32>) -> SipMsg {
    let uri = uri_named("target");
    SipMsg {
        class: MsgClass::Request(method.clone()),
        ruri: uri.clone(),
        from: NameAddr::new(uri.clone()),
        to: NameAddr::new(uri),
        cseq: CSeq { num: 1, method },
        call_id: Arc::from("cid-1"),
        via: vec![crate::message::ViaHeader {
            transport: TransportKind::Udp,
            sent_by: HostPort::new(Host::Domain("uac.example.com".into()), None),
            branch: Some(Arc::from("z9hG4bK-fixture")),
            received: None,
            rport: None,
        }],
        max_forwards,
        expires: None,
        headers: crate::message::HeaderMap::new(),
        body: None,
        msg_id: Arc::from("m1"),
        trans_id: None,
        dialog_id: None,
        nkport: None,
    }
}

/// A fresh INVITE client transaction, as the router would hand to the
/// (out-of-scope) transaction manager.
pub fn test_invite_trans(id: &str, transport: TransportKind) -> Trans {
    let request = test_request(SipMethod::Invite, Some(70));
    Trans::new(
        Arc::from(id),
        SipMethod::Invite,
        transport,
        Origin::User,
        RouteOpts::default(),
        request,
    )
}

/// A response fixture addressed to `trans_id`. `wire` controls whether
/// `nkport` is populated (`true`) or left `None` to simulate a locally
/// synthesized response.
pub fn test_invite_response(trans_id: &TransId, code: u16, reason: &str, to_tag: Option<&str>, wire: bool) -> SipMsg {
    let uri = uri_named("target");
    let mut to = NameAddr::new(uri.clone());
    if let Some(tag) = to_tag {
        to.set_tag(tag);
    }
    SipMsg {
        class: MsgClass::Response(code, Arc::from(reason)),
        ruri: uri.clone(),
        from: NameAddr::new(uri.clone()),
        to,
        cseq: CSeq {
            num: 1,
            method: SipMethod::Invite,
        },
        call_id: Arc::from("cid-1"),
        via: vec![crate::message::ViaHeader {
            transport: TransportKind::Udp,
            sent_by: HostPort::new(Host::Domain("uac.example.com".into()), None),
            branch: Some(Arc::from("z9hG4bK-fixture")),
            received: None,
            rport: None,
        }],
        max_forwards: None,
        expires: None,
        headers: crate::message::HeaderMap::new(),
        body: None,
        msg_id: Arc::from(format!("resp-{code}")),
        trans_id: Some(trans_id.clone()),
        dialog_id: Some(Arc::from(format!("dlg-{}", to_tag.unwrap_or("none")))),
        nkport: wire.then(|| crate::message::NkPort {
            transport: TransportKind::Udp,
            remote: std::net::SocketAddr::from(([127, 0, 0, 1], 5060)),
            local: Some(std::net::SocketAddr::from(([127, 0, 0, 1], 5061))),
        }),
    }
}

/// A minimal [`EngineConfig`] wrapped for test convenience.
pub fn test_config() -> Arc<EngineConfig> {
    Arc::new(EngineConfig::default())
}
