//! SIP message and URI types shared by every component of the core.

mod method;
mod msg;
mod param;
mod uri;

pub use method::SipMethod;
pub use msg::{CSeq, DialogId, HeaderMap, MsgClass, MsgId, MsgLog, NkPort, SipMsg, TransId, TransportKind, ViaHeader};
pub use param::{Parameter, Parameters};
pub use uri::{empty_uri_set, Host, HostPort, NameAddr, Scheme, Uri, UriSet, UserInfo};
