//! SIP request methods.

use std::fmt;

/// A SIP request method.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum SipMethod {
    /// `INVITE`
    Invite,
    /// `ACK`
    Ack,
    /// `BYE`
    Bye,
    /// `CANCEL`
    Cancel,
    /// `OPTIONS`
    Options,
    /// `REGISTER`
    Register,
    /// `SUBSCRIBE`
    Subscribe,
    /// `NOTIFY`
    Notify,
    /// `REFER`
    Refer,
    /// `PRACK`
    Prack,
    /// `UPDATE`
    Update,
    /// `MESSAGE`
    Message,
    /// `PUBLISH`
    Publish,
    /// An extension method not listed above.
    Other(String),
}

impl SipMethod {
    /// Returns `true` for methods that establish or terminate fork-visible
    /// dialog-altering state and thus drive `remove_prov_event`.
    pub fn is_event_method(&self) -> bool {
        matches!(self, SipMethod::Subscribe | SipMethod::Refer)
    }

    /// Returns the method's canonical wire name.
    pub fn as_str(&self) -> &str {
        match self {
            SipMethod::Invite => "INVITE",
            SipMethod::Ack => "ACK",
            SipMethod::Bye => "BYE",
            SipMethod::Cancel => "CANCEL",
            SipMethod::Options => "OPTIONS",
            SipMethod::Register => "REGISTER",
            SipMethod::Subscribe => "SUBSCRIBE",
            SipMethod::Notify => "NOTIFY",
            SipMethod::Refer => "REFER",
            SipMethod::Prack => "PRACK",
            SipMethod::Update => "UPDATE",
            SipMethod::Message => "MESSAGE",
            SipMethod::Publish => "PUBLISH",
            SipMethod::Other(name) => name,
        }
    }
}

impl fmt::Display for SipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
