//! Policy outcomes of routing.
//!
//! A [`ReplySpec`] is a *value*, not an [`crate::error::Error`]: every
//! variant here is an expected, total outcome the Request Validator or
//! Proxy Router can reach while doing its job correctly. The (out of
//! scope) reply formatter turns one of these into an outgoing
//! [`crate::message::SipMsg`] via `reply_build(req, reply_spec)`.

use std::fmt;

/// A routing or validation outcome that must be turned into an outgoing
/// response rather than a fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySpec {
    /// `Max-Forwards` reached zero on a non-`OPTIONS` request (483).
    TooManyHops,
    /// `Max-Forwards` was absent or malformed (400).
    InvalidRequest,
    /// Normalization produced no destinations (480).
    TemporarilyUnavailable,
    /// The request carries `Proxy-Require` tokens this proxy does not
    /// implement (420), carrying the comma-joined unsupported tags.
    BadExtension(String),
    /// `opts` demanded an extension (e.g. `path`) the request does not
    /// list in `Supported` (421).
    ExtensionRequired(String),
    /// `Max-Forwards` reached zero on an `OPTIONS` request: a synthesized
    /// 200 carrying this proxy's `Supported`/`Accept`/`Allow` tags and
    /// the reason phrase `"Max Forwards"`.
    OptionsMaxForwards {
        /// `Supported` tags to report.
        supported: Vec<String>,
        /// `Accept` media types to report.
        accept: Vec<String>,
        /// `Allow` methods to report.
        allow: Vec<String>,
    },
}

impl ReplySpec {
    /// The reason phrase the (out-of-scope) reply formatter should use,
    /// where this spec pins one down explicitly.
    pub fn reason_phrase(&self) -> Option<&'static str> {
        match self {
            ReplySpec::OptionsMaxForwards { .. } => Some("Max Forwards"),
            _ => None,
        }
    }
}

impl fmt::Display for ReplySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplySpec::TooManyHops => write!(f, "too_many_hops"),
            ReplySpec::InvalidRequest => write!(f, "invalid_request"),
            ReplySpec::TemporarilyUnavailable => write!(f, "temporarily_unavailable"),
            ReplySpec::BadExtension(tags) => write!(f, "bad_extension: {tags}"),
            ReplySpec::ExtensionRequired(ext) => write!(f, "extension_required({ext})"),
            ReplySpec::OptionsMaxForwards { .. } => write!(f, "ok: Max Forwards"),
        }
    }
}
