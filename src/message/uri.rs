//! SIP URIs.
//!
//! A faithful fork of this engine's `Uri` keeps two extra slots beyond what a
//! transport-facing URI needs: `ext_opts` and `ext_headers`. Both exist only
//! to shuttle router/caller-supplied annotations through the normalizer; a
//! `Uri` that is about to become a Request-URI must have both stripped (see
//! [`Uri::strip_ext`]) — that is the one invariant the normalizer promises
//! callers downstream.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use super::param::Parameters;

/// `sip:` or `sips:`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Scheme {
    #[default]
    /// Plain `sip:` scheme.
    Sip,
    /// TLS-secured `sips:` scheme.
    Sips,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
        })
    }
}

/// User/password portion of a URI.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserInfo {
    /// The user part.
    pub user: Arc<str>,
    /// Optional password.
    pub pass: Option<Arc<str>>,
}

impl UserInfo {
    /// Creates a new `UserInfo`.
    pub fn new(user: &str, pass: Option<&str>) -> Self {
        Self {
            user: user.into(),
            pass: pass.map(Into::into),
        }
    }
}

impl fmt::Display for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user)?;
        if let Some(pass) = &self.pass {
            write!(f, ":{pass}")?;
        }
        Ok(())
    }
}

/// A domain name or literal IP address.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Host {
    /// A domain name, e.g. `example.com`.
    Domain(Arc<str>),
    /// A literal IP address.
    Ip(IpAddr),
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Domain(d) => f.write_str(d),
            Host::Ip(ip) => write!(f, "{ip}"),
        }
    }
}

impl FromStr for Host {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<IpAddr>() {
            Ok(ip) => Host::Ip(ip),
            Err(_) => Host::Domain(s.into()),
        })
    }
}

/// Host plus optional port.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct HostPort {
    /// The host.
    pub host: Host,
    /// Optional port.
    pub port: Option<u16>,
}

impl HostPort {
    /// Creates a new `HostPort`.
    pub fn new(host: Host, port: Option<u16>) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// A SIP URI.
///
/// `ext_opts` and `ext_headers` are the normalizer's scratch slots — they
/// never appear in an R-URI that has been through [`Uri::strip_ext`].
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct Uri {
    /// URI scheme.
    pub scheme: Scheme,
    /// Optional user part.
    pub user: Option<UserInfo>,
    /// Host and port.
    pub host_port: HostPort,
    /// `;transport=`, `;ttl=`, `;lr`, `;maddr=` and other URI parameters.
    pub params: Parameters,
    /// URI header parameters (the `?name=value&...` suffix).
    pub headers: Parameters,
    /// Caller-supplied options riding along with this URI, stripped before
    /// the URI is used as a Request-URI.
    pub ext_opts: Parameters,
    /// Caller-supplied extra headers riding along with this URI, stripped
    /// before the URI is used as a Request-URI.
    pub ext_headers: Parameters,
}

impl Uri {
    /// Creates a bare URI with no parameters.
    pub fn new(scheme: Scheme, user: Option<UserInfo>, host_port: HostPort) -> Self {
        Self {
            scheme,
            user,
            host_port,
            ..Default::default()
        }
    }

    /// Returns `true` if both extension slots are empty — the invariant
    /// every R-URI must uphold.
    pub fn is_stripped(&self) -> bool {
        self.ext_opts.is_empty() && self.ext_headers.is_empty()
    }

    /// Returns a copy of this URI with both extension slots cleared.
    pub fn strip_ext(&self) -> Self {
        Self {
            ext_opts: Parameters::new(),
            ext_headers: Parameters::new(),
            ..self.clone()
        }
    }

    /// Returns the `lr` flag (loose-routing) of this URI.
    pub fn is_loose_routing(&self) -> bool {
        self.params.contains("lr")
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        write!(f, "{}", self.host_port)?;
        if !self.params.is_empty() {
            write!(f, ";{}", self.params)?;
        }
        if !self.headers.is_empty() {
            write!(f, "?{}", self.headers)?;
        }
        Ok(())
    }
}

/// A named address: an optional display name wrapped around a [`Uri`], plus
/// the tag parameter used by `From`/`To` headers.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NameAddr {
    /// Optional display name.
    pub display: Option<Arc<str>>,
    /// The wrapped URI.
    pub uri: Uri,
    /// The `tag` parameter, present once a dialog leg has been established.
    pub tag: Option<Arc<str>>,
}

impl NameAddr {
    /// Creates a `NameAddr` with no display name or tag.
    pub fn new(uri: Uri) -> Self {
        Self {
            display: None,
            uri,
            tag: None,
        }
    }

    /// Returns the tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Sets the tag.
    pub fn set_tag(&mut self, tag: impl Into<Arc<str>>) {
        self.tag = Some(tag.into());
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(display) = &self.display {
            write!(f, "\"{display}\" ")?;
        }
        write!(f, "<{}>", self.uri)?;
        if let Some(tag) = &self.tag {
            write!(f, ";tag={tag}")?;
        }
        Ok(())
    }
}

/// Canonical normalizer output: outer list = serial steps tried in order,
/// inner list = a parallel fork group.
pub type UriSet = Vec<Vec<Uri>>;

/// An empty `UriSet` — "no destinations".
pub fn empty_uri_set() -> UriSet {
    vec![vec![]]
}
