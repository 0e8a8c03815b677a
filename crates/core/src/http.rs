//! Request and response types exchanged between the application, the
//! network and the cache.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Declared resource kind of an intercepted request.
///
/// Mirrors the platform's `Request.destination`: the empty string for
/// fetch/XHR calls, `document` for top-level page loads, and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Script,
    Style,
    Image,
    Font,
    Other(String),
}

impl Destination {
    pub fn as_str(&self) -> &str {
        match self {
            Destination::Empty => "",
            Destination::Document => "document",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Image => "image",
            Destination::Font => "font",
            Destination::Other(s) => s,
        }
    }
}

impl FromStr for Destination {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "" => Destination::Empty,
            "document" => Destination::Document,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "image" => Destination::Image,
            "font" => Destination::Font,
            other => Destination::Other(other.to_string()),
        })
    }
}

impl From<String> for Destination {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(d) => d,
            Err(never) => match never {},
        }
    }
}

impl From<Destination> for String {
    fn from(d: Destination) -> Self {
        d.as_str().to_string()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request intercepted from the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Absolute, canonical request URL.
    pub url: Url,
    pub destination: Destination,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl ProxyRequest {
    pub fn new(method: &str, url: Url) -> Self {
        Self {
            method: method.trim().to_ascii_uppercase(),
            url,
            destination: Destination::Empty,
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    /// A plain `GET` with no declared destination.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether a response to this request may be written to a generation
    /// without opting in. Only `GET` qualifies.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == "GET"
    }
}

/// A response received from the network or read back from a cache generation.
///
/// The body is reference counted, so cloning a response to store one copy and
/// hand the other to the caller never consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    /// Final URL the response was served from.
    pub url: String,
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self { url: url.into(), status, headers: BTreeMap::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Status in the 200-299 range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}
